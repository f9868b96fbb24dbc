//! # Workspace Manager Module
//!
//! Questo modulo gestisce le directory temporanee usate dalle strategie.
//!
//! ## Responsabilità:
//! - Crea una directory scratch esclusiva per ogni invocazione
//! - Garantisce la rimozione ricorsiva su ogni percorso d'uscita (anche errori)
//! - Mantiene al massimo un workspace vivo per `Dispatcher`
//!
//! ## Ciclo di vita:
//! 1. `WorkspaceSlot::acquire()` elimina il workspace precedente e ne crea uno nuovo
//! 2. La strategia scrive i suoi artefatti intermedi dentro il workspace
//! 3. `WorkspaceSlot::release()` (o il drop) rimuove tutto
//!
//! Il video è l'unico caso in cui il workspace sopravvive alla strategia:
//! il file generato resta valido finché non viene salvato o sostituito.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "sfc-";

/// Scratch directory owned by a single compression invocation
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`, or the system temp dir
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Remove the directory now, reporting failures instead of ignoring them
    pub fn close(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

/// Holds at most one live workspace
#[derive(Debug, Default)]
pub struct WorkspaceSlot {
    root: Option<PathBuf>,
    current: Option<Workspace>,
}

impl WorkspaceSlot {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root, current: None }
    }

    /// Dispose the previous workspace, then create a new one
    pub fn acquire(&mut self) -> Result<&Workspace> {
        self.release();
        let workspace = Workspace::create(self.root.as_deref())?;
        Ok(&*self.current.insert(workspace))
    }

    /// Dispose the current workspace, if any
    pub fn release(&mut self) {
        if let Some(workspace) = self.current.take() {
            let path = workspace.path().to_path_buf();
            if let Err(e) = workspace.close() {
                warn!("Failed to remove workspace {}: {}", path.display(), e);
            }
        }
    }

    pub fn current(&self) -> Option<&Workspace> {
        self.current.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for WorkspaceSlot {
    fn drop(&mut self) {
        self.release();
    }
}
