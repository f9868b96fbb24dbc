//! # Compression Dispatcher
//!
//! Coordinatore principale: dato (path, tipo dichiarato) sceglie la strategia,
//! la esegue e riporta un risultato uniforme.
//!
//! ## Flusso:
//! 1. Elimina qualsiasi workspace rimasto dalla richiesta precedente
//! 2. Misura la sorgente (mancante o zero byte = `InvalidInput`)
//! 3. Esegue la strategia per il tipo dichiarato (match esaustivo)
//! 4. Misura il risultato: lunghezza del buffer o dimensione del file generato
//! 5. Applica la policy sulle dimensioni e costruisce `CompressionResult`
//!
//! ## Stati per richiesta:
//! `Idle → Running → Succeeded | Failed`. Nessun retry: un fallimento è
//! terminale, e il workspace creato durante il tentativo viene sempre rilasciato.
//!
//! ## Concorrenza:
//! `compress` è bloccante e richiede `&mut self`: una sola richiesta alla volta.
//! Chi ha un event loop (CLI, UI) deve chiamarlo da un thread dedicato.

use crate::config::Config;
use crate::document_processor::DocumentProcessor;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::image_processor::ImageProcessor;
use crate::pdf_processor::PdfProcessor;
use crate::types::{savings_percent, CompressionRequest, CompressionResult, DeclaredType, Payload};
use crate::assets::AssetSummary;
use crate::video_processor::VideoProcessor;
use crate::workspace::{Workspace, WorkspaceSlot};
use std::path::Path;
use tracing::{debug, info, warn};

/// Lifecycle of the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Selects and runs the strategy matching a request's declared type
pub struct Dispatcher {
    config: Config,
    workspace: WorkspaceSlot,
    state: DispatchState,
}

impl Dispatcher {
    /// Create a dispatcher after validating `config`
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let workspace = WorkspaceSlot::new(config.scratch_root.clone());
        Ok(Self {
            config,
            workspace,
            state: DispatchState::Idle,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Scratch directory backing the last result, if one is still alive
    pub fn live_workspace(&self) -> Option<&Path> {
        self.workspace.current().map(Workspace::path)
    }

    /// Run the strategy for `request`, blocking until it finishes
    pub fn compress(&mut self, request: &CompressionRequest) -> Result<CompressionResult, CompressError> {
        self.workspace.release();
        self.state = DispatchState::Running;

        let outcome = self.run(request);
        self.state = match outcome {
            Ok(_) => DispatchState::Succeeded,
            Err(ref e) => {
                warn!("Compression of {} failed: {}", request.source_path().display(), e);
                self.workspace.release();
                DispatchState::Failed
            }
        };
        outcome
    }

    fn run(&mut self, request: &CompressionRequest) -> Result<CompressionResult, CompressError> {
        let source = request.source_path();
        let declared_type = request.declared_type();

        let original_size = FileManager::source_size(source)?;
        if original_size == 0 {
            return Err(CompressError::InvalidInput(format!(
                "Source file is empty: {}",
                source.display()
            )));
        }

        info!("Compressing {} as {}", source.display(), declared_type);
        let strategy = declared_type.strategy_name();
        let (payload, assets) = self
            .run_strategy(declared_type, source)
            .map_err(|e| CompressError::from_strategy(strategy, e))?;

        let compressed_size = match payload {
            Payload::Buffer(ref bytes) => bytes.len() as u64,
            Payload::File(ref path) => std::fs::metadata(path)?.len(),
        };
        let savings = savings_percent(original_size, compressed_size)?;

        if self.config.reject_larger && compressed_size >= original_size {
            return Err(CompressError::NotSmaller {
                original: original_size,
                compressed: compressed_size,
            });
        }

        let message = match assets {
            Some(ref summary) => format!("{} ({})", declared_type.success_message(), summary.describe()),
            None => declared_type.success_message().to_string(),
        };
        info!(
            "Original: {} | Compressed: {} | Saved: {}%",
            FileManager::format_size(original_size),
            FileManager::format_size(compressed_size),
            savings
        );

        Ok(CompressionResult {
            declared_type,
            payload,
            original_size_bytes: original_size,
            compressed_size_bytes: compressed_size,
            message,
            assets,
        })
    }

    fn run_strategy(
        &mut self,
        declared_type: DeclaredType,
        source: &Path,
    ) -> anyhow::Result<(Payload, Option<AssetSummary>)> {
        let config = &self.config;
        match declared_type {
            DeclaredType::Document => {
                let processor = DocumentProcessor::new(config.document_quality, config.document_media_dir.clone());
                let workspace = self.workspace.acquire()?;
                let result = processor.compress(source, workspace);
                // The extracted tree is not needed once the archive is in memory
                self.workspace.release();
                let (bytes, summary) = result?;
                Ok((Payload::Buffer(bytes), Some(summary)))
            }
            DeclaredType::Image => {
                let bytes = ImageProcessor::new(config.image_quality).compress(source)?;
                Ok((Payload::Buffer(bytes), None))
            }
            DeclaredType::Pdf => {
                let (bytes, summary) = PdfProcessor::new(config.pdf_image_quality).compress(source)?;
                Ok((Payload::Buffer(bytes), Some(summary)))
            }
            DeclaredType::Video => {
                let processor = VideoProcessor::new(config.clone());
                let workspace = self.workspace.acquire()?;
                let output = processor.compress(source, workspace)?;
                Ok((Payload::File(output), None))
            }
        }
    }

    /// Persist a result to `destination`, then dispose the workspace.
    ///
    /// Returns the number of bytes written.
    pub fn save(&mut self, result: &CompressionResult, destination: &Path) -> Result<u64, CompressError> {
        let written = match result.payload {
            Payload::Buffer(ref bytes) => FileManager::write_atomic(destination, bytes)?,
            Payload::File(ref path) => {
                if !path.is_file() {
                    return Err(CompressError::InvalidInput(format!(
                        "Compressed output is no longer available: {}",
                        path.display()
                    )));
                }
                FileManager::copy_atomic(path, destination)?
            }
        };
        info!("Saved compressed file as {}", destination.display());

        self.dispose_workspace();
        Ok(written)
    }

    /// Release any lingering workspace
    pub fn dispose_workspace(&mut self) {
        if self.workspace.is_live() {
            debug!("Disposing workspace");
        }
        self.workspace.release();
    }
}
