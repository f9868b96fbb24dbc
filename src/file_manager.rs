//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file attorno alla pipeline.
//!
//! ## Responsabilità:
//! - Misura la dimensione della sorgente e del file generato
//! - Salva buffer o copia file generati nella destinazione scelta
//! - Sostituzione sicura con backup se la destinazione esiste già
//! - Formattazione human-readable delle dimensioni
//!
//! ## Sicurezza operazioni:
//! - Backup automatico prima della sostituzione
//! - Rollback in caso di errore durante la scrittura
//!
//! ## Esempio:
//! ```ignore
//! let size = FileManager::source_size(&path)?;
//! FileManager::write_atomic(&destination, &bytes)?;
//! println!("{}", FileManager::format_size(size));
//! ```

use crate::error::CompressError;
use crate::types::DeclaredType;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File helpers for sources and saved results
pub struct FileManager;

impl FileManager {
    /// Size of a declared source, which must be an existing regular file
    pub fn source_size(path: &Path) -> Result<u64, CompressError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                CompressError::InvalidInput(format!("Source file does not exist: {}", path.display()))
            }
            _ => CompressError::Io(e),
        })?;

        if !metadata.is_file() {
            return Err(CompressError::InvalidInput(format!(
                "Source is not a regular file: {}",
                path.display()
            )));
        }

        Ok(metadata.len())
    }

    /// Write `bytes` to `destination`, keeping a backup of any existing file
    /// until the write has succeeded
    pub fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<u64, CompressError> {
        Self::replace_with(destination, |dest| std::fs::write(dest, bytes).map(|_| bytes.len() as u64))
    }

    /// Copy a generated file to `destination` with the same backup semantics
    pub fn copy_atomic(source: &Path, destination: &Path) -> Result<u64, CompressError> {
        Self::replace_with(destination, |dest| std::fs::copy(source, dest))
    }

    fn replace_with<F>(destination: &Path, write: F) -> Result<u64, CompressError>
    where
        F: FnOnce(&Path) -> std::io::Result<u64>,
    {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let backup_path = if destination.exists() {
            let backup = Self::backup_path(destination);
            std::fs::copy(destination, &backup)?;
            Some(backup)
        } else {
            None
        };

        match write(destination) {
            Ok(written) => {
                if let Some(ref backup) = backup_path {
                    let _ = std::fs::remove_file(backup);
                }
                debug!("Wrote {} bytes to {}", written, destination.display());
                Ok(written)
            }
            Err(e) => {
                match backup_path {
                    Some(ref backup) => {
                        let _ = std::fs::copy(backup, destination);
                        let _ = std::fs::remove_file(backup);
                    }
                    None => {
                        let _ = std::fs::remove_file(destination);
                    }
                }
                Err(e.into())
            }
        }
    }

    fn backup_path(path: &Path) -> PathBuf {
        path.with_extension(format!(
            "{}.backup",
            path.extension().unwrap_or_default().to_string_lossy()
        ))
    }

    /// Default save location: `<stem>_compressed.<ext>` beside the source.
    ///
    /// Images are always re-encoded as JPEG, so they always get `.jpg`; the
    /// other types keep the source extension when there is one.
    pub fn default_destination(source: &Path, suffix: &str, declared_type: DeclaredType) -> PathBuf {
        let stem = source.file_stem().unwrap_or_default().to_string_lossy();
        let ext = match (declared_type, source.extension()) {
            (DeclaredType::Image, _) | (_, None) => declared_type.default_extension().to_string(),
            (_, Some(ext)) => ext.to_string_lossy().into_owned(),
        };
        source.with_file_name(format!("{}{}.{}", stem, suffix, ext))
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
