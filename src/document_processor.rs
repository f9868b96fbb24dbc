//! # Document Processing Module
//!
//! Questo modulo comprime documenti basati su archivi zip (DOCX).
//!
//! ## Pipeline di compressione:
//! 1. Estrae l'intero archivio nel workspace
//! 2. Cerca la cartella media (`word/media`); se assente l'archivio viene
//!    solo ri-impacchettato
//! 3. Ricodifica ogni immagine della cartella in JPEG, sovrascrivendo i byte
//!    originali dell'entry
//! 4. Ri-impacchetta tutti i file con deflate, preservando i path relativi
//!
//! Le parti strutturali e testuali non vengono mai modificate: l'unico
//! contenuto comprimibile di un documento sono le immagini raster.
//!
//! ## Resilienza:
//! Un'immagine corrotta o in un formato non raster (EMF, WMF, SVG) viene
//! saltata e registrata nel `AssetSummary`; il documento non fallisce mai per
//! un singolo asset.

use crate::assets::AssetSummary;
use crate::error::CompressError;
use crate::image_processor::{decode_image, encode_jpeg};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const EXTRACT_DIR: &str = "extracted";

/// Recompresses raster media inside a zip-structured document
pub struct DocumentProcessor {
    quality: u8,
    media_dir: String,
}

impl DocumentProcessor {
    pub fn new(quality: u8, media_dir: impl Into<String>) -> Self {
        Self {
            quality,
            media_dir: media_dir.into(),
        }
    }

    /// Compress the document at `input_path`, using `workspace` for the
    /// extracted tree. Returns the bytes of the rebuilt archive.
    pub fn compress(&self, input_path: &Path, workspace: &Workspace) -> Result<(Vec<u8>, AssetSummary)> {
        let root = workspace.join(EXTRACT_DIR);
        std::fs::create_dir_all(&root)?;

        self.extract(input_path, &root)?;

        let media_path = root.join(self.media_dir.trim_matches('/'));
        let summary = if media_path.is_dir() {
            self.recompress_media(&media_path)?
        } else {
            debug!("No media directory in {}, repacking unchanged", input_path.display());
            AssetSummary::new()
        };

        let archive = repack(&root)?;
        info!(
            "Rebuilt {} ({}): {} bytes",
            input_path.file_name().unwrap_or_default().to_string_lossy(),
            summary.describe(),
            archive.len()
        );
        Ok((archive, summary))
    }

    fn extract(&self, input_path: &Path, root: &Path) -> Result<()> {
        let file = File::open(input_path)
            .with_context(|| format!("Failed to open document {}", input_path.display()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            CompressError::Decode(format!("{} is not a zip-based document: {}", input_path.display(), e))
        })?;
        archive.extract(root).map_err(|e| {
            CompressError::Decode(format!("Failed to extract {}: {}", input_path.display(), e))
        })?;
        debug!("Extracted {} entries from {}", archive.len(), input_path.display());
        Ok(())
    }

    fn recompress_media(&self, media_path: &Path) -> Result<AssetSummary> {
        let mut summary = AssetSummary::new();

        let mut entries: Vec<_> = std::fs::read_dir(media_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        entries.sort();

        for path in entries {
            let name = format!(
                "{}/{}",
                self.media_dir.trim_matches('/'),
                path.file_name().unwrap_or_default().to_string_lossy()
            );
            match self.recompress_asset(&path) {
                Ok((before, after)) => {
                    debug!("Recompressed {}: {} -> {} bytes", name, before, after);
                    summary.record_recompressed(name, before, after);
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", name, e);
                    summary.record_skipped(name, format!("{:#}", e));
                }
            }
        }

        Ok(summary)
    }

    /// Overwrite one media entry in place with its JPEG re-encoding
    fn recompress_asset(&self, path: &Path) -> Result<(u64, u64)> {
        let bytes = std::fs::read(path)?;
        let img = decode_image(&bytes)?;
        let encoded = encode_jpeg(&img, self.quality)?;
        std::fs::write(path, &encoded)?;
        Ok((bytes.len() as u64, encoded.len() as u64))
    }
}

/// Zip every file under `root` with deflate, keeping root-relative paths
fn repack(root: &Path) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer.start_file(name, options)?;
        writer.write_all(&std::fs::read(entry.path())?)?;
    }

    Ok(writer.finish()?.into_inner())
}
