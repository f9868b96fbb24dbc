//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione delle strategie di compressione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i profili fissi di ogni formato
//! - Fornisce validazione dei parametri prima del dispatch
//! - Fornisce valori di default identici al profilo storico dello strumento
//!
//! ## Parametri di configurazione:
//! - `document_quality`: Qualità JPEG per le immagini nei documenti (default: 40)
//! - `document_media_dir`: Cartella media nell'archivio (default: "word/media")
//! - `image_quality`: Qualità JPEG per immagini singole (default: 30)
//! - `pdf_image_quality`: Qualità JPEG per le immagini nei PDF (default: 40)
//! - `video_codec` / `video_crf` / `video_preset`: Profilo FFmpeg (libx264, 28, fast)
//! - `audio_codec` / `audio_bitrate`: Audio (aac, 128k)
//! - `output_suffix`: Suffisso del file video generato (default: "_compressed")
//! - `ffmpeg_path`: Binario FFmpeg esplicito (default: risolto dal tool resolver)
//! - `scratch_root`: Directory padre dei workspace (default: temp di sistema)
//! - `reject_larger`: Rifiuta risultati non più piccoli (default: false)
//!
//! ## Validazione:
//! - Controlla che le qualità siano 1-100
//! - Controlla che video_crf sia 0-51
//! - Controlla che suffisso e cartella media non siano vuoti
//!
//! La configurazione vive solo in memoria: non viene mai salvata su disco.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the compression strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JPEG quality for images embedded in documents (1-100)
    pub document_quality: u8,
    /// Archive-relative directory holding document media
    pub document_media_dir: String,
    /// JPEG quality for single images (1-100)
    pub image_quality: u8,
    /// JPEG quality for images embedded in PDFs (1-100)
    pub pdf_image_quality: u8,
    /// Video codec passed to ffmpeg
    pub video_codec: String,
    /// Video CRF value (0-51, lower = better quality)
    pub video_crf: u8,
    /// Encoder speed/quality preset
    pub video_preset: String,
    /// Audio codec passed to ffmpeg
    pub audio_codec: String,
    /// Video audio bitrate
    pub audio_bitrate: String,
    /// Suffix appended to the video base name
    pub output_suffix: String,
    /// Explicit ffmpeg binary (None = resolve via TOOLS_DIR / PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// Parent directory for scratch workspaces (None = system temp dir)
    pub scratch_root: Option<PathBuf>,
    /// Fail instead of reporting a result that is not smaller than the source
    pub reject_larger: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_quality: 40,
            document_media_dir: "word/media".to_string(),
            image_quality: 30,
            pdf_image_quality: 40,
            video_codec: "libx264".to_string(),
            video_crf: 28,
            video_preset: "fast".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            output_suffix: "_compressed".to_string(),
            ffmpeg_path: None,
            scratch_root: None,
            reject_larger: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        for (name, quality) in [
            ("Document", self.document_quality),
            ("Image", self.image_quality),
            ("PDF image", self.pdf_image_quality),
        ] {
            if quality == 0 || quality > 100 {
                return Err(anyhow::anyhow!("{} quality must be between 1 and 100", name));
            }
        }

        if self.video_crf > 51 {
            return Err(anyhow::anyhow!("Video CRF must be between 0 and 51"));
        }

        if self.output_suffix.is_empty() {
            return Err(anyhow::anyhow!("Output suffix must not be empty"));
        }

        if self.document_media_dir.trim_matches('/').is_empty() {
            return Err(anyhow::anyhow!("Document media directory must not be empty"));
        }

        if let Some(ref scratch_root) = self.scratch_root {
            if !scratch_root.is_dir() {
                return Err(anyhow::anyhow!("Scratch root is not a directory: {}", scratch_root.display()));
            }
        }

        Ok(())
    }
}
