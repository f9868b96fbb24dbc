//! # Video Processing Module
//!
//! Questo modulo gestisce la compressione video tramite FFmpeg.
//!
//! ## Responsabilità:
//! - Calcola il nome del file di output (`<nome>_compressed.<ext>`) nel workspace
//! - Invoca FFmpeg con un profilo fisso e attende la fine del processo
//! - Mappa exit code non-zero e fallimenti di lancio in `CompressError::Transcode`
//! - Rimuove l'output parziale in caso di errore
//!
//! ## Profilo FFmpeg (default):
//! - Codec video: libx264
//! - CRF: 28
//! - Preset: fast
//! - Codec audio: AAC a 128k
//!
//! ## Note:
//! - Nessun timeout: la chiamata blocca finché FFmpeg non termina
//! - Il file non viene caricato in memoria; la dimensione si legge dal filesystem
//! - Il workspace (e quindi il file) resta valido fino al salvataggio o alla
//!   richiesta successiva
//!
//! ## Esempio:
//! ```ignore
//! let processor = VideoProcessor::new(config);
//! let output = processor.compress(&video_path, &workspace)?;
//! ```

use crate::config::Config;
use crate::error::CompressError;
use crate::tool_resolver::ToolPathResolver;
use crate::workspace::Workspace;
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Lines of encoder stderr kept in a transcode error
const STDERR_TAIL_LINES: usize = 10;

/// Handles video compression through an external encoder
pub struct VideoProcessor {
    config: Config,
}

impl VideoProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Output path inside the workspace: base name + suffix, extension kept
    pub fn output_path(&self, input_path: &Path, workspace: &Workspace) -> PathBuf {
        let stem = input_path.file_stem().unwrap_or_default().to_string_lossy();
        let filename = match input_path.extension() {
            Some(ext) => format!("{}{}.{}", stem, self.config.output_suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, self.config.output_suffix),
        };
        workspace.join(filename)
    }

    /// Encoder arguments for the fixed profile
    pub fn build_args(&self, input_path: &Path, output_path: &Path) -> Vec<OsString> {
        let crf = self.config.video_crf.to_string();
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input_path.into()];
        for arg in [
            "-vcodec", self.config.video_codec.as_str(),
            "-crf", crf.as_str(),
            "-preset", self.config.video_preset.as_str(),
            "-acodec", self.config.audio_codec.as_str(),
            "-b:a", self.config.audio_bitrate.as_str(),
        ] {
            args.push(OsString::from(arg));
        }

        // Suppress encoder chatter unless in debug mode
        if !tracing::enabled!(tracing::Level::DEBUG) {
            args.push(OsString::from("-loglevel"));
            args.push(OsString::from("warning"));
        }

        args.push(output_path.into());
        args
    }

    /// Transcode `input_path` into the workspace, blocking until the encoder exits
    pub fn compress(&self, input_path: &Path, workspace: &Workspace) -> Result<PathBuf> {
        let output_path = self.output_path(input_path, workspace);
        let ffmpeg = match self.config.ffmpeg_path {
            Some(ref path) => path.clone(),
            None => ToolPathResolver::new().command_for("ffmpeg"),
        };

        debug!(
            "🎬 Compressing video: {} (CRF: {}, preset: {}, audio: {} {})",
            input_path.file_name().unwrap_or_default().to_string_lossy(),
            self.config.video_crf,
            self.config.video_preset,
            self.config.audio_codec,
            self.config.audio_bitrate
        );

        let start_time = std::time::Instant::now();
        let output = Command::new(&ffmpeg)
            .args(self.build_args(input_path, &output_path))
            .output()
            .map_err(|e| CompressError::Transcode {
                code: None,
                message: format!("Failed to execute {}: {}", ffmpeg.display(), e),
            })?;
        let duration = start_time.elapsed();

        if !output.status.success() {
            discard_partial(&output_path);
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("FFmpeg failed after {:.1}s with {}", duration.as_secs_f64(), output.status);
            return Err(CompressError::Transcode {
                code: output.status.code(),
                message: stderr_tail(&stderr),
            }
            .into());
        }

        if !output_path.is_file() {
            return Err(CompressError::Transcode {
                code: output.status.code(),
                message: format!("{} exited successfully but produced no output", ffmpeg.display()),
            }
            .into());
        }

        info!("✅ Video compression completed in {:.1}s", duration.as_secs_f64());
        Ok(output_path)
    }
}

fn discard_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove partial output {}: {}", path.display(), e);
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
