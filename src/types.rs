//! # Request and Result Types
//!
//! Questo modulo definisce i dati che attraversano il confine della pipeline.
//!
//! ## Strutture dati:
//! - `DeclaredType`: Tipo dichiarato dall'utente (document, image, pdf, video)
//! - `CompressionRequest`: Sorgente + tipo dichiarato, immutabile
//! - `Payload`: Buffer in memoria oppure path di un file generato
//! - `CompressionResult`: Payload + dimensioni prima/dopo + messaggio
//!
//! Il tipo non viene mai rilevato automaticamente: il token viene validato
//! prima di qualsiasi accesso al filesystem.

use crate::assets::AssetSummary;
use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File type declared by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Document,
    Image,
    Pdf,
    Video,
}

impl DeclaredType {
    pub const ALL: [DeclaredType; 4] = [Self::Document, Self::Image, Self::Pdf, Self::Video];

    /// Short label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Document => "DOCX",
            Self::Image => "JPG",
            Self::Pdf => "PDF",
            Self::Video => "MP4",
        }
    }

    /// Extension used when the source has none
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Document => "docx",
            Self::Image => "jpg",
            Self::Pdf => "pdf",
            Self::Video => "mp4",
        }
    }

    /// Strategy name used in logs and `StrategyFailure`
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Video => "video",
        }
    }

    /// Message describing which strategy ran
    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Document => "Compressed DOCX by recompressing embedded images.",
            Self::Image => "Compressed JPG with reduced quality.",
            Self::Pdf => "Compressed PDF including embedded images.",
            Self::Video => "Compressed video using FFmpeg.",
        }
    }
}

impl FromStr for DeclaredType {
    type Err = CompressError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "document" | "docx" => Ok(Self::Document),
            "image" | "jpg" | "jpeg" => Ok(Self::Image),
            "pdf" => Ok(Self::Pdf),
            "video" | "mp4" => Ok(Self::Video),
            _ => Err(CompressError::UnsupportedType(token.to_string())),
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy_name())
    }
}

/// A single file to compress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionRequest {
    source_path: PathBuf,
    declared_type: DeclaredType,
}

impl CompressionRequest {
    /// Build a request from a user supplied type token.
    ///
    /// Fails with `UnsupportedType` without touching the filesystem.
    pub fn new(source_path: impl Into<PathBuf>, token: &str) -> Result<Self, CompressError> {
        let declared_type = token.parse()?;
        Ok(Self::typed(source_path, declared_type))
    }

    pub fn typed(source_path: impl Into<PathBuf>, declared_type: DeclaredType) -> Self {
        Self {
            source_path: source_path.into(),
            declared_type,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn declared_type(&self) -> DeclaredType {
        self.declared_type
    }
}

/// Compressed artifact, in memory or on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Buffer(Vec<u8>),
    /// File inside the dispatcher's live workspace
    File(PathBuf),
}

impl Payload {
    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Payload::Buffer(bytes) => Some(bytes),
            Payload::File(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Payload::Buffer(_) => None,
            Payload::File(path) => Some(path),
        }
    }
}

/// Outcome of a successful compression request
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub declared_type: DeclaredType,
    pub payload: Payload,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub message: String,
    /// Per-asset report for container formats
    pub assets: Option<AssetSummary>,
}

impl CompressionResult {
    /// Percentage saved, rounded to two decimals. Negative when the output grew.
    ///
    /// The dispatcher never builds a result for a zero-byte source.
    pub fn savings_percent(&self) -> f64 {
        savings_percent(self.original_size_bytes, self.compressed_size_bytes).unwrap_or(0.0)
    }

    /// True when re-encoding produced a bigger artifact than the source
    pub fn grew(&self) -> bool {
        self.compressed_size_bytes > self.original_size_bytes
    }
}

/// `round((original - compressed) / original * 100, 2)`, failing on an empty original
pub fn savings_percent(original: u64, compressed: u64) -> Result<f64, CompressError> {
    if original == 0 {
        return Err(CompressError::InvalidInput(
            "original size is zero, savings are undefined".to_string(),
        ));
    }
    let ratio = (original as f64 - compressed as f64) / original as f64 * 100.0;
    Ok((ratio * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_tokens() {
        assert_eq!("document".parse::<DeclaredType>().unwrap(), DeclaredType::Document);
        assert_eq!("DOCX".parse::<DeclaredType>().unwrap(), DeclaredType::Document);
        assert_eq!("jpeg".parse::<DeclaredType>().unwrap(), DeclaredType::Image);
        assert_eq!(" pdf ".parse::<DeclaredType>().unwrap(), DeclaredType::Pdf);
        assert_eq!("mp4".parse::<DeclaredType>().unwrap(), DeclaredType::Video);
    }

    #[test]
    fn test_unknown_token_fails_before_io() {
        let err = CompressionRequest::new("/does/not/exist.gif", "gif").unwrap_err();
        assert!(matches!(err, CompressError::UnsupportedType(ref t) if t == "gif"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for declared in DeclaredType::ALL {
            assert_eq!(declared.to_string().parse::<DeclaredType>().unwrap(), declared);
        }
    }

    #[test]
    fn test_savings_percent_rounding() {
        assert_eq!(savings_percent(1000, 250).unwrap(), 75.0);
        assert_eq!(savings_percent(3, 2).unwrap(), 33.33);
        assert_eq!(savings_percent(100, 150).unwrap(), -50.0);
    }

    #[test]
    fn test_savings_percent_zero_original() {
        assert!(matches!(savings_percent(0, 10), Err(CompressError::InvalidInput(_))));
    }

    #[test]
    fn test_payload_accessors() {
        let buffer = Payload::Buffer(vec![1, 2, 3]);
        assert_eq!(buffer.as_buffer(), Some(&[1u8, 2, 3][..]));
        assert!(buffer.as_path().is_none());

        let file = Payload::File(PathBuf::from("/tmp/out.mp4"));
        assert_eq!(file.as_path(), Some(Path::new("/tmp/out.mp4")));
        assert!(file.as_buffer().is_none());
    }
}
