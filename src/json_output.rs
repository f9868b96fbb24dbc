//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! della CLI (es. una UI che lancia `smart-compressor --json`).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della richiesta di compressione
//! - `complete`: Strategia completata, con dimensioni e asset
//! - `saved`: Risultato salvato nella destinazione
//! - `error`: Fallimento top-level, un solo messaggio descrittivo

use crate::assets::AssetOutcome;
use crate::types::{CompressionResult, DeclaredType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        source: PathBuf,
        declared_type: DeclaredType,
        original_size: u64,
    },

    #[serde(rename = "complete")]
    Complete {
        message: String,
        original_size: u64,
        compressed_size: u64,
        savings_percent: f64,
        grew: bool,
        assets: Option<Vec<AssetOutcome>>,
    },

    #[serde(rename = "saved")]
    Saved { destination: PathBuf, bytes_written: u64 },

    #[serde(rename = "error")]
    Error { message: String },
}

impl JsonMessage {
    pub fn start(source: &Path, declared_type: DeclaredType, original_size: u64) -> Self {
        Self::Start {
            source: source.to_path_buf(),
            declared_type,
            original_size,
        }
    }

    pub fn complete(result: &CompressionResult) -> Self {
        Self::Complete {
            message: result.message.clone(),
            original_size: result.original_size_bytes,
            compressed_size: result.compressed_size_bytes,
            savings_percent: result.savings_percent(),
            grew: result.grew(),
            assets: result.assets.as_ref().map(|summary| summary.outcomes.clone()),
        }
    }

    pub fn saved(destination: &Path, bytes_written: u64) -> Self {
        Self::Saved {
            destination: destination.to_path_buf(),
            bytes_written,
        }
    }

    pub fn error(err: &dyn std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    /// Emit as a single line on stdout
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!("Failed to serialize JSON message: {}", e),
        }
    }
}
