//! # Smart File Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline di compressione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Profili di compressione e validazione parametri
//! - `error`: Tassonomia degli errori top-level
//! - `types`: Richiesta, tipo dichiarato, payload e risultato
//! - `assets`: Esito per-asset delle strategie contenitore
//! - `workspace`: Directory scratch con rilascio garantito
//! - `document_processor`: Strategia documento (DOCX)
//! - `image_processor`: Strategia immagine (JPEG)
//! - `pdf_processor`: Strategia PDF
//! - `video_processor`: Strategia video (FFmpeg)
//! - `dispatcher`: Coordinatore che sceglie la strategia
//! - `file_manager`: Misure e salvataggio dei risultati
//!
//! ## Utilizzo:
//! ```ignore
//! use smart_file_compressor::{CompressionRequest, Config, Dispatcher};
//!
//! let mut dispatcher = Dispatcher::new(Config::default())?;
//! let request = CompressionRequest::new("report.docx", "document")?;
//! let result = dispatcher.compress(&request)?;
//! dispatcher.save(&result, Path::new("report_small.docx"))?;
//! ```

pub mod assets;
pub mod config;
pub mod dispatcher;
pub mod document_processor;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod pdf_processor;
pub mod progress;
pub mod tool_resolver;
pub mod types;
pub mod video_processor;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use assets::{AssetOutcome, AssetStatus, AssetSummary};
pub use config::Config;
pub use dispatcher::{DispatchState, Dispatcher};
pub use error::CompressError;
pub use types::{CompressionRequest, CompressionResult, DeclaredType, Payload};
