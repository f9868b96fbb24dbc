//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore della pipeline di compressione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti i fallimenti top-level
//! - Fornisce messaggi di errore descrittivi, uno per richiesta fallita
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `UnsupportedType`: Tipo dichiarato non riconosciuto (prima di qualsiasi I/O)
//! - `Decode`: Immagine o documento non leggibile
//! - `InvalidInput`: Sorgente mancante o di zero byte
//! - `Transcode`: FFmpeg fallito (exit code non-zero o lancio impossibile)
//! - `NotSmaller`: Risultato non più piccolo (solo con `reject_larger`)
//! - `StrategyFailure`: Qualsiasi altro errore sollevato da una strategia
//! - `Io`: Errori di I/O durante il salvataggio
//!
//! ## Propagazione:
//! Le strategie lavorano con `anyhow::Result`; il `Dispatcher` recupera gli
//! errori tipizzati con `downcast` e incapsula tutto il resto in `StrategyFailure`.
//!
//! ## Esempio:
//! ```ignore
//! if !status.success() {
//!     return Err(CompressError::Transcode { code: status.code(), message }.into());
//! }
//! ```

/// Failures surfaced by a compression request
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transcode error (exit code {}): {message}", describe_code(.code))]
    Transcode {
        /// Exit code of the encoder, `None` when it never ran or was killed by a signal
        code: Option<i32>,
        message: String,
    },

    #[error("Compressed output ({compressed} bytes) is not smaller than the original ({original} bytes)")]
    NotSmaller { original: u64, compressed: u64 },

    #[error("{strategy} strategy failed: {source}")]
    StrategyFailure {
        strategy: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
}

impl CompressError {
    /// Exit code carried by a transcode failure
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CompressError::Transcode { code, .. } => *code,
            _ => None,
        }
    }

    /// Recover a typed error raised inside a strategy, wrapping anything else.
    pub(crate) fn from_strategy(strategy: &'static str, err: anyhow::Error) -> Self {
        match err.downcast::<CompressError>() {
            Ok(typed) => typed,
            Err(other) => CompressError::StrategyFailure {
                strategy,
                source: other.into(),
            },
        }
    }
}
