//! # Smart File Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Validazione del tipo dichiarato prima di qualsiasi I/O
//! - Esecuzione del `Dispatcher` bloccante su un thread dedicato
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (tipo, file, qualità, crf, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` vince)
//! 3. Costruisce la richiesta: un tipo sconosciuto fallisce subito
//! 4. Comprime con `spawn_blocking` mostrando uno spinner
//! 5. Salva il risultato e stampa le statistiche (o messaggi JSON)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! smart-compressor video holiday.mp4 --crf 30 -o holiday_small.mp4 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use smart_file_compressor::file_manager::FileManager;
use smart_file_compressor::json_output::JsonMessage;
use smart_file_compressor::progress::ProgressManager;
use smart_file_compressor::{CompressionRequest, CompressionResult, Config, Dispatcher};

#[derive(Parser)]
#[command(name = "smart-compressor")]
#[command(about = "Compress a document, image, PDF or video according to its declared type")]
struct Args {
    /// Declared file type: document, image, pdf or video (docx, jpg, jpeg, mp4 also accepted)
    file_type: String,

    /// File to compress
    file: PathBuf,

    /// Destination of the compressed file (default: <name>_compressed.<ext> beside the source)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JPEG quality for images embedded in documents (1-100)
    #[arg(long, default_value = "40")]
    document_quality: u8,

    /// JPEG quality for standalone images (1-100)
    #[arg(long, default_value = "30")]
    image_quality: u8,

    /// JPEG quality for images embedded in PDFs (1-100)
    #[arg(long, default_value = "40")]
    pdf_quality: u8,

    /// Video CRF value (0-51, lower = better quality)
    #[arg(long, default_value = "28")]
    crf: u8,

    /// x264 encoder preset
    #[arg(long, default_value = "fast")]
    preset: String,

    /// Video audio bitrate
    #[arg(long, default_value = "128k")]
    audio_bitrate: String,

    /// Explicit ffmpeg binary (default: TOOLS_DIR, then PATH)
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Fail when the compressed file is not smaller than the original
    #[arg(long)]
    reject_larger: bool,

    /// Emit machine-readable JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = args.json;
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) if json => {
            JsonMessage::error(&e).emit();
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}

async fn run(args: Args) -> Result<()> {
    // Unknown types are rejected before the source is touched
    let request = CompressionRequest::new(&args.file, &args.file_type)?;
    let declared_type = request.declared_type();

    let config = Config {
        document_quality: args.document_quality,
        image_quality: args.image_quality,
        pdf_image_quality: args.pdf_quality,
        video_crf: args.crf,
        video_preset: args.preset,
        audio_bitrate: args.audio_bitrate,
        ffmpeg_path: args.ffmpeg,
        reject_larger: args.reject_larger,
        ..Default::default()
    };
    let destination = args.output.unwrap_or_else(|| {
        FileManager::default_destination(&args.file, &config.output_suffix, declared_type)
    });
    debug!("Destination: {}", destination.display());

    let dispatcher = Dispatcher::new(config)?;

    if args.json {
        let original_size = FileManager::source_size(&args.file)?;
        JsonMessage::start(&args.file, declared_type, original_size).emit();
    }

    let file_name = args.file.file_name().unwrap_or_default().to_string_lossy().into_owned();
    let progress = ProgressManager::spinner(
        &format!("Compressing {} as {}...", file_name, declared_type),
        !args.json,
    );

    let (dispatcher, outcome) = tokio::task::spawn_blocking(move || {
        let mut dispatcher = dispatcher;
        let outcome = dispatcher.compress(&request);
        (dispatcher, outcome)
    })
    .await?;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };

    if args.json {
        JsonMessage::complete(&result).emit();
    }

    progress.set_message(&format!("Saving {}...", destination.display()));
    let save_destination = destination.clone();
    let (result, saved) = tokio::task::spawn_blocking(move || {
        let mut dispatcher = dispatcher;
        let saved = dispatcher.save(&result, &save_destination);
        (result, saved)
    })
    .await?;

    let bytes_written = match saved {
        Ok(bytes) => bytes,
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };
    progress.finish(&result.message);

    if args.json {
        JsonMessage::saved(&destination, bytes_written).emit();
    } else {
        print_summary(&result, &destination);
        if result.grew() {
            println!("Note: the compressed file is larger than the original");
        }
    }

    Ok(())
}

fn print_summary(result: &CompressionResult, destination: &Path) {
    println!(
        "Original: {} | Compressed: {} | Saved: {:.2}%",
        FileManager::format_size(result.original_size_bytes),
        FileManager::format_size(result.compressed_size_bytes),
        result.savings_percent()
    );
    println!("Saved compressed file as {}", destination.display());
}
