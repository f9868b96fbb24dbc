//! # Image Processing Module
//!
//! Questo modulo gestisce la ricodifica JPEG di immagini raster, sia come
//! strategia top-level (`image`) sia come primitiva condivisa dalle strategie
//! contenitore (documenti e PDF).
//!
//! ## Pipeline di ottimizzazione:
//! 1. **Decodifica**: Formato rilevato dal contenuto (JPEG, PNG, GIF, BMP, TIFF, WebP)
//! 2. **Conversione colore**: Palette, alpha e scala di grigi diventano RGB
//! 3. **Ricodifica**: JPEG progressivo, subsampling cromatico 4:2:0 e tabelle
//!    Huffman ottimizzate (`jpeg-encoder`)
//!
//! ## Qualità:
//! - Immagine singola: 30 (nessun file intermedio, tutto in memoria)
//! - Immagini nei documenti: 40
//! - Immagini nei PDF: 40
//!
//! ## Error handling:
//! - Immagine singola non decodificabile: `CompressError::Decode`, propagato
//! - Asset in un contenitore: il chiamante decide (skip + log)
//!
//! ## Esempio:
//! ```ignore
//! let processor = ImageProcessor::new(config.image_quality);
//! let bytes = processor.compress(Path::new("photo.png"))?;
//! ```

use crate::error::CompressError;
use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Re-encodes a single raster image as a lower quality JPEG
pub struct ImageProcessor {
    quality: u8,
}

impl ImageProcessor {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    /// Compress the image at `input_path` into an in-memory JPEG buffer.
    ///
    /// Unlike embedded assets there is no fallback here: a source that cannot
    /// be decoded fails the whole request with `CompressError::Decode`.
    pub fn compress(&self, input_path: &Path) -> Result<Vec<u8>> {
        debug!("Decoding image: {}", input_path.display());

        let bytes = std::fs::read(input_path)?;
        let img = decode_image(&bytes).map_err(|e| {
            CompressError::Decode(format!("{}: {}", input_path.display(), e))
        })?;

        let encoded = encode_jpeg(&img, self.quality)?;
        info!(
            "Re-encoded {} at quality {}: {} -> {} bytes",
            input_path.file_name().unwrap_or_default().to_string_lossy(),
            self.quality,
            bytes.len(),
            encoded.len()
        );
        Ok(encoded)
    }
}

/// Decode an image, detecting the format from its content
pub(crate) fn decode_image(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}

/// Flatten palette, alpha and grayscale modes to plain RGB
pub(crate) fn to_rgb(img: &DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other => other.to_rgb8(),
    }
}

/// Encode as progressive JPEG at `quality` (1-100)
pub(crate) fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    encode_rgb_jpeg(&to_rgb(img), quality)
}

pub(crate) fn encode_rgb_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let width = u16::try_from(rgb.width()).context("image is too wide for JPEG")?;
    let height = u16::try_from(rgb.height()).context("image is too tall for JPEG")?;

    let mut output = Vec::new();
    let mut encoder = Encoder::new(&mut output, quality.clamp(1, 100));
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);
    encoder.set_sampling_factor(SamplingFactor::R_4_2_0);
    encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb)?;
    Ok(output)
}
