//! # PDF Processing Module
//!
//! Questo modulo comprime i PDF ricodificando le immagini incorporate nelle pagine.
//!
//! ## Pipeline di compressione:
//! 1. Apre il documento con `lopdf`
//! 2. Per ogni pagina enumera gli XObject immagine (risorse ereditate e Form
//!    XObject annidati inclusi), deduplicati per riferimento
//! 3. Estrae i byte dell'immagine, decodifica, forza RGB, ricodifica JPEG a qualità 40
//! 4. Sostituisce lo stream per riferimento (`/DCTDecode`, `/DeviceRGB`)
//! 5. Salva con garbage collection, deflate degli stream e pulizia strutturale
//!
//! ## Immagini supportate:
//! - `/DCTDecode` (JPEG)
//! - Pixel grezzi senza filtro o `/FlateDecode` (predittori PNG inclusi),
//!   1/2/4/8 bit per componente
//! - Spazi colore `/DeviceGray`, `/DeviceRGB`, `/CalGray`, `/CalRGB`,
//!   `/ICCBased` (N = 1 o 3) e `/Indexed` su una di queste basi
//!
//! Qualsiasi altra immagine (JPX, CCITT, JBIG2, CMYK grezzo) viene saltata e
//! lasciata invariata. Un'immagine non decodificabile non fa mai fallire il documento.

use crate::assets::AssetSummary;
use crate::error::CompressError;
use crate::image_processor::{decode_image, encode_rgb_jpeg, to_rgb};
use anyhow::{bail, Context, Result};
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Guards against cyclic `/Parent` chains in malformed page trees
const MAX_TREE_DEPTH: usize = 64;

/// Re-encodes the raster images embedded in a PDF
pub struct PdfProcessor {
    quality: u8,
}

/// A re-encoded image ready to be written back
struct Replacement {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

/// Color model of a raw image once ICC profiles are resolved
#[derive(Debug)]
enum ColorModel {
    Gray,
    Rgb,
    Indexed {
        base: Box<ColorModel>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorModel {
    /// Samples per pixel in the stream data
    fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
        }
    }
}

impl PdfProcessor {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    /// Compress the PDF at `input_path`, returning the rewritten document
    pub fn compress(&self, input_path: &Path) -> Result<(Vec<u8>, AssetSummary)> {
        let mut doc = Document::load(input_path).map_err(|e| {
            CompressError::Decode(format!("{} is not a readable PDF: {}", input_path.display(), e))
        })?;

        let image_ids = collect_page_images(&doc);
        debug!("Found {} distinct images in {}", image_ids.len(), input_path.display());

        let mut summary = AssetSummary::new();
        for id in image_ids {
            let name = format!("{} {} R", id.0, id.1);
            let outcome = match doc.get_object(id) {
                Ok(Object::Stream(stream)) => self.reencode(&doc, stream),
                _ => Err(anyhow::anyhow!("object is not an image stream")),
            };

            match outcome {
                Ok(replacement) => {
                    if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
                        let original = stream.content.len() as u64;
                        let compressed = replacement.jpeg.len() as u64;
                        substitute(stream, replacement);
                        debug!("Recompressed image {}: {} -> {} bytes", name, original, compressed);
                        summary.record_recompressed(name, original, compressed);
                    }
                }
                Err(e) => {
                    warn!("Skipping image {}: {:#}", name, e);
                    summary.record_skipped(name, format!("{:#}", e));
                }
            }
        }

        doc.prune_objects();
        doc.delete_zero_length_streams();
        doc.renumber_objects();
        doc.compress();

        let mut output = Cursor::new(Vec::new());
        doc.save_to(&mut output)?;
        let output = output.into_inner();

        info!(
            "Rewrote {} ({}): {} bytes",
            input_path.file_name().unwrap_or_default().to_string_lossy(),
            summary.describe(),
            output.len()
        );
        Ok((output, summary))
    }

    fn reencode(&self, doc: &Document, stream: &Stream) -> Result<Replacement> {
        let img = extract_image(doc, stream).context("failed to decode image stream")?;
        let rgb = to_rgb(&img);
        let jpeg = encode_rgb_jpeg(&rgb, self.quality).context("failed to encode JPEG")?;
        Ok(Replacement {
            width: rgb.width(),
            height: rgb.height(),
            jpeg,
        })
    }
}

/// Image XObjects referenced by every page, each reference once, in page order
fn collect_page_images(doc: &Document) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for page_id in doc.get_pages().into_values() {
        for id in page_image_ids(doc, page_id) {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }

    ids
}

fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    if let Some(resources) = inherited_resources(doc, page_id) {
        let mut visited_forms = HashSet::new();
        collect_xobject_images(doc, resources, &mut visited_forms, &mut ids);
    }
    ids
}

/// Images in a resource dictionary, descending into Form XObjects once each
fn collect_xobject_images(
    doc: &Document,
    resources: &Dictionary,
    visited_forms: &mut HashSet<ObjectId>,
    ids: &mut Vec<ObjectId>,
) {
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|xobjects| resolve(doc, xobjects).and_then(Object::as_dict).ok());
    let Some(xobjects) = xobjects else {
        return;
    };

    let mut refs: Vec<ObjectId> = xobjects
        .iter()
        .filter_map(|(_, obj)| obj.as_reference().ok())
        .collect();
    refs.sort();

    for id in refs {
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            continue;
        };
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => ids.push(id),
            Ok(b"Form") if visited_forms.insert(id) => {
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve(doc, r).and_then(Object::as_dict).ok());
                if let Some(form_resources) = form_resources {
                    collect_xobject_images(doc, form_resources, visited_forms, ids);
                }
            }
            _ => {}
        }
    }
}

/// Page resources, walking up `/Parent` when the page inherits them
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources).and_then(Object::as_dict).ok();
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> lopdf::Result<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id),
        other => Ok(other),
    }
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .map(|name| name.to_vec())
            .collect(),
        _ => Vec::new(),
    }
}

fn describe_filters(filters: &[&[u8]]) -> String {
    filters
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode an image XObject into pixels
fn extract_image(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    let filters = filter_names(&stream.dict);
    if let [filter] = filters.as_slice() {
        if filter.as_slice() == b"DCTDecode" {
            return Ok(decode_image(&stream.content)?);
        }
    }
    raw_pixels(doc, &stream.dict, stream_bytes(stream)?)
}

/// Stream content with `/FlateDecode` and its predictor undone.
///
/// lopdf refuses to decompress image streams itself, so this inflates directly.
fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    let filters = filter_names(&stream.dict);
    match filters.iter().map(Vec::as_slice).collect::<Vec<_>>().as_slice() {
        [] => Ok(stream.content.clone()),
        [b"FlateDecode"] | [b"Fl"] => {
            let inflated = inflate(&stream.content)?;
            match decode_parms(&stream.dict) {
                Some(parms) => unpredict(inflated, parms),
                None => Ok(inflated),
            }
        }
        other => bail!("unsupported filter chain [{}]", describe_filters(other)),
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut output)
        .context("corrupt Flate data")?;
    Ok(output)
}

fn decode_parms(dict: &Dictionary) -> Option<&Dictionary> {
    match dict.get(b"DecodeParms").ok()? {
        Object::Dictionary(parms) => Some(parms),
        Object::Array(items) => items.first().and_then(|item| item.as_dict().ok()),
        _ => None,
    }
}

fn int_entry(dict: &Dictionary, key: &[u8], default: usize) -> Result<usize> {
    match dict.get(key) {
        Ok(obj) => Ok(usize::try_from(obj.as_i64()?)?),
        Err(_) => Ok(default),
    }
}

/// Undo a PNG row predictor (`/Predictor` 10-15)
fn unpredict(data: Vec<u8>, parms: &Dictionary) -> Result<Vec<u8>> {
    let predictor = int_entry(parms, b"Predictor", 1)?;
    match predictor {
        1 => Ok(data),
        10..=15 => {
            let colors = int_entry(parms, b"Colors", 1)?;
            let bits = int_entry(parms, b"BitsPerComponent", 8)?;
            let columns = int_entry(parms, b"Columns", 1)?;
            let bytes_per_pixel = (colors * bits).div_ceil(8).max(1);
            let row_len = (colors * bits * columns).div_ceil(8);
            png_unfilter(&data, bytes_per_pixel, row_len)
        }
        other => bail!("unsupported predictor {}", other),
    }
}

fn png_unfilter(data: &[u8], bytes_per_pixel: usize, row_len: usize) -> Result<Vec<u8>> {
    if row_len == 0 {
        bail!("predictor row length is zero");
    }

    let mut output = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    for row in data.chunks_exact(row_len + 1) {
        let kind = row[0];
        let mut cur = row[1..].to_vec();
        for i in 0..row_len {
            let left = if i >= bytes_per_pixel { cur[i - bytes_per_pixel] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bytes_per_pixel { prev[i - bytes_per_pixel] } else { 0 };
            let delta = match kind {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => bail!("invalid PNG filter type {}", other),
            };
            cur[i] = cur[i].wrapping_add(delta);
        }
        output.extend_from_slice(&cur);
        prev = cur;
    }
    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn color_model(doc: &Document, obj: &Object) -> Result<ColorModel> {
    match resolve(doc, obj)? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorModel::Rgb),
            other => bail!("unsupported color space /{}", String::from_utf8_lossy(other)),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|f| f.as_name().ok()).unwrap_or_default();
            match family {
                b"CalGray" => Ok(ColorModel::Gray),
                b"CalRGB" => Ok(ColorModel::Rgb),
                b"ICCBased" => {
                    let profile = items.get(1).context("ICCBased color space without a profile")?;
                    let Object::Stream(profile) = resolve(doc, profile)? else {
                        bail!("ICC profile is not a stream");
                    };
                    match profile.dict.get(b"N").and_then(Object::as_i64)? {
                        1 => Ok(ColorModel::Gray),
                        3 => Ok(ColorModel::Rgb),
                        n => bail!("unsupported ICC profile with {} components", n),
                    }
                }
                b"Indexed" | b"I" => {
                    let [_, base, hival, lookup] = items.as_slice() else {
                        bail!("malformed Indexed color space");
                    };
                    let base = color_model(doc, base)?;
                    if matches!(base, ColorModel::Indexed { .. }) {
                        bail!("nested Indexed color space");
                    }
                    let hival = usize::try_from(resolve(doc, hival)?.as_i64()?)?;
                    let lookup = match resolve(doc, lookup)? {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(table) => stream_bytes(table)?,
                        _ => bail!("Indexed lookup is neither a string nor a stream"),
                    };
                    if lookup.len() < (hival + 1) * base.components() {
                        bail!("Indexed lookup table is too short");
                    }
                    Ok(ColorModel::Indexed {
                        base: Box::new(base),
                        hival,
                        lookup,
                    })
                }
                other => bail!("unsupported color space /{}", String::from_utf8_lossy(other)),
            }
        }
        _ => bail!("unsupported color space object"),
    }
}

/// Split packed rows into one byte per sample
fn unpack_samples(data: &[u8], bits: usize, per_row: usize, height: usize) -> Result<Vec<u8>> {
    let row_bytes = (per_row * bits).div_ceil(8);
    if data.len() < row_bytes * height {
        bail!("pixel data is shorter than {} rows of {} bytes", height, row_bytes);
    }
    if bits == 8 {
        return Ok(data[..row_bytes * height].to_vec());
    }

    let mask = ((1u16 << bits) - 1) as u8;
    let mut samples = Vec::with_capacity(per_row * height);
    for row in data.chunks_exact(row_bytes).take(height) {
        for i in 0..per_row {
            let bit = i * bits;
            let shift = 8 - bits - bit % 8;
            samples.push((row[bit / 8] >> shift) & mask);
        }
    }
    Ok(samples)
}

/// Stretch `bits`-deep samples to the 0-255 range
fn scale_samples(samples: Vec<u8>, bits: usize) -> Vec<u8> {
    if bits == 8 {
        return samples;
    }
    let factor = 255 / ((1u16 << bits) - 1) as u8;
    samples.into_iter().map(|s| s * factor).collect()
}

fn raw_pixels(doc: &Document, dict: &Dictionary, data: Vec<u8>) -> Result<DynamicImage> {
    let width = u32::try_from(dict.get(b"Width")?.as_i64()?)?;
    let height = u32::try_from(dict.get(b"Height")?.as_i64()?)?;

    let bits = int_entry(dict, b"BitsPerComponent", 8)?;
    if !matches!(bits, 1 | 2 | 4 | 8) {
        bail!("unsupported bits per component: {}", bits);
    }

    let model = match dict.get(b"ColorSpace") {
        Ok(space) => color_model(doc, space)?,
        Err(_) => bail!("image has no color space"),
    };
    let samples = unpack_samples(&data, bits, width as usize * model.components(), height as usize)?;

    let image = match model {
        ColorModel::Gray => GrayImage::from_raw(width, height, scale_samples(samples, bits)).map(DynamicImage::ImageLuma8),
        ColorModel::Rgb => RgbImage::from_raw(width, height, scale_samples(samples, bits)).map(DynamicImage::ImageRgb8),
        ColorModel::Indexed { base, hival, lookup } => {
            let components = base.components();
            let mut pixels = Vec::with_capacity(samples.len() * 3);
            for index in samples {
                let start = usize::from(index).min(hival) * components;
                let entry = &lookup[start..start + components];
                if components == 1 {
                    pixels.extend_from_slice(&[entry[0]; 3]);
                } else {
                    pixels.extend_from_slice(entry);
                }
            }
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
    };

    image.ok_or_else(|| anyhow::anyhow!("pixel data does not match {}x{}", width, height))
}

/// Rewrite an image stream in place as an RGB JPEG
fn substitute(stream: &mut Stream, replacement: Replacement) {
    stream.dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    stream.dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    stream.dict.set("BitsPerComponent", Object::Integer(8));
    stream.dict.set("Width", Object::Integer(i64::from(replacement.width)));
    stream.dict.set("Height", Object::Integer(i64::from(replacement.height)));
    stream.dict.remove(b"DecodeParms");
    stream.dict.remove(b"Decode");
    stream.set_content(replacement.jpeg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStatus;
    use crate::test_support::{gradient_image, jpeg_bytes, write_pdf, zlib, PdfImage};
    use tempfile::TempDir;

    /// (filter, content) of every image stream in a saved PDF
    fn image_streams(bytes: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.objects
            .values()
            .filter_map(|obj| match obj {
                Object::Stream(s) if matches!(s.dict.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Image") => {
                    Some((filter_names(&s.dict).concat(), s.content.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_images_are_recompressed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.pdf");
        write_pdf(
            &path,
            &[
                PdfImage::Jpeg(jpeg_bytes(120, 80, 95)),
                PdfImage::Jpeg(jpeg_bytes(64, 64, 95)),
            ],
        );

        let (bytes, summary) = PdfProcessor::new(40).compress(&path).unwrap();

        assert_eq!(summary.recompressed(), 2);
        let streams = image_streams(&bytes);
        assert_eq!(streams.len(), 2);
        for (filter, content) in streams {
            assert_eq!(filter, b"DCTDecode");
            assert!(image::load_from_memory(&content).is_ok());
        }
    }

    #[test]
    fn test_corrupt_image_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mixed.pdf");
        write_pdf(
            &path,
            &[
                PdfImage::Jpeg(jpeg_bytes(50, 50, 90)),
                PdfImage::Jpeg(b"not a jpeg at all".to_vec()),
                PdfImage::Jpeg(jpeg_bytes(70, 30, 90)),
            ],
        );

        let (bytes, summary) = PdfProcessor::new(40).compress(&path).unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.recompressed(), 2);
        assert_eq!(summary.skipped(), 1);

        let streams = image_streams(&bytes);
        let valid = streams
            .iter()
            .filter(|(_, content)| image::load_from_memory(content).is_ok())
            .count();
        assert_eq!(valid, 2);
        assert!(streams.iter().any(|(_, content)| content == b"not a jpeg at all"));
    }

    #[test]
    fn test_raw_rgb_image_becomes_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("raw.pdf");
        let pixels: Vec<u8> = (0..32 * 16).flat_map(|i| [(i % 256) as u8, 40, 200]).collect();
        write_pdf(&path, &[PdfImage::RawRgb { width: 32, height: 16, pixels }]);

        let (bytes, summary) = PdfProcessor::new(40).compress(&path).unwrap();

        assert_eq!(summary.recompressed(), 1);
        let streams = image_streams(&bytes);
        assert_eq!(streams[0].0, b"DCTDecode");
        let decoded = image::load_from_memory(&streams[0].1).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    fn compress_single(image: PdfImage) -> (Vec<u8>, AssetSummary) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("single.pdf");
        write_pdf(&path, &[image]);
        PdfProcessor::new(40).compress(&path).unwrap()
    }

    fn assert_single_jpeg(bytes: &[u8], width: u32, height: u32) {
        let streams = image_streams(bytes);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].0, b"DCTDecode");
        let decoded = image::load_from_memory(&streams[0].1).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (width, height));
    }

    #[test]
    fn test_flate_rgb_image_becomes_jpeg() {
        let pixels = gradient_image(64, 64).into_raw();
        let (bytes, summary) = compress_single(PdfImage::FlateRgb {
            width: 64,
            height: 64,
            pixels,
            png_predictor: false,
        });

        assert_eq!(summary.recompressed(), 1);
        assert_single_jpeg(&bytes, 64, 64);
    }

    #[test]
    fn test_flate_png_predictor_is_undone() {
        let rgb = gradient_image(24, 12);
        let (bytes, summary) = compress_single(PdfImage::FlateRgb {
            width: 24,
            height: 12,
            pixels: rgb.clone().into_raw(),
            png_predictor: true,
        });

        assert_eq!(summary.recompressed(), 1);
        assert_single_jpeg(&bytes, 24, 12);

        // The top-left corner survives lossy re-encoding within a loose tolerance
        let streams = image_streams(&bytes);
        let decoded = image::load_from_memory(&streams[0].1).unwrap().to_rgb8();
        let expected = rgb.get_pixel(0, 0);
        let actual = decoded.get_pixel(0, 0);
        for channel in 0..3 {
            assert!((i16::from(expected[channel]) - i16::from(actual[channel])).abs() < 48);
        }
    }

    #[test]
    fn test_icc_based_rgb_and_gray() {
        let (bytes, summary) = compress_single(PdfImage::IccBased {
            width: 16,
            height: 8,
            components: 3,
            pixels: gradient_image(16, 8).into_raw(),
        });
        assert_eq!(summary.recompressed(), 1);
        assert_single_jpeg(&bytes, 16, 8);

        let (bytes, summary) = compress_single(PdfImage::IccBased {
            width: 10,
            height: 10,
            components: 1,
            pixels: (0..100).map(|i| (i * 2) as u8).collect(),
        });
        assert_eq!(summary.recompressed(), 1);
        assert_single_jpeg(&bytes, 10, 10);
    }

    #[test]
    fn test_icc_cmyk_is_skipped_with_reason() {
        let (_, summary) = compress_single(PdfImage::IccBased {
            width: 4,
            height: 4,
            components: 4,
            pixels: vec![0; 64],
        });
        assert_eq!(summary.skipped(), 1);
        match &summary.outcomes[0].status {
            AssetStatus::Skipped { reason } => {
                assert!(reason.starts_with("failed to decode image stream"), "{reason}");
                assert!(reason.contains("4 components"), "{reason}");
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn test_indexed_image_expands_palette() {
        let palette = vec![255, 0, 0, 0, 0, 255];
        // Red everywhere except a blue bottom row
        let indices: Vec<u8> = (0..16 * 16).map(|i| u8::from(i / 16 == 15)).collect();
        let (bytes, summary) = compress_single(PdfImage::Indexed {
            width: 16,
            height: 16,
            palette,
            indices,
        });

        assert_eq!(summary.recompressed(), 1);
        assert_single_jpeg(&bytes, 16, 16);
        let streams = image_streams(&bytes);
        let decoded = image::load_from_memory(&streams[0].1).unwrap().to_rgb8();
        let top = decoded.get_pixel(8, 2);
        assert!(top[0] > 150 && top[2] < 100, "{top:?}");
    }

    #[test]
    fn test_image_inside_form_xobject() {
        let (bytes, summary) = compress_single(PdfImage::InForm(jpeg_bytes(48, 32, 95)));

        assert_eq!(summary.total(), 1);
        assert_eq!(summary.recompressed(), 1);
        assert_single_jpeg(&bytes, 48, 32);
    }

    #[test]
    fn test_unpack_one_bit_samples() {
        let samples = unpack_samples(&[0b1010_0000, 0b0100_0000], 1, 3, 2).unwrap();
        assert_eq!(samples, vec![1, 0, 1, 0, 1, 0]);
        assert_eq!(scale_samples(samples, 1), vec![255, 0, 255, 0, 255, 0]);
        assert!(unpack_samples(&[0xFF], 1, 3, 2).is_err());
    }

    #[test]
    fn test_png_unfilter_paeth_and_sub() {
        // Row 0 Sub: 10, 10+5, 15+5; row 1 Paeth against row 0
        let data = [1, 10, 5, 5, 4, 1, 1, 1];
        let rows = png_unfilter(&data, 1, 3).unwrap();
        assert_eq!(&rows[..3], &[10, 15, 20]);
        assert_eq!(&rows[3..], &[11, 16, 21]);
        assert!(png_unfilter(&[9, 0, 0, 0], 1, 3).is_err());
    }

    #[test]
    fn test_inflate_round_trip() {
        let data = b"raster rows".repeat(20);
        assert_eq!(inflate(&zlib(&data)).unwrap(), data);
        assert!(inflate(b"definitely not zlib").is_err());
    }

    #[test]
    fn test_shared_image_processed_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.pdf");
        write_pdf(
            &path,
            &[PdfImage::Jpeg(jpeg_bytes(40, 40, 90)), PdfImage::SameAsPrevious],
        );

        let (_, summary) = PdfProcessor::new(40).compress(&path).unwrap();
        assert_eq!(summary.total(), 1);
    }

    #[test]
    fn test_output_reopens_after_repeated_runs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("twice.pdf");
        write_pdf(&path, &[PdfImage::Jpeg(jpeg_bytes(60, 60, 90))]);

        for _ in 0..2 {
            let (bytes, _) = PdfProcessor::new(40).compress(&path).unwrap();
            let doc = Document::load_mem(&bytes).unwrap();
            assert_eq!(doc.get_pages().len(), 1);
        }
    }

    #[test]
    fn test_not_a_pdf_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fake.pdf");
        std::fs::write(&path, b"hello, I am not a PDF").unwrap();

        let err = PdfProcessor::new(40).compress(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<CompressError>(), Some(CompressError::Decode(_))));
    }
}
