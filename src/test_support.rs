//! Fixture builders shared by the unit tests.

use image::{DynamicImage, ImageFormat, RgbImage};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x ^ y) & 0xff) as u8,
        ])
    })
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient_image(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32, quality: u8) -> Vec<u8> {
    crate::image_processor::encode_rgb_jpeg(&gradient_image(width, height), quality).unwrap()
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, png_bytes(width, height)).unwrap();
}

pub fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    for (name, data) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// An image placed on its own page
pub enum PdfImage {
    /// `/DCTDecode` stream; dimensions come from the bytes, 10x10 if undecodable
    Jpeg(Vec<u8>),
    /// Unfiltered 8-bit `/DeviceRGB` pixels
    RawRgb { width: u32, height: u32, pixels: Vec<u8> },
    /// `/FlateDecode` 8-bit `/DeviceRGB` pixels, optionally with PNG "Up" rows
    FlateRgb { width: u32, height: u32, pixels: Vec<u8>, png_predictor: bool },
    /// `/FlateDecode` pixels in `[/ICCBased profile]` with `/N components`
    IccBased { width: u32, height: u32, components: i64, pixels: Vec<u8> },
    /// 8-bit indices into an RGB palette held as a string
    Indexed { width: u32, height: u32, palette: Vec<u8>, indices: Vec<u8> },
    /// JPEG drawn through a Form XObject
    InForm(Vec<u8>),
    /// New page reusing the previous page's XObject
    SameAsPrevious,
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Prefix every row with PNG filter type 2 (Up)
fn png_up_rows(pixels: &[u8], row_len: usize) -> Vec<u8> {
    let mut output = Vec::new();
    let mut prev = vec![0u8; row_len];
    for row in pixels.chunks(row_len) {
        output.push(2);
        output.extend(row.iter().zip(&prev).map(|(cur, up)| cur.wrapping_sub(*up)));
        prev = row.to_vec();
    }
    output
}

fn image_dict(width: u32, height: u32, color_space: Object) -> Dictionary {
    dictionary! {
        "Type" => Object::Name(b"XObject".to_vec()),
        "Subtype" => Object::Name(b"Image".to_vec()),
        "Width" => Object::Integer(width as i64),
        "Height" => Object::Integer(height as i64),
        "ColorSpace" => color_space,
        "BitsPerComponent" => Object::Integer(8),
    }
}

fn device_rgb() -> Object {
    Object::Name(b"DeviceRGB".to_vec())
}

fn add_jpeg(doc: &mut Document, bytes: &[u8]) -> ObjectId {
    let (width, height) = image::load_from_memory(bytes)
        .map(|img| (img.width(), img.height()))
        .unwrap_or((10, 10));
    let mut dict = image_dict(width, height, device_rgb());
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    doc.add_object(Stream::new(dict, bytes.to_vec()))
}

pub fn write_pdf(path: &Path, images: &[PdfImage]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    let mut previous = None;

    for image in images {
        let xobject_id = match image {
            PdfImage::Jpeg(bytes) => add_jpeg(&mut doc, bytes),
            PdfImage::RawRgb { width, height, pixels } => {
                doc.add_object(Stream::new(image_dict(*width, *height, device_rgb()), pixels.clone()))
            }
            PdfImage::FlateRgb { width, height, pixels, png_predictor } => {
                let mut dict = image_dict(*width, *height, device_rgb());
                dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                let data = if *png_predictor {
                    dict.set(
                        "DecodeParms",
                        dictionary! {
                            "Predictor" => Object::Integer(12),
                            "Colors" => Object::Integer(3),
                            "Columns" => Object::Integer(*width as i64),
                        },
                    );
                    zlib(&png_up_rows(pixels, *width as usize * 3))
                } else {
                    zlib(pixels)
                };
                doc.add_object(Stream::new(dict, data))
            }
            PdfImage::IccBased { width, height, components, pixels } => {
                let profile_id = doc.add_object(Stream::new(
                    dictionary! { "N" => Object::Integer(*components) },
                    b"not a real ICC profile".to_vec(),
                ));
                let color_space = Object::Array(vec![
                    Object::Name(b"ICCBased".to_vec()),
                    Object::Reference(profile_id),
                ]);
                let mut dict = image_dict(*width, *height, color_space);
                dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                doc.add_object(Stream::new(dict, zlib(pixels)))
            }
            PdfImage::Indexed { width, height, palette, indices } => {
                let color_space = Object::Array(vec![
                    Object::Name(b"Indexed".to_vec()),
                    device_rgb(),
                    Object::Integer((palette.len() / 3) as i64 - 1),
                    Object::String(palette.clone(), StringFormat::Hexadecimal),
                ]);
                doc.add_object(Stream::new(image_dict(*width, *height, color_space), indices.clone()))
            }
            PdfImage::InForm(bytes) => {
                let image_id = add_jpeg(&mut doc, bytes);
                doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => Object::Name(b"XObject".to_vec()),
                        "Subtype" => Object::Name(b"Form".to_vec()),
                        "BBox" => Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(1), Object::Integer(1)]),
                        "Resources" => dictionary! {
                            "XObject" => dictionary! {
                                "Im0" => Object::Reference(image_id),
                            },
                        },
                    },
                    b"q 1 0 0 1 0 0 cm /Im0 Do Q".to_vec(),
                ))
            }
            PdfImage::SameAsPrevious => previous.expect("SameAsPrevious needs a previous image"),
        };
        previous = Some(xobject_id);

        let content = b"q 100 0 0 100 0 0 cm /X0 Do Q".to_vec();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => Object::Name(b"Page".to_vec()),
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(200), Object::Integer(200)]),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "X0" => Object::Reference(xobject_id),
                },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => Object::Array(kids),
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Catalog".to_vec()),
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).unwrap();
}

/// Writes an executable script and waits until it can be launched.
///
/// A test thread forking while the file is still open for writing leaves a
/// writable descriptor in the child until it execs, which makes our own exec
/// fail with ETXTBSY. A successful dry launch proves no such descriptor remains.
#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    const ETXTBSY: i32 = 26;

    let path = dir.join(name);
    {
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "#!/bin/sh\n[ -n \"$SFC_DRY_RUN\" ] && exit 0\n{}\n", body).unwrap();
        file.sync_all().unwrap();
    }
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();

    for _ in 0..100 {
        match std::process::Command::new(&path).env("SFC_DRY_RUN", "1").status() {
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                std::thread::sleep(std::time::Duration::from_millis(10))
            }
            Err(e) => panic!("cannot launch {}: {}", path.display(), e),
            Ok(_) => return path,
        }
    }
    panic!("{} stayed busy", path.display());
}

/// Stand-in encoder that copies the `-i` input to the last argument
#[cfg(unix)]
pub fn copying_ffmpeg(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg-copy",
        r#"prev=""
src=""
for a in "$@"; do
  if [ "$prev" = "-i" ]; then src="$a"; fi
  prev="$a"
done
cp "$src" "$prev""#,
    )
}

/// Stand-in encoder that writes half an output file and exits with `code`
#[cfg(unix)]
pub fn failing_ffmpeg(dir: &Path, code: i32) -> PathBuf {
    write_script(
        dir,
        &format!("ffmpeg-fail-{}", code),
        &format!(
            r#"for a in "$@"; do last="$a"; done
printf 'partial' > "$last"
echo "encoder exploded" >&2
exit {}"#,
            code
        ),
    )
}
