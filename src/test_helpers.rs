//! Shared test utilities for the docuverify test suite.
//!
//! Synthetic images with known properties, so detector tests can assert exact
//! verdicts without shipping fixture files:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let noisy = noise_gray(200, 200, 7);                 // uniform noise
//! let patched = with_constant_block(&noisy, 50, 50, 50); // one dead block
//! let jpeg = jpeg_with_exif(&flat_rgb(64, 64, 128), &ExifFields {
//!     software: Some("GIMP 2.10"),
//!     date_time_original: None,
//! });
//! ```

use image::{DynamicImage, GrayImage, ImageEncoder, Luma, Rgb, RgbImage};
use std::path::Path;

use crate::types::RasterImage;

// =========================================================================
// Pixel generators
// =========================================================================

/// Deterministic xorshift64 so noise fixtures are stable across runs.
struct XorShift(u64);

impl XorShift {
    fn next_u8(&mut self) -> u8 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 24) as u8
    }
}

/// Uniform random grayscale noise.
pub fn noise_gray(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = XorShift(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1);
    GrayImage::from_fn(width, height, |_, _| Luma([rng.next_u8()]))
}

/// Overwrite exactly the `size`×`size` block at `(x, y)` with a constant value.
pub fn with_constant_block(src: &GrayImage, x: u32, y: u32, size: u32) -> GrayImage {
    let mut out = src.clone();
    for py in y..(y + size).min(src.height()) {
        for px in x..(x + size).min(src.width()) {
            out.put_pixel(px, py, Luma([128]));
        }
    }
    out
}

/// Single-colour gray RGB image.
pub fn flat_rgb(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// Flat gray image whose right half is a one-pixel checkerboard.
///
/// The checkerboard levels stay clear of 0/255 so codec error is not
/// hidden by clamping.
pub fn flat_with_checker_patch(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if x >= width / 2 {
            let v = if (x + y) % 2 == 0 { 40 } else { 215 };
            Rgb([v, v, v])
        } else {
            Rgb([128, 128, 128])
        }
    })
}

pub fn raster_from_gray(gray: GrayImage) -> RasterImage {
    RasterImage::from_pixels(DynamicImage::ImageLuma8(gray))
}

pub fn raster_from_rgb(rgb: RgbImage) -> RasterImage {
    RasterImage::from_pixels(DynamicImage::ImageRgb8(rgb))
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// Encode an RGB image as JPEG bytes.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    buf
}

/// Write a plain JPEG (no metadata) to `path`.
pub fn write_jpeg(path: &Path, img: &RgbImage) {
    std::fs::write(path, encode_jpeg(img, 95)).unwrap();
}

/// EXIF fields to embed with [`jpeg_with_exif`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifFields<'a> {
    pub software: Option<&'a str>,
    pub date_time_original: Option<&'a str>,
}

const TAG_SOFTWARE: u16 = 0x0131;
const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

/// Encode `img` as JPEG and splice in an APP1 EXIF segment right after SOI.
///
/// Builds a minimal big-endian TIFF structure: IFD0 carries `Software` and,
/// when a capture date is given, a pointer to an Exif sub-IFD holding
/// `DateTimeOriginal`.
pub fn jpeg_with_exif(img: &RgbImage, fields: &ExifFields) -> Vec<u8> {
    let tiff = build_tiff(fields);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);

    let jpeg = encode_jpeg(img, 95);
    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn ascii_bytes(s: &str) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.push(0);
    v
}

fn build_tiff(fields: &ExifFields) -> Vec<u8> {
    let software = fields.software.map(ascii_bytes);
    let date = fields.date_time_original.map(ascii_bytes);

    let ifd0_entries = software.is_some() as u32 + date.is_some() as u32;
    let ifd0_offset = 8u32;
    let ifd0_len = 2 + 12 * ifd0_entries + 4;
    let exif_ifd_offset = ifd0_offset + ifd0_len;
    let exif_ifd_len = if date.is_some() { 2 + 12 + 4 } else { 0 };
    let mut data_offset = exif_ifd_offset + exif_ifd_len;

    let mut head = Vec::new();
    let mut data = Vec::new();

    // Header
    head.extend_from_slice(b"MM");
    head.extend_from_slice(&42u16.to_be_bytes());
    head.extend_from_slice(&ifd0_offset.to_be_bytes());

    // IFD0
    head.extend_from_slice(&(ifd0_entries as u16).to_be_bytes());
    if let Some(bytes) = &software {
        push_ascii_entry(&mut head, &mut data, &mut data_offset, TAG_SOFTWARE, bytes);
    }
    if date.is_some() {
        push_entry(&mut head, TAG_EXIF_IFD_POINTER, TYPE_LONG, 1, exif_ifd_offset.to_be_bytes());
    }
    head.extend_from_slice(&0u32.to_be_bytes());

    // Exif sub-IFD
    if let Some(bytes) = &date {
        head.extend_from_slice(&1u16.to_be_bytes());
        push_ascii_entry(&mut head, &mut data, &mut data_offset, TAG_DATE_TIME_ORIGINAL, bytes);
        head.extend_from_slice(&0u32.to_be_bytes());
    }

    head.extend_from_slice(&data);
    head
}

fn push_entry(out: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: [u8; 4]) {
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&typ.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&value);
}

fn push_ascii_entry(
    out: &mut Vec<u8>,
    data: &mut Vec<u8>,
    data_offset: &mut u32,
    tag: u16,
    bytes: &[u8],
) {
    let count = bytes.len() as u32;
    if bytes.len() <= 4 {
        let mut inline = [0u8; 4];
        inline[..bytes.len()].copy_from_slice(bytes);
        push_entry(out, tag, TYPE_ASCII, count, inline);
    } else {
        push_entry(out, tag, TYPE_ASCII, count, data_offset.to_be_bytes());
        data.extend_from_slice(bytes);
        *data_offset += count;
    }
}
