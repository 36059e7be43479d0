//! Fixtures shared by the integration tests.
//!
//! `src/test_helpers.rs` is compiled only under `cfg(test)` for unit tests and
//! is not visible to the crates under `tests/`, so the few encoded fixtures the
//! end-to-end tests need live here, once.

#![allow(dead_code)]

use image::{ImageEncoder, Rgb, RgbImage};
use std::path::Path;

/// Seeded xorshift gray noise, stored as RGB.
pub fn noisy_rgb(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let v = (state >> 24) as u8;
        Rgb([v, v, v])
    })
}

/// Encode as JPEG at quality 95, no metadata.
pub fn encode_jpeg(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 95)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    buf
}

pub fn write_jpeg(path: &Path, img: &RgbImage) {
    std::fs::write(path, encode_jpeg(img)).unwrap();
}

/// JPEG with an APP1 segment whose IFD0 holds only a `Software` tag.
pub fn jpeg_with_software(img: &RgbImage, software: &str) -> Vec<u8> {
    let mut value = software.as_bytes().to_vec();
    value.push(0);
    assert!(value.len() > 4, "fixture stores the string out of line");

    let mut tiff = b"MM\0\x2a".to_vec();
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0131u16.to_be_bytes());
    tiff.extend_from_slice(&2u16.to_be_bytes());
    tiff.extend_from_slice(&(value.len() as u32).to_be_bytes());
    tiff.extend_from_slice(&(8u32 + 2 + 12 + 4).to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&value);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);

    let jpeg = encode_jpeg(img);
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}
