//! High-level image operations.
//!
//! These combine the pure calculations with `image::imageops` to build the
//! side-by-side debug image out of the ELA and noise maps.

use super::calculations::width_for_height;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};

/// Scale the noise map to the ELA map's height (aspect kept) and place the
/// two side by side: ELA on the left, noise on the right.
pub fn compose_side_by_side(ela_map: &RgbImage, noise_map: &GrayImage) -> RgbImage {
    let height = ela_map.height();
    let noise_rgb = DynamicImage::ImageLuma8(noise_map.clone()).to_rgb8();
    let noise_rgb = if noise_rgb.height() == height {
        noise_rgb
    } else {
        let width = width_for_height(noise_rgb.width(), noise_rgb.height(), height);
        imageops::resize(&noise_rgb, width, height, FilterType::Triangle)
    };

    let mut canvas = RgbImage::new(ela_map.width() + noise_rgb.width(), height);
    imageops::replace(&mut canvas, ela_map, 0, 0);
    imageops::replace(&mut canvas, &noise_rgb, ela_map.width() as i64, 0);
    canvas
}
