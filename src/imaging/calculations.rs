//! Pure pixel calculations used by the detectors.
//!
//! Everything here is a plain function of its inputs: no I/O, no codec.
//! Arithmetic that can leave the 8-bit range (differences, rescaling, the
//! Laplacian) is done in `i32`/`f64` and clamped back at the end.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Per-pixel, per-channel absolute difference.
///
/// Returns `None` when the dimensions disagree.
pub fn abs_difference(a: &RgbImage, b: &RgbImage) -> Option<RgbImage> {
    if a.dimensions() != b.dimensions() {
        return None;
    }
    let mut out = RgbImage::new(a.width(), a.height());
    for ((dst, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        *dst = Rgb([
            pa[0].abs_diff(pb[0]),
            pa[1].abs_diff(pb[1]),
            pa[2].abs_diff(pb[2]),
        ]);
    }
    Some(out)
}

/// Largest channel value anywhere in the image (0 for an empty image).
pub fn max_channel_value(img: &RgbImage) -> u8 {
    img.as_raw().iter().copied().max().unwrap_or(0)
}

/// Multiply every channel by `factor`, rounding and clamping to `0..=255`.
pub fn scale_brightness(img: &RgbImage, factor: f64) -> RgbImage {
    let raw = img
        .as_raw()
        .iter()
        .map(|&v| (v as f64 * factor).round().clamp(0.0, 255.0) as u8)
        .collect();
    // Same length as the source buffer, so from_raw cannot fail.
    RgbImage::from_raw(img.width(), img.height(), raw).unwrap_or_else(|| img.clone())
}

/// Mean over all channels of all pixels. `None` for an empty image.
pub fn mean_intensity(img: &RgbImage) -> Option<f64> {
    let raw = img.as_raw();
    if raw.is_empty() {
        return None;
    }
    let sum: u64 = raw.iter().map(|&v| v as u64).sum();
    Some(sum as f64 / raw.len() as f64)
}

/// Reflect-101 border index (`-1 → 1`, `n → n-2`), as OpenCV's default border.
fn reflect_101(i: i64, n: i64) -> usize {
    if n == 1 {
        return 0;
    }
    let r = if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    };
    r.clamp(0, n - 1) as usize
}

/// Absolute 4-neighbour Laplacian, saturated to 8 bits.
///
/// Kernel `[0 1 0; 1 -4 1; 0 1 0]`, reflect-101 borders.
pub fn laplacian_magnitude(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let (wi, hi) = (w as i64, h as i64);
    let raw = gray.as_raw();
    let at = |x: i64, y: i64| -> i32 {
        raw[reflect_101(y, hi) * w as usize + reflect_101(x, wi)] as i32
    };

    GrayImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let lap = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4 * at(x, y);
        Luma([lap.unsigned_abs().min(255) as u8])
    })
}

/// Population variance of every full `block`×`block` tile, row-major from the
/// origin. Trailing partial tiles on the right and bottom are dropped.
pub fn block_variances(gray: &GrayImage, block: u32) -> Vec<f64> {
    if block == 0 {
        return Vec::new();
    }
    let (w, h) = gray.dimensions();
    let (cols, rows) = (w / block, h / block);
    let n = (block as f64) * (block as f64);
    let mut out = Vec::with_capacity((cols * rows) as usize);

    for by in 0..rows {
        for bx in 0..cols {
            let mut sum = 0.0;
            let mut sum_sq = 0.0;
            for y in by * block..(by + 1) * block {
                for x in bx * block..(bx + 1) * block {
                    let v = gray.get_pixel(x, y)[0] as f64;
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let mean = sum / n;
            out.push((sum_sq / n - mean * mean).max(0.0));
        }
    }
    out
}

/// Width that keeps the aspect ratio when scaling `(w, h)` to `target_height`.
pub fn width_for_height(w: u32, h: u32, target_height: u32) -> u32 {
    if h == 0 {
        return w;
    }
    let scaled = (w as f64 * target_height as f64 / h as f64).round() as u32;
    scaled.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_difference_is_symmetric_and_exact() {
        let a = RgbImage::from_pixel(2, 2, Rgb([10, 200, 0]));
        let b = RgbImage::from_pixel(2, 2, Rgb([250, 5, 0]));
        let d = abs_difference(&a, &b).unwrap();
        assert_eq!(d.get_pixel(0, 0).0, [240, 195, 0]);
        assert_eq!(abs_difference(&b, &a).unwrap(), d);
    }

    #[test]
    fn abs_difference_rejects_mismatched_sizes() {
        assert!(abs_difference(&RgbImage::new(2, 2), &RgbImage::new(3, 2)).is_none());
    }

    #[test]
    fn max_channel_value_scans_all_channels() {
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(2, 1, Rgb([0, 0, 17]));
        assert_eq!(max_channel_value(&img), 17);
        assert_eq!(max_channel_value(&RgbImage::new(0, 0)), 0);
    }

    #[test]
    fn scale_brightness_clamps_at_255() {
        let img = RgbImage::from_pixel(1, 1, Rgb([1, 2, 200]));
        let out = scale_brightness(&img, 85.0);
        assert_eq!(out.get_pixel(0, 0).0, [85, 170, 255]);
    }

    #[test]
    fn mean_intensity_counts_every_channel() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        assert_eq!(mean_intensity(&img), Some(127.5));
        assert_eq!(mean_intensity(&RgbImage::new(0, 0)), None);
    }

    #[test]
    fn reflect_101_mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-1, 1), 0);
    }

    #[test]
    fn laplacian_of_constant_is_zero() {
        let flat = GrayImage::from_pixel(9, 7, Luma([90]));
        assert!(laplacian_magnitude(&flat).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn laplacian_of_single_spike() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([10]));
        let lap = laplacian_magnitude(&img);
        assert_eq!(lap.get_pixel(2, 2)[0], 40);
        assert_eq!(lap.get_pixel(1, 2)[0], 10);
        assert_eq!(lap.get_pixel(2, 1)[0], 10);
        assert_eq!(lap.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn laplacian_saturates_instead_of_wrapping() {
        let mut img = GrayImage::new(3, 3);
        img.put_pixel(1, 1, Luma([255]));
        assert_eq!(laplacian_magnitude(&img).get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn block_variances_drop_partial_tiles() {
        let img = GrayImage::new(125, 110);
        assert_eq!(block_variances(&img, 50).len(), 4);
        assert_eq!(block_variances(&GrayImage::new(100, 100), 50).len(), 4);
        assert!(block_variances(&GrayImage::new(49, 200), 50).is_empty());
        assert!(block_variances(&img, 0).is_empty());
    }

    #[test]
    fn block_variance_matches_population_formula() {
        // One 2x2 block: values 0, 0, 10, 10 → mean 5, variance 25.
        let mut img = GrayImage::new(2, 2);
        img.put_pixel(0, 1, Luma([10]));
        img.put_pixel(1, 1, Luma([10]));
        assert_eq!(block_variances(&img, 2), vec![25.0]);
    }

    #[test]
    fn width_for_height_keeps_aspect() {
        assert_eq!(width_for_height(200, 100, 50), 100);
        assert_eq!(width_for_height(300, 300, 300), 300);
        assert_eq!(width_for_height(1, 1000, 10), 1);
    }
}
