//! Rasterization of report pages: colour burn-in of a parameter grid and a
//! horizontal colorbar, plus downscaling of pages.
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use ndarray::Array2;
use tracing::debug;

use crate::error::{Error, Result};
use crate::report::colormap::{Colormap, Rgb};

pub const COLORBAR_WIDTH: usize = 512;
pub const COLORBAR_HEIGHT: usize = 32;

/// Normalization of valid values to [0, 1] before colour lookup.
enum Scaling {
    Linear { min: f64, span: f64 },
    /// Empirical CDF of the valid values clamped to [min, max]
    Uniform { sorted: Vec<f64> },
}

impl Scaling {
    fn new(valid: impl Iterator<Item = f64>, min: f64, max: f64, uniform: bool) -> Self {
        if uniform {
            let mut sorted: Vec<f64> = valid.map(|v| v.clamp(min.min(max), max.max(min))).collect();
            sorted.sort_by(f64::total_cmp);
            if !sorted.is_empty() {
                return Scaling::Uniform { sorted };
            }
        }
        Scaling::Linear {
            min,
            span: max - min,
        }
    }

    fn normalize(&self, v: f64) -> f64 {
        match self {
            Scaling::Linear { min, span } => {
                if span.abs() < f64::EPSILON {
                    0.5
                } else {
                    (v - min) / span
                }
            }
            Scaling::Uniform { sorted } => {
                let rank = sorted.partition_point(|&s| s <= v);
                rank as f64 / sorted.len() as f64
            }
        }
    }
}

/// Render `parameter` as interleaved RGB bytes (row-major). Cells equal to
/// `no_data` or NaN get the no-data background.
pub fn burn_in_rgb(
    parameter: &Array2<f64>,
    colormap: Colormap,
    min: f64,
    max: f64,
    no_data: f64,
    uniform: bool,
) -> Vec<u8> {
    let is_valid = |v: f64| v != no_data && !v.is_nan();
    let scaling = Scaling::new(parameter.iter().copied().filter(|&v| is_valid(v)), min, max, uniform);

    let mut rgb = Vec::with_capacity(parameter.len() * 3);
    for &v in parameter.iter() {
        let color = if is_valid(v) {
            colormap.evaluate(scaling.normalize(v))
        } else {
            Rgb::NO_DATA
        };
        rgb.extend_from_slice(&[color.r, color.g, color.b]);
    }
    rgb
}

/// Horizontal colour ramp from the low (left) to the high (right) end.
pub fn colorbar_rgb(colormap: Colormap, width: usize, height: usize) -> Vec<u8> {
    let row: Vec<Rgb> = (0..width)
        .map(|i| {
            let t = if width > 1 {
                i as f64 / (width - 1) as f64
            } else {
                0.0
            };
            colormap.evaluate(t)
        })
        .collect();

    let mut rgb = Vec::with_capacity(width * height * 3);
    for _ in 0..height {
        for c in &row {
            rgb.extend_from_slice(&[c.r, c.g, c.b]);
        }
    }
    rgb
}

/// Dimensions with the long side set to `target_size`, keeping the aspect
/// ratio. Images already smaller are left untouched.
pub fn calculate_resize_dimensions(
    original_cols: usize,
    original_rows: usize,
    target_size: usize,
) -> (usize, usize) {
    let short_side = original_rows.min(original_cols);
    let long_side = original_rows.max(original_cols);

    if target_size >= long_side || target_size == 0 {
        debug!(
            "Page {}x{} already within {} px, not resizing",
            original_cols, original_rows, target_size
        );
        return (original_cols, original_rows);
    }

    let scale_factor = target_size as f64 / long_side as f64;
    let new_short_side = ((short_side as f64 * scale_factor).round() as usize).max(1);

    if original_cols >= original_rows {
        (target_size, new_short_side)
    } else {
        (new_short_side, target_size)
    }
}

pub fn resize_rgb_image(
    data: &[u8],
    original_cols: usize,
    original_rows: usize,
    target_cols: usize,
    target_rows: usize,
) -> Result<Vec<u8>> {
    let resize_options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    let mut resizer = Resizer::new();

    let src_image = Image::from_vec_u8(
        original_cols as u32,
        original_rows as u32,
        data.to_vec(),
        PixelType::U8x3,
    )
    .map_err(Error::report)?;
    let mut dst_image = Image::new(target_cols as u32, target_rows as u32, PixelType::U8x3);
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::report)?;

    Ok(dst_image.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const ND: f64 = -9999.0;

    fn pixel(rgb: &[u8], idx: usize) -> Rgb {
        Rgb::new(rgb[idx * 3], rgb[idx * 3 + 1], rgb[idx * 3 + 2])
    }

    #[test]
    fn no_data_cells_get_background() {
        let param = array![[ND, 1.0], [f64::NAN, 2.0]];
        let rgb = burn_in_rgb(&param, Colormap::Gray, 1.0, 2.0, ND, false);
        assert_eq!(rgb.len(), 12);
        assert_eq!(pixel(&rgb, 0), Rgb::NO_DATA);
        assert_eq!(pixel(&rgb, 1), Rgb::new(0, 0, 0));
        assert_eq!(pixel(&rgb, 2), Rgb::NO_DATA);
        assert_eq!(pixel(&rgb, 3), Rgb::new(255, 255, 255));
    }

    #[test]
    fn uniform_spreads_skewed_values() {
        // three small values and one outlier: linear scaling crushes the small ones
        let param = array![[1.0, 1.1, 1.2, 100.0]];
        let linear = burn_in_rgb(&param, Colormap::Gray, 0.0, 100.0, ND, false);
        let uniform = burn_in_rgb(&param, Colormap::Gray, 0.0, 100.0, ND, true);
        assert!(pixel(&linear, 1).r < 5);
        assert_eq!(pixel(&uniform, 0), Colormap::Gray.evaluate(0.25));
        assert_eq!(pixel(&uniform, 1), Colormap::Gray.evaluate(0.5));
        assert_eq!(pixel(&uniform, 3), Rgb::new(255, 255, 255));
    }

    #[test]
    fn colorbar_runs_low_to_high() {
        let rgb = colorbar_rgb(Colormap::Gray, 4, 2);
        assert_eq!(rgb.len(), 4 * 2 * 3);
        assert_eq!(pixel(&rgb, 0), Rgb::new(0, 0, 0));
        assert_eq!(pixel(&rgb, 3), Rgb::new(255, 255, 255));
        assert_eq!(pixel(&rgb, 4), pixel(&rgb, 0));
    }

    #[test]
    fn resize_dimensions_keep_aspect() {
        assert_eq!(calculate_resize_dimensions(2000, 1000, 500), (500, 250));
        assert_eq!(calculate_resize_dimensions(1000, 2000, 500), (250, 500));
        assert_eq!(calculate_resize_dimensions(300, 200, 500), (300, 200));
    }

    #[test]
    fn resize_rgb_produces_target_size() {
        let data = vec![200u8; 8 * 4 * 3];
        let out = resize_rgb_image(&data, 8, 4, 4, 2).unwrap();
        assert_eq!(out.len(), 4 * 2 * 3);
    }
}
