//! Focus and contrast metrics on a single-channel grayscale image.
//!
//! Both functions are pure and side-effect free: no global state, same
//! input always yields the same output.

use image::GrayImage;

/// Capability trait for the focus/contrast stage of the pipeline.
/// Production code uses [`StdQualityAnalyzer`]; tests swap in fakes.
pub trait QualityAnalyzer {
    fn contrast(&self, gray: &GrayImage) -> f64;
    fn laplacian_variance(&self, gray: &GrayImage) -> f64;
}

/// Default, classical implementation: standard deviation for contrast, a
/// discrete 4-neighbor Laplacian for focus.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdQualityAnalyzer;

impl QualityAnalyzer for StdQualityAnalyzer {
    fn contrast(&self, gray: &GrayImage) -> f64 {
        let sigma = stddev(gray);
        (sigma / 64.0).clamp(0.0, 1.0)
    }

    fn laplacian_variance(&self, gray: &GrayImage) -> f64 {
        laplacian_variance(gray)
    }
}

fn stddev(gray: &GrayImage) -> f64 {
    let n = gray.pixels().len();
    if n == 0 {
        return 0.0;
    }
    let mean: f64 = gray.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n as f64;
    let var: f64 = gray
        .pixels()
        .map(|p| {
            let d = p.0[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    var.sqrt()
}

/// Variance (sigma^2) of the discrete Laplacian response across the image,
/// using the standard 4-neighbor kernel [[0,1,0],[1,-4,1],[0,1,0]] computed
/// in 64-bit float, clamped to the image interior (1-pixel border excluded
/// rather than padded, since the border contributes no useful focus signal
/// on a chart that fills most of the frame).
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut responses: Vec<f64> = Vec::with_capacity((w as usize - 2) * (h as usize - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = gray.get_pixel(x, y).0[0] as f64;
            let up = gray.get_pixel(x, y - 1).0[0] as f64;
            let down = gray.get_pixel(x, y + 1).0[0] as f64;
            let left = gray.get_pixel(x - 1, y).0[0] as f64;
            let right = gray.get_pixel(x + 1, y).0[0] as f64;
            responses.push(up + down + left + right - 4.0 * center);
        }
    }

    let n = responses.len() as f64;
    let mean = responses.iter().sum::<f64>() / n;
    responses.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n
}
