//! Perspective rectification, patch sampling, and grayscale-panel checks.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use serde::{Deserialize, Serialize};

use crate::color::{self, LabSample};
use crate::config::DetectorConfig;
use crate::error::CoreError;
use crate::geometry::{Quad, order_corners};

/// Average and maximum ΔE2000 across the 24 sampled patches of a detected chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchScores {
    pub avg_delta_e: f64,
    pub max_delta_e: f64,
}

const GRID_COLUMNS: u32 = 6;
const GRID_ROWS: u32 = 4;

/// Capability trait for the warp/sample/score stage of the pipeline.
pub trait PatchAnalyzer {
    fn score_patches(&self, bgr: &RgbImage, quad: &Quad) -> Result<PatchScores, CoreError>;
    fn validate_grayscale_panel(&self, bgr: &RgbImage, quad: &Quad) -> bool;
}

/// Default implementation: homography warp to a fixed canvas, grid sampling, ΔE2000 scoring.
#[derive(Debug, Clone)]
pub struct GridPatchAnalyzer {
    config: DetectorConfig,
}

impl GridPatchAnalyzer {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Warp the quad's interior to the canonical canvas. Fails only when the
    /// four corners are degenerate (collinear or coincident), in which case
    /// no valid homography exists.
    fn warp_to_canvas(&self, bgr: &RgbImage, quad: &Quad) -> Result<RgbImage, CoreError> {
        let ordered = order_corners(quad);
        let w = self.config.warp_canvas_width;
        let h = self.config.warp_canvas_height;

        let canvas_corners = [(0.0, 0.0), (w as f32, 0.0), (w as f32, h as f32), (0.0, h as f32)];
        let source_corners = [
            (ordered[0].x as f32, ordered[0].y as f32),
            (ordered[1].x as f32, ordered[1].y as f32),
            (ordered[2].x as f32, ordered[2].y as f32),
            (ordered[3].x as f32, ordered[3].y as f32),
        ];

        // `warp_into` samples `out(x, y) = bgr(projection(x, y))`, so the
        // projection must map canvas space to source space.
        let projection = Projection::from_control_points(canvas_corners, source_corners)
            .ok_or(CoreError::DegenerateQuad("corners do not span a valid homography"))?;

        let mut out = RgbImage::new(w, h);
        warp_into(bgr, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
        Ok(out)
    }

    /// Sample the 6x4 grid of centered 50x50 ROIs, one Lab mean per cell,
    /// in row-major order.
    fn sample_grid(&self, canvas: &RgbImage) -> Vec<LabSample> {
        let (w, h) = canvas.dimensions();
        let cell_w = w / GRID_COLUMNS;
        let cell_h = h / GRID_ROWS;
        let roi_w = (cell_w / 2).max(4);
        let roi_h = (cell_h / 2).max(4);
        let offset_x = cell_w / 4;
        let offset_y = cell_h / 4;

        let mut samples = Vec::with_capacity((GRID_COLUMNS * GRID_ROWS) as usize);
        for r in 0..GRID_ROWS {
            for c in 0..GRID_COLUMNS {
                let x0 = c * cell_w + offset_x;
                let y0 = r * cell_h + offset_y;
                samples.push(mean_lab(canvas, x0, y0, roi_w, roi_h));
            }
        }
        samples
    }
}

impl PatchAnalyzer for GridPatchAnalyzer {
    fn score_patches(&self, bgr: &RgbImage, quad: &Quad) -> Result<PatchScores, CoreError> {
        let canvas = self.warp_to_canvas(bgr, quad)?;
        let samples = self.sample_grid(&canvas);

        let deltas: Vec<f64> = samples
            .iter()
            .zip(color::REFERENCE_TABLE.iter())
            .map(|(measured, reference)| color::ciede2000(*measured, *reference))
            .collect();

        let avg_delta_e = deltas.iter().sum::<f64>() / deltas.len() as f64;
        let max_delta_e = deltas.iter().cloned().fold(0.0_f64, f64::max);

        tracing::debug!(avg_delta_e, max_delta_e, "scored chart patches");
        Ok(PatchScores { avg_delta_e, max_delta_e })
    }

    fn validate_grayscale_panel(&self, bgr: &RgbImage, quad: &Quad) -> bool {
        let canvas = match self.warp_to_canvas(bgr, quad) {
            Ok(canvas) => canvas,
            Err(_) => return false,
        };
        let samples = self.sample_grid(&canvas);

        let chromas: Vec<f64> = samples.iter().map(|s| (s.a * s.a + s.b * s.b).sqrt()).collect();
        let mean_chroma = chromas.iter().sum::<f64>() / chromas.len() as f64;
        let max_chroma = chromas.iter().cloned().fold(0.0_f64, f64::max);

        if mean_chroma >= self.config.grayscale_chroma_mean_limit {
            return false;
        }
        if max_chroma >= self.config.grayscale_chroma_max_limit {
            return false;
        }

        let row_means: Vec<f64> = samples
            .chunks(GRID_COLUMNS as usize)
            .map(|row| row.iter().map(|s| s.l).sum::<f64>() / row.len() as f64)
            .collect();

        row_means
            .windows(2)
            .all(|pair| pair[0] >= pair[1] - self.config.luminance_descent_slack)
    }
}

fn mean_lab(canvas: &RgbImage, x0: u32, y0: u32, w: u32, h: u32) -> LabSample {
    let mut sum_l = 0.0;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    let mut n = 0u32;

    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let pixel = canvas.get_pixel(x, y);
            let lab = color::srgb_to_lab(pixel[0], pixel[1], pixel[2]);
            let (l8, a8, b8) = color::encode_lab_8bit(lab);
            sum_l += l8 as f64;
            sum_a += a8 as f64;
            sum_b += b8 as f64;
            n += 1;
        }
    }

    let n = n.max(1) as f64;
    color::decode_lab_8bit(sum_l / n, sum_a / n, sum_b / n)
}
