//! Tunable constants for the detection pipeline.
//!
//! Most of these are empirical fits (scoring scales, the area boost) rather
//! than calibrated physical constants, so they live on a plain struct with
//! a `Default` rather than as bare `const`s — callers retuning the
//! pipeline for a different chart or camera override a field instead of
//! forking the crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Expected bounding-box aspect ratio (width/height) of a well-framed chart.
    pub expected_aspect: f64,
    /// Laplacian-variance value treated as "fully sharp" when normalizing `blur_score`.
    pub blur_reference: f64,
    /// ΔE value treated as "fully wrong" when normalizing the average-ΔE color sub-score.
    pub pass_avg_delta_e: f64,
    /// ΔE value treated as "fully wrong" when normalizing the max-ΔE color sub-score.
    pub pass_max_delta_e: f64,
    /// Average-ΔE value above which a detection is reclassified as `NotFound`.
    pub not_found_delta_e_guard: f64,
    /// Confidence at or above which a detection is considered a pass.
    pub confidence_threshold: f32,
    /// Average corresponding-corner distance, in pixels, below which two candidate quads are merged.
    pub dedup_threshold_px: f64,
    /// Width of the canonical warp canvas.
    pub warp_canvas_width: u32,
    /// Height of the canonical warp canvas.
    pub warp_canvas_height: u32,
    /// Mean-chroma ceiling for grayscale-panel validation.
    pub grayscale_chroma_mean_limit: f64,
    /// Max-chroma ceiling for grayscale-panel validation.
    pub grayscale_chroma_max_limit: f64,
    /// Allowed per-row luminance increase (darker-to-lighter tolerance) in grayscale-panel validation.
    pub luminance_descent_slack: f64,
    /// Multiplier applied to `area_score` before clamping, in the confidence blend.
    pub area_boost_factor: f64,
    /// Blur failure threshold on `blur_score`.
    pub blur_failure_threshold: f64,
    /// Partial failure threshold on `area_score`.
    pub partial_failure_threshold: f64,
    /// Lighting failure threshold on `contrast_score`.
    pub lighting_failure_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            expected_aspect: 1.5,
            blur_reference: 120.0,
            pass_avg_delta_e: 24.0,
            pass_max_delta_e: 40.0,
            not_found_delta_e_guard: 24.0 * 1.3,
            confidence_threshold: 0.70,
            dedup_threshold_px: 40.0,
            warp_canvas_width: 600,
            warp_canvas_height: 400,
            grayscale_chroma_mean_limit: 55.0,
            grayscale_chroma_max_limit: 90.0,
            luminance_descent_slack: 2.0,
            area_boost_factor: 8.0,
            blur_failure_threshold: 0.15,
            partial_failure_threshold: 0.005,
            lighting_failure_threshold: 0.08,
        }
    }
}
