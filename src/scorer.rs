//! Metric aggregation, confidence blending, and failure classification.

use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::geometry::{BoundingBox, Quad};
use crate::patch::PatchScores;

/// Categorical reason a detection did not pass, or `None` if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Failure {
    None,
    NotFound,
    Lighting,
    Blur,
    Partial,
}

/// Per-metric diagnostics for a single `detect` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub area_score: f64,
    pub aspect_score: f64,
    pub contrast_score: f64,
    pub blur_score: f64,
    pub color_score: f64,
    pub avg_delta_e: Option<f64>,
    pub max_delta_e: Option<f64>,
    pub primary_quad: Vec<crate::geometry::Point>,
    pub secondary_quad: Vec<crate::geometry::Point>,
    pub secondary_valid: bool,
    pub frame_width: i32,
    pub frame_height: i32,
    pub rotation_degrees: i32,
}

/// The full result of a `detect` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutput {
    pub confidence: f32,
    pub failure: Failure,
    pub needs_input: bool,
    pub metrics: Option<Metrics>,
}

/// Inputs to [`Scorer::score`], gathered by the orchestrator after running
/// every earlier pipeline stage.
pub struct ScoreInput {
    pub frame_width: u32,
    pub frame_height: u32,
    pub rotation_degrees: i32,
    pub bbox: BoundingBox,
    pub lap_var: f64,
    pub contrast: f64,
    pub patch_scores: PatchScores,
    pub ordered_primary: Quad,
    pub ordered_secondary: Option<Quad>,
    pub secondary_valid: bool,
}

/// Capability trait for the confidence-blending/classification stage.
pub trait Scorer {
    fn score(&self, input: ScoreInput) -> DetectionOutput;
}

/// Default implementation, following the weighted blend and first-match-wins
/// failure taxonomy.
#[derive(Debug, Clone)]
pub struct WeightedScorer {
    config: DetectorConfig,
}

impl WeightedScorer {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Scorer for WeightedScorer {
    fn score(&self, input: ScoreInput) -> DetectionOutput {
        let cfg = &self.config;

        let area_score = (input.bbox.width * input.bbox.height)
            / (input.frame_width as f64 * input.frame_height as f64);
        let aspect = input.bbox.width / input.bbox.height.max(1.0);
        let aspect_score = (1.0 - (aspect - cfg.expected_aspect).abs() / cfg.expected_aspect).clamp(0.0, 1.0);
        let blur_score = (input.lap_var / cfg.blur_reference).clamp(0.0, 1.0);
        let contrast_score = input.contrast.clamp(0.0, 1.0);

        let avg_delta_e = input.patch_scores.avg_delta_e;
        let max_delta_e = input.patch_scores.max_delta_e;
        let avg_color_sub = (1.0 - avg_delta_e / cfg.pass_avg_delta_e).clamp(0.0, 1.0);
        let max_color_sub = (1.0 - max_delta_e / cfg.pass_max_delta_e).clamp(0.0, 1.0);
        let color_score = (0.7 * avg_color_sub + 0.3 * max_color_sub).clamp(0.0, 1.0);

        let boosted_area = (area_score * cfg.area_boost_factor).clamp(0.0, 1.0);

        let confidence = (0.7 * boosted_area
            + 0.1 * aspect_score
            + 0.05 * contrast_score
            + 0.05 * blur_score
            + 0.1 * color_score) as f32;

        let failure = if blur_score < cfg.blur_failure_threshold {
            Failure::Blur
        } else if area_score < cfg.partial_failure_threshold {
            Failure::Partial
        } else if contrast_score < cfg.lighting_failure_threshold {
            Failure::Lighting
        } else if avg_delta_e > cfg.not_found_delta_e_guard {
            Failure::NotFound
        } else {
            Failure::None
        };

        let needs_input = failure == Failure::NotFound;

        tracing::debug!(
            confidence,
            ?failure,
            area_score,
            aspect_score,
            contrast_score,
            blur_score,
            color_score,
            "scored detection"
        );

        let primary_quad = input.ordered_primary.to_vec();
        let secondary_quad = input.ordered_secondary.map(|q| q.to_vec()).unwrap_or_default();

        DetectionOutput {
            confidence,
            failure,
            needs_input,
            metrics: Some(Metrics {
                area_score,
                aspect_score,
                contrast_score,
                blur_score,
                color_score,
                avg_delta_e: Some(avg_delta_e),
                max_delta_e: Some(max_delta_e),
                primary_quad,
                secondary_quad,
                secondary_valid: input.secondary_valid,
                frame_width: input.frame_width as i32,
                frame_height: input.frame_height as i32,
                rotation_degrees: input.rotation_degrees,
            }),
        }
    }
}
