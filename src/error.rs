use thiserror::Error;

/// Internal fault surface for the detection pipeline.
///
/// `detect` never surfaces this type to callers —
/// [`crate::ColorCheckerCore::detect`] catches every variant at the top
/// level and collapses it into a `NotFound` [`crate::DetectionOutput`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),

    #[error("degenerate quad: {0}")]
    DegenerateQuad(&'static str),

    #[error("processing failure: {0}")]
    Processing(String),
}
