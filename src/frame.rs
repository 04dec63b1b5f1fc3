use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single decoded camera frame, row-major RGBA8.
///
/// The alpha channel is ignored by every downstream stage; it is kept in
/// the wire format only because that is what camera pipelines hand over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// One of 0, 90, 180, 270. Informational only — no core algorithm reads it.
    pub rotation_degrees: i32,
    /// Row-major R,G,B,A octets; length MUST be >= width*height*4.
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, rotation_degrees: i32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rotation_degrees,
            pixels,
        }
    }

    /// Validate dimensions and buffer length.
    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        if self.width == 0 || self.height == 0 {
            return Err(CoreError::InvalidFrame("non-positive dimensions"));
        }
        let required = self.width as usize * self.height as usize * 4;
        if self.pixels.len() < required {
            return Err(CoreError::InvalidFrame("pixel buffer smaller than width*height*4"));
        }
        Ok(())
    }

    /// Drop the alpha channel, producing the pipeline's working image.
    ///
    /// Kept as an `RgbImage` in the `image` crate's native R,G,B channel
    /// order — nothing downstream depends on byte order, only on
    /// self-consistency between this method and its callers.
    pub(crate) fn to_bgr(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width, self.height);
        let src = &self.pixels;
        for y in 0..self.height {
            let row_base = y as usize * self.width as usize * 4;
            for x in 0..self.width {
                let i = row_base + x as usize * 4;
                out.put_pixel(x, y, image::Rgb([src[i], src[i + 1], src[i + 2]]));
            }
        }
        out
    }
}
