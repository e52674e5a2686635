//! Border-keyed background matte.
//!
//! Stand-in for the background removal model. The background color is
//! estimated as the mean of the outermost pixel ring; each pixel's alpha then
//! follows its color distance from that background:
//!
//! ```text
//! d     = |rgb - background| / |white - black|      (0.0 to 1.0)
//! alpha = smootherstep((d - tolerance) / feather)
//! ```
//!
//! Like the model it returns RGBA pixels, which need no normalization.

use super::{ProcessingError, ProcessingPipeline};
use crate::input::{decode_image, DecodedImage, ImageInput};
use crate::pixel::{check_buffer, PixelFormat, PixelResult};

/// Smootherstep interpolation function.
///
/// Returns values from 0.0 to 1.0 with zero velocity and acceleration at
/// boundaries, which keeps matte edges free of visible banding.
///
/// Formula: `6t^5 - 15t^4 + 10t^3`
#[inline]
pub fn smootherstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Removes pixels close to the border color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderKeyMatte {
    /// Normalized distance below which a pixel is fully background (0.0 to 1.0).
    pub tolerance: f32,
    /// Width of the soft edge above `tolerance`; 0 gives a hard cut.
    pub feather: f32,
}

impl Default for BorderKeyMatte {
    fn default() -> Self {
        Self {
            tolerance: 0.12,
            feather: 0.08,
        }
    }
}

impl BorderKeyMatte {
    pub fn new(tolerance: f32, feather: f32) -> Self {
        Self {
            tolerance: tolerance.clamp(0.0, 1.0),
            feather: feather.max(0.0),
        }
    }

    /// Alpha multiplier (0.0 to 1.0) for a normalized color distance.
    pub fn coverage(&self, distance: f32) -> f32 {
        if self.feather <= f32::EPSILON {
            return if distance > self.tolerance { 1.0 } else { 0.0 };
        }
        smootherstep((distance - self.tolerance) / self.feather)
    }

    /// Apply the matte to RGBA pixels in place.
    ///
    /// # Errors
    /// Fails if the dimensions are zero or `pixels` is not `width * height * 4` bytes.
    pub fn apply(&self, pixels: &mut [u8], width: u32, height: u32) -> Result<(), ProcessingError> {
        check_buffer(PixelFormat::Rgba, width, height, pixels.len())
            .map_err(|e| ProcessingError::new(e.to_string()))?;

        let background = border_mean(pixels, width, height);
        let max_distance = (3.0f32 * 255.0 * 255.0).sqrt();

        for px in pixels.chunks_exact_mut(4) {
            let dr = px[0] as f32 - background[0];
            let dg = px[1] as f32 - background[1];
            let db = px[2] as f32 - background[2];
            let distance = (dr * dr + dg * dg + db * db).sqrt() / max_distance;

            let alpha = px[3] as f32 * self.coverage(distance);
            px[3] = alpha.round().clamp(0.0, 255.0) as u8;
        }
        Ok(())
    }
}

impl ProcessingPipeline for BorderKeyMatte {
    fn transform(&mut self, input: &ImageInput) -> Result<PixelResult, ProcessingError> {
        let DecodedImage {
            width,
            height,
            mut pixels,
        } = decode_image(input)?;

        self.apply(&mut pixels, width, height)?;
        Ok(PixelResult::rgba(width, height, pixels))
    }
}

/// Mean RGB of the outermost ring of pixels.
fn border_mean(pixels: &[u8], width: u32, height: u32) -> [f32; 3] {
    let (w, h) = (width as usize, height as usize);
    let mut sum = [0f64; 3];
    let mut count = 0u64;

    for y in 0..h {
        for x in 0..w {
            if y != 0 && y != h - 1 && x != 0 && x != w - 1 {
                continue;
            }
            let i = (y * w + x) * 4;
            for c in 0..3 {
                sum[c] += pixels[i + c] as f64;
            }
            count += 1;
        }
    }

    if count == 0 {
        return [0.0; 3];
    }
    [
        (sum[0] / count as f64) as f32,
        (sum[1] / count as f64) as f32,
        (sum[2] / count as f64) as f32,
    ]
}
