//! Resampling upscaler.
//!
//! Stand-in for the 2x super-resolution model. Like that model it returns
//! RGB pixels, so its results go through RGB to RGBA normalization.

use serde::{Deserialize, Serialize};

use super::{ProcessingError, ProcessingPipeline};
use crate::input::{decode_image, ImageInput};
use crate::pixel::PixelResult;

/// Largest output the upscaler will allocate, in pixels.
const MAX_OUTPUT_PIXELS: u64 = 64_000_000;

/// Filter type for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Nearest neighbor interpolation (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, soft).
    Bilinear,
    /// Lanczos3 interpolation (slower, sharpest).
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            ResampleFilter::Nearest => image::imageops::FilterType::Nearest,
            ResampleFilter::Bilinear => image::imageops::FilterType::Triangle,
            ResampleFilter::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Upscales by an integer factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleUpscaler {
    pub factor: u32,
    pub filter: ResampleFilter,
}

impl Default for ResampleUpscaler {
    fn default() -> Self {
        Self {
            factor: 2,
            filter: ResampleFilter::Lanczos3,
        }
    }
}

impl ResampleUpscaler {
    pub fn new(factor: u32, filter: ResampleFilter) -> Self {
        Self { factor, filter }
    }

    /// Output dimensions for a source size.
    ///
    /// # Errors
    /// Fails if the factor is zero or the output would exceed the pixel limit.
    pub fn output_dimensions(&self, width: u32, height: u32) -> Result<(u32, u32), ProcessingError> {
        if self.factor == 0 {
            return Err(ProcessingError::new("Upscale factor must be at least 1"));
        }

        let out_w = width as u64 * self.factor as u64;
        let out_h = height as u64 * self.factor as u64;
        if out_w * out_h > MAX_OUTPUT_PIXELS || out_w > u32::MAX as u64 || out_h > u32::MAX as u64 {
            return Err(ProcessingError::new(format!(
                "Upscaled image would be {}x{}, above the {} pixel limit",
                out_w, out_h, MAX_OUTPUT_PIXELS
            )));
        }
        Ok((out_w as u32, out_h as u32))
    }
}

impl ProcessingPipeline for ResampleUpscaler {
    fn transform(&mut self, input: &ImageInput) -> Result<PixelResult, ProcessingError> {
        let decoded = decode_image(input)?;
        let (width, height) = self.output_dimensions(decoded.width, decoded.height)?;
        if self.factor == 1 {
            return Ok(PixelResult::rgb(width, height, decoded.to_rgb()));
        }

        let rgb = decoded
            .to_dynamic()
            .ok_or_else(|| ProcessingError::new("Decoded buffer does not match its dimensions"))?
            .resize_exact(width, height, self.filter.to_image_filter())
            .into_rgb8();

        Ok(PixelResult::rgb(width, height, rgb.into_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_png;
    use crate::input::data_url;
    use crate::pixel::PixelFormat;

    fn png_input(width: u32, height: u32) -> ImageInput {
        let pixels = vec![200u8; (width * height * 4) as usize];
        let url = data_url::encode("image/png", &encode_png(&pixels, width, height).unwrap());
        ImageInput::from_data_url(url)
    }

    #[test]
    fn test_filter_conversion() {
        assert!(matches!(
            ResampleFilter::Bilinear.to_image_filter(),
            image::imageops::FilterType::Triangle
        ));
        assert!(matches!(
            ResampleFilter::Lanczos3.to_image_filter(),
            image::imageops::FilterType::Lanczos3
        ));
    }

    #[test]
    fn test_upscale_doubles_dimensions() {
        let mut upscaler = ResampleUpscaler::default();
        let result = upscaler.transform(&png_input(10, 5)).unwrap();

        assert_eq!((result.width, result.height), (20, 10));
        assert_eq!(result.format, PixelFormat::Rgb);
        assert_eq!(result.data.len(), 20 * 10 * 3);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_upscale_factor_one_keeps_size() {
        let mut upscaler = ResampleUpscaler::new(1, ResampleFilter::Nearest);
        let result = upscaler.transform(&png_input(7, 3)).unwrap();
        assert_eq!((result.width, result.height), (7, 3));
        assert!(result.data.iter().all(|&c| c == 200));
    }

    #[test]
    fn test_zero_factor_rejected() {
        let upscaler = ResampleUpscaler::new(0, ResampleFilter::Nearest);
        assert!(upscaler.output_dimensions(10, 10).is_err());
    }

    #[test]
    fn test_output_limit() {
        let upscaler = ResampleUpscaler::new(4, ResampleFilter::Nearest);
        let err = upscaler.output_dimensions(4000, 4000).unwrap_err();
        assert!(err.reason.contains("pixel limit"));
    }

    #[test]
    fn test_undecodable_input() {
        let mut upscaler = ResampleUpscaler::default();
        let err = upscaler
            .transform(&ImageInput::from_file("image/png", vec![0, 1, 2]))
            .unwrap_err();
        assert!(err.reason.starts_with("Failed to decode image"));
    }
}
