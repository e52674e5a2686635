//! Pixel buffers produced by processing pipelines.
//!
//! Pipelines hand back raw pixels in whatever layout their model emits:
//! - **RGBA** (background removal) is used as-is
//! - **RGB** (upscaling) is expanded to RGBA with a fully opaque alpha channel
//!
//! Everything downstream of a pipeline (artifact encoding, display) only
//! ever sees the uniform [`RgbaImage`] produced by [`normalize_to_rgba`].

mod normalize;
mod types;

pub use normalize::{expand_rgb_to_rgba, normalize_to_rgba, OPAQUE_ALPHA};
pub use types::{check_buffer, PixelError, PixelFormat, PixelResult, RgbaImage};
