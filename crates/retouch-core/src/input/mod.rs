//! Image inputs supplied by the user.
//!
//! The two tools accept their image in different encodings:
//! - background removal takes the raw file bytes
//! - upscaling takes a `data:` URL string
//!
//! [`ImageInput`] carries either encoding, and [`decode_image`] turns both
//! into pixels for pipelines that decode in-process.

pub mod data_url;
mod decode;
mod types;

pub use decode::{decode_image, DecodedImage};
pub use types::{is_image_mime, ImageInput, InputEncoding, InputError};
