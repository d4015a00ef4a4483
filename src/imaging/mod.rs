//! Output-side image handling.
//!
//! Captured stills arrive as encoded buffers. This module turns them into
//! pixels, applies the configured rotation and writes the result in the
//! configured format.

mod codec;

pub use codec::{decode, encode, rotate, save, ImagingError, JPEG_QUALITY};
