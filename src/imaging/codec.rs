//! Decode, rotate and persist captured images.

use image::{DynamicImage, ImageOutputFormat};
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{CameraRotation, ImageFormat};

/// JPEG quality used for persisted captures.
pub const JPEG_QUALITY: u8 = 100;

/// Errors from image decoding, encoding or writing.
#[derive(Debug, Error)]
pub enum ImagingError {
    /// Buffer is not a decodable image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    /// Pixels could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    /// Writing the file failed.
    #[error("failed to write {path:?}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Decodes an encoded buffer (JPEG, PNG, ...) into pixels.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    image::load_from_memory(bytes).map_err(ImagingError::Decode)
}

/// Rotates clockwise. The identity rotation returns the input untouched.
pub fn rotate(image: DynamicImage, rotation: CameraRotation) -> DynamicImage {
    match rotation {
        CameraRotation::Rotation0 => image,
        CameraRotation::Rotation90 => image.rotate90(),
        CameraRotation::Rotation180 => image.rotate180(),
        CameraRotation::Rotation270 => image.rotate270(),
    }
}

/// Encodes an image into an in-memory buffer.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ImagingError> {
    let mut buffer = Vec::new();
    write_image(image, &mut Cursor::new(&mut buffer), format)?;
    Ok(buffer)
}

/// Writes an image to `path`, replacing any existing file.
///
/// A partially written file is removed on failure.
pub fn save(image: &DynamicImage, path: &Path, format: ImageFormat) -> Result<(), ImagingError> {
    let io_err = |source| ImagingError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    let result = write_image(image, &mut writer, format)
        .and_then(|()| writer.flush().map_err(io_err));

    if result.is_err() {
        drop(writer);
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_image<W: Write + Seek>(
    image: &DynamicImage,
    writer: &mut W,
    format: ImageFormat,
) -> Result<(), ImagingError> {
    match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(writer, ImageOutputFormat::Jpeg(JPEG_QUALITY)),
        ImageFormat::Png => image.write_to(writer, ImageOutputFormat::Png),
    }
    .map_err(ImagingError::Encode)
}
