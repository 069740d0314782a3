use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::{EncodeError, ProcessingError};
use crate::utils::validate_rgba_buffer;
use crate::RasterImage;

/// Output container for the processed image
///
/// Both containers carry a full alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContainer {
    #[default]
    #[serde(alias = "PNG")]
    Png,
    #[serde(alias = "WEBP", alias = "WebP")]
    WebP,
}

impl OutputContainer {
    /// File extension without the leading dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    #[must_use]
    pub const fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

/// Serialises raster images into an output container
///
/// Implementations must not keep references to the image; the pipeline
/// drops it once the bytes are returned.
pub trait RasterEncoder {
    /// Encodes `image` into `container`.
    ///
    /// # Errors
    ///
    /// * `EncodeError::EmptyImage` - the image has a zero dimension
    /// * `EncodeError::BufferSizeMismatch` - the buffer length does not match the dimensions
    /// * `EncodeError::Encoding` - the codec rejected the buffer
    fn encode(&self, image: &RasterImage, container: OutputContainer)
        -> Result<Vec<u8>, EncodeError>;
}

/// Encodes `image` into `container` using the `image` crate's codecs.
///
/// PNG output is deterministic: the same buffer always produces the same
/// bytes. WebP output goes through the pure-Rust lossless encoder.
pub fn encode_raster(
    image: &RasterImage,
    container: OutputContainer,
) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyImage { width, height });
    }
    // The codecs assert on the buffer length instead of returning an error
    validate_rgba_buffer(image).map_err(|e| match e {
        ProcessingError::BufferSizeMismatch { expected, actual } => {
            EncodeError::BufferSizeMismatch { expected, actual }
        }
        other => EncodeError::Encoding(other.to_string()),
    })?;

    let mut buffer = Vec::new();
    let writer = Cursor::new(&mut buffer);
    let result = match container {
        OutputContainer::Png => PngEncoder::new(writer).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputContainer::WebP => WebPEncoder::new_lossless(writer).encode(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|e| EncodeError::Encoding(e.to_string()))?;

    log::debug!(
        "encoded {width}x{height} image as {} ({} bytes)",
        container.extension(),
        buffer.len()
    );
    Ok(buffer)
}
