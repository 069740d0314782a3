use std::io::Cursor;

use image::{ImageError, ImageFormat, ImageReader, Limits};

use crate::bgremove::encoder::{encode_raster, OutputContainer, RasterEncoder};
use crate::error::{DecodeError, EncodeError};
use crate::utils::rgba_buffer_len;
use crate::RasterImage;

/// An uploaded file: raw bytes plus the MIME type the browser declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    bytes: Vec<u8>,
    mime_type: String,
}

impl SourceFile {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Whether the declared MIME type is an `image/*` type
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }
}

/// Upper bounds on what the decoder will accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_width: u32,
    pub max_height: u32,
    /// Ceiling on the decoded RGBA buffer, in bytes
    pub max_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 16_384,
            max_height: 16_384,
            max_bytes: 512 * 1024 * 1024,
        }
    }
}

impl DecodeLimits {
    fn check(&self, width: u32, height: u32) -> Result<(), DecodeError> {
        let within_bytes = rgba_buffer_len(width, height)
            .is_some_and(|len| (len as u64) <= self.max_bytes);

        if width > self.max_width || height > self.max_height || !within_bytes {
            return Err(DecodeError::LimitsExceeded { width, height });
        }
        Ok(())
    }

    fn to_image_limits(self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_bytes);
        limits
    }
}

/// Turns uploaded bytes into raster images
pub trait RasterDecoder {
    /// Decodes `file` into an RGBA raster.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]; the caller reports them all the same way.
    fn decode(&self, file: &SourceFile) -> Result<RasterImage, DecodeError>;
}

/// Decodes `file` into an RGBA raster.
///
/// The format is sniffed from the leading bytes first and the declared MIME
/// type is only used when sniffing fails. Dimensions are checked against
/// `limits` before any pixel data is decoded.
///
/// # Errors
///
/// * `DecodeError::UnsupportedMimeType` - the MIME type is not `image/*`
/// * `DecodeError::UnknownFormat` - neither the bytes nor the MIME type name a supported format
/// * `DecodeError::LimitsExceeded` - the image is larger than `limits`
/// * `DecodeError::Malformed` - the payload is corrupt
pub fn decode_raster(file: &SourceFile, limits: &DecodeLimits) -> Result<RasterImage, DecodeError> {
    if !file.is_image() {
        return Err(DecodeError::UnsupportedMimeType(file.mime_type().to_owned()));
    }

    let (width, height) = reader_for(file)?
        .into_dimensions()
        .map_err(|e| map_image_error(e, 0, 0))?;
    limits.check(width, height)?;

    let mut reader = reader_for(file)?;
    reader.limits(limits.to_image_limits());
    let image = reader
        .decode()
        .map_err(|e| map_image_error(e, width, height))?
        .into_rgba8();

    log::debug!(
        "decoded {} upload into {}x{} RGBA raster",
        file.mime_type(),
        image.width(),
        image.height()
    );
    Ok(image)
}

fn reader_for(file: &SourceFile) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    let mut reader = ImageReader::new(Cursor::new(file.bytes()))
        .with_guessed_format()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if reader.format().is_none() {
        let format =
            ImageFormat::from_mime_type(file.mime_type()).ok_or(DecodeError::UnknownFormat)?;
        reader.set_format(format);
    }
    Ok(reader)
}

fn map_image_error(error: ImageError, width: u32, height: u32) -> DecodeError {
    match error {
        ImageError::Unsupported(_) => DecodeError::UnknownFormat,
        ImageError::Limits(_) => DecodeError::LimitsExceeded { width, height },
        other => DecodeError::Malformed(other.to_string()),
    }
}

/// Decoder and encoder backed by the `image` crate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCodec {
    limits: DecodeLimits,
}

impl ImageCodec {
    #[must_use]
    pub const fn with_limits(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub const fn limits(&self) -> &DecodeLimits {
        &self.limits
    }
}

impl RasterDecoder for ImageCodec {
    fn decode(&self, file: &SourceFile) -> Result<RasterImage, DecodeError> {
        decode_raster(file, &self.limits)
    }
}

impl RasterEncoder for ImageCodec {
    fn encode(
        &self,
        image: &RasterImage,
        container: OutputContainer,
    ) -> Result<Vec<u8>, EncodeError> {
        encode_raster(image, container)
    }
}
