//! Internal utility functions for imageops-bgremove.
//!
//! This module contains the buffer checks and pixel helpers shared by the
//! pipeline stages.

use crate::error::ProcessingError;
use crate::RasterImage;

/// Number of bytes per RGBA pixel
pub const RGBA_CHANNELS: usize = 4;

/// Computes `width * height * 4`, or `None` if it overflows `usize`.
#[inline]
pub fn rgba_buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(RGBA_CHANNELS)
}

/// Validates that an image has non-zero dimensions.
///
/// # Arguments
///
/// * `width` - The width of the image
/// * `height` - The height of the image
///
/// # Returns
///
/// `Ok(())` if the dimensions are valid, otherwise an error
pub fn validate_non_empty_image(width: u32, height: u32) -> Result<(), ProcessingError> {
    if width == 0 || height == 0 {
        Err(ProcessingError::EmptyImage)
    } else {
        Ok(())
    }
}

/// Validates that the backing buffer of an RGBA image holds exactly
/// `width * height * 4` bytes.
///
/// `ImageBuffer::from_raw` accepts buffers that are longer than required,
/// so the exact length has to be checked separately.
pub fn validate_rgba_buffer(image: &RasterImage) -> Result<(), ProcessingError> {
    let (width, height) = image.dimensions();
    let actual = image.as_raw().len();
    let expected = rgba_buffer_len(width, height).ok_or(ProcessingError::BufferSizeMismatch {
        expected: usize::MAX,
        actual,
    })?;

    if actual == expected {
        Ok(())
    } else {
        Err(ProcessingError::BufferSizeMismatch { expected, actual })
    }
}

/// Average of the three colour channels, used as a brightness proxy.
#[inline]
pub fn luminance(red: u8, green: u8, blue: u8) -> f64 {
    (f64::from(red) + f64::from(green) + f64::from(blue)) / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_rgba_buffer_len() {
        assert_eq!(rgba_buffer_len(4, 4), Some(64));
        assert_eq!(rgba_buffer_len(0, 10), Some(0));
        assert_eq!(rgba_buffer_len(1, 1), Some(4));
    }

    #[test]
    fn test_validate_non_empty_image() {
        assert!(validate_non_empty_image(100, 100).is_ok());
        assert!(validate_non_empty_image(1, 1).is_ok());
        assert_eq!(
            validate_non_empty_image(0, 100),
            Err(ProcessingError::EmptyImage)
        );
        assert!(validate_non_empty_image(100, 0).is_err());
        assert!(validate_non_empty_image(0, 0).is_err());
    }

    #[test]
    fn test_validate_rgba_buffer() {
        let image: RasterImage = ImageBuffer::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        assert!(validate_rgba_buffer(&image).is_ok());

        // from_raw accepts an oversized buffer
        let oversized: RasterImage = ImageBuffer::from_raw(2, 2, vec![0u8; 20]).unwrap();
        assert_eq!(
            validate_rgba_buffer(&oversized),
            Err(ProcessingError::BufferSizeMismatch {
                expected: 16,
                actual: 20
            })
        );
    }

    #[test]
    fn test_luminance() {
        assert_eq!(luminance(0, 0, 0), 0.0);
        assert_eq!(luminance(255, 255, 255), 255.0);
        assert_eq!(luminance(30, 60, 90), 60.0);
    }
}
