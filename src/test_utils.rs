//! Test utilities for imageops-bgremove
//!
//! Shared fixtures for the unit tests. Only compiled when running tests.

#[cfg(test)]
use crate::RasterImage;
#[cfg(test)]
use image::codecs::png::PngEncoder;
#[cfg(test)]
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};

/// Creates a 4x4 cutout fixture: a white canvas with a black 2x2 block.
///
/// ```text
/// W W W W
/// W B B W
/// W B B W
/// W W W W
/// ```
///
/// Every pixel starts fully opaque.
#[cfg(test)]
pub fn create_test_cutout() -> RasterImage {
    rgba_image_from_fn(4, 4, |x, y| {
        if (1..=2).contains(&x) && (1..=2).contains(&y) {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

/// Builds an RGBA image from a per-pixel function.
#[cfg(test)]
pub fn rgba_image_from_fn<F>(width: u32, height: u32, f: F) -> RasterImage
where
    F: Fn(u32, u32) -> Rgba<u8>,
{
    ImageBuffer::from_fn(width, height, f)
}

/// Encodes an RGBA image as PNG, for feeding the decoder.
#[cfg(test)]
pub fn encode_png(image: &RasterImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .expect("PNG encoding of a test image should succeed");
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_cutout() {
        let image = create_test_cutout();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(1, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(3, 3), &Rgba([255, 255, 255, 255]));
        assert!(image.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_encode_png_signature() {
        let bytes = encode_png(&create_test_cutout());
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
