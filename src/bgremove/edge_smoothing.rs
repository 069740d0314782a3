use crate::bgremove::summed_area_table::CreateAlphaSummedAreaTable;
use crate::error::ProcessingError;
use crate::utils::validate_rgba_buffer;
use crate::RasterImage;

/// Trait providing alpha-only box smoothing along cutout boundaries
pub trait SmoothAlphaEdges {
    /// Replaces the alpha of every partially transparent pixel with the mean
    /// alpha of its `(2 * radius + 1)²` neighbourhood, clipped to the image.
    ///
    /// Fully transparent and fully opaque pixels are left alone. Means are
    /// taken from a snapshot of the alpha channel, so smoothed values never
    /// feed into their neighbours within the same call. A radius of `0` is a
    /// no-op.
    ///
    /// Uses a summed-area table, so the cost does not grow with the radius.
    ///
    /// # Errors
    ///
    /// * `ProcessingError::BufferSizeMismatch` - the buffer is not `width * height * 4` bytes
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imageops_bgremove::{RasterImage, SmoothAlphaEdges};
    /// use image::{ImageBuffer, Rgba};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut image: RasterImage = ImageBuffer::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
    /// image.put_pixel(1, 1, Rgba([0, 0, 0, 128]));
    ///
    /// image.smooth_alpha_edges(1)?;
    /// assert_eq!(image.get_pixel(1, 1)[3], 240);
    /// # Ok(())
    /// # }
    /// ```
    fn smooth_alpha_edges(&mut self, radius: u32) -> Result<&mut Self, ProcessingError>;
}

impl SmoothAlphaEdges for RasterImage {
    fn smooth_alpha_edges(&mut self, radius: u32) -> Result<&mut Self, ProcessingError> {
        validate_rgba_buffer(self)?;

        let (width, height) = self.dimensions();
        if radius == 0 || width == 0 || height == 0 {
            return Ok(self);
        }

        let sat = self.alpha_summed_area_table();
        let mut smoothed = 0usize;

        for (x, y, pixel) in self.enumerate_pixels_mut() {
            let alpha = pixel[3];
            if alpha == 0 || alpha == u8::MAX {
                continue;
            }

            let x1 = x.saturating_sub(radius);
            let y1 = y.saturating_sub(radius);
            let x2 = x.saturating_add(radius).min(width - 1);
            let y2 = y.saturating_add(radius).min(height - 1);

            let sum = sat.rectangle_sum(x1, y1, x2, y2);
            let count = u64::from(x2 - x1 + 1) * u64::from(y2 - y1 + 1);

            // Mean of u8 values always fits in u8
            pixel[3] = (sum / count) as u8;
            smoothed += 1;
        }

        log::debug!("smoothed alpha of {smoothed} boundary pixels with radius {radius}");
        Ok(self)
    }
}
