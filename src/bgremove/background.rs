//! Corner-sampled background classification.
//!
//! A pixel is treated as background when its colour is close to the average
//! of the image corners and it does not sit on a luminance edge. Background
//! pixels get an alpha proportional to their colour distance, so the cut is
//! a ramp rather than a hard threshold:
//!
//! ```text
//! threshold = 80 * (1 - foreground_strength)
//! alpha     = floor(255 * distance / threshold)   if distance < threshold and not an edge
//! ```
//!
//! Pixels that fail either test keep their alpha.

use image::{Luma, Rgba};
use imageproc::map::map_colors;
use itertools::iproduct;

use crate::bgremove::params::{ClassificationParameters, CornerSampling, EdgeDetection};
use crate::error::ProcessingError;
use crate::utils::{luminance, validate_non_empty_image, validate_rgba_buffer, RGBA_CHANNELS};
use crate::{Image, RasterImage};

/// Luminance step (0-255 units) above which a pixel counts as an edge
pub const EDGE_THRESHOLD: f64 = 30.0;

/// Reference background colour averaged from the image corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundSample {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl BackgroundSample {
    /// Averages the corner pixels selected by `sampling`, per channel.
    ///
    /// # Errors
    ///
    /// * `ProcessingError::EmptyImage` - the image has no corners to sample
    pub fn from_corners(
        image: &RasterImage,
        sampling: CornerSampling,
    ) -> Result<Self, ProcessingError> {
        let (width, height) = image.dimensions();
        validate_non_empty_image(width, height)?;

        let (right, bottom) = (width - 1, height - 1);
        let corners = [(0, 0), (right, 0), (0, bottom), (right, bottom)];
        let count = match sampling {
            CornerSampling::ThreeCorners => 3,
            CornerSampling::FourCorners => 4,
        };

        let (red, green, blue) = corners[..count].iter().fold(
            (0.0, 0.0, 0.0),
            |(red, green, blue), &(x, y)| {
                let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
                (
                    red + f64::from(r),
                    green + f64::from(g),
                    blue + f64::from(b),
                )
            },
        );

        let count = count as f64;
        Ok(Self {
            red: red / count,
            green: green / count,
            blue: blue / count,
        })
    }

    /// Euclidean RGB distance between a colour and this sample.
    #[inline]
    #[must_use]
    pub fn distance(&self, red: u8, green: u8, blue: u8) -> f64 {
        let dr = f64::from(red) - self.red;
        let dg = f64::from(green) - self.green;
        let db = f64::from(blue) - self.blue;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Per-pixel edge mask, one byte per pixel, `1` marking an edge
///
/// The one-pixel border is never marked, so images narrower or shorter
/// than three pixels have no edges at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl EdgeMap {
    /// Marks interior pixels whose luminance differs from the pixel above
    /// (and, for [`EdgeDetection::VerticalAndHorizontal`], the pixel to the
    /// left) by more than [`EDGE_THRESHOLD`].
    #[must_use]
    pub fn from_image(image: &RasterImage, detection: EdgeDetection) -> Self {
        let (width, height) = image.dimensions();
        let luma: Image<Luma<f64>> =
            map_colors(image, |Rgba([r, g, b, _])| Luma([luminance(r, g, b)]));

        let mut data = vec![0u8; width as usize * height as usize];
        let exceeds = |a: f64, b: f64| (a - b).abs() > EDGE_THRESHOLD;

        for (y, x) in iproduct!(1..height.saturating_sub(1), 1..width.saturating_sub(1)) {
            let Luma([center]) = *luma.get_pixel(x, y);
            let Luma([above]) = *luma.get_pixel(x, y - 1);

            let is_edge = exceeds(center, above)
                || (detection == EdgeDetection::VerticalAndHorizontal
                    && exceeds(center, luma.get_pixel(x - 1, y)[0]));

            data[(y * width + x) as usize] = u8::from(is_edge);
        }

        Self {
            width,
            height,
            data,
        }
    }

    #[must_use]
    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[(y * self.width + x) as usize] != 0
    }

    /// Edge flags of row `y`
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = (y * self.width) as usize;
        &self.data[start..start + self.width as usize]
    }

    /// Number of pixels marked as edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.data.iter().filter(|&&flag| flag != 0).count()
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait providing in-place background classification on RGBA images
pub trait ClassifyBackground {
    /// Lowers the alpha of pixels that look like background.
    ///
    /// Deterministic: the same buffer and parameters always produce the same
    /// result. The whole buffer is processed on every call.
    ///
    /// # Errors
    ///
    /// * `ProcessingError::BufferSizeMismatch` - the buffer is not `width * height * 4` bytes
    /// * `ProcessingError::EmptyImage` - the image has a zero dimension
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imageops_bgremove::{ClassificationParameters, ClassifyBackground, RasterImage};
    /// use image::{ImageBuffer, Rgba};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut image: RasterImage = ImageBuffer::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
    /// image.classify_background(&ClassificationParameters::default())?;
    /// assert_eq!(image.get_pixel(4, 4)[3], 0);
    /// # Ok(())
    /// # }
    /// ```
    fn classify_background(
        &mut self,
        params: &ClassificationParameters,
    ) -> Result<&mut Self, ProcessingError>;
}

impl ClassifyBackground for RasterImage {
    fn classify_background(
        &mut self,
        params: &ClassificationParameters,
    ) -> Result<&mut Self, ProcessingError> {
        validate_rgba_buffer(self)?;
        let (width, height) = self.dimensions();
        validate_non_empty_image(width, height)?;

        let sample = BackgroundSample::from_corners(self, params.corner_sampling)?;
        let edges = EdgeMap::from_image(self, params.edge_detection);
        let threshold = params.background_threshold();

        // No distance is below zero.
        if threshold <= 0.0 {
            log::debug!("background threshold is zero; alpha left unchanged");
            return Ok(self);
        }

        let row_len = width as usize * RGBA_CHANNELS;
        let pixels: &mut [u8] = &mut **self;

        #[cfg(feature = "rayon")]
        let background = {
            use rayon::prelude::*;
            pixels
                .par_chunks_exact_mut(row_len)
                .enumerate()
                .map(|(y, row)| classify_row(row, edges.row(y as u32), &sample, threshold))
                .sum::<usize>()
        };

        #[cfg(not(feature = "rayon"))]
        let background = pixels
            .chunks_exact_mut(row_len)
            .enumerate()
            .map(|(y, row)| classify_row(row, edges.row(y as u32), &sample, threshold))
            .sum::<usize>();

        log::debug!(
            "classified {background} of {} pixels as background ({} edges, threshold {threshold:.1})",
            u64::from(width) * u64::from(height),
            edges.edge_count(),
        );
        Ok(self)
    }
}

/// Classifies one row of RGBA pixels, returning how many became background.
#[inline]
fn classify_row(row: &mut [u8], edges: &[u8], sample: &BackgroundSample, threshold: f64) -> usize {
    let mut background = 0;
    for (pixel, &edge) in row.chunks_exact_mut(RGBA_CHANNELS).zip(edges) {
        if edge != 0 {
            continue;
        }

        let distance = sample.distance(pixel[0], pixel[1], pixel[2]);
        if distance < threshold {
            pixel[3] = (255.0 * (distance / threshold)).floor() as u8;
            background += 1;
        }
    }
    background
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgremove::encoder::OutputContainer;
    use crate::test_utils::{create_test_cutout, rgba_image_from_fn};
    use image::ImageBuffer;

    fn params_with_strength(foreground_strength: f64) -> ClassificationParameters {
        ClassificationParameters {
            foreground_strength,
            ..ClassificationParameters::default()
        }
    }

    #[test]
    fn test_background_sample_three_corners() {
        let image = rgba_image_from_fn(3, 3, |x, y| match (x, y) {
            (0, 0) => Rgba([30, 0, 0, 255]),
            (2, 0) => Rgba([0, 60, 0, 255]),
            (0, 2) => Rgba([0, 0, 90, 255]),
            _ => Rgba([255, 255, 255, 255]),
        });

        let sample = BackgroundSample::from_corners(&image, CornerSampling::ThreeCorners).unwrap();
        assert_eq!(
            sample,
            BackgroundSample {
                red: 10.0,
                green: 20.0,
                blue: 30.0
            }
        );
    }

    #[test]
    fn test_background_sample_four_corners_includes_bottom_right() {
        let image = rgba_image_from_fn(2, 2, |x, y| {
            if (x, y) == (1, 1) {
                Rgba([200, 200, 200, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });

        let three = BackgroundSample::from_corners(&image, CornerSampling::ThreeCorners).unwrap();
        let four = BackgroundSample::from_corners(&image, CornerSampling::FourCorners).unwrap();
        assert_eq!(three.red, 0.0);
        assert_eq!(four.red, 50.0);
    }

    #[test]
    fn test_background_sample_empty_image() {
        let image: RasterImage = ImageBuffer::new(0, 0);
        assert_eq!(
            BackgroundSample::from_corners(&image, CornerSampling::ThreeCorners),
            Err(ProcessingError::EmptyImage)
        );
    }

    #[test]
    fn test_distance() {
        let sample = BackgroundSample {
            red: 0.0,
            green: 0.0,
            blue: 0.0,
        };
        assert_eq!(sample.distance(0, 0, 0), 0.0);
        assert_eq!(sample.distance(3, 4, 0), 5.0);
    }

    #[test]
    fn test_edge_map_vertical_only() {
        let image = create_test_cutout();
        let edges = EdgeMap::from_image(&image, EdgeDetection::Vertical);

        // Top row of the dark block differs from the white row above it
        assert!(edges.is_edge(1, 1));
        assert!(edges.is_edge(2, 1));
        // Second row of the block matches the row above
        assert!(!edges.is_edge(1, 2));
        assert!(!edges.is_edge(2, 2));
        // Border never marked
        assert!(!edges.is_edge(0, 0));
        assert!(!edges.is_edge(3, 3));
        assert_eq!(edges.edge_count(), 2);
    }

    #[test]
    fn test_edge_map_vertical_and_horizontal() {
        let image = create_test_cutout();
        let edges = EdgeMap::from_image(&image, EdgeDetection::VerticalAndHorizontal);

        // (1, 2) is dark with a white pixel to its left
        assert!(edges.is_edge(1, 2));
        // (2, 2) is dark with a dark pixel above and to the left
        assert!(!edges.is_edge(2, 2));
        assert_eq!(edges.edge_count(), 3);
    }

    #[test]
    fn test_edge_map_threshold_is_strict() {
        // Luminance step of exactly 30 is not an edge; 31 is
        let image = rgba_image_from_fn(3, 3, |_, y| match y {
            0 => Rgba([100, 100, 100, 255]),
            1 => Rgba([130, 130, 130, 255]),
            _ => Rgba([161, 161, 161, 255]),
        });
        let edges = EdgeMap::from_image(&image, EdgeDetection::Vertical);
        assert!(!edges.is_edge(1, 1));

        let image = rgba_image_from_fn(3, 3, |_, y| match y {
            0 => Rgba([100, 100, 100, 255]),
            _ => Rgba([131, 131, 131, 255]),
        });
        let edges = EdgeMap::from_image(&image, EdgeDetection::Vertical);
        assert!(edges.is_edge(1, 1));
    }

    #[test]
    fn test_edge_map_degenerate_sizes() {
        for (width, height) in [(1, 1), (2, 5), (5, 2)] {
            let image = rgba_image_from_fn(width, height, |x, y| {
                Rgba([(x * 100) as u8, (y * 100) as u8, 0, 255])
            });
            let edges = EdgeMap::from_image(&image, EdgeDetection::VerticalAndHorizontal);
            assert_eq!(edges.dimensions(), (width, height));
            assert_eq!(edges.edge_count(), 0);
        }
    }

    #[test]
    fn test_classify_white_background_black_block() {
        let mut image = create_test_cutout();
        image.classify_background(&params_with_strength(0.5)).unwrap();

        for (x, y, pixel) in image.enumerate_pixels() {
            let inside = (1..=2).contains(&x) && (1..=2).contains(&y);
            if inside {
                assert_eq!(pixel[3], 255, "block pixel ({x}, {y})");
            } else {
                assert_eq!(pixel[3], 0, "background pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_classify_alpha_ramp() {
        // Background black, one pixel at distance 20 with threshold 40
        let mut image = rgba_image_from_fn(3, 3, |x, y| {
            if (x, y) == (2, 2) {
                Rgba([20, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        image.classify_background(&params_with_strength(0.5)).unwrap();

        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(image.get_pixel(2, 2)[3], 127);
    }

    #[test]
    fn test_classify_full_strength_is_noop() {
        let mut image = create_test_cutout();
        let original = image.clone();
        image.classify_background(&params_with_strength(1.0)).unwrap();
        assert_eq!(image, original);
    }

    #[test]
    fn test_classify_keeps_colour_channels() {
        let mut image = create_test_cutout();
        let original = image.clone();
        image.classify_background(&params_with_strength(0.0)).unwrap();

        for (before, after) in original.pixels().zip(image.pixels()) {
            assert_eq!(before.0[..3], after.0[..3]);
        }
    }

    #[test]
    fn test_classify_single_pixel() {
        let mut image: RasterImage = ImageBuffer::from_pixel(1, 1, Rgba([12, 34, 56, 255]));
        image.classify_background(&params_with_strength(0.0)).unwrap();
        // The only pixel is its own background
        assert_eq!(image.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_classify_rejects_oversized_buffer() {
        let mut image: RasterImage = ImageBuffer::from_raw(2, 2, vec![255u8; 17]).unwrap();
        assert_eq!(
            image
                .classify_background(&ClassificationParameters::default())
                .map(|_| ()),
            Err(ProcessingError::BufferSizeMismatch {
                expected: 16,
                actual: 17
            })
        );
    }

    #[test]
    fn test_classify_empty_image() {
        let mut image: RasterImage = ImageBuffer::new(0, 4);
        assert!(matches!(
            image.classify_background(&ClassificationParameters::default()),
            Err(ProcessingError::EmptyImage)
        ));
    }

    #[test]
    fn test_classify_slider_threshold_is_exact() {
        // 80 * (1 - 0.9) is just under 8, so a distance of exactly 8 stays opaque
        let params = ClassificationParameters::from_controls(0, 0.9, OutputContainer::Png);
        assert!(params.background_threshold() < 8.0);

        let mut image = rgba_image_from_fn(3, 3, |x, y| match (x, y) {
            (2, 2) => Rgba([8, 0, 0, 255]),
            (2, 1) => Rgba([7, 0, 0, 255]),
            _ => Rgba([0, 0, 0, 255]),
        });
        image.classify_background(&params).unwrap();

        assert_eq!(image.get_pixel(2, 2)[3], 255);
        // floor(255 * 7 / 7.999999999999998)
        assert_eq!(image.get_pixel(2, 1)[3], 223);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_rows_match_sequential_pass() {
        let image = rgba_image_from_fn(37, 23, |x, y| {
            let v = ((x * 11 + y * 7) % 96) as u8;
            if (10..25).contains(&x) && (6..18).contains(&y) {
                Rgba([200, v, 40, 255])
            } else {
                Rgba([v, v, v, 255])
            }
        });

        for params in [
            params_with_strength(0.0),
            params_with_strength(0.5),
            ClassificationParameters {
                corner_sampling: CornerSampling::FourCorners,
                edge_detection: EdgeDetection::VerticalAndHorizontal,
                ..params_with_strength(0.3)
            },
        ] {
            let mut expected = image.clone();
            let sample = BackgroundSample::from_corners(&expected, params.corner_sampling).unwrap();
            let edges = EdgeMap::from_image(&expected, params.edge_detection);
            let threshold = params.background_threshold();
            let row_len = expected.width() as usize * RGBA_CHANNELS;
            for (y, row) in expected.chunks_exact_mut(row_len).enumerate() {
                classify_row(row, edges.row(y as u32), &sample, threshold);
            }

            let mut parallel = image.clone();
            parallel.classify_background(&params).unwrap();
            assert_eq!(parallel, expected);
        }

        let mut cutout = create_test_cutout();
        let mut sequential = cutout.clone();
        let params = params_with_strength(0.5);
        let sample = BackgroundSample::from_corners(&sequential, params.corner_sampling).unwrap();
        let edges = EdgeMap::from_image(&sequential, params.edge_detection);
        for (y, row) in sequential.chunks_exact_mut(4 * RGBA_CHANNELS).enumerate() {
            classify_row(row, edges.row(y as u32), &sample, params.background_threshold());
        }
        cutout.classify_background(&params).unwrap();
        assert_eq!(cutout, sequential);
    }
}
