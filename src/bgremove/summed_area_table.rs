use crate::utils::RGBA_CHANNELS;
use crate::RasterImage;

/// Summed-area table over one channel of an image
///
/// The table is padded with a leading zero row and column, so entry
/// `(x + 1, y + 1)` holds the sum of every value in the rectangle from the
/// origin to `(x, y)` inclusive. Sums are `u64` so that an alpha plane of any
/// decodable size cannot overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummedAreaTable {
    data: Vec<u64>,
    width: u32,
    height: u32,
}

/// Trait for building a summed-area table from an image's alpha channel
pub trait CreateAlphaSummedAreaTable {
    /// Builds a summed-area table of the alpha channel.
    ///
    /// The table is a snapshot: later edits to the image do not affect it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imageops_bgremove::{CreateAlphaSummedAreaTable, RasterImage};
    /// use image::{ImageBuffer, Rgba};
    ///
    /// let image: RasterImage = ImageBuffer::from_pixel(3, 3, Rgba([0, 0, 0, 10]));
    /// let sat = image.alpha_summed_area_table();
    /// assert_eq!(sat.rectangle_sum(0, 0, 2, 2), 90);
    /// ```
    fn alpha_summed_area_table(&self) -> SummedAreaTable;
}

impl CreateAlphaSummedAreaTable for RasterImage {
    fn alpha_summed_area_table(&self) -> SummedAreaTable {
        let (width, height) = self.dimensions();
        let alpha: Vec<u8> = self
            .chunks_exact(RGBA_CHANNELS)
            .take(width as usize * height as usize)
            .map(|pixel| pixel[3])
            .collect();
        SummedAreaTable::from_data(&alpha, width, height)
    }
}

impl SummedAreaTable {
    /// Builds a table from a single row-major channel.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` is not `width * height`.
    #[must_use]
    pub fn from_data(data: &[u8], width: u32, height: u32) -> Self {
        assert_eq!(data.len(), width as usize * height as usize);

        let stride = width as usize + 1;
        let mut table = vec![0u64; stride * (height as usize + 1)];

        for (y, row) in data.chunks_exact(width.max(1) as usize).enumerate() {
            // sat(x, y) = src(x, y) + sat(x - 1, y) + sat(x, y - 1) - sat(x - 1, y - 1)
            let mut row_sum = 0u64;
            for (x, &value) in row.iter().enumerate() {
                row_sum += u64::from(value);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
            }
        }

        Self {
            data: table,
            width,
            height,
        }
    }

    /// Sum of the rectangle from the origin to `(x, y)` inclusive.
    ///
    /// Coordinates past the right or bottom edge are clamped.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u64 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let x = x.min(self.width - 1) as usize + 1;
        let y = y.min(self.height - 1) as usize + 1;
        self.data[y * (self.width as usize + 1) + x]
    }

    /// Sum of the values in the rectangle `(x1, y1)..=(x2, y2)`.
    ///
    /// Corners past the image are clamped to it; an empty rectangle sums to 0.
    ///
    /// # Formula
    ///
    /// Sum = sat(x2, y2) - sat(x1 - 1, y2) - sat(x2, y1 - 1) + sat(x1 - 1, y1 - 1)
    #[must_use]
    pub fn rectangle_sum(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> u64 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }

        let x2 = x2.min(self.width - 1);
        let y2 = y2.min(self.height - 1);
        if x1 > x2 || y1 > y2 {
            return 0;
        }

        // Indices into the padded table
        let stride = self.width as usize + 1;
        let (left, top) = (x1 as usize, y1 as usize);
        let (right, bottom) = (x2 as usize + 1, y2 as usize + 1);

        self.data[bottom * stride + right] + self.data[top * stride + left]
            - self.data[top * stride + right]
            - self.data[bottom * stride + left]
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}
