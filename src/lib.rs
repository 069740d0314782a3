//! Heuristic background removal for raster images.
//!
//! Decodes an upload, makes pixels close to the corner-sampled background
//! colour transparent, feathers the resulting boundary, and re-encodes the
//! cutout as PNG or WebP.

mod bgremove;
mod error;
#[cfg(test)]
mod test_utils;
mod utils;

use image::{ImageBuffer, Pixel, Rgba};

pub use bgremove::background::{BackgroundSample, ClassifyBackground, EdgeMap, EDGE_THRESHOLD};
pub use bgremove::edge_smoothing::SmoothAlphaEdges;
pub use bgremove::encoder::{encode_raster, OutputContainer, RasterEncoder};
pub use bgremove::notification::{
    LogNotifier, Notification, NotificationLog, NotificationSink, Severity,
};
pub use bgremove::params::{
    ClassificationParameters, CornerSampling, EdgeDetection, MAX_BACKGROUND_DISTANCE,
    MAX_EDGE_SMOOTHING_RADIUS,
};
pub use bgremove::pipeline::{
    process_raster, remove_background, BackgroundRemover, Download, EncodedImage,
    ProcessingState, Stage, COMPLETE_MESSAGE, DOWNLOADED_MESSAGE, FAILURE_MESSAGE,
    INVALID_UPLOAD_MESSAGE, LOADED_MESSAGE,
};
pub use bgremove::raster_source::{
    decode_raster, DecodeLimits, ImageCodec, RasterDecoder, SourceFile,
};
pub use bgremove::summed_area_table::{CreateAlphaSummedAreaTable, SummedAreaTable};
pub use error::{DecodeError, EncodeError, Error, ParameterError, ProcessingError};

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

/// Straight (non-premultiplied) 8-bit RGBA raster, row-major
pub type RasterImage = Image<Rgba<u8>>;
