use thiserror::Error;

/// Error type for turning uploaded bytes into a raster image
///
/// Every variant is reported to the user as the same generic failure;
/// the distinction exists for logging and for tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The declared MIME type is not an image type
    #[error("Unsupported MIME type {0:?}: expected an image/* upload")]
    UnsupportedMimeType(String),

    /// The byte stream is not in any raster format the decoder understands
    #[error("Could not determine the image format of the uploaded bytes")]
    UnknownFormat,

    /// The image is larger than the configured decode ceiling
    ///
    /// Checked against both the declared dimensions and the size of the
    /// decoded RGBA buffer so that a single upload cannot exhaust memory.
    #[error("Image of {width}x{height} exceeds the decode limits")]
    LimitsExceeded { width: u32, height: u32 },

    /// The format was recognised but the payload could not be decoded
    #[error("Malformed image data: {0}")]
    Malformed(String),
}

/// Error type for the in-place pixel stages (classification and smoothing)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// The RGBA buffer does not hold exactly `width * height * 4` bytes
    #[error("RGBA buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// `width * height * 4`
        expected: usize,
        /// Length of the backing buffer
        actual: usize,
    },

    /// The image has a zero dimension
    #[error("Image dimensions must be non-zero")]
    EmptyImage,
}

/// Error type for serialising a raster image into an output container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The encoder refuses zero-sized images
    #[error("Cannot encode an image of {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// The backing buffer does not hold exactly `width * height * 4` bytes
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The underlying codec rejected the buffer
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Error type for classification parameters supplied by a caller
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    /// Foreground strength is outside `[0, 1]` or not a number
    #[error("Foreground strength {0} is outside [0, 1]")]
    ForegroundStrengthOutOfRange(f64),

    /// Edge smoothing radius is above the supported maximum
    #[error("Edge smoothing radius {radius} exceeds the maximum of {max}")]
    EdgeSmoothingRadiusTooLarge { radius: u32, max: u32 },

    /// The configuration record could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Pipeline-level error
///
/// All stage errors funnel into this type at the pipeline boundary, where
/// they are converted into a single failure notification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Processing was requested before any source image was loaded
    #[error("No source image has been loaded")]
    NoSourceImage,

    /// The processing state machine was asked for an illegal transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}
