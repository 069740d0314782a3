//! Single-shot background removal pipeline and its processing state machine.
//!
//! Stages run strictly in order on one exclusively owned raster:
//!
//! ```text
//! decode -> classify -> smooth -> encode
//! ```
//!
//! [`BackgroundRemover`] wraps the pipeline with the state a tool view needs:
//! the loaded source, the last output, user notifications, and an explicit
//! state machine (`Idle -> Processing -> Complete | Failed`, back to `Idle`
//! on reset or a new upload). Either a complete encoded image is produced
//! or nothing is.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bgremove::background::ClassifyBackground;
use crate::bgremove::edge_smoothing::SmoothAlphaEdges;
use crate::bgremove::encoder::{OutputContainer, RasterEncoder};
use crate::bgremove::notification::{LogNotifier, NotificationSink, Severity};
use crate::bgremove::params::ClassificationParameters;
use crate::bgremove::raster_source::{ImageCodec, RasterDecoder, SourceFile};
use crate::error::{DecodeError, Error, ParameterError};
use crate::utils::validate_rgba_buffer;
use crate::RasterImage;

pub const LOADED_MESSAGE: &str = "Image loaded successfully!";
pub const INVALID_UPLOAD_MESSAGE: &str = "Please upload a valid image file";
pub const COMPLETE_MESSAGE: &str = "Background removed! Download your image below.";
pub const FAILURE_MESSAGE: &str = "Failed to process image. Please try again.";
pub const DOWNLOADED_MESSAGE: &str = "Image downloaded!";

/// Pipeline stage, reported for progress display
///
/// The progress values are cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Initializing,
    Preparing,
    Classifying,
    Smoothing,
    Encoding,
}

impl Stage {
    pub const ALL: [Self; 5] = [
        Self::Initializing,
        Self::Preparing,
        Self::Classifying,
        Self::Smoothing,
        Self::Encoding,
    ];

    /// Progress percentage shown while this stage runs
    #[must_use]
    pub const fn progress(self) -> u8 {
        match self {
            Self::Initializing => 10,
            Self::Preparing => 30,
            Self::Classifying => 50,
            Self::Smoothing => 80,
            Self::Encoding => 95,
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing background removal...",
            Self::Preparing => "Drawing image...",
            Self::Classifying => "Analyzing foreground...",
            Self::Smoothing => "Applying transparency...",
            Self::Encoding => "Finalizing...",
        }
    }
}

/// Processing state of a [`BackgroundRemover`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Processing(Stage),
    Complete,
    Failed {
        message: String,
    },
}

impl ProcessingState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing(_) => "processing",
            Self::Complete => "complete",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub const fn progress(&self) -> u8 {
        match self {
            Self::Processing(stage) => stage.progress(),
            Self::Complete => 100,
            Self::Idle | Self::Failed { .. } => 0,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Idle => "",
            Self::Processing(stage) => stage.message(),
            Self::Complete => "Background removed successfully!",
            Self::Failed { message } => message,
        }
    }

    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self, Self::Processing(_))
    }

    /// Whether `next` is a legal successor of this state.
    ///
    /// Stages only move forward, and `Complete`/`Failed` are reachable
    /// only from `Processing`.
    #[must_use]
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Processing(current), Self::Processing(following)) => following > current,
            (Self::Idle, Self::Processing(_))
            | (Self::Processing(_), Self::Complete | Self::Failed { .. })
            | (Self::Idle | Self::Complete | Self::Failed { .. }, Self::Idle) => true,
            _ => false,
        }
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidTransition` - `next` is not a legal successor
    pub fn transition(&mut self, next: Self) -> Result<(), Error> {
        if !self.can_transition_to(&next) {
            return Err(Error::InvalidTransition {
                from: self.name(),
                to: next.name(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}%)", self.name(), self.progress())
    }
}

/// Encoder output ready to be offered as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    container: OutputContainer,
    dimensions: (u32, u32),
}

impl EncodedImage {
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub const fn container(&self) -> OutputContainer {
        self.container
    }

    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }

    /// Width and height of the encoded raster
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Download name for a given Unix timestamp in milliseconds,
    /// e.g. `no-background-1700000000000.png`
    #[must_use]
    pub fn file_name(&self, unix_millis: u128) -> String {
        format!("no-background-{unix_millis}.{}", self.container.extension())
    }
}

/// What a download trigger needs: a name, a MIME type and the bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download<'a> {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: &'a [u8],
}

/// Runs classify, smooth and encode on an owned raster.
///
/// `on_stage` is called before each stage; an error from it aborts the
/// pipeline before the stage starts.
///
/// # Errors
///
/// Parameter, processing and encoding errors, or whatever `on_stage` returns.
pub fn process_raster<E, F>(
    mut raster: RasterImage,
    params: &ClassificationParameters,
    encoder: &E,
    mut on_stage: F,
) -> Result<EncodedImage, Error>
where
    E: RasterEncoder + ?Sized,
    F: FnMut(Stage) -> Result<(), Error>,
{
    params.validate()?;

    on_stage(Stage::Initializing)?;

    on_stage(Stage::Preparing)?;
    validate_rgba_buffer(&raster)?;

    on_stage(Stage::Classifying)?;
    raster.classify_background(params)?;

    on_stage(Stage::Smoothing)?;
    raster.smooth_alpha_edges(params.edge_smoothing_radius)?;

    on_stage(Stage::Encoding)?;
    let bytes = encoder.encode(&raster, params.output_container)?;

    Ok(EncodedImage {
        bytes,
        container: params.output_container,
        dimensions: raster.dimensions(),
    })
}

/// Decodes `file` and removes its background in one call.
///
/// # Examples
///
/// ```no_run
/// use imageops_bgremove::{remove_background, ClassificationParameters, SourceFile};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = SourceFile::new(std::fs::read("portrait.jpg")?, "image/jpeg");
/// let output = remove_background(&file, &ClassificationParameters::default())?;
/// std::fs::write(output.file_name(0), output.bytes())?;
/// # Ok(())
/// # }
/// ```
pub fn remove_background(
    file: &SourceFile,
    params: &ClassificationParameters,
) -> Result<EncodedImage, Error> {
    let codec = ImageCodec::default();
    let raster = codec.decode(file)?;
    process_raster(raster, params, &codec, |_| Ok(()))
}

type StageObserver = Box<dyn FnMut(Stage)>;

/// Stateful background removal tool
///
/// Holds the uploaded source so it can be reprocessed with new parameters,
/// and reports every outcome to the notification sink. The decoder, encoder
/// and sink are injected so any of them can be replaced.
pub struct BackgroundRemover<D = ImageCodec, E = ImageCodec, N = LogNotifier> {
    decoder: D,
    encoder: E,
    notifier: N,
    params: ClassificationParameters,
    source: Option<RasterImage>,
    output: Option<EncodedImage>,
    state: ProcessingState,
    observer: Option<StageObserver>,
}

impl Default for BackgroundRemover {
    fn default() -> Self {
        Self::new(ImageCodec::default(), ImageCodec::default(), LogNotifier)
    }
}

impl<D, E, N> BackgroundRemover<D, E, N>
where
    D: RasterDecoder,
    E: RasterEncoder,
    N: NotificationSink,
{
    pub fn new(decoder: D, encoder: E, notifier: N) -> Self {
        Self {
            decoder,
            encoder,
            notifier,
            params: ClassificationParameters::default(),
            source: None,
            output: None,
            state: ProcessingState::Idle,
            observer: None,
        }
    }

    /// Replaces the parameters used by the next run.
    ///
    /// # Errors
    ///
    /// Any [`ParameterError`] from [`ClassificationParameters::validate`].
    pub fn with_parameters(mut self, params: ClassificationParameters) -> Result<Self, ParameterError> {
        self.set_parameters(params)?;
        Ok(self)
    }

    /// Replaces the parameters used by the next run.
    ///
    /// # Errors
    ///
    /// Any [`ParameterError`] from [`ClassificationParameters::validate`].
    pub fn set_parameters(&mut self, params: ClassificationParameters) -> Result<(), ParameterError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Registers a callback invoked as each stage starts.
    pub fn on_progress(&mut self, observer: impl FnMut(Stage) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    #[must_use]
    pub const fn parameters(&self) -> &ClassificationParameters {
        &self.params
    }

    #[must_use]
    pub const fn state(&self) -> &ProcessingState {
        &self.state
    }

    #[must_use]
    pub const fn source(&self) -> Option<&RasterImage> {
        self.source.as_ref()
    }

    #[must_use]
    pub const fn output(&self) -> Option<&EncodedImage> {
        self.output.as_ref()
    }

    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Decodes an upload and makes it the current source.
    ///
    /// A previous output is discarded and a finished or failed run returns to
    /// `Idle`. On failure the previous source and state are kept.
    ///
    /// # Errors
    ///
    /// * `Error::Decode` - the upload is not an image or cannot be decoded
    pub fn load(&mut self, file: &SourceFile) -> Result<&RasterImage, Error> {
        if !file.is_image() {
            log::warn!("rejected upload with MIME type {:?}", file.mime_type());
            self.notifier.notify(INVALID_UPLOAD_MESSAGE, Severity::Error);
            return Err(DecodeError::UnsupportedMimeType(file.mime_type().to_owned()).into());
        }

        let raster = match self.decoder.decode(file) {
            Ok(raster) => raster,
            Err(error) => {
                log::warn!("failed to decode upload: {error}");
                self.notifier.notify(FAILURE_MESSAGE, Severity::Error);
                return Err(error.into());
            }
        };

        if self.state != ProcessingState::Idle {
            self.state.transition(ProcessingState::Idle)?;
        }
        self.output = None;

        log::info!(
            "loaded {}x{} source image ({})",
            raster.width(),
            raster.height(),
            file.mime_type()
        );
        self.notifier.notify(LOADED_MESSAGE, Severity::Success);
        Ok(self.source.insert(raster))
    }

    /// Removes the background of the current source with the current
    /// parameters.
    ///
    /// Runs from `Idle`, or after a previous `Complete`/`Failed` run, in which
    /// case the previous output is dropped first. The source is left intact,
    /// so a failed run can be retried with other parameters.
    ///
    /// # Errors
    ///
    /// * `Error::NoSourceImage` - nothing has been loaded
    /// * `Error::Parameter` - the current parameters are out of range
    /// * `Error::Processing` / `Error::Encode` - a stage failed; state becomes `Failed`
    pub fn remove_background(&mut self) -> Result<&EncodedImage, Error> {
        self.params.validate()?;
        let raster = self.source.clone().ok_or(Error::NoSourceImage)?;

        if matches!(
            self.state,
            ProcessingState::Complete | ProcessingState::Failed { .. }
        ) {
            self.output = None;
            self.state.transition(ProcessingState::Idle)?;
        }

        let params = self.params;
        let state = &mut self.state;
        let observer = &mut self.observer;
        let result = process_raster(raster, &params, &self.encoder, |stage| {
            state.transition(ProcessingState::Processing(stage))?;
            log::debug!("{}% {}", stage.progress(), stage.message());
            if let Some(observer) = observer.as_mut() {
                observer(stage);
            }
            Ok(())
        });

        match result {
            Ok(encoded) => {
                self.state.transition(ProcessingState::Complete)?;
                log::info!(
                    "background removed: {} bytes of {}",
                    encoded.bytes().len(),
                    encoded.mime_type()
                );
                self.notifier.notify(COMPLETE_MESSAGE, Severity::Success);
                Ok(self.output.insert(encoded))
            }
            Err(error) => {
                log::warn!("background removal failed: {error}");
                self.fail();
                Err(error)
            }
        }
    }

    /// Offers the current output as a download named after the current time.
    ///
    /// Returns `None` when there is no complete output.
    pub fn download(&self) -> Option<Download<'_>> {
        let output = self.output.as_ref()?;
        let unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();

        self.notifier.notify(DOWNLOADED_MESSAGE, Severity::Success);
        Some(Download {
            file_name: output.file_name(unix_millis),
            mime_type: output.mime_type(),
            bytes: output.bytes(),
        })
    }

    /// Clears source and output and returns to `Idle`.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidTransition` - called while processing
    pub fn reset(&mut self) -> Result<(), Error> {
        self.state.transition(ProcessingState::Idle)?;
        self.source = None;
        self.output = None;
        Ok(())
    }

    fn fail(&mut self) {
        if self.state.is_processing() {
            self.state = ProcessingState::Failed {
                message: FAILURE_MESSAGE.to_owned(),
            };
        }
        self.output = None;
        self.notifier.notify(FAILURE_MESSAGE, Severity::Error);
    }
}
