use std::cell::RefCell;

use enough::StopReason;

use crate::pixel::PixelFormat;

/// Errors from opening, decoding, converting and writing images.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PixportError {
    #[error("unsupported file type")]
    UnsupportedFileType,

    #[error("input stream is empty")]
    EmptyInput,

    #[error("external codec failed to load image: {0}")]
    LoadFailedExternal(String),

    #[error("image load failed: {0}")]
    LoadFailedInternal(String),

    #[error("bad pixel format: {0}")]
    BadFormat(String),

    #[error("pixel conversion failed: {0}")]
    ConversionFailed(String),

    #[error("pixel format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },

    #[error("external codec failed to write image: {0}")]
    WriteFailedExternal(String),

    #[error("image write failed: {0}")]
    WriteFailedInternal(String),

    #[error("invalid encode arguments: {0}")]
    InvalidEncodeArgs(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl From<StopReason> for PixportError {
    fn from(r: StopReason) -> Self {
        PixportError::Cancelled(r)
    }
}

/// Status classes that callers can branch on.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No registered loader recognised the stream.
    UnsupportedFileType,
    /// A delegated codec reported an error while reading.
    LoadFailedExternal,
    /// Orchestration failed before or around the codec (sizes, limits, state).
    LoadFailedInternal,
    /// An invalid or unsupported pixel format was supplied.
    ConversionFailedBadFormat,
    /// A delegated encoder, or the output stream, failed.
    WriteFailedExternal,
    /// Writing failed before reaching the encoder (sizes, limits).
    WriteFailedInternal,
    /// A [`Stop`](enough::Stop) token ended the operation.
    Cancelled,
    /// The stream had no bytes at the starting offset.
    EmptyInput,
    /// Encode arguments were rejected before any byte was produced.
    InvalidEncodeArgs,
}

impl ErrorKind {
    /// Stable integer status code. Success is `0` and never produced here.
    pub fn code(self) -> i32 {
        match self {
            Self::UnsupportedFileType => -1,
            Self::LoadFailedExternal => -2,
            Self::LoadFailedInternal => -3,
            Self::ConversionFailedBadFormat => -4,
            Self::WriteFailedExternal => -5,
            Self::WriteFailedInternal => -6,
            Self::Cancelled => -7,
            Self::EmptyInput => -8,
            Self::InvalidEncodeArgs => -9,
        }
    }
}

impl PixportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFileType => ErrorKind::UnsupportedFileType,
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::LoadFailedExternal(_) | Self::Stream(_) => ErrorKind::LoadFailedExternal,
            Self::LoadFailedInternal(_)
            | Self::DimensionsTooLarge { .. }
            | Self::LimitExceeded(_)
            | Self::BufferTooSmall { .. } => ErrorKind::LoadFailedInternal,
            Self::BadFormat(_) | Self::FormatMismatch { .. } | Self::ConversionFailed(_) => {
                ErrorKind::ConversionFailedBadFormat
            }
            Self::WriteFailedExternal(_) => ErrorKind::WriteFailedExternal,
            Self::WriteFailedInternal(_) => ErrorKind::WriteFailedInternal,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::InvalidEncodeArgs(_) => ErrorKind::InvalidEncodeArgs,
        }
    }

    /// Shorthand for `self.kind().code()`.
    pub fn code(&self) -> i32 {
        self.kind().code()
    }

    /// Size and limit failures raised on the write path.
    pub(crate) fn while_writing(self) -> Self {
        match self {
            e @ (Self::LoadFailedInternal(_)
            | Self::DimensionsTooLarge { .. }
            | Self::LimitExceeded(_)
            | Self::BufferTooSmall { .. }) => Self::WriteFailedInternal(e.to_string()),
            other => other,
        }
    }

    /// Size failures raised by a standalone conversion.
    pub(crate) fn while_converting(self) -> Self {
        match self {
            e @ (Self::DimensionsTooLarge { .. } | Self::BufferTooSmall { .. }) => {
                Self::ConversionFailed(e.to_string())
            }
            other => other,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Message of the most recent error returned by a public entry point on
/// this thread. Empty if nothing has failed yet.
pub fn last_error_details() -> String {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Store the message of a failing result in the last-error slot.
pub(crate) fn record<T>(result: Result<T, PixportError>) -> Result<T, PixportError> {
    if let Err(e) = &result {
        let msg = e.to_string();
        log::debug!("pixport error ({}): {msg}", e.code());
        LAST_ERROR.with(|slot| *slot.borrow_mut() = msg);
    }
    result
}
