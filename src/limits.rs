use crate::error::PixportError;

/// Caps on what opening, decoding or writing an image may commit to.
///
/// Dimensions are checked against the codec header at open, before any
/// pixel data is read, and against the caller's size before a write.
/// `None` means unbounded, which is the default.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Width times height.
    pub max_pixels: Option<u64>,
    /// Largest single buffer pixport allocates on its own behalf.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    pub(crate) fn check_dimensions(&self, width: u32, height: u32) -> Result<(), PixportError> {
        let pixels = u64::from(width) * u64::from(height);
        cap("width", u64::from(width), self.max_width)?;
        cap("height", u64::from(height), self.max_height)?;
        cap("pixel count", pixels, self.max_pixels)
    }

    /// Refuse a buffer pixport is about to allocate.
    ///
    /// Destinations handed in by the caller are never counted. What is
    /// counted: the `Vec` behind [`decode_to_vec`], the scratch buffer a
    /// decode fills in the file's native format before converting into the
    /// requested one, and the converted copy of the input that an encode
    /// builds when the target file cannot store the input format.
    ///
    /// [`decode_to_vec`]: crate::ImageHandle::decode_to_vec
    pub(crate) fn check_memory(&self, bytes: usize, purpose: &str) -> Result<(), PixportError> {
        let bytes = u64::try_from(bytes).unwrap_or(u64::MAX);
        cap(purpose, bytes, self.max_memory_bytes)
    }
}

fn cap(what: &str, value: u64, limit: Option<u64>) -> Result<(), PixportError> {
    match limit {
        Some(max) if value > max => Err(PixportError::LimitExceeded(format!(
            "{what} {value} exceeds limit {max}"
        ))),
        _ => Ok(()),
    }
}
