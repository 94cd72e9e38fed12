use core::mem;

use enough::{Stop, Unstoppable};

#[cfg(feature = "rgb")]
use rgb::AsPixels as _;

use crate::codec::Codec;
use crate::convert::convert_pixels;
use crate::error::{PixportError, record};
use crate::format::FileFormat;
use crate::limits::Limits;
use crate::pixel::PixelFormat;

/// Metadata of an opened image. Fixed for the lifetime of its handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub bytes_per_channel: usize,
    pub is_float: bool,
    /// Pixel format the codec produces without conversion.
    pub format: PixelFormat,
    pub file_format: FileFormat,
    /// Embedded ICC profile, if the file carries one.
    pub icc_profile: Option<Vec<u8>>,
}

/// Where a handle is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Decoded,
    /// A decode failed; the handle can only be closed.
    Failed,
}

enum State<'s> {
    Created(Codec<'s>),
    Decoded,
    Failed,
}

/// One opened image, bound to the stream it was opened from.
///
/// Dropping the handle releases the codec in every state; [`close`](Self::close)
/// does the same explicitly.
pub struct ImageHandle<'s> {
    info: ImageInfo,
    limits: Limits,
    state: State<'s>,
}

impl<'s> ImageHandle<'s> {
    pub(crate) fn new(
        mut codec: Codec<'s>,
        file_format: FileFormat,
        limits: Limits,
    ) -> Result<Self, PixportError> {
        let (width, height) = codec.dimensions();
        if width == 0 || height == 0 {
            return Err(PixportError::LoadFailedExternal(format!(
                "{file_format:?} decoder reported {width}x{height}"
            )));
        }
        let format = codec.native_format()?;
        limits.check_dimensions(width, height)?;

        let icc_profile = codec.icc_profile().unwrap_or_else(|e| {
            log::warn!("ignoring unreadable ICC profile: {e}");
            None
        });

        let details = format.describe();
        log::debug!("opened {file_format:?} {width}x{height} {format:?}");
        Ok(Self {
            info: ImageInfo {
                width,
                height,
                channels: details.channels,
                bytes_per_channel: details.bytes_per_channel,
                is_float: details.is_float,
                format,
                file_format,
                icc_profile,
            },
            limits,
            state: State::Created(codec),
        })
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn file_format(&self) -> FileFormat {
        self.info.file_format
    }

    pub fn native_format(&self) -> PixelFormat {
        self.info.format
    }

    pub fn state(&self) -> HandleState {
        match self.state {
            State::Created(_) => HandleState::Created,
            State::Decoded => HandleState::Decoded,
            State::Failed => HandleState::Failed,
        }
    }

    /// Bytes [`decode`](Self::decode) writes for `forced` (native format when `None`).
    pub fn buffer_len(&self, forced: Option<PixelFormat>) -> Result<usize, PixportError> {
        forced
            .unwrap_or(self.info.format)
            .buffer_len(self.info.width, self.info.height)
    }

    /// Decode every pixel into `dest`, converting to `forced` when given.
    ///
    /// One decode per handle. Argument errors (short buffer, memory limit)
    /// leave the handle usable; a codec or conversion failure does not.
    pub fn decode(
        &mut self,
        dest: &mut [u8],
        forced: Option<PixelFormat>,
    ) -> Result<(), PixportError> {
        self.decode_with_stop(dest, forced, Unstoppable)
    }

    /// [`decode`](Self::decode) with a cancellation token. The token is
    /// checked before the codec runs and every 16 rows of conversion.
    pub fn decode_with_stop(
        &mut self,
        dest: &mut [u8],
        forced: Option<PixelFormat>,
        stop: impl Stop,
    ) -> Result<(), PixportError> {
        record(self.decode_inner(dest, forced, &stop))
    }

    /// Decode into a freshly allocated buffer.
    pub fn decode_to_vec(
        &mut self,
        forced: Option<PixelFormat>,
    ) -> Result<DecodeOutput, PixportError> {
        record(self.decode_owned(forced))
    }

    /// Release the codec. Valid in every state.
    pub fn close(self) {
        log::trace!("closing {:?} handle in state {:?}", self.info.file_format, self.state());
    }

    fn decode_owned(&mut self, forced: Option<PixelFormat>) -> Result<DecodeOutput, PixportError> {
        let format = forced.unwrap_or(self.info.format);
        let len = self.buffer_len(Some(format))?;
        self.limits.check_memory(len, "decoded image")?;
        let mut pixels = vec![0u8; len];
        self.decode_inner(&mut pixels, Some(format), &Unstoppable)?;
        Ok(DecodeOutput {
            pixels,
            width: self.info.width,
            height: self.info.height,
            format,
        })
    }

    fn decode_inner(
        &mut self,
        dest: &mut [u8],
        forced: Option<PixelFormat>,
        stop: &dyn Stop,
    ) -> Result<(), PixportError> {
        match self.state {
            State::Created(_) => {}
            State::Decoded => {
                return Err(PixportError::LoadFailedInternal(
                    "image already decoded".into(),
                ));
            }
            State::Failed => {
                return Err(PixportError::LoadFailedInternal(
                    "previous decode failed".into(),
                ));
            }
        }

        let (width, height) = (self.info.width, self.info.height);
        let native = self.info.format;
        let target = forced.unwrap_or(native);
        let native_len = native.buffer_len(width, height)?;
        let target_len = target.buffer_len(width, height)?;
        if dest.len() < target_len {
            return Err(PixportError::BufferTooSmall {
                needed: target_len,
                actual: dest.len(),
            });
        }
        let convert = target != native;
        if convert {
            self.limits.check_memory(native_len, "decode scratch buffer")?;
        }
        stop.check()?;

        let State::Created(codec) = mem::replace(&mut self.state, State::Failed) else {
            return Err(PixportError::LoadFailedInternal(
                "decoder state lost".into(),
            ));
        };

        if convert {
            log::debug!("decoding {native:?} and converting to {target:?}");
            let mut scratch = vec![0u8; native_len];
            codec.read_image(&mut scratch)?;
            convert_pixels(&scratch, dest, width, height, native, target, stop)?;
        } else {
            codec.read_image(&mut dest[..native_len])?;
        }

        self.state = State::Decoded;
        Ok(())
    }
}

impl core::fmt::Debug for ImageHandle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("info", &self.info)
            .field("state", &self.state())
            .finish()
    }
}

/// Owned result of [`ImageHandle::decode_to_vec`].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeOutput {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl DecodeOutput {
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Reinterpret pixel data as a typed pixel slice.
    ///
    /// Returns [`PixportError::FormatMismatch`] if the format doesn't match `P`.
    #[cfg(feature = "rgb")]
    pub fn as_pixels<P: DecodePixel>(&self) -> Result<&[P], PixportError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        if self.format != P::pixel_format() {
            return Err(PixportError::FormatMismatch {
                expected: P::pixel_format(),
                actual: self.format,
            });
        }
        Ok(self.pixels.as_pixels())
    }

    /// Borrowed [`imgref::ImgRef`] view of typed pixels.
    #[cfg(feature = "imgref")]
    pub fn as_imgref<P: DecodePixel>(&self) -> Result<imgref::ImgRef<'_, P>, PixportError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgRef::new(
            pixels,
            self.width as usize,
            self.height as usize,
        ))
    }

    #[cfg(feature = "imgref")]
    pub fn to_imgvec<P: DecodePixel>(&self) -> Result<imgref::ImgVec<P>, PixportError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgVec::new(
            pixels.to_vec(),
            self.width as usize,
            self.height as usize,
        ))
    }
}

/// Pixel types a [`DecodeOutput`] can be viewed as.
#[cfg(feature = "rgb")]
pub trait DecodePixel: Copy + 'static {
    fn pixel_format() -> PixelFormat;
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGB8 {
    fn pixel_format() -> PixelFormat {
        PixelFormat::Rgb8
    }
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGBA8 {
    fn pixel_format() -> PixelFormat {
        PixelFormat::Rgba8
    }
}
