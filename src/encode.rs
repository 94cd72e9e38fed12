use enough::{Stop, Unstoppable};

use crate::codec::png::{PngCompression, PngFilter};
use crate::codec::{jpeg, openexr, png, tga};
use crate::convert::convert_pixels;
use crate::error::{PixportError, record};
use crate::format::FileFormat;
use crate::limits::Limits;
use crate::pixel::PixelFormat;
use crate::stream::{WriteStream, write_all};

/// Builder for writing pixels in one file format.
///
/// Input pixels in a format the target cannot store are converted first,
/// to the format [`FileFormat::resolve_write_format`] picks, or to the one
/// given with [`with_output_format`](Self::with_output_format).
///
/// ```
/// use pixport::{EncodeRequest, PixelFormat, Unstoppable};
///
/// let pixels = vec![0.5f32.to_ne_bytes(); 4 * 3].concat();
/// let png = EncodeRequest::png()
///     .encode(&pixels, 2, 2, PixelFormat::RgbF32, Unstoppable)?;
/// assert_eq!(&png[1..4], b"PNG");
/// # Ok::<(), pixport::PixportError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct EncodeRequest<'a> {
    format: FileFormat,
    png_compression: PngCompression,
    png_filter: PngFilter,
    jpeg_quality: u8,
    output_format: Option<PixelFormat>,
    icc_profile: Option<&'a [u8]>,
    limits: Option<&'a Limits>,
}

impl<'a> EncodeRequest<'a> {
    pub fn new(format: FileFormat) -> Self {
        Self {
            format,
            png_compression: PngCompression::default(),
            png_filter: PngFilter::default(),
            jpeg_quality: jpeg::DEFAULT_QUALITY,
            output_format: None,
            icc_profile: None,
            limits: None,
        }
    }

    pub fn png() -> Self {
        Self::new(FileFormat::Png)
    }

    pub fn jpeg() -> Self {
        Self::new(FileFormat::Jpeg)
    }

    pub fn tga() -> Self {
        Self::new(FileFormat::Tga)
    }

    pub fn exr() -> Self {
        Self::new(FileFormat::Exr)
    }

    pub fn with_png_compression(mut self, compression: PngCompression) -> Self {
        self.png_compression = compression;
        self
    }

    pub fn with_png_filter(mut self, filter: PngFilter) -> Self {
        self.png_filter = filter;
        self
    }

    /// JPEG quality, 1 to 100. Anything else fails the encode with
    /// [`PixportError::InvalidEncodeArgs`].
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Store pixels as `format` instead of the resolved default.
    ///
    /// `format` must be in the target's
    /// [`capabilities`](FileFormat::capabilities); otherwise the encode fails
    /// with [`PixportError::InvalidEncodeArgs`].
    pub fn with_output_format(mut self, format: PixelFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Embed an ICC colour profile. PNG and JPEG only.
    pub fn with_icc_profile(mut self, profile: &'a [u8]) -> Self {
        self.icc_profile = Some(profile);
        self
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn file_format(&self) -> FileFormat {
        self.format
    }

    /// Pixel format that ends up in the file for `input`.
    pub fn write_format(&self, input: PixelFormat) -> PixelFormat {
        self.output_format
            .unwrap_or_else(|| self.format.resolve_write_format(input))
    }

    /// Encode into memory.
    pub fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        input: PixelFormat,
        stop: impl Stop,
    ) -> Result<Vec<u8>, PixportError> {
        record(
            self.encode_inner(pixels, width, height, input, &stop)
                .map_err(PixportError::while_writing),
        )
    }

    /// Encode, then hand the complete file to `stream`.
    ///
    /// Nothing reaches the stream unless encoding succeeded. A stream that
    /// stops accepting bytes fails with [`PixportError::WriteFailedExternal`].
    pub fn write(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        input: PixelFormat,
        stream: &mut dyn WriteStream,
        stop: impl Stop,
    ) -> Result<(), PixportError> {
        record(
            self.encode_inner(pixels, width, height, input, &stop)
                .map_err(PixportError::while_writing)
                .and_then(|bytes| {
                    write_all(stream, &bytes).map_err(|e| {
                        log::warn!("output stream failed after {} byte file: {e}", bytes.len());
                        PixportError::WriteFailedExternal(e.to_string())
                    })
                }),
        )
    }

    fn encode_inner(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        input: PixelFormat,
        stop: &dyn Stop,
    ) -> Result<Vec<u8>, PixportError> {
        if width == 0 || height == 0 {
            return Err(PixportError::InvalidEncodeArgs(format!(
                "cannot encode a {width}x{height} image"
            )));
        }
        if self.format == FileFormat::Jpeg && !(1..=100).contains(&self.jpeg_quality) {
            return Err(PixportError::InvalidEncodeArgs(format!(
                "JPEG quality {} is outside 1..=100",
                self.jpeg_quality
            )));
        }
        if let Some(format) = self.output_format
            && !self.format.can_store(format)
        {
            return Err(PixportError::InvalidEncodeArgs(format!(
                "{:?} cannot store {format:?}",
                self.format
            )));
        }
        if self.icc_profile.is_some() && matches!(self.format, FileFormat::Exr | FileFormat::Tga) {
            return Err(PixportError::InvalidEncodeArgs(format!(
                "{:?} files cannot carry an ICC profile",
                self.format
            )));
        }
        let input_len = input.buffer_len(width, height)?;
        if pixels.len() < input_len {
            return Err(PixportError::InvalidEncodeArgs(format!(
                "{width}x{height} {input:?} needs {input_len} bytes, got {}",
                pixels.len()
            )));
        }
        if let Some(limits) = self.limits {
            limits.check_dimensions(width, height)?;
        }

        stop.check()?;

        let target = self.write_format(input);
        let converted;
        let data = if target == input {
            &pixels[..input_len]
        } else {
            log::debug!("writing {input:?} as {target:?} to {:?}", self.format);
            let target_len = target.buffer_len(width, height)?;
            if let Some(limits) = self.limits {
                limits.check_memory(target_len, "encode conversion buffer")?;
            }
            let mut buf = vec![0u8; target_len];
            convert_pixels(pixels, &mut buf, width, height, input, target, stop)?;
            converted = buf;
            &converted[..]
        };

        stop.check()?;

        let bytes = match self.format {
            FileFormat::Exr => openexr::encode(data, width, height, target),
            FileFormat::Png => png::encode(
                data,
                width,
                height,
                target,
                self.png_compression,
                self.png_filter,
                self.icc_profile,
            ),
            FileFormat::Jpeg => jpeg::encode(
                data,
                width,
                height,
                target,
                self.jpeg_quality,
                self.icc_profile,
            ),
            FileFormat::Tga => tga::encode(data, width, height, target),
        }?;
        log::debug!(
            "encoded {width}x{height} {target:?} as {:?}, {} bytes",
            self.format,
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Write `data` to `stream` as `file_format` with default options.
pub fn write_image(
    file_format: FileFormat,
    data: &[u8],
    width: u32,
    height: u32,
    input: PixelFormat,
    stream: &mut dyn WriteStream,
) -> Result<(), PixportError> {
    EncodeRequest::new(file_format).write(data, width, height, input, stream, Unstoppable)
}
