//! Adapters to the external codecs.
//!
//! Bitstream parsing and emission live in the `image` crate; this module
//! only detects signatures, maps colour types onto [`PixelFormat`] and
//! turns codec failures into [`PixportError`] values.

pub(crate) mod jpeg;
pub(crate) mod openexr;
pub(crate) mod png;
pub(crate) mod tga;

use std::io::BufReader;

use image::{ColorType, ExtendedColorType, ImageDecoder, ImageEncoder, ImageError};

use crate::error::PixportError;
use crate::pixel::PixelFormat;
use crate::stream::{ReadStream, StreamReader, peek};

/// Byte source handed to every decoder.
pub(crate) type Source<'s> = BufReader<StreamReader<'s>>;

pub(crate) fn source(stream: &mut dyn ReadStream) -> std::io::Result<Source<'_>> {
    Ok(BufReader::new(StreamReader::new(stream)?))
}

/// One opened external decoder. The set is closed, so a plain enum does.
pub(crate) enum Codec<'s> {
    Exr(openexr::ExrFile),
    Png(image::codecs::png::PngDecoder<Source<'s>>),
    Jpeg(image::codecs::jpeg::JpegDecoder<Source<'s>>),
    Tga(image::codecs::tga::TgaDecoder<Source<'s>>),
}

macro_rules! with_decoder {
    ($codec:expr, $exr:ident => $exr_body:expr, $d:ident => $body:expr) => {
        match $codec {
            Codec::Exr($exr) => $exr_body,
            Codec::Png($d) => $body,
            Codec::Jpeg($d) => $body,
            Codec::Tga($d) => $body,
        }
    };
}

impl Codec<'_> {
    pub(crate) fn dimensions(&self) -> (u32, u32) {
        with_decoder!(self, e => e.dimensions(), d => d.dimensions())
    }

    /// Pixel format produced without conversion.
    pub(crate) fn native_format(&self) -> Result<PixelFormat, PixportError> {
        let color = with_decoder!(self, e => return Ok(e.format()), d => d.color_type());
        pixel_format(color).ok_or_else(|| {
            PixportError::LoadFailedExternal(format!("unsupported colour type {color:?}"))
        })
    }

    pub(crate) fn icc_profile(&mut self) -> Result<Option<Vec<u8>>, PixportError> {
        with_decoder!(self, _e => Ok(None), d => d.icc_profile()).map_err(load_error)
    }

    /// Decode every pixel into `buf`, which must be exactly the native size.
    pub(crate) fn read_image(self, buf: &mut [u8]) -> Result<(), PixportError> {
        with_decoder!(self, e => e.read_image(buf), d => d.read_image(buf).map_err(load_error))
    }
}

/// Compare a fixed signature against the stream without moving it.
pub(crate) fn signature_matches(
    stream: &mut dyn ReadStream,
    signature: &[u8],
) -> std::io::Result<bool> {
    let mut buf = [0u8; 16];
    let buf = &mut buf[..signature.len()];
    let n = peek(stream, buf)?;
    Ok(n == signature.len() && buf == signature)
}

pub(crate) fn pixel_format(color: ColorType) -> Option<PixelFormat> {
    Some(match color {
        ColorType::L8 => PixelFormat::R8,
        ColorType::La8 => PixelFormat::Rg8,
        ColorType::Rgb8 => PixelFormat::Rgb8,
        ColorType::Rgba8 => PixelFormat::Rgba8,
        ColorType::L16 => PixelFormat::R16,
        ColorType::La16 => PixelFormat::Rg16,
        ColorType::Rgb16 => PixelFormat::Rgb16,
        ColorType::Rgba16 => PixelFormat::Rgba16,
        ColorType::Rgb32F => PixelFormat::RgbF32,
        ColorType::Rgba32F => PixelFormat::RgbaF32,
        _ => return None,
    })
}

/// Colour type the `image` encoders are given for `format`.
pub(crate) fn extended_color_type(format: PixelFormat) -> Option<ExtendedColorType> {
    Some(match format {
        PixelFormat::R8 => ExtendedColorType::L8,
        PixelFormat::Rg8 => ExtendedColorType::La8,
        PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
        PixelFormat::Rgba8 => ExtendedColorType::Rgba8,
        PixelFormat::R16 => ExtendedColorType::L16,
        PixelFormat::Rg16 => ExtendedColorType::La16,
        PixelFormat::Rgb16 => ExtendedColorType::Rgb16,
        PixelFormat::Rgba16 => ExtendedColorType::Rgba16,
        PixelFormat::RgbF32 => ExtendedColorType::Rgb32F,
        PixelFormat::RgbaF32 => ExtendedColorType::Rgba32F,
        _ => return None,
    })
}

/// Embed `profile` through an encoder that supports it.
pub(crate) fn attach_icc(
    encoder: &mut impl ImageEncoder,
    profile: Option<&[u8]>,
    file: &str,
) -> Result<(), PixportError> {
    if let Some(profile) = profile {
        encoder.set_icc_profile(profile.to_vec()).map_err(|e| {
            PixportError::InvalidEncodeArgs(format!("{file} writer cannot embed an ICC profile: {e}"))
        })?;
    }
    Ok(())
}

pub(crate) fn load_error(e: ImageError) -> PixportError {
    log::warn!("external decoder failed: {e}");
    PixportError::LoadFailedExternal(e.to_string())
}

pub(crate) fn write_error(e: ImageError) -> PixportError {
    log::warn!("external encoder failed: {e}");
    PixportError::WriteFailedExternal(e.to_string())
}

pub(crate) fn unstorable(format: PixelFormat, file: &str) -> PixportError {
    PixportError::WriteFailedExternal(format!("{file} encoder cannot store {format:?}"))
}
