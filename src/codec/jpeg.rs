//! JPEG: SOI marker detection, 8-bit grey and RGB.

use image::ImageEncoder;
use image::codecs::jpeg::{JpegDecoder, JpegEncoder};

use super::{
    Codec, attach_icc, extended_color_type, load_error, source, unstorable, write_error,
};
use crate::error::PixportError;
use crate::pixel::PixelFormat;
use crate::stream::ReadStream;

/// SOI followed by the first marker's prefix.
pub(crate) const SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

pub(crate) const DEFAULT_QUALITY: u8 = 90;

pub(crate) fn detect(stream: &mut dyn ReadStream) -> std::io::Result<bool> {
    super::signature_matches(stream, &SIGNATURE)
}

pub(crate) fn open(stream: &mut dyn ReadStream) -> Result<Codec<'_>, PixportError> {
    JpegDecoder::new(source(stream)?)
        .map(Codec::Jpeg)
        .map_err(load_error)
}

pub(crate) fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    quality: u8,
    icc_profile: Option<&[u8]>,
) -> Result<Vec<u8>, PixportError> {
    let color = match format {
        PixelFormat::R8 | PixelFormat::Rgb8 => extended_color_type(format),
        _ => None,
    }
    .ok_or_else(|| unstorable(format, "JPEG"))?;

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    attach_icc(&mut encoder, icc_profile, "JPEG")?;
    encoder
        .write_image(pixels, width, height, color)
        .map_err(write_error)?;
    Ok(out)
}
