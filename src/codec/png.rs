//! PNG: 8-byte signature, 8/16-bit grey, grey+alpha, RGB and RGBA.

use image::ImageEncoder;
use image::codecs::png::{CompressionType, FilterType, PngDecoder, PngEncoder};

use super::{
    Codec, attach_icc, extended_color_type, load_error, source, unstorable, write_error,
};
use crate::error::PixportError;
use crate::pixel::PixelFormat;
use crate::stream::ReadStream;

pub(crate) const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Deflate effort for PNG output.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PngCompression {
    #[default]
    Default,
    Fast,
    Best,
}

/// Row filter for PNG output.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PngFilter {
    /// No filtering; fastest, largest output.
    None,
    Sub,
    Up,
    Avg,
    Paeth,
    /// Pick a filter per row.
    #[default]
    Adaptive,
}

pub(crate) fn detect(stream: &mut dyn ReadStream) -> std::io::Result<bool> {
    super::signature_matches(stream, &SIGNATURE)
}

pub(crate) fn open(stream: &mut dyn ReadStream) -> Result<Codec<'_>, PixportError> {
    PngDecoder::new(source(stream)?)
        .map(Codec::Png)
        .map_err(load_error)
}

pub(crate) fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    compression: PngCompression,
    filter: PngFilter,
    icc_profile: Option<&[u8]>,
) -> Result<Vec<u8>, PixportError> {
    let color = extended_color_type(format)
        .filter(|_| !format.is_float())
        .ok_or_else(|| unstorable(format, "PNG"))?;

    let compression = match compression {
        PngCompression::Default => CompressionType::Default,
        PngCompression::Fast => CompressionType::Fast,
        PngCompression::Best => CompressionType::Best,
    };
    let filter = match filter {
        PngFilter::None => FilterType::NoFilter,
        PngFilter::Sub => FilterType::Sub,
        PngFilter::Up => FilterType::Up,
        PngFilter::Avg => FilterType::Avg,
        PngFilter::Paeth => FilterType::Paeth,
        PngFilter::Adaptive => FilterType::Adaptive,
    };

    let mut out = Vec::new();
    let mut encoder = PngEncoder::new_with_quality(&mut out, compression, filter);
    attach_icc(&mut encoder, icc_profile, "PNG")?;
    encoder
        .write_image(pixels, width, height, color)
        .map_err(write_error)?;
    Ok(out)
}
