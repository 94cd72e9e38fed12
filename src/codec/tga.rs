//! TGA: no magic number, so detection sanity-checks the 18-byte header.
//! Stores 8-bit grey, grey+alpha, RGB and RGBA.

use image::ImageEncoder;
use image::codecs::tga::{TgaDecoder, TgaEncoder};

use super::{Codec, extended_color_type, load_error, source, unstorable, write_error};
use crate::error::PixportError;
use crate::pixel::PixelFormat;
use crate::stream::{ReadStream, peek};

const HEADER_LEN: usize = 18;

pub(crate) fn detect(stream: &mut dyn ReadStream) -> std::io::Result<bool> {
    let mut header = [0u8; HEADER_LEN];
    if peek(stream, &mut header)? < HEADER_LEN {
        return Ok(false);
    }
    Ok(header_is_plausible(&header))
}

fn header_is_plausible(h: &[u8; HEADER_LEN]) -> bool {
    let color_map_type = h[1];
    let image_type = h[2];
    let color_map_bits = h[7];
    let width = u16::from_le_bytes([h[12], h[13]]);
    let height = u16::from_le_bytes([h[14], h[15]]);
    let pixel_bits = h[16];

    let mapped = match color_map_type {
        0 => false,
        1 => true,
        _ => return false,
    };
    if mapped {
        // Colour-mapped, raw or RLE.
        if !matches!(image_type, 1 | 9) || !matches!(color_map_bits, 15 | 16 | 24 | 32) {
            return false;
        }
        if !matches!(pixel_bits, 8 | 16) {
            return false;
        }
    } else {
        // Truecolour or greyscale, raw or RLE.
        if !matches!(image_type, 2 | 3 | 10 | 11) {
            return false;
        }
        if !matches!(pixel_bits, 8 | 15 | 16 | 24 | 32) {
            return false;
        }
    }
    width > 0 && height > 0
}

pub(crate) fn open(stream: &mut dyn ReadStream) -> Result<Codec<'_>, PixportError> {
    TgaDecoder::new(source(stream)?)
        .map(Codec::Tga)
        .map_err(load_error)
}

pub(crate) fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>, PixportError> {
    let color = match format {
        PixelFormat::R8 | PixelFormat::Rg8 | PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
            extended_color_type(format)
        }
        _ => None,
    }
    .ok_or_else(|| unstorable(format, "TGA"))?;

    let mut out = Vec::new();
    TgaEncoder::new(&mut out)
        .write_image(pixels, width, height, color)
        .map_err(write_error)?;
    Ok(out)
}
