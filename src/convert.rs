//! Pixel format conversion.
//!
//! Every channel passes through a normalized `f32`: integer channels map
//! linearly onto `[0, 1]` (`v / (2^bits - 1)`), float channels are carried
//! as-is. Writing an integer channel rounds to nearest and clamps; NaN
//! becomes 0. Channels are copied by position; missing channels are filled
//! with 0, except alpha of a 4-channel target which is filled with 1.

use enough::{Stop, Unstoppable};
use half::f16;

use crate::error::PixportError;
use crate::pixel::{ChannelEncoding, PixelFormat};

/// Convert `width` × `height` pixels from `from` to `to`.
///
/// `src` and `dst` must hold at least `from.buffer_len(width, height)` and
/// `to.buffer_len(width, height)` bytes respectively.
pub fn convert(
    src: &[u8],
    dst: &mut [u8],
    width: u32,
    height: u32,
    from: PixelFormat,
    to: PixelFormat,
) -> Result<(), PixportError> {
    convert_with_stop(src, dst, width, height, from, to, Unstoppable)
}

/// [`convert`] with a cancellation token, checked every 16 rows.
pub fn convert_with_stop(
    src: &[u8],
    dst: &mut [u8],
    width: u32,
    height: u32,
    from: PixelFormat,
    to: PixelFormat,
    stop: impl Stop,
) -> Result<(), PixportError> {
    crate::error::record(
        convert_pixels(src, dst, width, height, from, to, &stop)
            .map_err(PixportError::while_converting),
    )
}

/// Convert between two integer format codes, rejecting invalid codes.
pub fn convert_codes(
    src: &[u8],
    dst: &mut [u8],
    width: u32,
    height: u32,
    from: i32,
    to: i32,
) -> Result<(), PixportError> {
    let formats = PixelFormat::from_code(from).and_then(|f| Ok((f, PixelFormat::from_code(to)?)));
    let (from, to) = crate::error::record(formats)?;
    convert(src, dst, width, height, from, to)
}

pub(crate) fn convert_pixels(
    src: &[u8],
    dst: &mut [u8],
    width: u32,
    height: u32,
    from: PixelFormat,
    to: PixelFormat,
    stop: &dyn Stop,
) -> Result<(), PixportError> {
    let src_len = from.buffer_len(width, height)?;
    let dst_len = to.buffer_len(width, height)?;
    if src.len() < src_len {
        return Err(PixportError::BufferTooSmall {
            needed: src_len,
            actual: src.len(),
        });
    }
    if dst.len() < dst_len {
        return Err(PixportError::BufferTooSmall {
            needed: dst_len,
            actual: dst.len(),
        });
    }
    if src_len == 0 {
        return Ok(());
    }

    stop.check()?;

    if from == to {
        dst[..dst_len].copy_from_slice(&src[..src_len]);
        return Ok(());
    }

    log::trace!("converting {width}x{height} pixels {from:?} -> {to:?}");

    let src_enc = from.encoding();
    let dst_enc = to.encoding();
    let src_channels = from.channels();
    let dst_channels = to.channels();
    let src_bpp = from.bytes_per_pixel();
    let dst_bpp = to.bytes_per_pixel();
    let w = width as usize;

    let src_rows = src[..src_len].chunks_exact(w * src_bpp);
    let dst_rows = dst[..dst_len].chunks_exact_mut(w * dst_bpp);
    for (row_idx, (src_row, dst_row)) in src_rows.zip(dst_rows).enumerate() {
        if row_idx % 16 == 0 {
            stop.check()?;
        }
        for (sp, dp) in src_row
            .chunks_exact(src_bpp)
            .zip(dst_row.chunks_exact_mut(dst_bpp))
        {
            for c in 0..dst_channels {
                let v = if c < src_channels {
                    read_channel(sp, c, src_enc)
                } else {
                    fill_value(to, c)
                };
                write_channel(dp, c, dst_enc, v);
            }
        }
    }

    Ok(())
}

fn fill_value(to: PixelFormat, channel: usize) -> f32 {
    if to.has_alpha() && channel == 3 {
        1.0
    } else {
        0.0
    }
}

#[inline]
fn read_channel(pixel: &[u8], channel: usize, enc: ChannelEncoding) -> f32 {
    match enc {
        ChannelEncoding::U8 => f32::from(pixel[channel]) / 255.0,
        ChannelEncoding::U16 => {
            let o = channel * 2;
            f32::from(u16::from_ne_bytes([pixel[o], pixel[o + 1]])) / 65535.0
        }
        ChannelEncoding::F16 => {
            let o = channel * 2;
            f16::from_bits(u16::from_ne_bytes([pixel[o], pixel[o + 1]])).to_f32()
        }
        ChannelEncoding::F32 => {
            let o = channel * 4;
            f32::from_ne_bytes([pixel[o], pixel[o + 1], pixel[o + 2], pixel[o + 3]])
        }
    }
}

#[inline]
fn write_channel(pixel: &mut [u8], channel: usize, enc: ChannelEncoding, v: f32) {
    match enc {
        ChannelEncoding::U8 => pixel[channel] = quantize(v, 255.0) as u8,
        ChannelEncoding::U16 => {
            let o = channel * 2;
            let q = quantize(v, 65535.0) as u16;
            pixel[o..o + 2].copy_from_slice(&q.to_ne_bytes());
        }
        ChannelEncoding::F16 => {
            let o = channel * 2;
            pixel[o..o + 2].copy_from_slice(&f16::from_f32(v).to_bits().to_ne_bytes());
        }
        ChannelEncoding::F32 => {
            let o = channel * 4;
            pixel[o..o + 4].copy_from_slice(&v.to_ne_bytes());
        }
    }
}

/// Scale a normalized value to `[0, max]`, rounding to nearest.
#[inline]
fn quantize(v: f32, max: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    (v.clamp(0.0, 1.0) * max).round()
}
