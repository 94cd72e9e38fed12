//! Canonical in-memory pixel formats.
//!
//! Every format is a channel count (1–4) combined with one channel encoding.
//! [`PixelFormat::describe`] is the only place channel count and byte width
//! are defined; everything else in the crate asks it.

use crate::error::PixportError;

/// How a single channel is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelEncoding {
    /// 8-bit unsigned normalized integer (0–255 maps to 0.0–1.0).
    U8,
    /// 16-bit unsigned normalized integer (0–65535 maps to 0.0–1.0), native endian.
    U16,
    /// IEEE 754 half-precision float, native endian.
    F16,
    /// IEEE 754 single-precision float, native endian.
    F32,
}

impl ChannelEncoding {
    /// Bytes used by one channel.
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::F32 => 4,
        }
    }

    /// Whether channel values are floats rather than normalized integers.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }
}

/// Static facts about a [`PixelFormat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatDetails {
    pub channels: usize,
    pub bytes_per_channel: usize,
    pub is_float: bool,
}

/// Pixel memory layout: channel count × channel encoding.
///
/// Channels are positional (`R`, `G`, `B`, `A`). Only the fourth channel of
/// a 4-channel format carries alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    R16,
    Rg16,
    Rgb16,
    Rgba16,
    RF16,
    RgF16,
    RgbF16,
    RgbaF16,
    RF32,
    RgF32,
    RgbF32,
    RgbaF32,
}

const fn details(channels: usize, encoding: ChannelEncoding) -> FormatDetails {
    FormatDetails {
        channels,
        bytes_per_channel: encoding.bytes(),
        is_float: encoding.is_float(),
    }
}

// Indexed by `PixelFormat as usize`; order must match the enum.
static TABLE: [(FormatDetails, ChannelEncoding); 16] = {
    use ChannelEncoding::*;
    [
        (details(1, U8), U8),
        (details(2, U8), U8),
        (details(3, U8), U8),
        (details(4, U8), U8),
        (details(1, U16), U16),
        (details(2, U16), U16),
        (details(3, U16), U16),
        (details(4, U16), U16),
        (details(1, F16), F16),
        (details(2, F16), F16),
        (details(3, F16), F16),
        (details(4, F16), F16),
        (details(1, F32), F32),
        (details(2, F32), F32),
        (details(3, F32), F32),
        (details(4, F32), F32),
    ]
};

impl PixelFormat {
    /// All sixteen formats, in code order.
    pub const ALL: [PixelFormat; 16] = [
        Self::R8,
        Self::Rg8,
        Self::Rgb8,
        Self::Rgba8,
        Self::R16,
        Self::Rg16,
        Self::Rgb16,
        Self::Rgba16,
        Self::RF16,
        Self::RgF16,
        Self::RgbF16,
        Self::RgbaF16,
        Self::RF32,
        Self::RgF32,
        Self::RgbF32,
        Self::RgbaF32,
    ];

    /// Integer code meaning "no format".
    pub const INVALID_CODE: i32 = -1;

    /// Channel count, bytes per channel and float-ness.
    pub fn describe(self) -> FormatDetails {
        TABLE[self as usize].0
    }

    /// Channel encoding.
    pub fn encoding(self) -> ChannelEncoding {
        TABLE[self as usize].1
    }

    /// Number of channels.
    pub fn channels(self) -> usize {
        self.describe().channels
    }

    /// Bytes per channel.
    pub fn bytes_per_channel(self) -> usize {
        self.describe().bytes_per_channel
    }

    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        let d = self.describe();
        d.channels * d.bytes_per_channel
    }

    pub fn is_float(self) -> bool {
        self.describe().is_float
    }

    /// Whether the last channel is alpha.
    pub fn has_alpha(self) -> bool {
        self.channels() == 4
    }

    /// Find the format with the given channel count and encoding.
    pub fn from_parts(channels: usize, encoding: ChannelEncoding) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.channels() == channels && f.encoding() == encoding)
    }

    /// Stable integer code (0–15).
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Parse an integer code. `-1` and anything outside 0–15 is rejected.
    pub fn from_code(code: i32) -> Result<Self, PixportError> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| {
                PixportError::BadFormat(format!("pixel format code {code} is not a valid format"))
            })
    }

    /// Buffer size in bytes for a `width` × `height` image in this format.
    pub fn buffer_len(self, width: u32, height: u32) -> Result<usize, PixportError> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(self.bytes_per_pixel()))
            .ok_or(PixportError::DimensionsTooLarge { width, height })
    }
}

/// Look up [`FormatDetails`] for an integer format code.
pub fn describe_format(code: i32) -> Result<FormatDetails, PixportError> {
    crate::error::record(PixelFormat::from_code(code).map(PixelFormat::describe))
}
