//! On-disk file formats and what each can store.

use core::ops::{BitOr, BitOrAssign};

use crate::pixel::{ChannelEncoding, PixelFormat};

/// Image file format detected from magic bytes or chosen for writing.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// OpenEXR.
    Exr,
    /// Portable Network Graphics.
    Png,
    /// JPEG (JFIF/EXIF).
    Jpeg,
    /// Truevision TGA.
    Tga,
}

/// Bit-flag query for [`FileFormat::is_supported`].
///
/// Depth flags and type flags compose independently:
/// `FormatFlags::BITS_32 | FormatFlags::FLOAT` asks for 32-bit float storage,
/// `FormatFlags::BITS_16` asks for 16-bit storage of either type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FormatFlags(u8);

impl FormatFlags {
    pub const BITS_8: Self = Self(1);
    pub const BITS_16: Self = Self(1 << 1);
    pub const BITS_32: Self = Self(1 << 2);
    pub const INT: Self = Self(1 << 3);
    pub const FLOAT: Self = Self(1 << 4);

    const DEPTHS: [(Self, usize); 3] = [(Self::BITS_8, 1), (Self::BITS_16, 2), (Self::BITS_32, 4)];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn type_matches(self, format: PixelFormat) -> bool {
        let want_int = self.contains(Self::INT);
        let want_float = self.contains(Self::FLOAT);
        if want_int == want_float {
            return true;
        }
        format.is_float() == want_float
    }
}

impl BitOr for FormatFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FormatFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

static EXR_FORMATS: &[PixelFormat] = &[
    PixelFormat::RF16,
    PixelFormat::RgF16,
    PixelFormat::RgbF16,
    PixelFormat::RgbaF16,
    PixelFormat::RF32,
    PixelFormat::RgF32,
    PixelFormat::RgbF32,
    PixelFormat::RgbaF32,
];

static PNG_FORMATS: &[PixelFormat] = &[
    PixelFormat::R8,
    PixelFormat::Rg8,
    PixelFormat::Rgb8,
    PixelFormat::Rgba8,
    PixelFormat::R16,
    PixelFormat::Rg16,
    PixelFormat::Rgb16,
    PixelFormat::Rgba16,
];

static JPEG_FORMATS: &[PixelFormat] = &[PixelFormat::R8, PixelFormat::Rgb8];

static TGA_FORMATS: &[PixelFormat] = &[
    PixelFormat::R8,
    PixelFormat::Rg8,
    PixelFormat::Rgb8,
    PixelFormat::Rgba8,
];

impl FileFormat {
    /// Every format, in detection order.
    pub const ALL: [FileFormat; 4] = [Self::Exr, Self::Png, Self::Jpeg, Self::Tga];

    /// Stable integer code.
    pub fn code(self) -> i32 {
        match self {
            Self::Exr => 1,
            Self::Png => 2,
            Self::Jpeg => 3,
            Self::Tga => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    /// Canonical lowercase file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Exr => "exr",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Tga => "tga",
        }
    }

    /// Extensions recognised for this format, lowercase.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Exr => &["exr"],
            Self::Png => &["png"],
            Self::Jpeg => &["jpeg", "jpg", "jpe", "jfif"],
            Self::Tga => &["tga", "icb", "vda", "vst"],
        }
    }

    /// Pixel formats this file format can store without conversion.
    pub fn capabilities(self) -> &'static [PixelFormat] {
        match self {
            Self::Exr => EXR_FORMATS,
            Self::Png => PNG_FORMATS,
            Self::Jpeg => JPEG_FORMATS,
            Self::Tga => TGA_FORMATS,
        }
    }

    /// Whether the capability set contains `format`.
    pub fn can_store(self, format: PixelFormat) -> bool {
        self.capabilities().contains(&format)
    }

    /// Answer a bit-depth / type query without opening any stream.
    ///
    /// Every depth flag in `query` must be storable; if no depth flag is
    /// given, any depth satisfying the type flags will do.
    pub fn is_supported(self, query: FormatFlags) -> bool {
        let caps = self.capabilities();
        let mut depths = FormatFlags::DEPTHS
            .iter()
            .filter(|(flag, _)| query.contains(*flag))
            .peekable();

        if depths.peek().is_none() {
            return caps.iter().any(|f| query.type_matches(*f));
        }
        depths.all(|(_, bytes)| {
            caps.iter()
                .any(|f| f.bytes_per_channel() == *bytes && query.type_matches(*f))
        })
    }

    /// The pixel format that will actually be written for `input`.
    ///
    /// Identity when `input` is already storable. Otherwise the channel
    /// count is matched first (widening when the exact count is missing,
    /// narrowing only as a last resort), then the encoding closest to the
    /// input's precision within the format's capability set.
    pub fn resolve_write_format(self, input: PixelFormat) -> PixelFormat {
        let caps = self.capabilities();
        if caps.contains(&input) {
            return input;
        }

        let channels = pick_channels(caps, input.channels());
        let candidates = caps.iter().copied().filter(|f| f.channels() == channels);
        candidates
            .min_by_key(|f| encoding_distance(input.encoding(), f.encoding()))
            .unwrap_or(input)
    }
}

fn pick_channels(caps: &[PixelFormat], wanted: usize) -> usize {
    let available = || caps.iter().map(|f| f.channels());
    if available().any(|c| c == wanted) {
        return wanted;
    }
    available()
        .filter(|&c| c > wanted)
        .min()
        .or_else(|| available().max())
        .unwrap_or(wanted)
}

/// Lower is better. Same int/float nature beats a type change; within one
/// nature, keeping precision beats losing it.
fn encoding_distance(from: ChannelEncoding, to: ChannelEncoding) -> u32 {
    let from_bytes = from.bytes() as i32;
    let to_bytes = to.bytes() as i32;
    let type_penalty = if from.is_float() == to.is_float() { 0 } else { 100 };
    let precision_penalty = if to_bytes >= from_bytes {
        (to_bytes - from_bytes) as u32
    } else {
        // Losing precision: prefer the widest remaining encoding.
        10 + (from_bytes - to_bytes) as u32
    };
    type_penalty + precision_penalty
}

/// The pixel format [`FileFormat::resolve_write_format`] picks.
pub fn resolve_write_format(file_format: FileFormat, input: PixelFormat) -> PixelFormat {
    file_format.resolve_write_format(input)
}

/// Bit-depth / type capability query; see [`FileFormat::is_supported`].
pub fn is_format_supported(file_format: FileFormat, query: FormatFlags) -> bool {
    file_format.is_supported(query)
}
