//! OpenEXR: magic number detection, 1 to 4 channels of f16 or f32.
//!
//! Channels are named the usual way: `Y` (and `A`) for one or two
//! channels, `R`, `G`, `B` (and `A`) for three or four.

use std::io::Read;

use super::{Codec, source};
use crate::error::PixportError;
use crate::pixel::{ChannelEncoding, PixelFormat};
use crate::stream::ReadStream;

pub(crate) const SIGNATURE: [u8; 4] = [0x76, 0x2F, 0x31, 0x01];

pub(crate) fn detect(stream: &mut dyn ReadStream) -> std::io::Result<bool> {
    super::signature_matches(stream, &SIGNATURE)
}

/// Header facts plus the file bytes; pixel data is decoded on demand.
pub(crate) struct ExrFile {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Positions, in the file's channel list, of the channels we output.
    channels: Vec<usize>,
}

pub(crate) fn open(stream: &mut dyn ReadStream) -> Result<Codec<'_>, PixportError> {
    let mut bytes = Vec::new();
    source(stream)?.read_to_end(&mut bytes)?;

    let meta = exr::meta::MetaData::read_from_buffered(&bytes[..], false).map_err(load_error)?;
    let header = meta
        .headers
        .first()
        .ok_or_else(|| PixportError::LoadFailedExternal("EXR file has no layers".into()))?;
    if header.deep {
        return Err(PixportError::LoadFailedExternal(
            "deep EXR data is not supported".into(),
        ));
    }

    let names: Vec<String> = header
        .channels
        .list
        .iter()
        .map(|c| c.name.to_string())
        .collect();
    let channels = select_channels(&names).ok_or_else(|| {
        PixportError::LoadFailedExternal("EXR layer has no channels".into())
    })?;
    let all_half = channels
        .iter()
        .all(|&i| header.channels.list[i].sample_type == exr::meta::attribute::SampleType::F16);
    let encoding = if all_half {
        ChannelEncoding::F16
    } else {
        ChannelEncoding::F32
    };
    let format = PixelFormat::from_parts(channels.len(), encoding).ok_or_else(|| {
        PixportError::LoadFailedExternal(format!("{} EXR channels selected", channels.len()))
    })?;

    let size = header.layer_size;
    let (width, height) = match (u32::try_from(size.0), u32::try_from(size.1)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(PixportError::LoadFailedExternal(format!(
                "EXR layer is {}x{}",
                size.0, size.1
            )));
        }
    };

    Ok(Codec::Exr(ExrFile {
        bytes,
        width,
        height,
        format,
        channels,
    }))
}

/// Colour channels first (`R G B`, else `Y`, else the first non-alpha
/// channel), then `A` if present.
fn select_channels(names: &[String]) -> Option<Vec<usize>> {
    let find = |wanted: &str| names.iter().position(|n| n.eq_ignore_ascii_case(wanted));
    let mut picked = match (find("R"), find("G"), find("B"), find("Y")) {
        (Some(r), Some(g), Some(b), _) => vec![r, g, b],
        (_, _, _, Some(y)) => vec![y],
        _ => {
            let first = names
                .iter()
                .position(|n| !n.eq_ignore_ascii_case("A"))
                .or((!names.is_empty()).then_some(0))?;
            vec![first]
        }
    };
    if let Some(a) = find("A")
        && !picked.contains(&a)
    {
        picked.push(a);
    }
    Some(picked)
}

impl ExrFile {
    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn format(&self) -> PixelFormat {
        self.format
    }

    /// Interleave the selected channels into `buf` in [`Self::format`].
    pub(crate) fn read_image(self, buf: &mut [u8]) -> Result<(), PixportError> {
        let image = read_layer(&self.bytes).map_err(load_error)?;
        let planes = &image.layer_data.channel_data.list;
        let pixel_count = self.width as usize * self.height as usize;
        for &c in &self.channels {
            let plane = planes.get(c).ok_or_else(|| {
                PixportError::LoadFailedExternal("EXR channel list changed while reading".into())
            })?;
            if sample_count(&plane.sample_data) != pixel_count {
                return Err(PixportError::LoadFailedExternal(
                    "subsampled EXR channels are not supported".into(),
                ));
            }
        }

        let bpc = self.format.bytes_per_channel();
        let bpp = self.format.bytes_per_pixel();
        for (slot, &c) in self.channels.iter().enumerate() {
            let samples = &planes[c].sample_data;
            for (i, px) in buf[..pixel_count * bpp].chunks_exact_mut(bpp).enumerate() {
                let out = &mut px[slot * bpc..(slot + 1) * bpc];
                match self.format.encoding() {
                    ChannelEncoding::F16 => {
                        out.copy_from_slice(&half_sample(samples, i).to_bits().to_ne_bytes());
                    }
                    _ => out.copy_from_slice(&float_sample(samples, i).to_ne_bytes()),
                }
            }
        }
        Ok(())
    }
}

type ExrLayer = exr::image::Image<exr::image::Layer<exr::image::AnyChannels<exr::image::FlatSamples>>>;

fn read_layer(bytes: &[u8]) -> exr::error::Result<ExrLayer> {
    use exr::prelude::*;

    read()
        .no_deep_data()
        .largest_resolution_level()
        .all_channels()
        .first_valid_layer()
        .all_attributes()
        .from_buffered(std::io::Cursor::new(bytes))
}

fn sample_count(samples: &exr::image::FlatSamples) -> usize {
    use exr::image::FlatSamples;
    match samples {
        FlatSamples::F16(v) => v.len(),
        FlatSamples::F32(v) => v.len(),
        FlatSamples::U32(v) => v.len(),
    }
}

fn float_sample(samples: &exr::image::FlatSamples, i: usize) -> f32 {
    use exr::image::FlatSamples;
    match samples {
        FlatSamples::F16(v) => v[i].to_f32(),
        FlatSamples::F32(v) => v[i],
        FlatSamples::U32(v) => v[i] as f32,
    }
}

fn half_sample(samples: &exr::image::FlatSamples, i: usize) -> half::f16 {
    use exr::image::FlatSamples;
    match samples {
        FlatSamples::F16(v) => half::f16::from_bits(v[i].to_bits()),
        other => half::f16::from_f32(float_sample(other, i)),
    }
}

fn load_error(e: exr::error::Error) -> PixportError {
    log::warn!("EXR decoder failed: {e}");
    PixportError::LoadFailedExternal(e.to_string())
}

pub(crate) fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>, PixportError> {
    let encoding = format.encoding();
    if !encoding.is_float() {
        return Err(super::unstorable(format, "OpenEXR"));
    }
    let names: &[&str] = match format.channels() {
        1 => &["Y"],
        2 => &["Y", "A"],
        3 => &["R", "G", "B"],
        _ => &["R", "G", "B", "A"],
    };

    let bpc = format.bytes_per_channel();
    let bpp = format.bytes_per_pixel();
    let pixel_count = width as usize * height as usize;
    let pixels = &pixels[..pixel_count * bpp];
    let planes = (0..names.len()).map(|slot| {
        let samples = pixels
            .chunks_exact(bpp)
            .map(|px| &px[slot * bpc..(slot + 1) * bpc]);
        match encoding {
            ChannelEncoding::F16 => exr::image::FlatSamples::F16(
                samples
                    .map(|b| exr::prelude::f16::from_bits(u16::from_ne_bytes([b[0], b[1]])))
                    .collect(),
            ),
            _ => exr::image::FlatSamples::F32(
                samples
                    .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
        }
    });
    let planes: Vec<_> = names.iter().copied().zip(planes).collect();

    write_layer(width as usize, height as usize, planes).map_err(|e| {
        log::warn!("EXR encoder failed: {e}");
        PixportError::WriteFailedExternal(e.to_string())
    })
}

fn write_layer(
    width: usize,
    height: usize,
    planes: Vec<(&str, exr::image::FlatSamples)>,
) -> exr::error::Result<Vec<u8>> {
    use exr::prelude::*;

    let channels = AnyChannels::sort(
        planes
            .into_iter()
            .map(|(name, samples)| AnyChannel::new(name, samples))
            .collect(),
    );
    let layer = Layer::new(
        (width, height),
        LayerAttributes::default(),
        Encoding::FAST_LOSSLESS,
        channels,
    );
    // The writer seeks back to patch offset tables.
    let mut out = std::io::Cursor::new(Vec::new());
    Image::from_layer(layer).write().to_buffered(&mut out)?;
    Ok(out.into_inner())
}
