use std::io::Cursor;

use pixport::*;

fn noise_pattern(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    let mut state: u32 = 0xDEAD_BEEF;
    for b in bytes.iter_mut() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        *b = state as u8;
    }
    bytes
}

fn f32_values(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn write_to_vec(file: FileFormat, pixels: &[u8], w: u32, h: u32, format: PixelFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    write_image(file, pixels, w, h, format, &mut out).unwrap();
    out.into_inner()
}

/// Open, check the native format, decode without conversion.
fn reopen(data: Vec<u8>, file: FileFormat, native: PixelFormat) -> Vec<u8> {
    let mut stream = Cursor::new(data);
    let mut handle = open(&mut stream).unwrap();
    assert_eq!(handle.file_format(), file);
    assert_eq!(handle.native_format(), native);
    let mut pixels = vec![0u8; handle.buffer_len(None).unwrap()];
    handle.decode(&mut pixels, None).unwrap();
    handle.close();
    pixels
}

// ── End-to-end scenarios ─────────────────────────────────────────────

#[test]
fn exr_rgb_f32_is_bit_exact() {
    let (w, h) = (64u32, 32u32);
    let reference: Vec<u8> = (0..w * h * 3)
        .map(|i| (i as f32 * 0.37).sin() * 4.0 - 0.5)
        .flat_map(f32::to_ne_bytes)
        .collect();
    let file = write_to_vec(FileFormat::Exr, &reference, w, h, PixelFormat::RgbF32);

    let mut stream = Cursor::new(file);
    let mut handle = open(&mut stream).unwrap();
    let info = handle.info().clone();
    assert_eq!((info.width, info.height), (64, 32));
    assert_eq!(info.format, PixelFormat::RgbF32);
    assert_eq!((info.channels, info.bytes_per_channel, info.is_float), (3, 4, true));

    let mut dest = vec![0u8; 64 * 32 * 3 * 4];
    handle.decode(&mut dest, None).unwrap();
    assert_eq!(dest, reference);
}

#[test]
fn sixteen_bit_downgraded_by_eight_bit_target() {
    let (w, h) = (9u32, 7u32);
    let source = noise_pattern(PixelFormat::R16.buffer_len(w, h).unwrap());
    let png = write_to_vec(FileFormat::Png, &source, w, h, PixelFormat::R16);

    let mut stream = Cursor::new(png);
    let mut handle = open(&mut stream).unwrap();
    assert_eq!(handle.native_format(), PixelFormat::R16);
    let mut decoded = vec![0u8; handle.buffer_len(Some(PixelFormat::R16)).unwrap()];
    handle.decode(&mut decoded, Some(PixelFormat::R16)).unwrap();
    assert_eq!(decoded, source);

    assert_eq!(resolve_write_format(FileFormat::Tga, PixelFormat::R16), PixelFormat::R8);
    let tga = write_to_vec(FileFormat::Tga, &decoded, w, h, PixelFormat::R16);
    let narrowed = reopen(tga, FileFormat::Tga, PixelFormat::R8);

    let mut expected = vec![0u8; (w * h) as usize];
    convert(&source, &mut expected, w, h, PixelFormat::R16, PixelFormat::R8).unwrap();
    assert_eq!(narrowed, expected);
}

#[test]
fn eight_bit_only_targets_truth_table() {
    for file in [FileFormat::Tga, FileFormat::Jpeg] {
        assert!(is_format_supported(file, FormatFlags::BITS_8));
        assert!(!is_format_supported(file, FormatFlags::BITS_16));
        assert!(!is_format_supported(file, FormatFlags::BITS_32 | FormatFlags::FLOAT));
    }
}

// ── Lossless formats ─────────────────────────────────────────────────

#[test]
fn png_stores_every_integer_format() {
    for &format in FileFormat::Png.capabilities() {
        let pixels = noise_pattern(format.buffer_len(13, 5).unwrap());
        let png = write_to_vec(FileFormat::Png, &pixels, 13, 5, format);
        assert_eq!(reopen(png, FileFormat::Png, format), pixels, "{format:?}");
    }
}

#[test]
fn png_float_input_written_as_16_bit() {
    let values = [0.0f32, 0.25, 0.5, 1.0, 1.5, -0.5];
    let pixels: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let png = write_to_vec(FileFormat::Png, &pixels, 2, 1, PixelFormat::RgbF32);
    let decoded = reopen(png, FileFormat::Png, PixelFormat::Rgb16);
    let samples: Vec<u16> = decoded
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(samples, [0, 16384, 32768, 65535, 65535, 0]);
}

#[test]
fn png_compression_and_filter_options() {
    let pixels = noise_pattern(PixelFormat::Rgba8.buffer_len(16, 16).unwrap());
    for (compression, filter) in [
        (PngCompression::Fast, PngFilter::None),
        (PngCompression::Best, PngFilter::Paeth),
        (PngCompression::Default, PngFilter::Adaptive),
    ] {
        let png = EncodeRequest::png()
            .with_png_compression(compression)
            .with_png_filter(filter)
            .encode(&pixels, 16, 16, PixelFormat::Rgba8, Unstoppable)
            .unwrap();
        assert_eq!(reopen(png, FileFormat::Png, PixelFormat::Rgba8), pixels);
    }
}

#[test]
fn explicit_output_format_overrides_resolution() {
    let values = [0.0f32, 0.5, 1.0, 0.25, 0.75, 1.0];
    let pixels: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let request = EncodeRequest::png().with_output_format(PixelFormat::Rgb8);
    assert_eq!(request.write_format(PixelFormat::RgbF32), PixelFormat::Rgb8);
    let png = request
        .encode(&pixels, 2, 1, PixelFormat::RgbF32, Unstoppable)
        .unwrap();
    assert_eq!(
        reopen(png, FileFormat::Png, PixelFormat::Rgb8),
        [0, 128, 255, 64, 191, 255]
    );

    let gray = [10u8, 200];
    let png = EncodeRequest::png()
        .with_output_format(PixelFormat::Rgba16)
        .encode(&gray, 2, 1, PixelFormat::R8, Unstoppable)
        .unwrap();
    let decoded = reopen(png, FileFormat::Png, PixelFormat::Rgba16);
    assert_eq!(decoded.len(), 2 * 4 * 2);
}

#[test]
fn output_format_outside_capabilities_rejected() {
    for (file, format) in [
        (FileFormat::Png, PixelFormat::RgbF32),
        (FileFormat::Tga, PixelFormat::Rgb16),
        (FileFormat::Exr, PixelFormat::Rgb8),
        (FileFormat::Jpeg, PixelFormat::Rgba8),
    ] {
        let mut out = Cursor::new(Vec::new());
        let err = EncodeRequest::new(file)
            .with_output_format(format)
            .write(&[0; 16], 1, 1, PixelFormat::Rgba8, &mut out, Unstoppable)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncodeArgs, "{file:?} {format:?}");
        assert!(out.into_inner().is_empty());
    }
}

#[test]
fn icc_profile_written_and_reopened() {
    let profile: Vec<u8> = (0..=255u8).cycle().take(600).collect();
    let pixels = noise_pattern(PixelFormat::Rgb8.buffer_len(8, 8).unwrap());
    for request in [EncodeRequest::png(), EncodeRequest::jpeg()] {
        let file = request
            .with_icc_profile(&profile)
            .encode(&pixels, 8, 8, PixelFormat::Rgb8, Unstoppable)
            .unwrap();
        let mut stream = Cursor::new(file);
        let handle = open(&mut stream).unwrap();
        assert_eq!(handle.file_format(), request.file_format());
        assert_eq!(handle.info().icc_profile.as_deref(), Some(&profile[..]));
    }
}

#[test]
fn icc_profile_rejected_where_unsupported() {
    let profile = [1u8, 2, 3, 4];
    for file in [FileFormat::Tga, FileFormat::Exr] {
        let err = EncodeRequest::new(file)
            .with_icc_profile(&profile)
            .encode(&[0, 0, 0], 1, 1, PixelFormat::Rgb8, Unstoppable)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncodeArgs);
    }
}

#[test]
fn tga_eight_bit_roundtrips() {
    for format in [
        PixelFormat::R8,
        PixelFormat::Rg8,
        PixelFormat::Rgb8,
        PixelFormat::Rgba8,
    ] {
        let pixels = noise_pattern(format.buffer_len(11, 4).unwrap());
        let tga = write_to_vec(FileFormat::Tga, &pixels, 11, 4, format);
        assert_eq!(reopen(tga, FileFormat::Tga, format), pixels, "{format:?}");
    }
}

#[test]
fn exr_widens_integer_input() {
    let pixels = [0u8, 51, 255, 102];
    let exr = write_to_vec(FileFormat::Exr, &pixels, 2, 2, PixelFormat::R8);
    let decoded = reopen(exr, FileFormat::Exr, PixelFormat::RF16);
    let samples: Vec<u16> = decoded
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect();
    let expected: Vec<u16> = pixels
        .iter()
        .map(|&v| half::f16::from_f32(f32::from(v) / 255.0).to_bits())
        .collect();
    assert_eq!(samples, expected);
}

#[test]
fn exr_half_float_is_bit_exact() {
    let (w, h) = (7u32, 5u32);
    let reference: Vec<u8> = (0..w * h * 3)
        .map(|i| half::f16::from_f32((i as f32 * 0.61).cos() * 2.0))
        .flat_map(|v| v.to_bits().to_ne_bytes())
        .collect();
    assert_eq!(
        resolve_write_format(FileFormat::Exr, PixelFormat::RgbF16),
        PixelFormat::RgbF16
    );
    let exr = write_to_vec(FileFormat::Exr, &reference, w, h, PixelFormat::RgbF16);
    assert_eq!(reopen(exr, FileFormat::Exr, PixelFormat::RgbF16), reference);
}

#[test]
fn exr_luminance_alpha_keeps_channel_order() {
    let values = [0.25f32, 1.0, -3.5, 0.0, 8.0, 0.5];
    let pixels: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let exr = write_to_vec(FileFormat::Exr, &pixels, 3, 1, PixelFormat::RgF32);
    let decoded = reopen(exr, FileFormat::Exr, PixelFormat::RgF32);
    assert_eq!(f32_values(&decoded), values);
}

#[test]
fn exr_capability_queries() {
    assert!(is_format_supported(FileFormat::Exr, FormatFlags::BITS_16 | FormatFlags::FLOAT));
    assert!(is_format_supported(FileFormat::Exr, FormatFlags::BITS_32 | FormatFlags::FLOAT));
    assert!(!is_format_supported(FileFormat::Exr, FormatFlags::BITS_8));
    assert_eq!(resolve_write_format(FileFormat::Exr, PixelFormat::R16), PixelFormat::RF16);
    assert_eq!(resolve_write_format(FileFormat::Exr, PixelFormat::Rgb8), PixelFormat::RgbF16);
}

// ── JPEG ─────────────────────────────────────────────────────────────

#[test]
fn jpeg_flat_colour_survives() {
    let pixels = [100u8, 150, 200].repeat(16 * 16);
    let jpeg = EncodeRequest::jpeg()
        .with_jpeg_quality(100)
        .encode(&pixels, 16, 16, PixelFormat::Rgb8, Unstoppable)
        .unwrap();
    let decoded = reopen(jpeg, FileFormat::Jpeg, PixelFormat::Rgb8);
    for (a, b) in decoded.iter().zip(&pixels) {
        assert!(a.abs_diff(*b) <= 4, "{a} vs {b}");
    }
}

#[test]
fn jpeg_drops_alpha() {
    assert_eq!(
        EncodeRequest::jpeg().write_format(PixelFormat::Rgba8),
        PixelFormat::Rgb8
    );
    let pixels = [60u8, 60, 60, 0].repeat(8 * 8);
    let jpeg = write_to_vec(FileFormat::Jpeg, &pixels, 8, 8, PixelFormat::Rgba8);
    let decoded = reopen(jpeg, FileFormat::Jpeg, PixelFormat::Rgb8);
    assert_eq!(decoded.len(), 8 * 8 * 3);
}

#[test]
fn jpeg_quality_out_of_range() {
    let pixels = [0u8; 3];
    for quality in [0, 101] {
        let err = EncodeRequest::jpeg()
            .with_jpeg_quality(quality)
            .encode(&pixels, 1, 1, PixelFormat::Rgb8, Unstoppable)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncodeArgs);
        assert_eq!(err.code(), -9);
    }
}

// ── Forced decode and handle state ───────────────────────────────────

fn rgba_png() -> (Vec<u8>, Vec<u8>) {
    let pixels = noise_pattern(PixelFormat::Rgba8.buffer_len(6, 4).unwrap());
    let png = write_to_vec(FileFormat::Png, &pixels, 6, 4, PixelFormat::Rgba8);
    (pixels, png)
}

#[test]
fn forced_format_drops_alpha() {
    let (pixels, png) = rgba_png();
    let mut stream = Cursor::new(png);
    let mut handle = open(&mut stream).unwrap();
    let mut rgb = vec![0u8; 6 * 4 * 3];
    handle.decode(&mut rgb, Some(PixelFormat::Rgb8)).unwrap();
    let expected: Vec<u8> = pixels
        .chunks_exact(4)
        .flat_map(|p| [p[0], p[1], p[2]])
        .collect();
    assert_eq!(rgb, expected);
}

#[test]
fn forced_float_is_value_over_255() {
    let (pixels, png) = rgba_png();
    let mut stream = Cursor::new(png);
    let mut handle = open(&mut stream).unwrap();
    let out = handle.decode_to_vec(Some(PixelFormat::RgbaF32)).unwrap();
    assert_eq!(out.format, PixelFormat::RgbaF32);
    for (f, b) in f32_values(out.pixels()).into_iter().zip(&pixels) {
        assert_eq!(f, f32::from(*b) / 255.0);
    }
}

#[test]
fn repeat_decode_is_rejected() {
    let (_, png) = rgba_png();
    let mut stream = Cursor::new(png);
    let mut handle = open(&mut stream).unwrap();
    let mut buf = vec![0u8; handle.buffer_len(None).unwrap()];
    handle.decode(&mut buf, None).unwrap();
    assert_eq!(handle.state(), HandleState::Decoded);

    let err = handle.decode(&mut buf, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadFailedInternal);
    assert_eq!(err.code(), -3);
    assert!(last_error_details().contains("already decoded"));
}

#[test]
fn short_buffer_leaves_handle_usable() {
    let (pixels, png) = rgba_png();
    let mut stream = Cursor::new(png);
    let mut handle = open(&mut stream).unwrap();
    let mut short = vec![0u8; pixels.len() - 1];
    let err = handle.decode(&mut short, None).unwrap_err();
    assert!(matches!(err, PixportError::BufferTooSmall { .. }));
    assert_eq!(handle.state(), HandleState::Created);

    let out = handle.decode_to_vec(None).unwrap();
    assert_eq!(out.pixels(), &pixels[..]);
}

#[test]
fn truncated_body_fails_the_handle() {
    let big = noise_pattern(PixelFormat::Rgba8.buffer_len(32, 32).unwrap());
    let mut file = write_to_vec(FileFormat::Png, &big, 32, 32, PixelFormat::Rgba8);
    file.truncate(file.len() / 2);

    let mut stream = Cursor::new(file);
    let mut handle = open(&mut stream).unwrap();
    let mut buf = vec![0u8; handle.buffer_len(None).unwrap()];
    let err = handle.decode(&mut buf, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadFailedExternal);
    assert_eq!(handle.state(), HandleState::Failed);

    let err = handle.decode(&mut buf, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadFailedInternal);
    handle.close();
}

#[test]
fn memory_limit_checked_before_conversion() {
    let (_, png) = rgba_png();
    let limits = Limits {
        max_memory_bytes: Some(32),
        ..Default::default()
    };
    let mut stream = Cursor::new(png);
    let mut handle = OpenRequest::new().with_limits(&limits).open(&mut stream).unwrap();
    let err = handle.decode_to_vec(Some(PixelFormat::R8)).unwrap_err();
    assert!(matches!(err, PixportError::LimitExceeded(_)));
    assert_eq!(handle.state(), HandleState::Created);
}

#[test]
fn no_icc_profile_when_none_written() {
    let (_, png) = rgba_png();
    let mut stream = Cursor::new(png);
    let handle = open(&mut stream).unwrap();
    assert_eq!(handle.info().icc_profile, None);
}

// ── Writer errors and streams ────────────────────────────────────────

#[test]
fn zero_dimensions_rejected() {
    let mut out = Cursor::new(Vec::new());
    let err = write_image(FileFormat::Png, &[], 0, 4, PixelFormat::R8, &mut out).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEncodeArgs);
    assert!(out.into_inner().is_empty());
}

#[test]
fn short_input_rejected() {
    let mut out = Cursor::new(Vec::new());
    let err = write_image(FileFormat::Tga, &[1, 2, 3], 2, 1, PixelFormat::Rgb8, &mut out)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEncodeArgs);
}

#[test]
fn write_limits_report_write_failure() {
    let limits = Limits {
        max_width: Some(4),
        ..Default::default()
    };
    let pixels = [0u8; 8 * 3];
    let err = EncodeRequest::tga()
        .with_limits(&limits)
        .encode(&pixels, 8, 1, PixelFormat::Rgb8, Unstoppable)
        .unwrap_err();
    assert!(matches!(err, PixportError::WriteFailedInternal(_)));
    assert_eq!(err.kind(), ErrorKind::WriteFailedInternal);
    assert_eq!(err.code(), -6);
    assert!(last_error_details().contains("width 8"));
}

struct Halted;

impl Stop for Halted {
    fn check(&self) -> Result<(), StopReason> {
        Err(StopReason::Cancelled)
    }
}

#[test]
fn cancelled_write_leaves_stream_untouched() {
    let mut out = Cursor::new(Vec::new());
    let err = EncodeRequest::png()
        .write(&[0u8; 12], 2, 2, PixelFormat::Rgb8, &mut out, Halted)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(out.into_inner().is_empty());
}

struct Memory {
    data: Vec<u8>,
    pos: usize,
    capacity: usize,
}

fn memory_callbacks() -> Callbacks<Memory> {
    Callbacks {
        read: |m, buf| {
            let n = buf.len().min(m.data.len().saturating_sub(m.pos));
            buf[..n].copy_from_slice(&m.data[m.pos..m.pos + n]);
            m.pos += n;
            n
        },
        write: |m, buf| {
            let n = buf.len().min(m.capacity.saturating_sub(m.pos));
            let end = m.pos + n;
            if m.data.len() < end {
                m.data.resize(end, 0);
            }
            m.data[m.pos..end].copy_from_slice(&buf[..n]);
            m.pos = end;
            n
        },
        tell: |m| m.pos as u64,
        seek: |m, pos| m.pos = pos as usize,
    }
}

#[test]
fn callback_stream_roundtrip() {
    let pixels = noise_pattern(PixelFormat::Rgb8.buffer_len(5, 5).unwrap());
    let mut stream = CallbackStream::new(
        memory_callbacks(),
        Memory {
            data: Vec::new(),
            pos: 0,
            capacity: usize::MAX,
        },
    );
    write_image(FileFormat::Tga, &pixels, 5, 5, PixelFormat::Rgb8, &mut stream).unwrap();
    assert!(!stream.context().data.is_empty());

    stream.seek_to(0).unwrap();
    let mut handle = open(&mut stream).unwrap();
    assert_eq!(handle.file_format(), FileFormat::Tga);
    let out = handle.decode_to_vec(None).unwrap();
    assert_eq!(out.pixels(), &pixels[..]);
}

#[test]
fn full_stream_is_external_write_failure() {
    let pixels = noise_pattern(PixelFormat::Rgba8.buffer_len(8, 8).unwrap());
    let mut stream = CallbackStream::new(
        memory_callbacks(),
        Memory {
            data: Vec::new(),
            pos: 0,
            capacity: 16,
        },
    );
    let err = write_image(FileFormat::Png, &pixels, 8, 8, PixelFormat::Rgba8, &mut stream)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteFailedExternal);
    assert_eq!(err.code(), -5);
    assert!(!last_error_details().is_empty());
}

#[test]
fn last_error_is_overwritten() {
    let mut empty = Cursor::new(Vec::new());
    open(&mut empty).unwrap_err();
    let first = last_error_details();
    describe_format(-1).unwrap_err();
    let second = last_error_details();
    assert_ne!(first, second);
    assert!(second.contains("-1"));
}

#[cfg(feature = "rgb")]
#[test]
fn typed_pixel_view() {
    let (pixels, png) = rgba_png();
    let mut stream = Cursor::new(png);
    let mut handle = open(&mut stream).unwrap();
    let out = handle.decode_to_vec(None).unwrap();
    let typed: &[rgb::RGBA8] = out.as_pixels().unwrap();
    assert_eq!(typed.len(), 24);
    assert_eq!(typed[0].a, pixels[3]);
    assert!(out.as_pixels::<rgb::RGB8>().is_err());
}
