#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use pixport::{Limits, OpenRequest, PixelFormat};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 22),
        max_memory_bytes: Some(1 << 26),
        ..Default::default()
    };

    // Detection, open and decode must never panic
    let mut stream = Cursor::new(data);
    let Ok(mut handle) = OpenRequest::new().with_limits(&limits).open(&mut stream) else {
        return;
    };
    let Ok(len) = handle.buffer_len(Some(PixelFormat::RgbaF32)) else {
        return;
    };
    if len > 1 << 26 {
        return;
    }
    let mut dest = vec![0u8; len];
    let _ = handle.decode_with_stop(&mut dest, Some(PixelFormat::RgbaF32), enough::Unstoppable);
});
