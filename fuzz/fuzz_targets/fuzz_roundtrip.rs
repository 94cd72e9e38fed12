#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use pixport::*;

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 20),
        max_memory_bytes: Some(1 << 24),
        ..Default::default()
    };

    let mut stream = Cursor::new(data);
    let Ok(mut handle) = OpenRequest::new().with_limits(&limits).open(&mut stream) else {
        return;
    };
    let Ok(decoded) = handle.decode_to_vec(None) else {
        return;
    };

    // Lossless targets must give back exactly what they were handed
    for file in [FileFormat::Png, FileFormat::Tga] {
        if !file.can_store(decoded.format) {
            continue;
        }
        let mut out = Cursor::new(Vec::new());
        EncodeRequest::new(file)
            .with_limits(&limits)
            .write(
                decoded.pixels(),
                decoded.width,
                decoded.height,
                decoded.format,
                &mut out,
                enough::Unstoppable,
            )
            .expect("storable format failed to encode");

        let mut reread = Cursor::new(out.into_inner());
        let mut handle2 = open(&mut reread).expect("re-encoded data failed to open");
        let decoded2 = handle2.decode_to_vec(None).expect("re-encoded data failed to decode");

        assert_eq!(decoded2.format, decoded.format);
        assert_eq!(decoded.width, decoded2.width);
        assert_eq!(decoded.height, decoded2.height);
        assert_eq!(decoded.pixels(), decoded2.pixels(), "roundtrip pixel mismatch");
    }
});
