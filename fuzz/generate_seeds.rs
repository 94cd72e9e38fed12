#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn main() {
    use std::fs;
    let dir = "fuzz/corpus/fuzz_decode";
    fs::create_dir_all(dir).unwrap();

    // Uncompressed truecolour TGA 2x1, 24-bit BGR
    let mut tga = vec![0u8; 18];
    tga[2] = 2; // image type: truecolour
    tga[12..14].copy_from_slice(&2u16.to_le_bytes());
    tga[14..16].copy_from_slice(&1u16.to_le_bytes());
    tga[16] = 24;
    tga[17] = 0x20; // top-left origin
    tga.extend_from_slice(&[0x00, 0x00, 0xff, 0x00, 0xff, 0x00]);
    fs::write(format!("{dir}/tga_2x1.tga"), tga).unwrap();

    // Greyscale TGA 1x1
    let mut grey = vec![0u8; 18];
    grey[2] = 3;
    grey[12] = 1;
    grey[14] = 1;
    grey[16] = 8;
    grey.push(0x80);
    fs::write(format!("{dir}/tga_grey_1x1.tga"), grey).unwrap();

    // Signatures alone, and signatures followed by junk
    let png_sig = b"\x89PNG\r\n\x1a\n";
    fs::write(format!("{dir}/png_sig.bin"), png_sig).unwrap();
    let mut png_junk = png_sig.to_vec();
    png_junk.extend_from_slice(b"\x00\x00\x00\x0dIHDR\x00\x00\x00\x01\x00\x00\x00\x01\x08\x00");
    fs::write(format!("{dir}/png_short_ihdr.bin"), png_junk).unwrap();
    fs::write(format!("{dir}/jpeg_soi.bin"), b"\xff\xd8\xff\xe0\x00\x10JFIF\x00").unwrap();
    fs::write(format!("{dir}/exr_magic.bin"), b"\x76\x2f\x31\x01\x02\x00\x00\x00").unwrap();

    // Edge cases
    fs::write(format!("{dir}/empty.bin"), b"").unwrap();
    fs::write(format!("{dir}/ascii.bin"), b"not an image at all, just text").unwrap();

    println!("Generated seed corpus in {dir}/");
}
