//! # pixport
//!
//! Format-agnostic image I/O: detect what a byte stream holds, decode it
//! into one of 16 canonical pixel formats, convert between those formats,
//! and write pixels back out as PNG, JPEG, TGA or OpenEXR.
//!
//! Bitstream work is delegated to the [`image`] crate's codecs, and to the
//! [`exr`] crate for OpenEXR. This crate owns detection, the pixel format
//! model, conversion, and picking a pixel format each file format can
//! actually store.
//!
//! ## Pixel formats
//!
//! | channels | 8-bit   | 16-bit   | f16       | f32       |
//! |----------|---------|----------|-----------|-----------|
//! | 1        | `R8`    | `R16`    | `RF16`    | `RF32`    |
//! | 2        | `Rg8`   | `Rg16`   | `RgF16`   | `RgF32`   |
//! | 3        | `Rgb8`  | `Rgb16`  | `RgbF16`  | `RgbF32`  |
//! | 4        | `Rgba8` | `Rgba16` | `RgbaF16` | `RgbaF32` |
//!
//! Integer channels are unsigned normalized; multi-byte samples are native
//! endian in every buffer the crate reads or writes.
//!
//! ## Usage
//!
//! ```no_run
//! use pixport::{EncodeRequest, PixelFormat, Unstoppable};
//! use std::io::Cursor;
//!
//! let mut input = Cursor::new(std::fs::read("input.png")?);
//! let mut handle = pixport::open(&mut input)?;
//! println!("{:?}", handle.info());
//!
//! // Decode straight to RGBA f32, whatever the file holds.
//! let mut pixels = vec![0u8; handle.buffer_len(Some(PixelFormat::RgbaF32))?];
//! handle.decode(&mut pixels, Some(PixelFormat::RgbaF32))?;
//! let (w, h) = (handle.info().width, handle.info().height);
//! handle.close();
//!
//! // TGA stores 8-bit only; the encoder converts.
//! let mut output = Cursor::new(Vec::new());
//! EncodeRequest::tga().write(&pixels, w, h, PixelFormat::RgbaF32, &mut output, Unstoppable)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Errors
//!
//! Every fallible call returns [`PixportError`]. [`PixportError::kind`]
//! groups errors into stable status classes with integer codes, and
//! [`last_error_details`] returns the message of the most recent failure on
//! the calling thread.

#![forbid(unsafe_code)]

mod codec;
mod convert;
mod decode;
mod encode;
mod error;
mod format;
mod limits;
mod pixel;
mod registry;
mod stream;

pub use codec::png::{PngCompression, PngFilter};
pub use convert::{convert, convert_codes, convert_with_stop};
#[cfg(feature = "rgb")]
pub use decode::DecodePixel;
pub use decode::{DecodeOutput, HandleState, ImageHandle, ImageInfo};
pub use encode::{EncodeRequest, write_image};
pub use enough::{Stop, StopReason, Unstoppable};
pub use error::{ErrorKind, PixportError, last_error_details};
pub use format::{FileFormat, FormatFlags, is_format_supported, resolve_write_format};
pub use limits::Limits;
pub use pixel::{ChannelEncoding, FormatDetails, PixelFormat, describe_format};
pub use registry::{LoaderRegistration, LoaderRegistry, OpenRequest, open};
pub use stream::{CallbackStream, Callbacks, ReadStream, Stream, WriteStream};
