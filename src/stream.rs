//! The byte stream boundary.
//!
//! A stream offers read, write, tell and absolute seek. Any
//! `std::io::Read + Seek` type is a [`ReadStream`] and any `Write + Seek`
//! type is a [`WriteStream`]. [`CallbackStream`] adapts four plain
//! functions plus an opaque context value.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Position control shared by readers and writers.
pub trait Stream {
    /// Current absolute offset.
    fn tell(&mut self) -> io::Result<u64>;
    /// Move to an absolute offset.
    fn seek_to(&mut self, pos: u64) -> io::Result<()>;
}

/// A readable stream.
pub trait ReadStream: Stream {
    /// Read up to `buf.len()` bytes, returning how many were read. `0` means
    /// nothing is left.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// A writable stream.
pub trait WriteStream: Stream {
    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<T: Seek> Stream for T {
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(pos)).map(|_| ())
    }
}

impl<T: Read + Seek> ReadStream for T {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

impl<T: Write + Seek> WriteStream for T {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }
}

/// Read until `buf` is full or the stream is exhausted.
pub(crate) fn read_full(stream: &mut dyn ReadStream, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read_bytes(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read a bounded prefix and restore the starting position, whatever the
/// outcome of the read.
pub(crate) fn peek(stream: &mut dyn ReadStream, buf: &mut [u8]) -> io::Result<usize> {
    let start = stream.tell()?;
    let read = read_full(stream, buf);
    stream.seek_to(start)?;
    read
}

/// Write all of `buf`, failing if the stream stops accepting bytes.
pub(crate) fn write_all(stream: &mut dyn WriteStream, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match stream.write_bytes(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "stream accepted no bytes",
                ));
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// `std::io` view of a [`ReadStream`], handed to the external decoders.
///
/// Offsets are relative to where the stream stood when the view was made,
/// so a decoder always sees its file starting at 0.
pub(crate) struct StreamReader<'s> {
    inner: &'s mut dyn ReadStream,
    base: u64,
}

impl<'s> StreamReader<'s> {
    pub(crate) fn new(inner: &'s mut dyn ReadStream) -> io::Result<Self> {
        let base = inner.tell()?;
        Ok(Self { inner, base })
    }
}

impl Read for StreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_bytes(buf)
    }
}

impl Seek for StreamReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let before_start =
            || io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream");
        let target = match pos {
            SeekFrom::Start(p) => self.base.checked_add(p).ok_or_else(before_start)?,
            SeekFrom::Current(delta) => {
                let here = self.inner.tell()?;
                here.checked_add_signed(delta)
                    .filter(|&t| t >= self.base)
                    .ok_or_else(before_start)?
            }
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "stream length is unknown",
                ));
            }
        };
        self.inner.seek_to(target)?;
        Ok(target - self.base)
    }
}

/// Function table for a [`CallbackStream`]. Every function receives the
/// stream's context value.
pub struct Callbacks<C> {
    /// Fill the buffer, returning bytes read (`0` at end of stream).
    pub read: fn(&mut C, &mut [u8]) -> usize,
    /// Consume bytes, returning how many were taken.
    pub write: fn(&mut C, &[u8]) -> usize,
    pub tell: fn(&mut C) -> u64,
    pub seek: fn(&mut C, u64),
}

impl<C> Clone for Callbacks<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Callbacks<C> {}

/// A stream driven by plain functions and an opaque context value.
pub struct CallbackStream<C> {
    callbacks: Callbacks<C>,
    context: C,
}

impl<C> CallbackStream<C> {
    pub fn new(callbacks: Callbacks<C>, context: C) -> Self {
        Self { callbacks, context }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }
}

impl<C> Read for CallbackStream<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok((self.callbacks.read)(&mut self.context, buf).min(buf.len()))
    }
}

impl<C> Write for CallbackStream<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok((self.callbacks.write)(&mut self.context, buf).min(buf.len()))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C> Seek for CallbackStream<C> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p,
            SeekFrom::Current(delta) => {
                let here = (self.callbacks.tell)(&mut self.context);
                here.checked_add_signed(delta).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
                })?
            }
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "callback streams cannot seek from the end",
                ));
            }
        };
        (self.callbacks.seek)(&mut self.context, target);
        Ok(target)
    }
}
