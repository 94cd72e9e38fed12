//! Loader registry and format detection.
//!
//! Detectors run in registration order against the stream's current
//! offset. Each reads a bounded prefix and puts the stream back where it
//! found it, so later detectors and the chosen decoder see the same bytes.

use std::io;
use std::sync::OnceLock;

use crate::codec::{self, Codec};
use crate::decode::ImageHandle;
use crate::error::{PixportError, record};
use crate::format::FileFormat;
use crate::limits::Limits;
use crate::stream::{ReadStream, peek};

type DetectFn = fn(&mut dyn ReadStream) -> io::Result<bool>;
type OpenFn = for<'s> fn(&'s mut dyn ReadStream) -> Result<Codec<'s>, PixportError>;

/// One registered format handler.
#[derive(Clone, Copy)]
pub struct LoaderRegistration {
    format: FileFormat,
    detect: DetectFn,
    open: OpenFn,
}

impl LoaderRegistration {
    fn of(format: FileFormat) -> Self {
        let (detect, open) = match format {
            FileFormat::Exr => (codec::openexr::detect as DetectFn, codec::openexr::open as OpenFn),
            FileFormat::Png => (codec::png::detect as DetectFn, codec::png::open as OpenFn),
            FileFormat::Jpeg => (codec::jpeg::detect as DetectFn, codec::jpeg::open as OpenFn),
            FileFormat::Tga => (codec::tga::detect as DetectFn, codec::tga::open as OpenFn),
        };
        Self {
            format,
            detect,
            open,
        }
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// Run this loader's detector. The stream position is unchanged on
    /// return, match or not.
    pub fn detect(&self, stream: &mut dyn ReadStream) -> Result<bool, PixportError> {
        Ok((self.detect)(stream)?)
    }
}

impl core::fmt::Debug for LoaderRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoaderRegistration")
            .field("format", &self.format)
            .field("extension", &self.extension())
            .finish()
    }
}

/// Ordered, immutable set of loaders.
///
/// ```
/// use pixport::{FileFormat, LoaderRegistry};
///
/// let registry = LoaderRegistry::none().with(FileFormat::Png);
/// assert!(registry.find(FileFormat::Png).is_some());
/// assert!(registry.find(FileFormat::Tga).is_none());
/// ```
#[derive(Clone, Debug)]
pub struct LoaderRegistry {
    loaders: Vec<LoaderRegistration>,
}

impl LoaderRegistry {
    /// Every built-in loader. Formats with a real magic number come first;
    /// TGA, which has none, is tried last.
    pub fn all() -> Self {
        FileFormat::ALL
            .into_iter()
            .fold(Self::none(), |registry, f| registry.with(f))
    }

    pub fn none() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Append a loader. Registering a format twice keeps the first entry.
    pub fn with(mut self, format: FileFormat) -> Self {
        if self.find(format).is_none() {
            self.loaders.push(LoaderRegistration::of(format));
        }
        self
    }

    /// Process-wide registry of every built-in loader, built on first use.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<LoaderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::all)
    }

    pub fn loaders(&self) -> &[LoaderRegistration] {
        &self.loaders
    }

    pub fn find(&self, format: FileFormat) -> Option<&LoaderRegistration> {
        self.loaders.iter().find(|l| l.format == format)
    }

    /// Look a loader up by file extension, with or without the leading dot.
    pub fn find_by_extension(&self, extension: &str) -> Option<&LoaderRegistration> {
        let ext = extension.strip_prefix('.').unwrap_or(extension);
        self.loaders.iter().find(|l| {
            l.format
                .extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
    }

    /// Identify the stream's format without opening it.
    ///
    /// `Ok(None)` when no loader recognises the bytes; [`PixportError::EmptyInput`]
    /// when there are no bytes at all.
    pub fn detect(&self, stream: &mut dyn ReadStream) -> Result<Option<FileFormat>, PixportError> {
        record(match self.select(stream) {
            Ok(loader) => Ok(Some(loader.format)),
            Err(PixportError::UnsupportedFileType) => Ok(None),
            Err(e) => Err(e),
        })
    }

    /// Detect the format and open a decoder at the stream's current offset.
    pub fn open<'s>(&self, stream: &'s mut dyn ReadStream) -> Result<ImageHandle<'s>, PixportError> {
        OpenRequest::new().with_registry(self).open(stream)
    }

    fn select(&self, stream: &mut dyn ReadStream) -> Result<&LoaderRegistration, PixportError> {
        let mut first = [0u8; 1];
        if peek(stream, &mut first)? == 0 {
            return Err(PixportError::EmptyInput);
        }
        for loader in &self.loaders {
            if loader.detect(stream)? {
                log::debug!("detected {:?}", loader.format);
                return Ok(loader);
            }
        }
        log::debug!("no loader matched among {} registered", self.loaders.len());
        Err(PixportError::UnsupportedFileType)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::all()
    }
}

/// Open configuration: which loaders to try and what limits to enforce.
///
/// ```no_run
/// use pixport::{Limits, OpenRequest};
/// use std::io::Cursor;
///
/// let limits = Limits {
///     max_pixels: Some(16_000_000),
///     ..Default::default()
/// };
/// let mut stream = Cursor::new(std::fs::read("photo.png")?);
/// let handle = OpenRequest::new().with_limits(&limits).open(&mut stream)?;
/// println!("{:?}", handle.info());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenRequest<'a> {
    limits: Option<&'a Limits>,
    registry: Option<&'a LoaderRegistry>,
}

impl<'a> OpenRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Use `registry` instead of [`LoaderRegistry::global`].
    pub fn with_registry(mut self, registry: &'a LoaderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn open<'s>(self, stream: &'s mut dyn ReadStream) -> Result<ImageHandle<'s>, PixportError> {
        record(self.open_inner(stream))
    }

    fn open_inner<'s>(self, stream: &'s mut dyn ReadStream) -> Result<ImageHandle<'s>, PixportError> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => LoaderRegistry::global(),
        };
        let loader = registry.select(stream)?;
        let codec = (loader.open)(stream)?;
        ImageHandle::new(codec, loader.format, self.limits.cloned().unwrap_or_default())
    }
}

/// Open `stream` with every built-in loader and no limits.
pub fn open(stream: &mut dyn ReadStream) -> Result<ImageHandle<'_>, PixportError> {
    OpenRequest::new().open(stream)
}
