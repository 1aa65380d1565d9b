//! Outer compression transforms.
//!
//! A transform wraps the archive byte stream on its way in or out and is
//! selected by name ("gzip", "bzip2", "xz", "zstd"). The codecs themselves
//! live in their crates; this module only adapts them to one bidirectional
//! interface so the entry pipeline never needs to know which one is active.
//! An unknown name fails before any entry processing begins; an absent name
//! means the stream passes through unchanged.

use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::{Error, Result};
use crate::fsx;

/// Compression formats the transform layer can construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl CompressionFormat {
    /// Resolve an operation-level format identifier.
    ///
    /// `None`/empty means "no transform"; anything unrecognized is fatal
    /// before the first entry is touched.
    pub fn from_name(name: Option<&str>) -> Result<Option<Self>> {
        let Some(name) = name else { return Ok(None) };
        if name.is_empty() {
            return Ok(None);
        }
        match name.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Some(Self::Gzip)),
            "bzip2" | "bz2" => Ok(Some(Self::Bzip2)),
            "xz" | "lzma" => Ok(Some(Self::Xz)),
            "zstd" | "zst" => Ok(Some(Self::Zstd)),
            _ => Err(Error::UnsupportedCompression(name.to_string())),
        }
    }
}

/// Write-side transform. `finish` must be called so codec trailers are
/// flushed before the underlying stream is dropped.
pub enum Encoder<W: Write> {
    Passthrough(W),
    Gzip(GzEncoder<W>),
    Bzip2(BzEncoder<W>),
    Xz(XzEncoder<W>),
    Zstd(zstd::stream::Encoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W, format: Option<CompressionFormat>) -> io::Result<Self> {
        Ok(match format {
            None => Self::Passthrough(writer),
            Some(CompressionFormat::Gzip) => {
                Self::Gzip(GzEncoder::new(writer, flate2::Compression::default()))
            }
            Some(CompressionFormat::Bzip2) => {
                Self::Bzip2(BzEncoder::new(writer, bzip2::Compression::default()))
            }
            Some(CompressionFormat::Xz) => Self::Xz(XzEncoder::new(writer, 6)),
            Some(CompressionFormat::Zstd) => Self::Zstd(zstd::stream::Encoder::new(writer, 0)?),
        })
    }

    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Passthrough(w) => Ok(w),
            Self::Gzip(e) => e.finish(),
            Self::Bzip2(e) => e.finish(),
            Self::Xz(e) => e.finish(),
            Self::Zstd(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(w) => w.write(buf),
            Self::Gzip(e) => e.write(buf),
            Self::Bzip2(e) => e.write(buf),
            Self::Xz(e) => e.write(buf),
            Self::Zstd(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Passthrough(w) => w.flush(),
            Self::Gzip(e) => e.flush(),
            Self::Bzip2(e) => e.flush(),
            Self::Xz(e) => e.flush(),
            Self::Zstd(e) => e.flush(),
        }
    }
}

/// Read-side transform.
pub enum Decoder<R: Read> {
    Passthrough(R),
    Gzip(GzDecoder<R>),
    Bzip2(BzDecoder<R>),
    Xz(XzDecoder<R>),
    Zstd(zstd::stream::Decoder<'static, BufReader<R>>),
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R, format: Option<CompressionFormat>) -> io::Result<Self> {
        Ok(match format {
            None => Self::Passthrough(reader),
            Some(CompressionFormat::Gzip) => Self::Gzip(GzDecoder::new(reader)),
            Some(CompressionFormat::Bzip2) => Self::Bzip2(BzDecoder::new(reader)),
            Some(CompressionFormat::Xz) => Self::Xz(XzDecoder::new(reader)),
            Some(CompressionFormat::Zstd) => Self::Zstd(zstd::stream::Decoder::new(reader)?),
        })
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(r) => r.read(buf),
            Self::Gzip(d) => d.read(buf),
            Self::Bzip2(d) => d.read(buf),
            Self::Xz(d) => d.read(buf),
            Self::Zstd(d) => d.read(buf),
        }
    }
}

/// Compress a raw byte stream: input file or stdin to output file or stdout.
pub fn compress_stream(
    format: CompressionFormat,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let mut reader = fsx::open_input(input)?;
    let writer = fsx::open_output(output)?;
    let mut encoder = Encoder::new(writer, Some(format))?;
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Decompress a raw byte stream, the inverse of [`compress_stream`].
pub fn decompress_stream(
    format: CompressionFormat,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let reader = fsx::open_input(input)?;
    let mut decoder = Decoder::new(reader, Some(format))?;
    let mut writer = fsx::open_output(output)?;
    io::copy(&mut decoder, &mut writer)?;
    writer.flush()?;
    Ok(())
}
