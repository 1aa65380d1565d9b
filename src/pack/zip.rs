//! Zip container sink.
//!
//! Unix permission bits travel in the external attributes and mtimes as DOS
//! timestamps, the way the zip format expects. `ZipWriter` needs a seekable
//! stream, so writing to stdout goes through an anonymous temp file that is
//! copied out once the central directory is finalized.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::entry::{EntryDescriptor, EntryKind};
use crate::error::Result;

use super::{select_for_create, write_entries, CreateOptions, CreateOutcome, EntrySink};

pub(crate) struct ZipSink<W: Write + Seek> {
    writer: ZipWriter<W>,
    level: Option<i32>,
}

impl<W: Write + Seek> ZipSink<W> {
    pub(crate) fn new(writer: W, level: Option<i32>) -> Self {
        Self {
            writer: ZipWriter::new(writer),
            level,
        }
    }

    fn options(&self, entry: &EntryDescriptor) -> FileOptions {
        let mut options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.level)
            .unix_permissions(entry.mode)
            .large_file(entry.size > u32::MAX as u64);
        if let Some(mtime) = dos_datetime(entry.mtime) {
            options = options.last_modified_time(mtime);
        }
        options
    }

    pub(crate) fn finish(mut self) -> io::Result<W> {
        self.writer
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl<W: Write + Seek> EntrySink for ZipSink<W> {
    fn add_entry(
        &mut self,
        entry: &EntryDescriptor,
        content: Option<&mut dyn Read>,
    ) -> io::Result<()> {
        let options = self.options(entry);
        match &entry.kind {
            EntryKind::Directory => self.writer.add_directory(entry.name.as_str(), options)?,
            EntryKind::Symlink { target } => {
                self.writer
                    .add_symlink(entry.name.as_str(), target.to_string_lossy(), options)?
            }
            EntryKind::Regular => {
                self.writer.start_file(entry.name.as_str(), options)?;
                if let Some(reader) = content {
                    io::copy(reader, &mut self.writer)?;
                }
            }
        }
        Ok(())
    }
}

/// Create a zip archive. `level` is the deflate level (0-9); zip carries its
/// compression per entry, so there is no outer transform here.
pub fn create_zip(options: &CreateOptions, level: Option<i32>) -> Result<CreateOutcome> {
    let Some(selection) = select_for_create(options)? else {
        return Ok(CreateOutcome::NoMatches);
    };
    debug!(entries = selection.len(), "zip selection complete");

    match options.output.as_deref() {
        Some(path) => {
            let file = File::create(path)?;
            let mut sink = ZipSink::new(file, level);
            let written = write_entries(&mut sink, options, &selection)?;
            sink.finish()?.flush()?;
            Ok(CreateOutcome::Archived { entries: written })
        }
        None => {
            // Stdout is not seekable: build the archive in a temp file first.
            let mut sink = ZipSink::new(tempfile::tempfile()?, level);
            let written = write_entries(&mut sink, options, &selection)?;
            let mut spool = sink.finish()?;
            spool.seek(SeekFrom::Start(0))?;
            let mut stdout = io::stdout();
            io::copy(&mut spool, &mut stdout)?;
            stdout.flush()?;
            Ok(CreateOutcome::Archived { entries: written })
        }
    }
}

/// Convert an mtime to the zip DOS representation, if it fits the format's
/// 1980..=2107 range.
fn dos_datetime(mtime: SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = mtime.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}
