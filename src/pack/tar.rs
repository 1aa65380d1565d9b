//! Tar container sink.
//!
//! Headers are synthesized manually so mode, ownership and mtime come from
//! the pipeline's resolution rather than from the filesystem; the `tar`
//! crate takes care of long-name extensions and checksums.

use std::io::{self, Read, Write};

use tar::{Builder, EntryType, Header};
use tracing::debug;

use crate::entry::{EntryDescriptor, EntryKind};
use crate::error::Result;
use crate::fsx;
use crate::transform::{CompressionFormat, Encoder};

use super::{
    select_for_create, unix_seconds, write_entries, CreateOptions, CreateOutcome, EntrySink,
};

pub(crate) struct TarSink<W: Write> {
    builder: Builder<W>,
}

impl<W: Write> TarSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            builder: Builder::new(writer),
        }
    }

    pub(crate) fn finish(self) -> io::Result<W> {
        self.builder.into_inner()
    }
}

impl<W: Write> EntrySink for TarSink<W> {
    fn add_entry(
        &mut self,
        entry: &EntryDescriptor,
        content: Option<&mut dyn Read>,
    ) -> io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_mtime(unix_seconds(entry.mtime));
        header.set_mode(entry.mode);
        if let Some(uid) = entry.uid {
            header.set_uid(uid);
        }
        if let Some(gid) = entry.gid {
            header.set_gid(gid);
        }
        match &entry.kind {
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                self.builder
                    .append_data(&mut header, &entry.name, io::empty())
            }
            EntryKind::Symlink { target } => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                self.builder.append_link(&mut header, &entry.name, target)
            }
            EntryKind::Regular => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(entry.size);
                match content {
                    Some(reader) => self.builder.append_data(&mut header, &entry.name, reader),
                    None => self.builder.append_data(&mut header, &entry.name, io::empty()),
                }
            }
        }
    }
}

/// Create a tar archive, optionally wrapped in an outer compression
/// transform. The format must already be resolved; selection runs before the
/// output stream is opened so a no-match run leaves nothing behind.
pub fn create_tar(
    options: &CreateOptions,
    format: Option<CompressionFormat>,
) -> Result<CreateOutcome> {
    let Some(selection) = select_for_create(options)? else {
        return Ok(CreateOutcome::NoMatches);
    };
    debug!(entries = selection.len(), "tar selection complete");

    let output = fsx::open_output(options.output.as_deref())?;
    let encoder = Encoder::new(output, format)?;
    let mut sink = TarSink::new(encoder);
    let written = write_entries(&mut sink, options, &selection)?;
    sink.finish()?.finish()?.flush()?;
    Ok(CreateOutcome::Archived { entries: written })
}
