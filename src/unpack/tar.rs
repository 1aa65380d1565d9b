//! Tar extraction loop.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fsx;
use crate::select::NameFilter;
use crate::transform::{CompressionFormat, Decoder};

use super::{dest_path, place_symlink, restore_file_metadata, write_file_content, ExtractOptions};

/// File-type bits a symlink carries in a mode field.
const S_IFLNK: u32 = 0o120000;

enum StoredKind {
    Regular,
    Directory,
    Symlink { target: PathBuf },
}

/// Extract a tar archive, undoing the optional outer compression transform
/// first. Entries are visited in archive order; unread content is skipped
/// when the cursor advances.
pub fn extract_tar(options: &ExtractOptions, format: Option<CompressionFormat>) -> Result<usize> {
    let filter = NameFilter::new(&options.includes, &options.excludes, options.case_sensitive)?;
    let input = fsx::open_input(options.input.as_deref())?;
    let decoder = Decoder::new(input, format)?;
    let mut archive = tar::Archive::new(decoder);

    let mut materialized = 0usize;
    for entry in archive.entries().map_err(Error::entry_read)? {
        options.cancel.check()?;
        let mut entry = entry.map_err(Error::entry_read)?;

        let stored = entry
            .path()
            .map_err(Error::entry_read)?
            .to_string_lossy()
            .into_owned();
        if !filter.matches(&stored) {
            debug!("no match, skip: {stored}");
            continue;
        }
        if options.list_only {
            println!("{stored}");
            continue;
        }

        let header = entry.header();
        let mode = header.mode().ok();
        let mtime = header.mtime().ok().map(|secs| secs as i64);
        let entry_type = header.entry_type();
        let link_target = entry
            .link_name()
            .map_err(Error::entry_read)?
            .map(|t| t.into_owned());

        // Collapse the header flags into a closed kind. A directory header
        // whose mode carries the symlink file-type bits is a symlink in
        // disguise (some producers store reparse-point directories that way).
        let kind = if entry_type.is_symlink() {
            let target = link_target.ok_or_else(|| {
                Error::entry_read(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("symlink entry '{stored}' has no link target"),
                ))
            })?;
            StoredKind::Symlink { target }
        } else if entry_type.is_dir() {
            match (mode.map_or(false, |m| m & S_IFLNK == S_IFLNK), link_target) {
                (true, Some(target)) => StoredKind::Symlink { target },
                _ => StoredKind::Directory,
            }
        } else {
            StoredKind::Regular
        };

        let dest_name = options.rename.apply(&stored);
        let Some(dest) = dest_path(&options.dest_dir, dest_name.trim_end_matches('/')) else {
            warn!("entry '{stored}' escapes the output directory, skipped");
            continue;
        };
        debug!("extracting {stored} to {}", dest.display());

        match kind {
            StoredKind::Directory => {
                fs::create_dir_all(&dest)?;
            }
            StoredKind::Symlink { target } => {
                place_symlink(&target, &dest)?;
            }
            StoredKind::Regular => {
                write_file_content(&mut entry, &dest)?;
                restore_file_metadata(&dest, mtime, mode)?;
            }
        }
        materialized += 1;
    }
    Ok(materialized)
}
