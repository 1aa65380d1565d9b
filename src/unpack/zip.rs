//! Zip extraction loop.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::select::NameFilter;

use super::{dest_path, place_symlink, restore_file_metadata, write_file_content, ExtractOptions};

const S_IFMT: u32 = 0o170000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// Extract a zip archive. The reader needs the central directory, so stdin
/// input is spooled to an anonymous temp file to gain seekability.
pub fn extract_zip(options: &ExtractOptions) -> Result<usize> {
    let filter = NameFilter::new(&options.includes, &options.excludes, options.case_sensitive)?;
    let file = match options.input.as_deref() {
        Some(path) => File::open(path)?,
        None => spool_stdin()?,
    };
    let mut archive = ZipArchive::new(file).map_err(|e| Error::entry_read(e.into()))?;

    let mut materialized = 0usize;
    for index in 0..archive.len() {
        options.cancel.check()?;
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::entry_read(e.into()))?;

        let stored = entry.name().to_string();
        if !filter.matches(&stored) {
            debug!("no match, skip: {stored}");
            continue;
        }
        if options.list_only {
            println!("{stored}");
            continue;
        }

        let dest_name = options.rename.apply(&stored);
        let Some(dest) = dest_path(&options.dest_dir, dest_name.trim_end_matches('/')) else {
            warn!("entry '{stored}' escapes the output directory, skipped");
            continue;
        };
        debug!("extracting {stored} to {}", dest.display());

        let mode = entry.unix_mode();
        if entry.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if mode.map_or(false, |m| m & S_IFMT == S_IFLNK) {
            // Symlink entries store the target string as their content.
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .map_err(Error::entry_read)?;
            place_symlink(Path::new(&target), &dest)?;
        } else {
            write_file_content(&mut entry, &dest)?;
            let mtime = dos_to_unix_seconds(entry.last_modified());
            // Only apply permission bits stored for a regular Unix file.
            let perm = mode.filter(|m| m & S_IFMT == S_IFREG || m & S_IFMT == 0);
            restore_file_metadata(&dest, mtime, perm)?;
        }
        materialized += 1;
    }
    Ok(materialized)
}

fn spool_stdin() -> io::Result<File> {
    let mut spool = tempfile::tempfile()?;
    io::copy(&mut io::stdin(), &mut spool)?;
    spool.seek(SeekFrom::Start(0))?;
    Ok(spool)
}

/// DOS timestamps are local wall-clock time with two-second resolution.
fn dos_to_unix_seconds(dt: zip::DateTime) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(dt.year() as i32, dt.month() as u32, dt.day() as u32)?;
    let naive = date.and_hms_opt(dt.hour() as u32, dt.minute() as u32, dt.second() as u32)?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.timestamp())
}
