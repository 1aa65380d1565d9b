//! Archive creation pipeline.
//!
//! One entry at a time: select, resolve permissions, rewrite the name,
//! synthesize the header, hand it to the container sink. Non-directory
//! entries run inside a bounded retry loop; what happens when the budget is
//! exhausted depends on `stop_on_error`. With it unset the entry is simply
//! omitted and the operation still reports success; that partial-success
//! mode is intentional (see DESIGN.md).

mod tar;
mod zip;

pub use self::tar::create_tar;
pub use self::zip::create_zip;

use std::fs;
use std::io::{self, Read};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::common::CancelFlag;
use crate::entry::{EntryDescriptor, EntryKind};
use crate::error::{Error, Result};
use crate::fsx;
use crate::rename::Rename;
use crate::rules::PermissionMap;
use crate::select::{select, Selected};

/// Attempts per non-directory entry before the stop-on-error policy applies.
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Everything one create operation needs, built once and read-only after.
pub struct CreateOptions {
    /// Directory the selection is rooted at.
    pub base_dir: std::path::PathBuf,
    /// Archive destination; `None` writes to stdout.
    pub output: Option<std::path::PathBuf>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub case_sensitive: bool,
    pub rename: Rename,
    pub permissions: PermissionMap,
    pub retry_limit: u32,
    pub stop_on_error: bool,
    pub cancel: CancelFlag,
}

impl CreateOptions {
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            output: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            case_sensitive: false,
            rename: Rename::default(),
            permissions: PermissionMap::default(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            stop_on_error: false,
            cancel: CancelFlag::new(),
        }
    }
}

/// Result of a create operation. `NoMatches` is distinct from both success
/// and failure so the caller can exit with its own status for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Archived { entries: usize },
    NoMatches,
}

/// Archive-writer collaborator: receives one header (and content, for
/// regular entries) at a time, in selection order.
pub trait EntrySink {
    fn add_entry(
        &mut self,
        entry: &EntryDescriptor,
        content: Option<&mut dyn Read>,
    ) -> io::Result<()>;
}

/// Run the selection, or report `NoMatches` before any output is opened.
pub(crate) fn select_for_create(options: &CreateOptions) -> Result<Option<Vec<Selected>>> {
    let selection = select(
        &options.base_dir,
        &options.includes,
        &options.excludes,
        options.case_sensitive,
    )?;
    if selection.is_empty() {
        Ok(None)
    } else {
        Ok(Some(selection))
    }
}

/// Drive the whole selection through the sink. Returns how many entries the
/// archive ended up with.
pub(crate) fn write_entries<S: EntrySink>(
    sink: &mut S,
    options: &CreateOptions,
    selection: &[Selected],
) -> Result<usize> {
    let mut written = 0usize;
    for selected in selection {
        options.cancel.check()?;

        let source = options.base_dir.join(&selected.path);
        let is_dir = fs::symlink_metadata(&source)
            .map(|m| m.is_dir())
            .unwrap_or(false);

        if is_dir {
            // A directory header carries no content stream; there is nothing
            // transient to retry. Failure here fails the operation.
            if write_one(sink, options, selected)? {
                written += 1;
            }
            continue;
        }

        let limit = options.retry_limit.max(1);
        let mut last_error = None;
        for attempt in 1..=limit {
            last_error = None;
            match write_one(sink, options, selected) {
                Ok(true) => {
                    written += 1;
                    break;
                }
                Ok(false) => break,
                Err(err) => {
                    warn!(
                        entry = %selected.stem,
                        attempt,
                        limit,
                        "failed to add entry, retrying: {err}"
                    );
                    last_error = Some(err);
                }
            }
        }
        if let Some(err) = last_error {
            if options.stop_on_error {
                return Err(err);
            }
            warn!(entry = %selected.stem, "retries exhausted, entry omitted: {err}");
        }
    }
    Ok(written)
}

/// Stat, describe and emit a single entry. `Ok(false)` means the source
/// vanished between selection and now and the entry was skipped.
fn write_one<S: EntrySink>(
    sink: &mut S,
    options: &CreateOptions,
    selected: &Selected,
) -> Result<bool> {
    let Some(entry) = describe(options, selected)? else {
        return Ok(false);
    };
    debug!(
        "'{}' -> '{}' ({:o})",
        entry.source.display(),
        entry.name,
        entry.mode
    );
    match entry.kind {
        EntryKind::Regular => {
            let mut file =
                fs::File::open(&entry.source).map_err(|e| Error::entry_write(&entry.name, e))?;
            sink.add_entry(&entry, Some(&mut file))
        }
        _ => sink.add_entry(&entry, None),
    }
    .map_err(|e| Error::entry_write(&entry.name, e))?;
    Ok(true)
}

/// Build the header descriptor for one selected object, re-reading the
/// filesystem so every retry attempt sees fresh metadata.
fn describe(options: &CreateOptions, selected: &Selected) -> Result<Option<EntryDescriptor>> {
    let source = options.base_dir.join(&selected.path);
    let metadata = match fs::symlink_metadata(&source) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("'{}' does not exist, skipped", source.display());
            return Ok(None);
        }
        Err(e) => return Err(Error::entry_write(&selected.stem, e)),
    };
    let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let file_type = metadata.file_type();

    let entry = if file_type.is_symlink() {
        let target = fs::read_link(&source).map_err(|e| Error::entry_write(&selected.stem, e))?;
        let name = options.rename.apply(&selected.stem);
        // Mode is fixed for links; uid/gid still go through the rule map.
        let resolved = options.permissions.resolve(&name, fsx::DEFAULT_FILE_MODE);
        EntryDescriptor {
            source,
            name,
            kind: EntryKind::Symlink { target },
            size: 0,
            mtime,
            mode: fsx::SYMLINK_MODE,
            uid: resolved.uid,
            gid: resolved.gid,
        }
    } else if file_type.is_dir() {
        let name = format!("{}/", options.rename.apply(&selected.stem));
        let resolved = options.permissions.resolve(&name, fsx::DEFAULT_DIR_MODE);
        EntryDescriptor {
            source,
            name,
            kind: EntryKind::Directory,
            size: 0,
            mtime,
            mode: resolved.mode,
            uid: resolved.uid,
            gid: resolved.gid,
        }
    } else {
        let name = options.rename.apply(&selected.stem);
        let resolved = options.permissions.resolve(&name, fsx::file_mode(&metadata));
        EntryDescriptor {
            source,
            name,
            kind: EntryKind::Regular,
            size: metadata.len(),
            mtime,
            mode: resolved.mode,
            uid: resolved.uid,
            gid: resolved.gid,
        }
    };
    Ok(Some(entry))
}

pub(crate) fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
