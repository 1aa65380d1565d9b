//! Archive extraction pipeline.
//!
//! The container readers are forward-only cursors: each entry is filtered,
//! optionally listed, renamed, materialized and fully consumed before the
//! cursor advances. Shared mechanics (destination resolution, content
//! streaming, metadata restore) live here; the per-container loops are in
//! `tar.rs` and `zip.rs`.

mod tar;
mod zip;

pub use self::tar::extract_tar;
pub use self::zip::extract_zip;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;

use crate::common::CancelFlag;
use crate::fsx;
use crate::rename::Rename;

/// Everything one extract operation needs, built once and read-only after.
pub struct ExtractOptions {
    /// Archive source; `None` reads from stdin.
    pub input: Option<PathBuf>,
    /// Directory entries are recreated under; created on demand.
    pub dest_dir: PathBuf,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub case_sensitive: bool,
    pub rename: Rename,
    /// Print stored entry names instead of extracting.
    pub list_only: bool,
    pub cancel: CancelFlag,
}

impl ExtractOptions {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: None,
            dest_dir: dest_dir.into(),
            includes: Vec::new(),
            excludes: Vec::new(),
            case_sensitive: false,
            rename: Rename::default(),
            list_only: false,
            cancel: CancelFlag::new(),
        }
    }
}

/// Entries are copied out in chunks of this size.
const COPY_CHUNK: usize = 8192;

/// Resolve a destination name under the output directory, refusing names
/// that would escape it (absolute paths or `..` traversal).
pub(crate) fn dest_path(dest_dir: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    if relative.is_absolute() {
        return None;
    }
    let mut out = dest_dir.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Stream one entry's content to a destination file, creating parents.
pub(crate) fn write_file_content(reader: &mut dyn Read, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(dest)?;
    let mut buffer = [0u8; COPY_CHUNK];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])?;
    }
    Ok(())
}

/// Restore mtime and, on Unix, the stored permission bits.
pub(crate) fn restore_file_metadata(
    dest: &Path,
    mtime_secs: Option<i64>,
    mode: Option<u32>,
) -> io::Result<()> {
    if let Some(secs) = mtime_secs {
        filetime::set_file_mtime(dest, FileTime::from_unix_time(secs, 0))?;
    }
    if let Some(mode) = mode {
        fsx::set_unix_permissions(dest, mode & 0o7777)?;
    }
    Ok(())
}

/// Recreate a symlink, replacing whatever sat at the destination before.
pub(crate) fn place_symlink(target: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::symlink_metadata(dest).is_ok() {
        fs::remove_file(dest)?;
    }
    fsx::make_symlink(target, dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dest_path_joins_under_destination() {
        let dest = dest_path(Path::new("/out"), "a/b.txt").unwrap();
        assert_eq!(dest, PathBuf::from("/out/a/b.txt"));
    }

    #[test]
    fn dest_path_rejects_escapes() {
        assert!(dest_path(Path::new("/out"), "../evil").is_none());
        assert!(dest_path(Path::new("/out"), "a/../../evil").is_none());
        #[cfg(unix)]
        assert!(dest_path(Path::new("/out"), "/etc/passwd").is_none());
    }

    #[test]
    fn dest_path_ignores_current_dir_components() {
        let dest = dest_path(Path::new("/out"), "./a/./b").unwrap();
        assert_eq!(dest, PathBuf::from("/out/a/b"));
    }
}
