//! Archive entry data model shared by the encoder and the extractor.

use std::path::PathBuf;
use std::time::SystemTime;

/// What kind of filesystem object an entry represents.
///
/// Reparse points / symbolic links carry their target here; they never carry
/// content bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink { target: PathBuf },
}

/// Header data for one archive entry, built per selected filesystem object.
///
/// Immutable once built; discarded after the entry is written. `name` is the
/// post-rewrite archive-relative name: directories always end with `/`,
/// symlinks never do.
#[derive(Clone, Debug)]
pub struct EntryDescriptor {
    /// Absolute path of the source object on disk.
    pub source: PathBuf,
    /// Name as it appears inside the archive.
    pub name: String,
    pub kind: EntryKind,
    /// Content length in bytes; 0 for directories and symlinks.
    pub size: u64,
    pub mtime: SystemTime,
    /// POSIX permission bits.
    pub mode: u32,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
}

impl EntryDescriptor {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    pub fn link_target(&self) -> Option<&PathBuf> {
        match &self.kind {
            EntryKind::Symlink { target } => Some(target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_target_only_for_symlinks() {
        let entry = EntryDescriptor {
            source: PathBuf::from("/src/lib.so"),
            name: "lib.so".to_string(),
            kind: EntryKind::Symlink {
                target: PathBuf::from("lib.so.1"),
            },
            size: 0,
            mtime: SystemTime::UNIX_EPOCH,
            mode: 0o777,
            uid: None,
            gid: None,
        };
        assert_eq!(entry.link_target(), Some(&PathBuf::from("lib.so.1")));
        assert!(!entry.is_dir());
    }
}
