//! Path selection: glob-based enumeration of archive candidates.
//!
//! Walks a base directory and yields `(relative path, stem)` pairs for every
//! filesystem object that passes the include/exclude filter. The stem is the
//! forward-slash name the entry will get inside the archive. Enumeration
//! order is whatever the directory walk returns; it is not sorted.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Everything under the base directory, used when no include pattern is given.
pub const DEFAULT_INCLUDE: &str = "**/*";

/// One selected filesystem object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selected {
    /// Path relative to the base directory.
    pub path: PathBuf,
    /// Archive-relative name with `/` separators, before any rewrite.
    pub stem: String,
}

/// Compiled include/exclude filter applied to archive-relative names.
///
/// The same semantics cover both sides of the pipeline: selection stems at
/// create time and stored entry names at extract time. Excludes win over
/// includes; an empty include list means [`DEFAULT_INCLUDE`].
#[derive(Clone, Debug)]
pub struct NameFilter {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
    options: MatchOptions,
}

impl NameFilter {
    pub fn new(includes: &[String], excludes: &[String], case_sensitive: bool) -> Result<Self> {
        let compile = |pattern: &str| {
            Pattern::new(pattern).map_err(|source| Error::Pattern {
                pattern: pattern.to_string(),
                source,
            })
        };
        let includes = if includes.is_empty() {
            vec![compile(DEFAULT_INCLUDE)?]
        } else {
            includes.iter().map(|p| compile(p)).collect::<Result<_>>()?
        };
        let excludes = excludes.iter().map(|p| compile(p)).collect::<Result<_>>()?;
        Ok(Self {
            includes,
            excludes,
            options: MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        let hit = |p: &Pattern| p.matches_with(name, self.options);
        self.includes.iter().any(hit) && !self.excludes.iter().any(hit)
    }
}

/// Enumerate the base directory and apply the filter to each stem.
///
/// Fails if `base_dir` does not exist; an empty selection is not an error and
/// is reported to the caller as an empty vector.
pub fn select(
    base_dir: &Path,
    includes: &[String],
    excludes: &[String],
    case_sensitive: bool,
) -> Result<Vec<Selected>> {
    let filter = NameFilter::new(includes, excludes, case_sensitive)?;
    // Surface a bad base directory as its own error instead of an empty walk.
    std::fs::symlink_metadata(base_dir).map_err(|source| Error::BaseDirectory {
        path: base_dir.to_path_buf(),
        source,
    })?;

    let mut selected = Vec::new();
    for item in WalkDir::new(base_dir).min_depth(1).follow_links(false) {
        let item = item.map_err(|e| {
            Error::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
            }))
        })?;
        let rel = item
            .path()
            .strip_prefix(base_dir)
            .expect("walk yields children of the base directory")
            .to_path_buf();
        let stem = stem_of(&rel);
        if filter.matches(&stem) {
            selected.push(Selected { path: rel, stem });
        }
    }
    Ok(selected)
}

/// Archive-relative name for a path: components joined with `/`.
pub fn stem_of(rel: &Path) -> String {
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}
