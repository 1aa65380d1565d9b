use std::io;
use std::path::PathBuf;

/// The primary error type for all operations in the `baler` crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The base directory to archive from does not exist or cannot be read.
    #[error("base directory '{path}' is not usable: {source}")]
    BaseDirectory { path: PathBuf, source: io::Error },

    /// An include or exclude pattern failed to compile.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// A regular expression (permission rule or rename pattern) failed to compile.
    #[error("invalid regular expression '{pattern}': {source}")]
    Regex {
        pattern: String,
        source: regex::Error,
    },

    /// An `=`-delimited permission rule carried a non-octal mode/uid/gid field.
    #[error("invalid octal field '{field}' in permission rule '{rule}'")]
    PermissionRule { rule: String, field: String },

    /// Writing one entry into the archive failed after all retry attempts.
    #[error("failed to add entry '{name}': {source}")]
    EntryWrite { name: String, source: io::Error },

    /// Reading or decoding one entry out of the archive failed. Never retried.
    #[error("failed to read archive entry: {source}")]
    EntryRead { source: io::Error },

    /// The compression format name is not one we can construct a transform for.
    #[error("unsupported compression format '{0}'")]
    UnsupportedCompression(String),

    /// The operation was cancelled between entries.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn entry_write(name: &str, source: io::Error) -> Self {
        Error::EntryWrite {
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn entry_read(source: io::Error) -> Self {
        Error::EntryRead { source }
    }
}
