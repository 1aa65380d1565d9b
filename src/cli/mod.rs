use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::pack::DEFAULT_RETRY_LIMIT;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Verbose diagnostics on stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or extract tar archives, optionally compressed.
    Tar {
        #[command(subcommand)]
        op: TarOp,
    },

    /// Create or extract zip archives.
    Zip {
        #[command(subcommand)]
        op: ZipOp,
    },

    /// Compress or decompress a raw gzip stream.
    Gzip {
        #[command(subcommand)]
        op: StreamOp,
    },

    /// Compress or decompress a raw bzip2 stream.
    Bzip2 {
        #[command(subcommand)]
        op: StreamOp,
    },

    /// Compress or decompress a raw xz stream.
    Xz {
        #[command(subcommand)]
        op: StreamOp,
    },

    /// Compress or decompress a raw zstd stream.
    Zstd {
        #[command(subcommand)]
        op: StreamOp,
    },
}

#[derive(Subcommand, Debug)]
pub enum TarOp {
    /// Create a tar archive from files under a base directory.
    #[command(alias = "c")]
    Create {
        #[command(flatten)]
        args: CreateArgs,

        /// Compress the archive after writing it (gzip, bzip2, xz, zstd).
        #[arg(short = 'c', long, value_name = "FORMAT")]
        compression_format: Option<String>,
    },

    /// Extract a tar archive onto the filesystem.
    #[command(aliases = ["x", "d"])]
    Extract {
        #[command(flatten)]
        args: ExtractArgs,

        /// Decompress the input before reading entries (gzip, bzip2, xz, zstd).
        #[arg(short = 'c', long, value_name = "FORMAT")]
        compression_format: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ZipOp {
    /// Create a zip archive from files under a base directory.
    #[command(alias = "c")]
    Create {
        #[command(flatten)]
        args: CreateArgs,

        /// Deflate compression level (0-9).
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..=9))]
        level: Option<i32>,
    },

    /// Extract a zip archive onto the filesystem.
    #[command(aliases = ["x", "d"])]
    Extract {
        #[command(flatten)]
        args: ExtractArgs,
    },
}

/// Options shared by every archive-creating subcommand.
#[derive(ClapArgs, Debug)]
pub struct CreateArgs {
    /// Base directory to select files under. Defaults to the current directory.
    #[arg(short, long)]
    pub base_directory: Option<PathBuf>,

    /// Output file path. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include glob pattern; may repeat. Defaults to "**/*".
    #[arg(short, long = "include", value_name = "PATTERN")]
    pub includes: Vec<String>,

    /// Exclude glob pattern; may repeat. Wins over includes.
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Match include/exclude patterns case-sensitively.
    #[arg(long)]
    pub case_sensitive: bool,

    /// Regex matched against entry names before archiving.
    #[arg(long, value_name = "REGEX")]
    pub replace_from: Option<String>,

    /// Replacement for --replace-from matches; backreferences as \1, \2, ...
    #[arg(long, value_name = "TEXT")]
    pub replace_to: Option<String>,

    /// Permission rule 'REGEX=MODE[:UID[:GID]]' with octal fields; may
    /// repeat. A later rule wins when several match the same name.
    #[arg(short = 'p', long = "permission-map", value_name = "RULE")]
    pub permission_maps: Vec<String>,

    /// File with one permission rule per line, applied after --permission-map.
    #[arg(long, value_name = "FILE")]
    pub permission_file: Option<PathBuf>,

    /// Attempts per entry before the stop-on-error policy applies.
    #[arg(short, long, default_value_t = DEFAULT_RETRY_LIMIT)]
    pub retry: u32,

    /// Abort the whole operation when one entry keeps failing.
    #[arg(long)]
    pub stop_on_error: bool,
}

/// Options shared by every archive-extracting subcommand.
#[derive(ClapArgs, Debug)]
pub struct ExtractArgs {
    /// Input archive path. Defaults to stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory, created if missing. Defaults to the current directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only extract entries matching this glob; may repeat.
    #[arg(long = "include", value_name = "PATTERN")]
    pub includes: Vec<String>,

    /// Skip entries matching this glob; may repeat.
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Match include/exclude patterns case-sensitively.
    #[arg(long)]
    pub case_sensitive: bool,

    /// Regex matched against stored names to pick destination paths.
    #[arg(long, value_name = "REGEX")]
    pub replace_from: Option<String>,

    /// Replacement for --replace-from matches; backreferences as \1, \2, ...
    #[arg(long, value_name = "TEXT")]
    pub replace_to: Option<String>,

    /// List stored entry names on stdout instead of extracting.
    #[arg(short, long)]
    pub list: bool,
}

#[derive(Subcommand, Debug)]
pub enum StreamOp {
    /// Compress a raw byte stream.
    #[command(alias = "c")]
    Compress {
        /// Input file path. Defaults to stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file path. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decompress a raw byte stream.
    #[command(alias = "d")]
    Decompress {
        /// Input file path. Defaults to stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file path. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Parses command-line arguments and returns the parsed tree.
pub fn run() -> Args {
    Args::parse()
}
