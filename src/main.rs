//! Main entry point for the baler CLI app.

use std::path::PathBuf;
use std::process::ExitCode;

use baler::cli::{self, Commands, CreateArgs, ExtractArgs, StreamOp, TarOp, ZipOp};
use baler::pack::{self, CreateOptions, CreateOutcome};
use baler::rename::Rename;
use baler::rules::PermissionMap;
use baler::transform::{self, CompressionFormat};
use baler::unpack::{self, ExtractOptions};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status for a create run that selected zero entries, distinct from
/// both success and failure.
const EXIT_NO_MATCHES: u8 = 2;

fn main() -> ExitCode {
    let args = cli::run();
    init_tracing(args.verbose);

    match run_app(args.command) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::NoMatches) => {
            eprintln!("no file matched");
            ExitCode::from(EXIT_NO_MATCHES)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

enum Outcome {
    Done,
    NoMatches,
}

fn run_app(command: Commands) -> baler::Result<Outcome> {
    match command {
        Commands::Tar { op } => match op {
            TarOp::Create {
                args,
                compression_format,
            } => {
                let format = CompressionFormat::from_name(compression_format.as_deref())?;
                let options = create_options(&args)?;
                create(pack::create_tar(&options, format)?)
            }
            TarOp::Extract {
                args,
                compression_format,
            } => {
                let format = CompressionFormat::from_name(compression_format.as_deref())?;
                let options = extract_options(&args)?;
                let entries = unpack::extract_tar(&options, format)?;
                debug!(entries, "tar extraction finished");
                Ok(Outcome::Done)
            }
        },
        Commands::Zip { op } => match op {
            ZipOp::Create { args, level } => {
                let options = create_options(&args)?;
                create(pack::create_zip(&options, level)?)
            }
            ZipOp::Extract { args } => {
                let options = extract_options(&args)?;
                let entries = unpack::extract_zip(&options)?;
                debug!(entries, "zip extraction finished");
                Ok(Outcome::Done)
            }
        },
        Commands::Gzip { op } => stream(CompressionFormat::Gzip, op),
        Commands::Bzip2 { op } => stream(CompressionFormat::Bzip2, op),
        Commands::Xz { op } => stream(CompressionFormat::Xz, op),
        Commands::Zstd { op } => stream(CompressionFormat::Zstd, op),
    }
}

fn create(outcome: CreateOutcome) -> baler::Result<Outcome> {
    match outcome {
        CreateOutcome::Archived { entries } => {
            debug!(entries, "archive complete");
            Ok(Outcome::Done)
        }
        CreateOutcome::NoMatches => Ok(Outcome::NoMatches),
    }
}

fn stream(format: CompressionFormat, op: StreamOp) -> baler::Result<Outcome> {
    match op {
        StreamOp::Compress { input, output } => {
            transform::compress_stream(format, input.as_deref(), output.as_deref())?
        }
        StreamOp::Decompress { input, output } => {
            transform::decompress_stream(format, input.as_deref(), output.as_deref())?
        }
    }
    Ok(Outcome::Done)
}

fn create_options(args: &CreateArgs) -> baler::Result<CreateOptions> {
    let mut options = CreateOptions::new(default_dir(args.base_directory.clone())?);
    options.output = args.output.clone();
    options.includes = args.includes.clone();
    options.excludes = args.excludes.clone();
    options.case_sensitive = args.case_sensitive;
    options.rename = Rename::new(args.replace_from.as_deref(), args.replace_to.as_deref())?;
    options.permissions =
        PermissionMap::load(&args.permission_maps, args.permission_file.as_deref())?;
    options.retry_limit = args.retry;
    options.stop_on_error = args.stop_on_error;
    Ok(options)
}

fn extract_options(args: &ExtractArgs) -> baler::Result<ExtractOptions> {
    let mut options = ExtractOptions::new(default_dir(args.output.clone())?);
    options.input = args.input.clone();
    options.includes = args.includes.clone();
    options.excludes = args.excludes.clone();
    options.case_sensitive = args.case_sensitive;
    options.rename = Rename::new(args.replace_from.as_deref(), args.replace_to.as_deref())?;
    options.list_only = args.list;
    Ok(options)
}

fn default_dir(path: Option<PathBuf>) -> std::io::Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => std::env::current_dir(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "baler=debug" } else { "baler=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
