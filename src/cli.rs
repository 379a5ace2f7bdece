//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use downloader_core::DEFAULT_WORKERS;

/// Download one file over HTTP(S), in parallel byte ranges when possible.
///
/// The server is probed first. If it reports a size and accepts range
/// requests, the file is split across workers and merged afterwards;
/// otherwise it is streamed with a single request.
#[derive(Parser, Debug)]
#[command(name = "downloader")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the file to download
    pub url: String,

    /// Directory to save the file into (created if missing)
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Parallel segment workers (1-64)
    #[arg(short, long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub workers: u8,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// Idle read timeout in seconds (1-3600)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,

    /// Print session events as JSON lines instead of a progress bar
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/file.iso";

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["downloader", URL]).unwrap();
        assert_eq!(args.url, URL);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.workers, 8); // DEFAULT_WORKERS
        assert_eq!(args.connect_timeout, 10);
        assert_eq!(args.read_timeout, 10);
        assert!(!args.json);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_missing_url_returns_error() {
        let err = Args::try_parse_from(["downloader"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["downloader", URL, "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["downloader", URL, "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["downloader", URL, "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["downloader", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["downloader", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["downloader", URL, "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_output_dir_short_and_long() {
        let args = Args::try_parse_from(["downloader", URL, "-o", "/tmp/out"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));

        let args = Args::try_parse_from(["downloader", URL, "--output-dir", "dl"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("dl"));
    }

    #[test]
    fn test_cli_workers_bounds() {
        let args = Args::try_parse_from(["downloader", URL, "-w", "1"]).unwrap();
        assert_eq!(args.workers, 1);

        let args = Args::try_parse_from(["downloader", URL, "--workers", "64"]).unwrap();
        assert_eq!(args.workers, 64);

        for bad in ["0", "65"] {
            let err = Args::try_parse_from(["downloader", URL, "-w", bad]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_timeouts_reject_zero() {
        let args =
            Args::try_parse_from(["downloader", URL, "--connect-timeout", "3", "--read-timeout", "30"])
                .unwrap();
        assert_eq!(args.connect_timeout, 3);
        assert_eq!(args.read_timeout, 30);

        let err = Args::try_parse_from(["downloader", URL, "--read-timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_json_flag() {
        let args = Args::try_parse_from(["downloader", URL, "--json"]).unwrap();
        assert!(args.json);
    }
}
