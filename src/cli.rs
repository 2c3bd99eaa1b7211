//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch files behind file-host links with parallel byte-range downloads.
///
/// Links are read from the input file (one per line, `#` comments allowed)
/// unless given as arguments. Completed links are removed from the file;
/// failed links stay and are listed at the end.
///
/// While running: type `p` + Enter to pause, `r` to resume, `q` to cancel.
#[derive(Parser, Debug)]
#[command(name = "linkfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Links to download instead of reading the input file
    #[arg(value_name = "LINKS")]
    pub links: Vec<String>,

    /// Link list file [default: input.txt]
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output directory [default: downloads]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Concurrent chunk requests per file (1-64) [default: 16]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub concurrency: Option<u8>,

    /// Chunk size in MiB (1-1024) [default: 4]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1024))]
    pub chunk_size_mib: Option<u64>,

    /// Attempts per chunk, including the first (1-10) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: Option<u8>,

    /// Treat links as direct file URLs instead of landing pages
    #[arg(long)]
    pub direct: bool,

    /// Fail a file when any chunk fails permanently instead of leaving a gap
    #[arg(long)]
    pub strict: bool,

    /// Keep completed links in the input file
    #[arg(long)]
    pub no_remove: bool,

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

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["linkfetch"]).unwrap();
        assert!(args.links.is_empty());
        assert_eq!(args.input, None);
        assert_eq!(args.output, None);
        assert_eq!(args.concurrency, None);
        assert_eq!(args.max_attempts, None);
        assert!(!args.direct);
        assert!(!args.strict);
        assert!(!args.no_remove);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_positional_links() {
        let args =
            Args::try_parse_from(["linkfetch", "https://a.example/1", "https://b.example/2"])
                .unwrap();
        assert_eq!(args.links, ["https://a.example/1", "https://b.example/2"]);
    }

    #[test]
    fn test_cli_input_and_output_paths() {
        let args = Args::try_parse_from(["linkfetch", "-i", "links.txt", "--output", "/tmp/dl"])
            .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("links.txt")));
        assert_eq!(args.output, Some(PathBuf::from("/tmp/dl")));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["linkfetch", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["linkfetch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["linkfetch", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["linkfetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["linkfetch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["linkfetch", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    // ==================== Engine Tuning Tests ====================

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["linkfetch", "-c", "64"]).unwrap();
        assert_eq!(args.concurrency, Some(64));

        for value in ["0", "65"] {
            let err = Args::try_parse_from(["linkfetch", "-c", value]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_chunk_size_mib() {
        let args = Args::try_parse_from(["linkfetch", "--chunk-size-mib", "8"]).unwrap();
        assert_eq!(args.chunk_size_mib, Some(8));

        let err = Args::try_parse_from(["linkfetch", "--chunk-size-mib", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_attempts_bounds() {
        let args = Args::try_parse_from(["linkfetch", "-r", "1"]).unwrap();
        assert_eq!(args.max_attempts, Some(1));

        let err = Args::try_parse_from(["linkfetch", "--max-attempts", "11"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_mode_flags() {
        let args =
            Args::try_parse_from(["linkfetch", "--direct", "--strict", "--no-remove"]).unwrap();
        assert!(args.direct);
        assert!(args.strict);
        assert!(args.no_remove);
    }
}
