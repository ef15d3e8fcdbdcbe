use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tinyunzip")]
#[command(version)]
#[command(about = "List a ZIP archive and extract all of its files", long_about = None)]
#[command(after_help = "Examples:\n  \
  tinyunzip data1.zip out          extract everything from data1.zip into out/\n  \
  tinyunzip -l -v data1.zip out    list data1.zip in detail, extract nothing\n  \
  tinyunzip https://example.com/archive.zip out   extract a remote ZIP")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Directory to extract files into
    #[arg(value_name = "EXDIR")]
    pub output_dir: PathBuf,

    /// List files only, do not extract
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely (sizes, ratio, timestamps)
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Test CRC32 of the extracted files
    #[arg(short = 't')]
    pub test: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Log level for diagnostics (RUST_LOG overrides)
    #[arg(short = 'L', long, value_name = "LEVEL", value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.archive.starts_with("http://") || self.archive.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_archive_and_output_dir() {
        assert!(Cli::try_parse_from(["tinyunzip"]).is_err());
        assert!(Cli::try_parse_from(["tinyunzip", "a.zip"]).is_err());

        let cli = Cli::try_parse_from(["tinyunzip", "a.zip", "out"]).unwrap();
        assert_eq!(cli.archive, "a.zip");
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert!(!cli.is_http_url());
    }

    #[test]
    fn flags_and_levels() {
        let cli = Cli::try_parse_from([
            "tinyunzip",
            "-qq",
            "-t",
            "-L",
            "debug",
            "https://example.com/a.zip",
            "out",
        ])
        .unwrap();
        assert!(cli.is_very_quiet());
        assert!(cli.test);
        assert!(cli.is_http_url());
        assert_eq!(cli.log_level.to_string(), "debug");
    }
}
