use crate::config::Settings;
use crate::types::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dnsfuzzer",
    version,
    long_version = LONG_VERSION,
    about = "This is a simple DNS subdomain discovery tool",
    long_about = "Brute-forces subdomains of a target domain by resolving every word of a wordlist\nconcurrently against the system resolver or a single given DNS server."
)]
pub struct Args {
    /// Domain to enumerate subdomains of
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN")]
    pub domain: String,

    /// Wordlist file to use for subdomain discovery
    #[arg(short = 'w', long = "wordlist", value_name = "FILE")]
    pub wordlist: PathBuf,

    /// IP address of a DNS resolver to use
    #[arg(short = 'r', long = "resolver", value_name = "ADDR")]
    pub resolver: Option<String>,

    /// Number of concurrent resolution workers [default: 50]
    #[arg(short = 't', long = "threads", allow_negative_numbers = true)]
    pub threads: Option<i64>,

    /// Per-query timeout in seconds [default: 5]
    #[arg(long = "timeout", allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Output file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Output results as JSON lines
    #[arg(long = "json")]
    pub json: bool,

    /// Also print lookups that failed
    #[arg(long = "show-failures")]
    pub show_failures: bool,

    /// Silent mode (only output results)
    #[arg(long = "silent")]
    pub silent: bool,

    /// Do not draw the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,
}

impl Args {
    /// Command-line flags win over every other layer.
    pub fn apply_to(&self, settings: &mut Settings) {
        settings.domain = Some(self.domain.clone());
        if let Some(resolver) = &self.resolver {
            settings.resolver = Some(resolver.clone());
        }
        if let Some(threads) = self.threads {
            settings.workers = threads;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout = timeout;
        }
        if let Some(file) = &self.output_file {
            settings.output.file = Some(file.clone());
        }
        if self.json {
            settings.output.format = OutputFormat::Json;
        }
        if self.show_failures {
            settings.show_failures = true;
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.silent && !self.no_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "dnsfuzzer", "-d", "example.com", "-w", "words.txt", "-r", "1.1.1.1", "-t", "8", "--timeout", "2",
            "--json",
        ]);
        let mut settings = Settings::default();
        args.apply_to(&mut settings);

        assert_eq!(settings.domain.as_deref(), Some("example.com"));
        assert_eq!(settings.resolver.as_deref(), Some("1.1.1.1"));
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.timeout, 2);
        assert_eq!(settings.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_defaults_left_alone() {
        let args = Args::parse_from(["dnsfuzzer", "-d", "example.com", "-w", "words.txt"]);
        let mut settings = Settings::default();
        args.apply_to(&mut settings);

        assert_eq!(settings.workers, 50);
        assert_eq!(settings.timeout, 5);
        assert!(settings.resolver.is_none());
        assert!(args.show_progress());
    }

    #[test]
    fn test_negative_timeout_reaches_validation() {
        let args = Args::parse_from(["dnsfuzzer", "-d", "example.com", "-w", "w.txt", "--timeout", "-1"]);
        let mut settings = Settings::default();
        args.apply_to(&mut settings);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_domain_is_rejected() {
        assert!(Args::try_parse_from(["dnsfuzzer", "-w", "words.txt"]).is_err());
    }
}
