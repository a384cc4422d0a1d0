// src/output.rs
use crate::error::ErrorContext;
use crate::progress::ProgressReporter;
use crate::types::{DnsFuzzerError, OutputConfig, OutputFormat, ResolutionResult, RunStats};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct OutputManager {
    config: OutputConfig,
    color: bool,
    file: Option<BufWriter<File>>,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Result<Self, DnsFuzzerError> {
        let file = match &config.file {
            Some(path) => Some(Self::create_file(path)?),
            None => None,
        };
        let color = config.color && atty::is(atty::Stream::Stdout);

        Ok(Self { config, color, file })
    }

    fn create_file(file_path: &Path) -> Result<BufWriter<File>, DnsFuzzerError> {
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context_as(DnsFuzzerError::OutputError, || {
                format!("Failed to create directory {}", parent.display())
            })?;
        }

        let file = File::create(file_path).context_as(DnsFuzzerError::OutputError, || {
            format!("Failed to create file {}", file_path.display())
        })?;
        Ok(BufWriter::new(file))
    }

    /// Prints one result above the progress bar and appends it to the
    /// output file. Suppressed failures are still counted by the caller.
    pub fn write_result(
        &mut self,
        result: &ResolutionResult,
        reporter: &ProgressReporter,
    ) -> Result<(), DnsFuzzerError> {
        if let Some(line) = format_result(result, &self.config, self.color) {
            reporter.println(&line);
        }

        if let Some(file) = self.file.as_mut() {
            if let Some(line) = format_result(result, &self.config, false) {
                writeln!(file, "{}", line).context_as(DnsFuzzerError::OutputError, || "Failed to write result".to_string())?;
            }
        }

        Ok(())
    }

    pub fn finish(&mut self, stats: &RunStats) -> Result<(), DnsFuzzerError> {
        if let Some(mut file) = self.file.take() {
            if self.config.format == OutputFormat::Json {
                let summary = serde_json::json!({ "summary": stats });
                writeln!(file, "{}", summary)
                    .context_as(DnsFuzzerError::OutputError, || "Failed to write summary".to_string())?;
            }
            file.flush().context_as(DnsFuzzerError::OutputError, || "Failed to flush output file".to_string())?;

            if let Some(path) = &self.config.file {
                println!("Results written to: {}", path.display());
            }
        }
        Ok(())
    }
}

/// Display form of a result, or `None` when the configuration hides it.
pub fn format_result(result: &ResolutionResult, config: &OutputConfig, color: bool) -> Option<String> {
    if !result.is_resolved() && !config.show_failures {
        return None;
    }

    match config.format {
        OutputFormat::Json => serde_json::to_string(result).ok(),
        OutputFormat::Text => Some(match result {
            ResolutionResult::Resolved { name, address } if color => {
                format!("{} {} {} {}", "[+] Subdomain:".green(), name, "IP:".cyan(), address)
            }
            ResolutionResult::Resolved { name, address } => {
                format!("[+] Subdomain: {} IP: {}", name, address)
            }
            ResolutionResult::Failed { name, reason } if color => {
                format!("{} {}", format!("Error resolving {}:", name).red(), reason)
            }
            ResolutionResult::Failed { name, reason } => {
                format!("Error resolving {}: {}", name, reason)
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureReason;
    use std::time::Duration;

    fn resolved() -> ResolutionResult {
        ResolutionResult::Resolved {
            name: "www.example.com".to_string(),
            address: "93.184.216.34".parse().unwrap(),
        }
    }

    fn failed() -> ResolutionResult {
        ResolutionResult::Failed {
            name: "ftp.example.com".to_string(),
            reason: FailureReason::NxDomain,
        }
    }

    #[test]
    fn test_text_success_line() {
        let line = format_result(&resolved(), &OutputConfig::default(), false).unwrap();
        assert_eq!(line, "[+] Subdomain: www.example.com IP: 93.184.216.34");
    }

    #[test]
    fn test_failures_hidden_by_default() {
        assert!(format_result(&failed(), &OutputConfig::default(), false).is_none());

        let config = OutputConfig {
            show_failures: true,
            ..OutputConfig::default()
        };
        let line = format_result(&failed(), &config, false).unwrap();
        assert_eq!(line, "Error resolving ftp.example.com: name does not exist (NXDOMAIN)");
    }

    #[test]
    fn test_json_lines() {
        let config = OutputConfig {
            format: OutputFormat::Json,
            show_failures: true,
            ..OutputConfig::default()
        };

        let ok: serde_json::Value = serde_json::from_str(&format_result(&resolved(), &config, false).unwrap()).unwrap();
        assert_eq!(ok["status"], "resolved");
        assert_eq!(ok["name"], "www.example.com");
        assert_eq!(ok["address"], "93.184.216.34");

        let err: serde_json::Value = serde_json::from_str(&format_result(&failed(), &config, false).unwrap()).unwrap();
        assert_eq!(err["status"], "failed");
        assert_eq!(err["reason"], "name does not exist (NXDOMAIN)");
    }

    #[test]
    fn test_unwritable_output_path_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = OutputConfig {
            file: Some(dir.path().to_path_buf()),
            ..OutputConfig::default()
        };

        let err = OutputManager::new(config).err().unwrap();
        assert!(matches!(err, DnsFuzzerError::OutputError(_)));
    }

    #[test]
    fn test_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("found.txt");
        let config = OutputConfig {
            file: Some(path.clone()),
            ..OutputConfig::default()
        };

        let reporter = ProgressReporter::new(2, false);
        let mut manager = OutputManager::new(config).unwrap();
        manager.write_result(&resolved(), &reporter).unwrap();
        manager.write_result(&failed(), &reporter).unwrap();
        manager
            .finish(&RunStats::from_results(&[resolved(), failed()], Duration::from_secs(1)))
            .unwrap();

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents, "[+] Subdomain: www.example.com IP: 93.184.216.34\n");
    }
}
