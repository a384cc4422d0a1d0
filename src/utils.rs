// src/utils.rs
use crate::error::{ErrorContext, Result};
use crate::types::DnsFuzzerError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads a wordlist: one label per line, trimmed, blank lines skipped.
/// Duplicates are kept; each one is resolved on its own.
pub fn read_wordlist(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).context_as(DnsFuzzerError::WordlistError, || {
        format!("The wordlist file {} cannot be opened", path.display())
    })?;
    let reader = BufReader::new(file);

    let mut labels = Vec::new();
    for line in reader.lines() {
        let line = line.context_as(DnsFuzzerError::WordlistError, || format!("Failed to read {}", path.display()))?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    Ok(labels)
}

/// `label.domain`
pub fn fqdn(label: &str, domain: &str) -> String {
    format!("{}.{}", label, domain)
}

/// Lowercases and drops a trailing root dot.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}

/// Check if a string is a valid domain
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    for part in parts {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        if !part.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return false;
        }

        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }
    }

    true
}
