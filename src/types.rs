// src/types.rs
use crate::config::parse_resolver_addr;
use crate::utils::{is_valid_domain, normalize_domain};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WORKERS: i64 = 50;
pub const DEFAULT_TIMEOUT_SECS: i64 = 5;
pub const DEFAULT_DNS_PORT: u16 = 53;

/// One subdomain label to test against the target domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub domain: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            domain: domain.into(),
        }
    }

    pub fn fqdn(&self) -> String {
        crate::utils::fqdn(&self.label, &self.domain)
    }
}

/// Which DNS server a run talks to. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverTarget {
    System,
    Nameserver(SocketAddr),
}

impl fmt::Display for ResolverTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverTarget::System => write!(f, "system"),
            ResolverTarget::Nameserver(addr) => write!(f, "{}", addr),
        }
    }
}

/// A single lookup handed to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub name: String,
    pub target: ResolverTarget,
    pub timeout: Duration,
}

impl ResolutionRequest {
    pub fn new(candidate: &Candidate, config: &RunConfig) -> Self {
        Self {
            name: candidate.fqdn(),
            target: config.resolver(),
            timeout: config.timeout(),
        }
    }
}

/// Why a lookup did not produce an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    NxDomain,
    NoAnswer,
    ServFail,
    Refused,
    Protocol(String),
    Transport(String),
    Cancelled,
    Other(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timed out"),
            FailureReason::NxDomain => write!(f, "name does not exist (NXDOMAIN)"),
            FailureReason::NoAnswer => write!(f, "no address records"),
            FailureReason::ServFail => write!(f, "server failure (SERVFAIL)"),
            FailureReason::Refused => write!(f, "query refused (REFUSED)"),
            FailureReason::Protocol(msg) => write!(f, "protocol error: {}", msg),
            FailureReason::Transport(msg) => write!(f, "network error: {}", msg),
            FailureReason::Cancelled => write!(f, "cancelled before dispatch"),
            FailureReason::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl Serialize for FailureReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one candidate. Exactly one per candidate per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolutionResult {
    Resolved { name: String, address: IpAddr },
    Failed { name: String, reason: FailureReason },
}

impl ResolutionResult {
    pub fn name(&self) -> &str {
        match self {
            ResolutionResult::Resolved { name, .. } => name,
            ResolutionResult::Failed { name, .. } => name,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved { .. })
    }
}

/// Validated, immutable parameters of one run. Only obtainable through
/// `RunConfig::new`, so every instance satisfies the run preconditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    domain: String,
    resolver: ResolverTarget,
    workers: usize,
    timeout: Duration,
}

impl RunConfig {
    pub fn new(domain: &str, resolver: Option<&str>, workers: usize, timeout: Duration) -> Result<Self, DnsFuzzerError> {
        let domain = normalize_domain(domain);
        if !is_valid_domain(&domain) {
            return Err(DnsFuzzerError::InvalidDomain(domain));
        }
        if workers == 0 {
            return Err(DnsFuzzerError::ConfigError("Worker count must be at least 1".to_string()));
        }
        if timeout.is_zero() {
            return Err(DnsFuzzerError::ConfigError("Timeout must be greater than 0".to_string()));
        }

        let resolver = match resolver.map(str::trim).filter(|s| !s.is_empty()) {
            Some(addr) => ResolverTarget::Nameserver(parse_resolver_addr(addr)?),
            None => ResolverTarget::System,
        };

        Ok(Self {
            domain,
            resolver,
            workers,
            timeout,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resolver(&self) -> ResolverTarget {
        self.resolver
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub resolved: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub duration: Duration,
}

impl RunStats {
    pub fn from_results(results: &[ResolutionResult], duration: Duration) -> Self {
        let resolved = results.iter().filter(|r| r.is_resolved()).count();
        let cancelled = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    ResolutionResult::Failed { reason: FailureReason::Cancelled, .. }
                )
            })
            .count();

        Self {
            total: results.len(),
            resolved,
            failed: results.len() - resolved - cancelled,
            cancelled,
            duration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
    pub show_failures: bool,
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            show_failures: false,
            color: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum DnsFuzzerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid resolver address: {0}")]
    InvalidResolver(String),

    #[error("Wordlist error: {0}")]
    WordlistError(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("Output error: {0}")]
    OutputError(String),
}
