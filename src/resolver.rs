// src/resolver.rs
use crate::error::Result;
use crate::types::{DnsFuzzerError, FailureReason, ResolutionRequest, ResolutionResult, ResolverTarget};
use async_trait::async_trait;
use log::{debug, trace};
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig as DnsResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::error::ProtoErrorKind;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

/// A single address lookup. Implementations make one attempt and return the
/// first address the server gave back.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, request: &ResolutionRequest) -> std::result::Result<IpAddr, FailureReason>;
}

pub struct DnsLookup {
    resolver: TokioAsyncResolver,
    target: ResolverTarget,
}

impl DnsLookup {
    /// Builds the client for a run. An explicit nameserver is used alone,
    /// with no fallback to the host configuration.
    pub fn for_target(target: ResolverTarget, timeout: Duration) -> Result<Self> {
        let (resolver_config, mut opts) = match target {
            ResolverTarget::System => trust_dns_resolver::system_conf::read_system_conf().map_err(|e| {
                DnsFuzzerError::ResolutionError(format!("Failed to read system resolver configuration: {}", e))
            })?,
            ResolverTarget::Nameserver(socket_addr) => {
                let mut resolver_config = DnsResolverConfig::new();
                resolver_config.add_name_server(NameServerConfig {
                    socket_addr,
                    protocol: Protocol::Udp,
                    tls_dns_name: None,
                    trust_negative_responses: false,
                    bind_addr: None,
                });
                (resolver_config, ResolverOpts::default())
            }
        };

        single_shot(&mut opts, timeout);

        debug!("Using {} resolver with a {:?} timeout", target, timeout);

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, opts),
            target,
        })
    }

    pub fn target(&self) -> ResolverTarget {
        self.target
    }
}

/// One attempt, no answer cache: duplicate words must each hit the wire.
fn single_shot(opts: &mut ResolverOpts, timeout: Duration) {
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.cache_size = 0;
}

#[async_trait]
impl Lookup for DnsLookup {
    async fn lookup(&self, request: &ResolutionRequest) -> std::result::Result<IpAddr, FailureReason> {
        if request.target != self.target {
            return Err(FailureReason::Other(format!(
                "request for {} resolver sent to {} client",
                request.target, self.target
            )));
        }

        // Absolute name: search domains must not be appended.
        let name = format!("{}.", request.name.trim_end_matches('.'));

        match self.resolver.lookup_ip(name.as_str()).await {
            Ok(lookup) => lookup.iter().next().ok_or(FailureReason::NoAnswer),
            Err(e) => {
                trace!("{}: {}", request.name, e);
                Err(categorize(&e))
            }
        }
    }
}

/// Maps a resolver error onto a short, stable cause.
pub fn categorize(error: &ResolveError) -> FailureReason {
    match error.kind() {
        ResolveErrorKind::Timeout => FailureReason::Timeout,
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match response_code {
            ResponseCode::NXDomain => FailureReason::NxDomain,
            ResponseCode::NoError => FailureReason::NoAnswer,
            ResponseCode::ServFail => FailureReason::ServFail,
            ResponseCode::Refused => FailureReason::Refused,
            other => FailureReason::Protocol(format!("unexpected response code {:?}", other)),
        },
        ResolveErrorKind::NoConnections => FailureReason::Transport("no connections available".to_string()),
        ResolveErrorKind::Io(err) => FailureReason::Transport(err.to_string()),
        ResolveErrorKind::Proto(err) => match err.kind() {
            ProtoErrorKind::Timeout => FailureReason::Timeout,
            ProtoErrorKind::Io(io) => FailureReason::Transport(io.to_string()),
            _ => FailureReason::Protocol(err.to_string()),
        },
        _ => FailureReason::Other(error.to_string()),
    }
}

/// Runs one lookup bounded by the request's total lifetime.
pub async fn resolve(lookup: &dyn Lookup, request: &ResolutionRequest) -> ResolutionResult {
    let outcome = tokio::time::timeout(request.timeout, lookup.lookup(request))
        .await
        .unwrap_or(Err(FailureReason::Timeout));

    match outcome {
        Ok(address) => ResolutionResult::Resolved {
            name: request.name.clone(),
            address,
        },
        Err(reason) => ResolutionResult::Failed {
            name: request.name.clone(),
            reason,
        },
    }
}
