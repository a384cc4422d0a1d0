// src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod progress;
pub mod resolver;
pub mod types;
pub mod utils;

pub use cli::Args;
pub use engine::{ProgressCounter, ResolutionEngine};
pub use resolver::{DnsLookup, Lookup};
pub use types::{
    Candidate, DnsFuzzerError, FailureReason, Progress, ResolutionRequest, ResolutionResult, ResolverTarget,
    RunConfig, RunStats,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
