use crate::error::Result;
use crate::resolver::{resolve, DnsLookup, Lookup};
use crate::types::{Candidate, FailureReason, Progress, ResolutionRequest, ResolutionResult, RunConfig};
use futures::future::join_all;
use futures::FutureExt;
use log::{debug, error, info, trace};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Count of completed lookups for the current run.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicUsize>);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the count after this increment.
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// Fixed pool of workers draining a shared FIFO of candidates.
pub struct ResolutionEngine {
    config: Arc<RunConfig>,
    lookup: Arc<dyn Lookup>,
    progress: ProgressCounter,
    cancel: CancellationToken,
}

impl ResolutionEngine {
    pub fn new(config: RunConfig, lookup: Arc<dyn Lookup>) -> Self {
        Self {
            config: Arc::new(config),
            lookup,
            progress: ProgressCounter::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Engine backed by real DNS, using the resolver selected in `config`.
    pub fn from_config(config: RunConfig) -> Result<Self> {
        let lookup = DnsLookup::for_target(config.resolver(), config.timeout())?;
        Ok(Self::new(config, Arc::new(lookup)))
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn progress(&self) -> usize {
        self.progress.get()
    }

    pub fn candidates<I, S>(&self, labels: I) -> Vec<Candidate>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        labels
            .into_iter()
            .map(|label| Candidate::new(label, self.config.domain()))
            .collect()
    }

    /// Resolves every candidate exactly once, in completion order.
    ///
    /// `on_result` runs on the caller's task for each finished item, so a sink
    /// can print from it without interleaving. If the engine is cancelled,
    /// workers stop claiming new candidates, in-flight lookups finish, and
    /// every unclaimed candidate is reported as `Cancelled`.
    pub async fn run<F>(&self, candidates: Vec<Candidate>, mut on_result: F) -> Vec<ResolutionResult>
    where
        F: FnMut(&ResolutionResult, Progress),
    {
        let total = candidates.len();
        let workers = self.config.workers().min(total);
        let start_time = Instant::now();
        self.progress.reset();

        info!(
            "Resolving {} candidates for {} via {} resolver with {} workers",
            total, self.config.domain(), self.config.resolver(), workers
        );

        let queue = Arc::new(Mutex::new(candidates.into_iter().collect::<VecDeque<_>>()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let queue = queue.clone();
                let tx = tx.clone();
                let lookup = self.lookup.clone();
                let config = self.config.clone();
                let cancel = self.cancel.clone();

                tokio::spawn(async move {
                    loop {
                        if cancel.is_cancelled() {
                            debug!("Worker {} stopping: cancelled", id);
                            break;
                        }
                        let Some(candidate) = queue.lock().await.pop_front() else {
                            break;
                        };

                        let request = ResolutionRequest::new(&candidate, &config);
                        let result = AssertUnwindSafe(resolve(lookup.as_ref(), &request))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|_| ResolutionResult::Failed {
                                name: request.name.clone(),
                                reason: FailureReason::Other("lookup panicked".to_string()),
                            });

                        if tx.send(result).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            trace!("{:?}", result);
            let completed = self.progress.increment();
            on_result(&result, Progress { completed, total });
            results.push(result);
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }

        let unclaimed: Vec<Candidate> = queue.lock().await.drain(..).collect();
        if !unclaimed.is_empty() {
            info!("Run cancelled with {} candidates not dispatched", unclaimed.len());
        }
        for candidate in unclaimed {
            let result = ResolutionResult::Failed {
                name: candidate.fqdn(),
                reason: FailureReason::Cancelled,
            };
            let completed = self.progress.increment();
            on_result(&result, Progress { completed, total });
            results.push(result);
        }

        info!(
            "Finished {} lookups in {:.2}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolverTarget;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::time::Duration;

    /// Answers from a fixed table and records what it was asked.
    #[derive(Default)]
    struct FakeLookup {
        answers: HashMap<String, IpAddr>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: std::sync::Mutex<Vec<ResolutionRequest>>,
    }

    impl FakeLookup {
        fn with_answer(mut self, name: &str, address: &str) -> Self {
            self.answers.insert(name.to_string(), address.parse().unwrap());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> Vec<ResolutionRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Lookup for FakeLookup {
        async fn lookup(&self, request: &ResolutionRequest) -> std::result::Result<IpAddr, FailureReason> {
            self.calls.lock().unwrap().push(request.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.answers.get(&request.name).copied().ok_or(FailureReason::NxDomain)
        }
    }

    fn config(workers: usize) -> RunConfig {
        RunConfig::new("example.com", None, workers, Duration::from_secs(5)).unwrap()
    }

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("host{}", i % 25)).collect()
    }

    #[tokio::test]
    async fn test_example_domain_sweep() {
        let fake = Arc::new(FakeLookup::default().with_answer("www.example.com", "93.184.216.34"));
        let engine = ResolutionEngine::new(config(3), fake);

        let mut results = engine.run(engine.candidates(["www", "ftp", "mail"]), |_, _| {}).await;
        results.sort_by(|a, b| a.name().cmp(b.name()));

        assert_eq!(results.len(), 3);
        assert!(matches!(&results[0], ResolutionResult::Failed { name, .. } if name == "ftp.example.com"));
        assert!(matches!(&results[1], ResolutionResult::Failed { name, .. } if name == "mail.example.com"));
        assert_eq!(
            results[2],
            ResolutionResult::Resolved {
                name: "www.example.com".to_string(),
                address: "93.184.216.34".parse().unwrap(),
            }
        );
    }

    #[tokio::test]
    async fn test_every_candidate_yields_one_result() {
        for workers in [1, 3, 8, 50] {
            let engine = ResolutionEngine::new(config(workers), Arc::new(FakeLookup::default()));
            let input = labels(40);

            let mut names: Vec<String> = engine
                .run(engine.candidates(input.clone()), |_, _| {})
                .await
                .iter()
                .map(|r| r.name().to_string())
                .collect();
            let mut expected: Vec<String> = input.iter().map(|l| format!("{}.example.com", l)).collect();
            names.sort();
            expected.sort();

            assert_eq!(names, expected, "workers = {}", workers);
        }
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_worker_count() {
        for workers in [1, 4] {
            let fake = Arc::new(FakeLookup::default().with_delay(Duration::from_millis(10)));
            let engine = ResolutionEngine::new(config(workers), fake.clone());

            engine.run(engine.candidates(labels(30)), |_, _| {}).await;

            let max = fake.max_in_flight.load(Ordering::SeqCst);
            assert!(max >= 1 && max <= workers, "max in flight {} with {} workers", max, workers);
            assert_eq!(fake.calls().len(), 30);
        }
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_complete() {
        let engine = ResolutionEngine::new(config(5), Arc::new(FakeLookup::default()));
        let mut seen = Vec::new();

        engine
            .run(engine.candidates(labels(20)), |_, progress| seen.push(progress))
            .await;

        assert_eq!(seen.len(), 20);
        for (i, progress) in seen.iter().enumerate() {
            assert_eq!(progress.completed, i + 1);
            assert_eq!(progress.total, 20);
        }
        assert_eq!(engine.progress(), 20);
    }

    #[tokio::test]
    async fn test_resolver_override_used_for_every_query() {
        let config = RunConfig::new("example.com", Some("10.0.0.53"), 4, Duration::from_secs(5)).unwrap();
        let fake = Arc::new(FakeLookup::default());
        let engine = ResolutionEngine::new(config, fake.clone());

        engine.run(engine.candidates(labels(12)), |_, _| {}).await;

        let expected = ResolverTarget::Nameserver("10.0.0.53:53".parse().unwrap());
        let calls = fake.calls();
        assert_eq!(calls.len(), 12);
        assert!(calls.iter().all(|req| req.target == expected));
    }

    #[test]
    fn test_invalid_run_config_is_rejected_up_front() {
        let fake = FakeLookup::default();

        assert!(matches!(
            RunConfig::new("", None, 1, Duration::from_secs(5)),
            Err(crate::types::DnsFuzzerError::InvalidDomain(_))
        ));
        assert!(matches!(
            RunConfig::new("example.com", None, 0, Duration::from_secs(5)),
            Err(crate::types::DnsFuzzerError::ConfigError(_))
        ));
        assert!(matches!(
            RunConfig::new("example.com", None, 4, Duration::ZERO),
            Err(crate::types::DnsFuzzerError::ConfigError(_))
        ));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_routes_to_override() {
        // 127.0.0.1:9 is never queried: the mismatch is caught before any I/O.
        let pinned = RunConfig::new("example.com", Some("127.0.0.1:9"), 2, Duration::from_secs(1)).unwrap();
        let engine = ResolutionEngine::from_config(pinned).unwrap();
        assert_eq!(engine.config().resolver(), ResolverTarget::Nameserver("127.0.0.1:9".parse().unwrap()));

        let other = RunConfig::new("example.com", Some("10.0.0.53"), 2, Duration::from_secs(1)).unwrap();
        let lookup = DnsLookup::for_target(ResolverTarget::Nameserver("127.0.0.1:9".parse().unwrap()), Duration::from_secs(1))
            .unwrap();
        let mismatched = ResolutionEngine::new(other, Arc::new(lookup));

        let results = mismatched.run(mismatched.candidates(["www", "mail"]), |_, _| {}).await;
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, ResolutionResult::Failed { reason: FailureReason::Other(_), .. })));
    }

    #[tokio::test]
    async fn test_hanging_queries_fail_with_timeout() {
        let config = RunConfig::new("example.com", None, 2, Duration::from_millis(100)).unwrap();
        let fake = Arc::new(FakeLookup::default().with_delay(Duration::from_secs(3600)));
        let engine = ResolutionEngine::new(config, fake);
        let started = Instant::now();

        let results = engine.run(engine.candidates(["a", "b", "c"]), |_, _| {}).await;

        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| matches!(r, ResolutionResult::Failed { reason: FailureReason::Timeout, .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_dispatches_nothing() {
        let fake = Arc::new(FakeLookup::default());
        let token = CancellationToken::new();
        token.cancel();
        let engine = ResolutionEngine::new(config(4), fake.clone()).with_cancellation(token);

        let results = engine.run(engine.candidates(labels(10)), |_, _| {}).await;

        assert_eq!(results.len(), 10);
        assert!(results
            .iter()
            .all(|r| matches!(r, ResolutionResult::Failed { reason: FailureReason::Cancelled, .. })));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_run_accounts_for_everything() {
        let fake = Arc::new(FakeLookup::default().with_delay(Duration::from_millis(5)));
        let engine = ResolutionEngine::new(config(1), fake.clone());
        let token = engine.cancellation_token();

        let results = engine
            .run(engine.candidates(labels(10)), |_, progress| {
                if progress.completed == 1 {
                    token.cancel();
                }
            })
            .await;

        assert_eq!(results.len(), 10);
        assert!(fake.calls().len() < 10);
        let cancelled = results
            .iter()
            .filter(|r| matches!(r, ResolutionResult::Failed { reason: FailureReason::Cancelled, .. }))
            .count();
        assert_eq!(cancelled + fake.calls().len(), 10);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let engine = ResolutionEngine::new(config(4), Arc::new(FakeLookup::default()));
        let results = engine.run(Vec::new(), |_, _| {}).await;
        assert!(results.is_empty());
        assert_eq!(engine.progress(), 0);
    }
}
