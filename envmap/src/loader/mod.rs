//! De-duplicated loading of remote SDK bundles.
//!
//! A map provider is only usable once its SDK bundle has been fetched. The
//! [`ScriptLoader`] guarantees that each URL is fetched at most once no matter
//! how many callers ask for it concurrently: the first caller starts the load
//! and every other caller attaches to the same in-flight future.
//!
//! # State Machine
//!
//! ```text
//! Unloaded --[load()]--> Loading --[fetch ok]-----------> Loaded
//!                               \--[fetch err/timeout]--> Failed
//! ```
//!
//! Entries are never removed. `Loaded` and `Failed` are terminal for the
//! lifetime of the [`ScriptRegistry`]; tests get isolation by creating a
//! fresh registry instead of resetting a global one.
//!
//! # Failure Policy
//!
//! Under [`LoadPolicy::FailOpen`] (the default) a failed load resolves to
//! [`LoadOutcome::Degraded`] instead of an error. Callers must therefore check
//! [`ScriptLoader::is_available`] before relying on the bundle.

mod types;

pub use types::{LoadError, LoadOutcome, LoadPolicy, LoadState, LoadStatus};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::http::{redact_url, BoxFuture, HttpClient};

/// Default bounded wait for a bundle load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Shortest bounded wait accepted from configuration.
pub const MIN_LOAD_TIMEOUT: Duration = Duration::from_secs(8);

/// Longest bounded wait accepted from configuration.
pub const MAX_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

type PendingLoad = Shared<BoxFuture<'static, Result<(), LoadError>>>;

/// Fetches a remote bundle.
///
/// The loader treats a non-empty body as a successful injection.
pub trait ScriptFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, LoadError>>;
}

/// [`ScriptFetcher`] backed by any [`HttpClient`].
pub struct HttpScriptFetcher {
    client: Arc<dyn HttpClient>,
}

impl HttpScriptFetcher {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

impl ScriptFetcher for HttpScriptFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, LoadError>> {
        let url = url.to_string();
        Box::pin(async move { self.client.get(&url).await.map_err(LoadError::from) })
    }
}

#[derive(Default)]
struct RegistryEntry {
    status: Option<LoadStatus>,
    pending: Option<PendingLoad>,
    error: Option<LoadError>,
}

/// Process-wide table of bundle load states keyed by URL.
///
/// Only [`ScriptLoader`] writes to it. Entries are append-only.
#[derive(Default)]
pub struct ScriptRegistry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl ScriptRegistry {
    /// Creates an empty, independent registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registry shared by the whole process.
    pub fn global() -> Arc<ScriptRegistry> {
        static GLOBAL: OnceLock<Arc<ScriptRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ScriptRegistry::new())))
    }

    /// Current status for a URL (`Unloaded` if never requested).
    pub fn status(&self, url: &str) -> LoadStatus {
        self.entries
            .lock()
            .get(url)
            .and_then(|e| e.status)
            .unwrap_or(LoadStatus::Unloaded)
    }

    /// Snapshot of every known entry, sorted by URL.
    pub fn snapshot(&self) -> Vec<LoadState> {
        let entries = self.entries.lock();
        let mut states: Vec<LoadState> = entries
            .iter()
            .map(|(url, e)| LoadState {
                url: redact_url(url),
                status: e.status.unwrap_or(LoadStatus::Unloaded),
            })
            .collect();
        states.sort_by(|a, b| a.url.cmp(&b.url));
        states
    }

    fn settle(&self, url: &str, result: &Result<(), LoadError>) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(url.to_string()).or_default();
        entry.pending = None;
        match result {
            Ok(()) => {
                entry.status = Some(LoadStatus::Loaded);
                entry.error = None;
            }
            Err(e) => {
                entry.status = Some(LoadStatus::Failed);
                entry.error = Some(e.clone());
            }
        }
    }
}

enum Claim {
    Settled(Result<(), LoadError>),
    Wait(PendingLoad),
}

/// Loads remote bundles exactly once per URL.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use envmap::http::ReqwestClient;
/// use envmap::loader::{HttpScriptFetcher, ScriptLoader, ScriptRegistry};
///
/// let fetcher = Arc::new(HttpScriptFetcher::new(Arc::new(ReqwestClient::new()?)));
/// let loader = ScriptLoader::new(ScriptRegistry::global(), fetcher);
/// let outcome = loader.load("https://api.mapbox.com/mapbox-gl-js/v2.15.0/mapbox-gl.js").await?;
/// ```
#[derive(Clone)]
pub struct ScriptLoader {
    registry: Arc<ScriptRegistry>,
    fetcher: Arc<dyn ScriptFetcher>,
    timeout: Duration,
    policy: LoadPolicy,
}

impl ScriptLoader {
    /// Creates a loader with the default timeout and fail-open policy.
    pub fn new(registry: Arc<ScriptRegistry>, fetcher: Arc<dyn ScriptFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            timeout: DEFAULT_LOAD_TIMEOUT,
            policy: LoadPolicy::default(),
        }
    }

    /// Set the bounded wait, clamped to 8..=15 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.clamp(MIN_LOAD_TIMEOUT, MAX_LOAD_TIMEOUT);
        self
    }

    /// Set the default failure policy.
    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    pub fn registry(&self) -> &Arc<ScriptRegistry> {
        &self.registry
    }

    /// Current status of a URL.
    pub fn status(&self, url: &str) -> LoadStatus {
        self.registry.status(url)
    }

    /// Returns true only if the bundle actually loaded.
    pub fn is_available(&self, url: &str) -> bool {
        self.status(url) == LoadStatus::Loaded
    }

    /// Load a bundle using the loader's default policy.
    pub async fn load(&self, url: &str) -> Result<LoadOutcome, LoadError> {
        self.load_with_policy(url, self.policy).await
    }

    /// Load a bundle, deciding explicitly how a failure is reported.
    ///
    /// Concurrent callers for the same URL share one fetch and all observe
    /// the same result.
    pub async fn load_with_policy(
        &self,
        url: &str,
        policy: LoadPolicy,
    ) -> Result<LoadOutcome, LoadError> {
        let result = match self.claim(url) {
            Claim::Settled(result) => result,
            Claim::Wait(pending) => pending.await,
        };
        Self::apply_policy(result, policy)
    }

    fn claim(&self, url: &str) -> Claim {
        let mut entries = self.registry.entries.lock();
        let entry = entries.entry(url.to_string()).or_default();

        match entry.status.unwrap_or(LoadStatus::Unloaded) {
            LoadStatus::Loaded => Claim::Settled(Ok(())),
            LoadStatus::Failed => {
                let error = entry.error.clone().unwrap_or_else(|| LoadError::Fetch {
                    url: redact_url(url),
                    reason: "previous load failed".to_string(),
                });
                Claim::Settled(Err(error))
            }
            LoadStatus::Loading => match &entry.pending {
                Some(pending) => {
                    debug!(url = %redact_url(url), "Bundle already loading, attaching to in-flight load");
                    Claim::Wait(pending.clone())
                }
                None => Claim::Settled(Err(LoadError::Fetch {
                    url: redact_url(url),
                    reason: "load state lost".to_string(),
                })),
            },
            LoadStatus::Unloaded => {
                let pending = self.start_load(url);
                entry.status = Some(LoadStatus::Loading);
                entry.pending = Some(pending.clone());
                Claim::Wait(pending)
            }
        }
    }

    fn start_load(&self, url: &str) -> PendingLoad {
        let url = url.to_string();
        let fetcher = Arc::clone(&self.fetcher);
        let registry = Arc::clone(&self.registry);
        let timeout = self.timeout;

        // The registry is keyed by the real URL; only the masked form leaves this module.
        let shown = redact_url(&url);
        info!(url = %shown, timeout_secs = timeout.as_secs(), "Loading SDK bundle");

        let load = async move {
            let result = match tokio::time::timeout(timeout, fetcher.fetch(&url)).await {
                Ok(Ok(body)) if body.is_empty() => Err(LoadError::EmptyBundle { url: shown }),
                Ok(Ok(body)) => {
                    debug!(url = %shown, bytes = body.len(), "SDK bundle loaded");
                    Ok(())
                }
                Ok(Err(e)) => Err(e.redacted()),
                Err(_) => Err(LoadError::Timeout { url: shown, timeout }),
            };
            registry.settle(&url, &result);
            result
        };

        let boxed: BoxFuture<'static, Result<(), LoadError>> = Box::pin(load);
        boxed.shared()
    }

    fn apply_policy(
        result: Result<(), LoadError>,
        policy: LoadPolicy,
    ) -> Result<LoadOutcome, LoadError> {
        match (result, policy) {
            (Ok(()), _) => Ok(LoadOutcome::Loaded),
            (Err(e), LoadPolicy::FailOpen) => {
                warn!(url = e.url(), error = %e, "SDK bundle unavailable, continuing degraded");
                Ok(LoadOutcome::Degraded(e))
            }
            (Err(e), LoadPolicy::FailClosed) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that counts calls and can be slowed down.
    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
        response: Result<Vec<u8>, LoadError>,
    }

    impl CountingFetcher {
        fn ok(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                response: Ok(b"sdk();".to_vec()),
            }
        }

        fn failing() -> Self {
            Self::failing_after(Duration::ZERO)
        }

        fn failing_after(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                response: Err(refused()),
            }
        }
    }

    impl ScriptFetcher for CountingFetcher {
        fn fetch(&self, _url: &str) -> BoxFuture<'_, Result<Vec<u8>, LoadError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                self.response.clone()
            })
        }
    }

    const URL: &str = "https://sdk.example/bundle.js";

    fn refused() -> LoadError {
        LoadError::Fetch {
            url: URL.to_string(),
            reason: "connection refused".to_string(),
        }
    }

    fn loader(fetcher: Arc<CountingFetcher>) -> ScriptLoader {
        ScriptLoader::new(Arc::new(ScriptRegistry::new()), fetcher)
    }

    /// Loader over a fresh registry whose fetches succeed immediately.
    pub(crate) fn test_loader() -> ScriptLoader {
        loader(Arc::new(CountingFetcher::ok(Duration::ZERO)))
    }

    /// Fail-open loader over a fresh registry whose fetches always fail.
    pub(crate) fn failing_loader() -> ScriptLoader {
        loader(Arc::new(CountingFetcher::failing()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_fetch() {
        let fetcher = Arc::new(CountingFetcher::ok(Duration::from_secs(2)));
        let loader = loader(Arc::clone(&fetcher));

        let (a, b, c) = tokio::join!(loader.load(URL), loader.load(URL), loader.load(URL));

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, Ok(LoadOutcome::Loaded));
        assert_eq!(b, Ok(LoadOutcome::Loaded));
        assert_eq!(c, Ok(LoadOutcome::Loaded));
        assert_eq!(loader.status(URL), LoadStatus::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_reject_together() {
        let fetcher = Arc::new(CountingFetcher::failing_after(Duration::from_secs(2)));
        let loader = loader(Arc::clone(&fetcher));

        let late_fail_open = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(loader.status(URL), LoadStatus::Loading);
            loader.load_with_policy(URL, LoadPolicy::FailOpen).await
        };

        let (a, b, c, late) = tokio::join!(
            loader.load_with_policy(URL, LoadPolicy::FailClosed),
            loader.load_with_policy(URL, LoadPolicy::FailClosed),
            loader.load_with_policy(URL, LoadPolicy::FailClosed),
            late_fail_open
        );

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, Err(refused()));
        assert_eq!(b, Err(refused()));
        assert_eq!(c, Err(refused()));
        assert_eq!(late, Ok(LoadOutcome::Degraded(refused())));
        assert_eq!(loader.status(URL), LoadStatus::Failed);
    }

    #[tokio::test]
    async fn test_loaded_url_resolves_without_refetch() {
        let fetcher = Arc::new(CountingFetcher::ok(Duration::ZERO));
        let loader = loader(Arc::clone(&fetcher));

        loader.load(URL).await.unwrap();
        loader.load(URL).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_available(URL));
    }

    #[tokio::test]
    async fn test_fail_open_resolves_degraded() {
        let fetcher = Arc::new(CountingFetcher::failing());
        let loader = loader(fetcher);

        let outcome = loader.load(URL).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Degraded(LoadError::Fetch { .. })));
        assert!(!loader.is_available(URL));
        assert_eq!(loader.status(URL), LoadStatus::Failed);
    }

    #[tokio::test]
    async fn test_fail_closed_returns_error() {
        let fetcher = Arc::new(CountingFetcher::failing());
        let loader = loader(fetcher);

        let result = loader.load_with_policy(URL, LoadPolicy::FailClosed).await;
        assert!(matches!(result, Err(LoadError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_failed_url_is_not_refetched() {
        let fetcher = Arc::new(CountingFetcher::failing());
        let loader = loader(Arc::clone(&fetcher));

        let _ = loader.load(URL).await;
        let second = loader.load_with_policy(URL, LoadPolicy::FailClosed).await;

        assert!(second.is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_bundle_times_out() {
        let fetcher = Arc::new(CountingFetcher::ok(Duration::from_secs(60)));
        let loader = loader(fetcher).with_timeout(Duration::from_secs(10));

        let outcome = loader.load(URL).await.unwrap();
        match outcome {
            LoadOutcome::Degraded(e) => assert!(e.is_timeout()),
            other => panic!("Expected timeout, got {other:?}"),
        }
        assert_eq!(loader.status(URL), LoadStatus::Failed);
    }

    #[tokio::test]
    async fn test_empty_bundle_is_a_failure() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            response: Ok(Vec::new()),
        });
        let loader = loader(fetcher);

        let result = loader.load_with_policy(URL, LoadPolicy::FailClosed).await;
        assert!(matches!(result, Err(LoadError::EmptyBundle { .. })));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let fetcher = Arc::new(CountingFetcher::ok(Duration::ZERO));
        let short = loader(Arc::clone(&fetcher)).with_timeout(Duration::from_secs(1));
        let long = loader(fetcher).with_timeout(Duration::from_secs(120));
        assert_eq!(short.timeout(), MIN_LOAD_TIMEOUT);
        assert_eq!(long.timeout(), MAX_LOAD_TIMEOUT);
    }

    #[test]
    fn test_unknown_url_is_unloaded() {
        let registry = ScriptRegistry::new();
        assert_eq!(registry.status(URL), LoadStatus::Unloaded);
        assert!(registry.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_lists_entries() {
        let fetcher = Arc::new(CountingFetcher::ok(Duration::ZERO));
        let loader = loader(fetcher);
        loader.load(URL).await.unwrap();

        let snapshot = loader.registry().snapshot();
        assert_eq!(
            snapshot,
            vec![LoadState {
                url: URL.to_string(),
                status: LoadStatus::Loaded,
            }]
        );
    }
}
