//! Single-flight refresh of the rate store from the upstream provider.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use ratedesk_core::{Clock, RateDeskError, RefreshOutcome, Result, UpsertOutcome};

use crate::provider::SheetProvider;
use crate::resolver::AsOfResolver;
use crate::store::RateStore;

/// What a caller gets when another refresh is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Wait for the in-flight attempt and share its outcome.
    #[default]
    WaitAndShare,
    /// Fail fast with `RefreshInProgress`.
    Reject,
}

/// Configuration for the refresh coordinator.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Policy for callers that find a refresh in flight.
    pub policy: RefreshPolicy,
    /// Upstream fetch timeout.
    pub fetch_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            policy: RefreshPolicy::WaitAndShare,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// A finished attempt, published so joiners can pick it up.
#[derive(Debug, Clone)]
struct Attempt {
    seq: u64,
    result: Result<RefreshOutcome>,
}

/// Serializes refreshes: at most one fetch-and-merge in flight per process.
///
/// The first caller becomes the leader; it fetches one sheet, validates it
/// in full, then merges it record by record. Callers arriving while the
/// leader runs either wait for the leader's exact outcome or are rejected,
/// depending on [`RefreshPolicy`]. No partial sheet is ever merged.
pub struct RefreshCoordinator {
    provider: Arc<dyn SheetProvider>,
    store: Arc<dyn RateStore>,
    resolver: Arc<AsOfResolver>,
    clock: Arc<dyn Clock>,
    config: RefreshConfig,
    /// Held by the leader for the duration of one attempt.
    leader: Mutex<()>,
    /// Monotonic attempt counter, bumped by the leader under the lock.
    seq: AtomicU64,
    /// Last finished attempt.
    published: watch::Sender<Option<Attempt>>,
    /// Completion time of the last successful merge since startup.
    last_success: RwLock<Option<DateTime<Utc>>>,
}

impl RefreshCoordinator {
    /// Create a coordinator with the default configuration.
    pub fn new(
        provider: Arc<dyn SheetProvider>,
        store: Arc<dyn RateStore>,
        resolver: Arc<AsOfResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_config(provider, store, resolver, clock, RefreshConfig::default())
    }

    /// Create a coordinator with a custom configuration.
    pub fn with_config(
        provider: Arc<dyn SheetProvider>,
        store: Arc<dyn RateStore>,
        resolver: Arc<AsOfResolver>,
        clock: Arc<dyn Clock>,
        config: RefreshConfig,
    ) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            provider,
            store,
            resolver,
            clock,
            config,
            leader: Mutex::new(()),
            seq: AtomicU64::new(0),
            published,
            last_success: RwLock::new(None),
        }
    }

    /// Completion time of the last successful refresh since startup.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.read()
    }

    /// Fetch the daily sheet and merge it into the store.
    ///
    /// Returns the merge counts, or the shared outcome of the attempt this
    /// call joined. A joined attempt's outcome is returned verbatim, id
    /// included.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        // Joiners only accept attempts that finish after they arrived, so
        // the observed sequence is read before trying for leadership.
        let mut rx = self.published.subscribe();
        let observed = rx.borrow_and_update().as_ref().map_or(0, |a| a.seq);

        match self.leader.try_lock() {
            Ok(_guard) => {
                let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
                let result = self.run_attempt().await;
                self.published.send_replace(Some(Attempt {
                    seq,
                    result: result.clone(),
                }));
                result
            }
            Err(_) => match self.config.policy {
                RefreshPolicy::Reject => Err(RateDeskError::RefreshInProgress),
                RefreshPolicy::WaitAndShare => loop {
                    {
                        let current = rx.borrow_and_update();
                        if let Some(attempt) = current.as_ref() {
                            if attempt.seq > observed {
                                return attempt.result.clone();
                            }
                        }
                    }
                    if rx.changed().await.is_err() {
                        return Err(RateDeskError::Internal(
                            "refresh publisher closed".to_string(),
                        ));
                    }
                },
            },
        }
    }

    async fn run_attempt(&self) -> Result<RefreshOutcome> {
        let started = std::time::Instant::now();

        let fetch = self.provider.fetch_daily_sheet();
        let sheet = match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(sheet)) => sheet,
            Ok(Err(err)) => {
                warn!(provider = self.provider.name(), error = %err, "upstream fetch failed");
                return Err(err);
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout_ms = self.config.fetch_timeout.as_millis() as u64,
                    "upstream fetch timed out"
                );
                return Err(RateDeskError::UpstreamUnavailable(format!(
                    "fetch exceeded {}ms",
                    self.config.fetch_timeout.as_millis()
                )));
            }
        };

        sheet.validate()?;

        let mut inserted = 0u64;
        let mut updated = 0u64;
        let mut unchanged = 0u64;
        for rate in &sheet.rates {
            let record = rate.to_record(sheet.effective_date);
            if record.has_inverted_spread() {
                warn!(
                    currency = %record.currency,
                    buy = %record.buy,
                    sell = %record.sell,
                    "inverted spread published upstream"
                );
            }
            match self.store.upsert(record).await {
                UpsertOutcome::Inserted => inserted += 1,
                UpsertOutcome::Updated => updated += 1,
                UpsertOutcome::Unchanged => unchanged += 1,
            }
        }

        let completed_at = self.clock.now();
        *self.last_success.write() = Some(completed_at);
        self.resolver.invalidate();

        let outcome = RefreshOutcome {
            id: Uuid::now_v7(),
            sheet_date: sheet.effective_date,
            inserted,
            updated,
            unchanged,
            completed_at,
        };

        info!(
            sheet_date = %outcome.sheet_date,
            inserted,
            updated,
            unchanged,
            total = outcome.total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refresh merged"
        );

        Ok(outcome)
    }
}
