//! Read-side aggregation over the store.

use std::sync::Arc;

use ratedesk_core::EngineStats;

use crate::refresh::RefreshCoordinator;
use crate::store::RateStore;

/// Assembles store-wide figures for monitoring surfaces.
///
/// Counts come from store scans; the last-update timestamp is the refresh
/// coordinator's process-wide record of its most recent successful merge.
pub struct StatsAggregator {
    store: Arc<dyn RateStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl StatsAggregator {
    /// Create a new aggregator.
    pub fn new(store: Arc<dyn RateStore>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { store, coordinator }
    }

    /// Snapshot of the current figures.
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            total_records: self.store.record_count().await,
            currency_count: self.store.distinct_currencies().await.len() as u64,
            last_update: self.coordinator.last_success(),
        }
    }
}
