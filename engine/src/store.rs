//! Rate record storage.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use dashmap::DashMap;
use ratedesk_core::{CurrencyCode, RateRecord, UpsertOutcome};
use std::collections::BTreeMap;

/// Storage contract for daily rate records.
///
/// Records are keyed by `(currency, effective_date)` and upserts are atomic
/// per key. Readers see committed records only and are never blocked by an
/// in-progress refresh.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Insert or replace the record stored under the record's key.
    async fn upsert(&self, record: RateRecord) -> UpsertOutcome;

    /// Exact point lookup.
    async fn get(&self, currency: &CurrencyCode, date: NaiveDate) -> Option<RateRecord>;

    /// Most recent record with `effective_date <= date`, looking back at
    /// most `lookback_days` calendar days. The window is inclusive on both
    /// ends.
    async fn latest_on_or_before(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Option<RateRecord>;

    /// Most recent record regardless of age.
    async fn latest(&self, currency: &CurrencyCode) -> Option<RateRecord>;

    /// Full series for a currency, ascending by effective date.
    async fn all_for_currency(&self, currency: &CurrencyCode) -> Vec<RateRecord>;

    /// Total records across all currencies and dates.
    async fn record_count(&self) -> u64;

    /// Currencies with at least one record, sorted by code.
    async fn distinct_currencies(&self) -> Vec<CurrencyCode>;
}

/// In-memory store holding a date-ordered series per currency.
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    series: DashMap<CurrencyCode, BTreeMap<NaiveDate, RateRecord>>,
}

impl MemoryRateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            series: DashMap::new(),
        }
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn upsert(&self, record: RateRecord) -> UpsertOutcome {
        let mut series = self.series.entry(record.currency.clone()).or_default();
        match series.insert(record.effective_date, record.clone()) {
            None => UpsertOutcome::Inserted,
            Some(previous) if previous == record => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        }
    }

    async fn get(&self, currency: &CurrencyCode, date: NaiveDate) -> Option<RateRecord> {
        self.series
            .get(currency)
            .and_then(|series| series.get(&date).cloned())
    }

    async fn latest_on_or_before(
        &self,
        currency: &CurrencyCode,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Option<RateRecord> {
        let series = self.series.get(currency)?;
        let floor = date - Duration::days(i64::from(lookback_days));
        series
            .value()
            .range(floor..=date)
            .next_back()
            .map(|(_, record)| record.clone())
    }

    async fn latest(&self, currency: &CurrencyCode) -> Option<RateRecord> {
        let series = self.series.get(currency)?;
        series
            .value()
            .last_key_value()
            .map(|(_, record)| record.clone())
    }

    async fn all_for_currency(&self, currency: &CurrencyCode) -> Vec<RateRecord> {
        self.series
            .get(currency)
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn record_count(&self) -> u64 {
        self.series
            .iter()
            .map(|entry| entry.value().len() as u64)
            .sum()
    }

    async fn distinct_currencies(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<CurrencyCode> =
            self.series.iter().map(|entry| entry.key().clone()).collect();
        codes.sort();
        codes
    }
}
