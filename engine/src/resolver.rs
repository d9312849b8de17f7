//! As-of rate resolution with bounded lookback.

use chrono::NaiveDate;
use dashmap::DashMap;
use ratedesk_core::{Clock, CurrencyCode, RateDeskError, RateRecord, Result};
use std::sync::Arc;
use tracing::debug;

use crate::store::RateStore;

/// A record resolved for a requested date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRate {
    /// The record found, carrying its actual effective date.
    pub record: RateRecord,
    /// The date the caller asked about, after future-date clamping.
    pub as_of: NaiveDate,
}

/// Configuration for as-of resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How many calendar days behind the requested date a record may lie.
    pub lookback_days: u32,
    /// Whether successful resolutions are memoized until the next refresh.
    pub cache_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookback_days: 10,
            cache_enabled: true,
        }
    }
}

/// Resolves the most recent record on or before a requested date.
///
/// Resolution is a pure function of store contents and the injected clock.
/// Successful lookups are memoized per `(currency, as_of)`; the refresh
/// coordinator calls [`AsOfResolver::invalidate`] after merging new data.
/// Failures are never memoized.
pub struct AsOfResolver {
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
    memo: DashMap<(CurrencyCode, NaiveDate), RateRecord>,
}

impl AsOfResolver {
    /// Create a resolver with the default configuration.
    pub fn new(store: Arc<dyn RateStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(store, clock, ResolverConfig::default())
    }

    /// Create a resolver with a custom configuration.
    pub fn with_config(
        store: Arc<dyn RateStore>,
        clock: Arc<dyn Clock>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            memo: DashMap::new(),
        }
    }

    /// Lookback window in use, in calendar days.
    pub fn lookback_days(&self) -> u32 {
        self.config.lookback_days
    }

    /// The date reads default to.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Resolve `currency` as of the given date.
    ///
    /// `None` means today; a future date is treated as today. Fails with
    /// `StaleRate` when no record lies within the lookback window, whether
    /// the currency has older records or none at all.
    pub async fn resolve(
        &self,
        currency: &CurrencyCode,
        as_of: Option<NaiveDate>,
    ) -> Result<ResolvedRate> {
        let today = self.clock.today();
        let as_of = as_of.unwrap_or(today).min(today);

        let key = (currency.clone(), as_of);
        if self.config.cache_enabled {
            if let Some(hit) = self.memo.get(&key) {
                debug!(currency = %currency, %as_of, "resolver memo hit");
                return Ok(ResolvedRate {
                    record: hit.clone(),
                    as_of,
                });
            }
        }

        let record = self
            .store
            .latest_on_or_before(currency, as_of, self.config.lookback_days)
            .await
            .ok_or_else(|| RateDeskError::StaleRate {
                currency: currency.clone(),
                as_of,
                lookback_days: self.config.lookback_days,
            })?;

        if self.config.cache_enabled {
            self.memo.insert(key, record.clone());
        }

        Ok(ResolvedRate { record, as_of })
    }

    /// Drop all memoized resolutions.
    pub fn invalidate(&self) {
        let dropped = self.memo.len();
        self.memo.clear();
        debug!(dropped, "resolver memo invalidated");
    }

    /// Number of memoized resolutions.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRateStore;
    use ratedesk_core::FixedClock;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(code: &str, on: NaiveDate, buy: Decimal, sell: Decimal) -> RateRecord {
        RateRecord::new(CurrencyCode::new(code), on, buy, sell, buy, sell)
    }

    async fn setup(today: NaiveDate) -> (Arc<MemoryRateStore>, AsOfResolver) {
        let store = Arc::new(MemoryRateStore::new());
        let resolver = AsOfResolver::new(
            store.clone() as Arc<dyn RateStore>,
            Arc::new(FixedClock::on(today)),
        );
        (store, resolver)
    }

    #[tokio::test]
    async fn test_resolves_exact_date() {
        let (store, resolver) = setup(date(2024, 1, 10)).await;
        let usd = CurrencyCode::new("USD");
        store
            .upsert(record("USD", date(2024, 1, 10), dec!(30.00), dec!(30.10)))
            .await;

        let resolved = resolver.resolve(&usd, Some(date(2024, 1, 10))).await.unwrap();
        assert_eq!(resolved.record.effective_date, date(2024, 1, 10));
        assert_eq!(resolved.as_of, date(2024, 1, 10));
    }

    #[tokio::test]
    async fn test_falls_back_within_lookback() {
        let (store, resolver) = setup(date(2024, 1, 20)).await;
        let usd = CurrencyCode::new("USD");
        store
            .upsert(record("USD", date(2024, 1, 10), dec!(30.00), dec!(30.10)))
            .await;

        // Ten days out: still resolvable.
        let resolved = resolver.resolve(&usd, Some(date(2024, 1, 20))).await.unwrap();
        assert_eq!(resolved.record.effective_date, date(2024, 1, 10));
    }

    #[tokio::test]
    async fn test_stale_beyond_lookback() {
        let (store, resolver) = setup(date(2024, 1, 21)).await;
        let usd = CurrencyCode::new("USD");
        store
            .upsert(record("USD", date(2024, 1, 10), dec!(30.00), dec!(30.10)))
            .await;

        let err = resolver
            .resolve(&usd, Some(date(2024, 1, 21)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RateDeskError::StaleRate {
                currency: usd,
                as_of: date(2024, 1, 21),
                lookback_days: 10,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_currency_reports_staleness() {
        let (_store, resolver) = setup(date(2024, 1, 10)).await;
        let err = resolver
            .resolve(&CurrencyCode::new("GBP"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RateDeskError::StaleRate { .. }));
    }

    #[tokio::test]
    async fn test_future_date_clamps_to_today() {
        let today = date(2024, 1, 15);
        let (store, resolver) = setup(today).await;
        let usd = CurrencyCode::new("USD");
        store
            .upsert(record("USD", today, dec!(30.00), dec!(30.10)))
            .await;

        let resolved = resolver
            .resolve(&usd, Some(date(2024, 3, 1)))
            .await
            .unwrap();
        assert_eq!(resolved.as_of, today);
        assert_eq!(resolved.record.effective_date, today);
    }

    #[tokio::test]
    async fn test_none_defaults_to_today() {
        let today = date(2024, 1, 15);
        let (store, resolver) = setup(today).await;
        let usd = CurrencyCode::new("USD");
        store
            .upsert(record("USD", date(2024, 1, 12), dec!(30.00), dec!(30.10)))
            .await;

        let resolved = resolver.resolve(&usd, None).await.unwrap();
        assert_eq!(resolved.as_of, today);
        assert_eq!(resolved.record.effective_date, date(2024, 1, 12));
    }

    #[tokio::test]
    async fn test_memo_holds_until_invalidated() {
        let (store, resolver) = setup(date(2024, 1, 15)).await;
        let usd = CurrencyCode::new("USD");
        store
            .upsert(record("USD", date(2024, 1, 10), dec!(30.00), dec!(30.10)))
            .await;

        let first = resolver.resolve(&usd, None).await.unwrap();
        assert_eq!(first.record.effective_date, date(2024, 1, 10));

        // Newer data lands; the memo still answers until invalidated.
        store
            .upsert(record("USD", date(2024, 1, 15), dec!(30.50), dec!(30.60)))
            .await;
        let memoized = resolver.resolve(&usd, None).await.unwrap();
        assert_eq!(memoized.record.effective_date, date(2024, 1, 10));

        resolver.invalidate();
        let fresh = resolver.resolve(&usd, None).await.unwrap();
        assert_eq!(fresh.record.effective_date, date(2024, 1, 15));
    }

    #[tokio::test]
    async fn test_failures_are_not_memoized() {
        let (store, resolver) = setup(date(2024, 1, 15)).await;
        let usd = CurrencyCode::new("USD");

        assert!(resolver.resolve(&usd, None).await.is_err());
        assert_eq!(resolver.memo_len(), 0);

        store
            .upsert(record("USD", date(2024, 1, 15), dec!(30.00), dec!(30.10)))
            .await;
        assert!(resolver.resolve(&usd, None).await.is_ok());
    }
}
