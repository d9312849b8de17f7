//! Request/response facade over the engine.

use std::sync::Arc;

use chrono::NaiveDate;
use ratedesk_core::{
    Clock, ConversionResult, Currency, CurrencyCode, CurrencyRegistry, EngineStats, RateDeskError,
    RateRecord, RefreshOutcome, Result,
};
use rust_decimal::Decimal;

use crate::convert::ConversionEngine;
use crate::provider::SheetProvider;
use crate::refresh::{RefreshConfig, RefreshCoordinator};
use crate::resolver::{AsOfResolver, ResolverConfig};
use crate::stats::StatsAggregator;
use crate::store::RateStore;

/// Configuration for the rate service.
#[derive(Debug, Clone, Default)]
pub struct RateServiceConfig {
    /// Resolver configuration.
    pub resolver: ResolverConfig,
    /// Refresh configuration.
    pub refresh: RefreshConfig,
}

/// The operations a transport boundary calls.
///
/// Owns the wiring between store, resolver, conversion engine and refresh
/// coordinator; the registry gates which currencies the read and convert
/// surface accepts, independent of what the store holds.
pub struct RateService {
    registry: Arc<CurrencyRegistry>,
    store: Arc<dyn RateStore>,
    engine: ConversionEngine,
    coordinator: Arc<RefreshCoordinator>,
    aggregator: StatsAggregator,
}

impl RateService {
    /// Create a service with the default configuration.
    pub fn new(
        registry: Arc<CurrencyRegistry>,
        store: Arc<dyn RateStore>,
        provider: Arc<dyn SheetProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_config(registry, store, provider, clock, RateServiceConfig::default())
    }

    /// Create a service with a custom configuration.
    pub fn with_config(
        registry: Arc<CurrencyRegistry>,
        store: Arc<dyn RateStore>,
        provider: Arc<dyn SheetProvider>,
        clock: Arc<dyn Clock>,
        config: RateServiceConfig,
    ) -> Self {
        let resolver = Arc::new(AsOfResolver::with_config(
            store.clone(),
            clock.clone(),
            config.resolver,
        ));
        let engine = ConversionEngine::new(registry.clone(), resolver.clone());
        let coordinator = Arc::new(RefreshCoordinator::with_config(
            provider,
            store.clone(),
            resolver,
            clock,
            config.refresh,
        ));
        let aggregator = StatsAggregator::new(store.clone(), coordinator.clone());
        Self {
            registry,
            store,
            engine,
            coordinator,
            aggregator,
        }
    }

    /// Newest stored record for each known currency.
    ///
    /// Currencies without any record are skipped, so an empty store yields
    /// an empty list rather than an error.
    pub async fn latest_rates(&self) -> Vec<RateRecord> {
        let mut records = Vec::with_capacity(self.registry.quoted().len());
        for currency in self.registry.quoted() {
            if let Some(record) = self.store.latest(&currency.code).await {
                records.push(record);
            }
        }
        records
    }

    /// Stored record for one currency on one exact date.
    ///
    /// Unlike [`RateService::convert`] this does not fall back to earlier
    /// dates; a date with no published sheet is `RecordNotFound`.
    pub async fn rate_on(&self, currency: &CurrencyCode, date: NaiveDate) -> Result<RateRecord> {
        if !self.registry.contains(currency) {
            return Err(RateDeskError::UnknownCurrency(currency.clone()));
        }
        self.store
            .get(currency, date)
            .await
            .ok_or_else(|| RateDeskError::RecordNotFound {
                currency: currency.clone(),
                date,
            })
    }

    /// Stored series for one currency, ascending by date, optionally
    /// restricted to an inclusive date range.
    ///
    /// A known currency with no records in range yields an empty series.
    pub async fn history(
        &self,
        currency: &CurrencyCode,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<RateRecord>> {
        if !self.registry.contains(currency) {
            return Err(RateDeskError::UnknownCurrency(currency.clone()));
        }
        let mut series = self.store.all_for_currency(currency).await;
        if let Some(from) = from {
            series.retain(|record| record.effective_date >= from);
        }
        if let Some(to) = to {
            series.retain(|record| record.effective_date <= to);
        }
        Ok(series)
    }

    /// Store-wide figures.
    pub async fn stats(&self) -> EngineStats {
        self.aggregator.stats().await
    }

    /// All known currencies, base first.
    pub fn currencies(&self) -> Vec<Currency> {
        self.registry.all()
    }

    /// Convert an amount between two known currencies as of a date.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: Option<NaiveDate>,
    ) -> Result<ConversionResult> {
        self.engine.convert(amount, from, to, as_of).await
    }

    /// Fetch the daily sheet and merge it into the store.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        self.coordinator.refresh().await
    }
}
