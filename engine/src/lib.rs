//! RateDesk Engine
//!
//! Daily FX rate store and cross-rate conversion engine, quoted against a
//! fixed base currency.
//!
//! # Features
//!
//! - Keyed rate store with idempotent per-day upserts
//! - As-of resolution with a bounded lookback window for unpublished days
//! - Two-hop conversion through the base currency with buy/sell directionality
//! - Single-flight refresh from an upstream bulletin provider
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use ratedesk_core::{Currency, CurrencyRegistry, SystemClock};
//! use ratedesk_engine::{HttpSheetProvider, MemoryRateStore, RateService};
//!
//! let registry = Arc::new(CurrencyRegistry::new(
//!     Currency::new("TRY", "Turkish Lira"),
//!     vec![Currency::new("USD", "US Dollar")],
//! ));
//! let clock = Arc::new(SystemClock);
//! let provider = Arc::new(HttpSheetProvider::new(clock.clone())?);
//! let service = RateService::new(registry, Arc::new(MemoryRateStore::new()), provider, clock);
//!
//! service.refresh().await?;
//! let result = service
//!     .convert(dec!(100), &"USD".into(), &"EUR".into(), None)
//!     .await?;
//! ```

pub mod convert;
pub mod provider;
pub mod refresh;
pub mod resolver;
pub mod service;
pub mod stats;
pub mod store;

pub use convert::ConversionEngine;
pub use provider::{HttpSheetProvider, HttpSheetProviderConfig, SheetProvider};
pub use refresh::{RefreshConfig, RefreshCoordinator, RefreshPolicy};
pub use resolver::{AsOfResolver, ResolvedRate, ResolverConfig};
pub use service::{RateService, RateServiceConfig};
pub use stats::StatsAggregator;
pub use store::{MemoryRateStore, RateStore};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockSheetProvider;
