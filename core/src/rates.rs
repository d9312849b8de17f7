//! Daily rate records and engine outcome types.

use crate::currency::CurrencyCode;
use crate::error::{RateDeskError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Decimal places used when presenting converted amounts.
pub const DISPLAY_SCALE: u32 = 4;

/// One currency's published rates for one effective date.
///
/// All four rates are quoted as units of the base currency per one unit of
/// `currency`. Keyed by `(currency, effective_date)`: the store holds at
/// most one record per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    /// Quoted currency.
    pub currency: CurrencyCode,
    /// Publication date of the sheet this record came from.
    pub effective_date: NaiveDate,
    /// Listed buy rate.
    pub buy: Decimal,
    /// Listed sell rate.
    pub sell: Decimal,
    /// Effective (cash) buy rate.
    pub effective_buy: Decimal,
    /// Effective (cash) sell rate.
    pub effective_sell: Decimal,
}

impl RateRecord {
    /// Create a new rate record.
    pub fn new(
        currency: CurrencyCode,
        effective_date: NaiveDate,
        buy: Decimal,
        sell: Decimal,
        effective_buy: Decimal,
        effective_sell: Decimal,
    ) -> Self {
        Self {
            currency,
            effective_date,
            buy,
            sell,
            effective_buy,
            effective_sell,
        }
    }

    /// Published quadruples normally satisfy `buy <= sell`, but feeds do
    /// publish the occasional inversion and it is stored as given.
    pub fn has_inverted_spread(&self) -> bool {
        self.buy > self.sell
    }
}

/// One rate entry parsed from an upstream bulletin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRate {
    /// Quoted currency.
    pub code: CurrencyCode,
    /// Display name as published.
    pub name: String,
    /// Listed buy rate.
    pub buy: Decimal,
    /// Listed sell rate.
    pub sell: Decimal,
    /// Effective (cash) buy rate.
    pub effective_buy: Decimal,
    /// Effective (cash) sell rate.
    pub effective_sell: Decimal,
}

impl SheetRate {
    /// Build the storable record for this entry.
    pub fn to_record(&self, effective_date: NaiveDate) -> RateRecord {
        RateRecord::new(
            self.code.clone(),
            effective_date,
            self.buy,
            self.sell,
            self.effective_buy,
            self.effective_sell,
        )
    }

    fn rates(&self) -> [(&'static str, Decimal); 4] {
        [
            ("buy", self.buy),
            ("sell", self.sell),
            ("effectiveBuy", self.effective_buy),
            ("effectiveSell", self.effective_sell),
        ]
    }
}

/// A full upstream bulletin: one effective date, many currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSheet {
    /// Publication date of the bulletin.
    pub effective_date: NaiveDate,
    /// Rate entries, one per currency.
    pub rates: Vec<SheetRate>,
}

impl RateSheet {
    /// Create a new sheet.
    pub fn new(effective_date: NaiveDate, rates: Vec<SheetRate>) -> Self {
        Self {
            effective_date,
            rates,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Check whether the sheet carries no entries.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Validate the whole sheet before any of it is merged.
    ///
    /// Rejects an empty sheet, malformed codes, blank names, non-positive
    /// rates, and duplicate codes. An inverted spread is not an error.
    pub fn validate(&self) -> Result<()> {
        if self.rates.is_empty() {
            return Err(RateDeskError::MalformedSheet(
                "sheet contains no rate entries".to_string(),
            ));
        }

        let mut seen: HashSet<&CurrencyCode> = HashSet::with_capacity(self.rates.len());
        for rate in &self.rates {
            if !rate.code.is_well_formed() {
                return Err(RateDeskError::MalformedSheet(format!(
                    "invalid currency code: {:?}",
                    rate.code.as_str()
                )));
            }
            if rate.name.trim().is_empty() {
                return Err(RateDeskError::MalformedSheet(format!(
                    "blank currency name for {}",
                    rate.code
                )));
            }
            for (field, value) in rate.rates() {
                if value <= Decimal::ZERO {
                    return Err(RateDeskError::MalformedSheet(format!(
                        "non-positive {} rate for {}: {}",
                        field, rate.code, value
                    )));
                }
            }
            if !seen.insert(&rate.code) {
                return Err(RateDeskError::MalformedSheet(format!(
                    "duplicate entry for {}",
                    rate.code
                )));
            }
        }

        Ok(())
    }
}

/// How an upsert changed the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpsertOutcome {
    /// No record existed for the key.
    Inserted,
    /// A record existed and at least one rate differed.
    Updated,
    /// A value-identical record was already stored.
    Unchanged,
}

/// Result of one refresh pass.
///
/// Every caller that joined the in-flight attempt receives the same
/// outcome, `id` included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    /// Identifier of the refresh attempt.
    pub id: Uuid,
    /// Effective date of the merged sheet.
    pub sheet_date: NaiveDate,
    /// Records inserted.
    pub inserted: u64,
    /// Records updated in place.
    pub updated: u64,
    /// Records already stored with identical values.
    pub unchanged: u64,
    /// When the merge finished.
    pub completed_at: DateTime<Utc>,
}

impl RefreshOutcome {
    /// Total records covered by the merged sheet.
    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.unchanged
    }
}

/// Outcome of a cross-rate conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Requested amount, in `from` units.
    pub amount: Decimal,
    /// Source currency.
    pub from: CurrencyCode,
    /// Target currency.
    pub to: CurrencyCode,
    /// Converted amount, unrounded.
    pub converted: Decimal,
    /// Effective date of the rate data used; for a two-hop conversion the
    /// newer of the two resolved dates.
    pub rate_date: NaiveDate,
    /// Base units received per unit of `from` (ONE on a base or identity leg).
    pub from_rate: Decimal,
    /// Base units paid per unit of `to` (ONE on a base or identity leg).
    pub to_rate: Decimal,
}

impl ConversionResult {
    /// Converted amount rounded for presentation.
    pub fn display_amount(&self) -> Decimal {
        self.converted.round_dp(DISPLAY_SCALE)
    }
}

/// Store-wide figures for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Total rate records across all currencies and dates.
    pub total_records: u64,
    /// Distinct currencies with at least one record.
    pub currency_count: u64,
    /// Completion time of the last successful refresh, if any since startup.
    pub last_update: Option<DateTime<Utc>>,
}
