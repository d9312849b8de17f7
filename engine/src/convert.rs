//! Cross-rate conversion through the base currency.

use chrono::NaiveDate;
use ratedesk_core::{ConversionResult, CurrencyCode, CurrencyRegistry, RateDeskError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::resolver::{AsOfResolver, ResolvedRate};

/// Converts amounts between any two known currencies.
///
/// Every non-identity conversion routes through the base currency: the
/// source leg is valued at its buy rate (the desk buys foreign currency),
/// the target leg at its sell rate (the desk sells foreign currency). The
/// converted amount is returned unrounded.
pub struct ConversionEngine {
    registry: Arc<CurrencyRegistry>,
    resolver: Arc<AsOfResolver>,
}

impl ConversionEngine {
    /// Create a new conversion engine.
    pub fn new(registry: Arc<CurrencyRegistry>, resolver: Arc<AsOfResolver>) -> Self {
        Self { registry, resolver }
    }

    /// Convert `amount` of `from` into `to` as of the given date.
    ///
    /// `None` means today; a future date is treated as today. A zero amount
    /// converts to zero without any rate lookup.
    #[instrument(skip(self), fields(from = %from, to = %to, amount = %amount))]
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: Option<NaiveDate>,
    ) -> Result<ConversionResult> {
        if amount < Decimal::ZERO {
            return Err(RateDeskError::InvalidAmount(format!(
                "amount must be non-negative, got {amount}"
            )));
        }
        if !self.registry.contains(from) {
            return Err(RateDeskError::UnknownCurrency(from.clone()));
        }
        if !self.registry.contains(to) {
            return Err(RateDeskError::UnknownCurrency(to.clone()));
        }

        let today = self.resolver.today();
        let as_of = as_of.unwrap_or(today).min(today);
        let base = self.registry.base_code();

        let result = if from == to {
            self.exact(amount, from, to, amount, as_of)
        } else if amount.is_zero() {
            self.exact(amount, from, to, Decimal::ZERO, as_of)
        } else if from == base {
            let leg = self.resolver.resolve(to, Some(as_of)).await?;
            ConversionResult {
                amount,
                from: from.clone(),
                to: to.clone(),
                converted: Self::base_to_target(amount, &leg)?,
                rate_date: leg.record.effective_date,
                from_rate: Decimal::ONE,
                to_rate: leg.record.sell,
            }
        } else if to == base {
            let leg = self.resolver.resolve(from, Some(as_of)).await?;
            ConversionResult {
                amount,
                from: from.clone(),
                to: to.clone(),
                converted: Self::foreign_to_base(amount, &leg)?,
                rate_date: leg.record.effective_date,
                from_rate: leg.record.buy,
                to_rate: Decimal::ONE,
            }
        } else {
            let from_leg = self.resolver.resolve(from, Some(as_of)).await?;
            let to_leg = self.resolver.resolve(to, Some(as_of)).await?;
            let in_base = Self::foreign_to_base(amount, &from_leg)?;
            ConversionResult {
                amount,
                from: from.clone(),
                to: to.clone(),
                converted: Self::base_to_target(in_base, &to_leg)?,
                rate_date: from_leg
                    .record
                    .effective_date
                    .max(to_leg.record.effective_date),
                from_rate: from_leg.record.buy,
                to_rate: to_leg.record.sell,
            }
        };

        info!(
            converted = %result.converted,
            rate_date = %result.rate_date,
            "conversion completed"
        );

        Ok(result)
    }

    /// Result for the paths that never touch the store.
    fn exact(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        converted: Decimal,
        as_of: NaiveDate,
    ) -> ConversionResult {
        ConversionResult {
            amount,
            from: from.clone(),
            to: to.clone(),
            converted,
            rate_date: as_of,
            from_rate: Decimal::ONE,
            to_rate: Decimal::ONE,
        }
    }

    // Stored rates are validated positive at ingestion; a zero here means
    // the store was written around validation.
    fn base_to_target(in_base: Decimal, leg: &ResolvedRate) -> Result<Decimal> {
        if leg.record.sell.is_zero() {
            return Err(RateDeskError::Internal(format!(
                "stored sell rate for {} on {} is zero",
                leg.record.currency, leg.record.effective_date
            )));
        }
        in_base
            .checked_div(leg.record.sell)
            .ok_or_else(|| Self::overflow(in_base))
    }

    fn foreign_to_base(amount: Decimal, leg: &ResolvedRate) -> Result<Decimal> {
        amount
            .checked_mul(leg.record.buy)
            .ok_or_else(|| Self::overflow(amount))
    }

    fn overflow(amount: Decimal) -> RateDeskError {
        RateDeskError::InvalidAmount(format!(
            "converting {amount} overflows the representable range"
        ))
    }
}
