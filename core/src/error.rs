//! Error taxonomy for RateDesk operations.

use crate::currency::CurrencyCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for RateDesk operations.
///
/// The enum is `Clone` so that a refresh attempt's failure can be handed
/// verbatim to every caller that joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateDeskError {
    /// Conversion amount is not a valid quantity.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is outside the known set.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(CurrencyCode),

    /// No record within the lookback window of the requested date.
    #[error("No rate for {currency} within {lookback_days} days of {as_of}")]
    StaleRate {
        currency: CurrencyCode,
        as_of: NaiveDate,
        lookback_days: u32,
    },

    /// Point query for a (currency, date) pair with no record.
    #[error("No rate stored for {currency} on {date}")]
    RecordNotFound {
        currency: CurrencyCode,
        date: NaiveDate,
    },

    /// Upstream provider unreachable, erroring, or timed out.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Fetched sheet failed validation.
    #[error("Malformed sheet: {0}")]
    MalformedSheet(String),

    /// A refresh is already in flight and the policy rejects joiners.
    #[error("Refresh already in progress")]
    RefreshInProgress,

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by boundaries to map errors onto their own
/// failure vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller passed something invalid.
    Input,
    /// The store has no usable data for the request.
    DataAvailability,
    /// The upstream provider failed.
    Upstream,
    /// Lost a race against another in-flight operation.
    Concurrency,
    /// Engine-side invariant violation.
    Internal,
}

impl RateDeskError {
    /// Classify the error.
    pub fn class(&self) -> ErrorClass {
        match self {
            RateDeskError::InvalidAmount(_) | RateDeskError::UnknownCurrency(_) => {
                ErrorClass::Input
            }
            RateDeskError::StaleRate { .. } | RateDeskError::RecordNotFound { .. } => {
                ErrorClass::DataAvailability
            }
            RateDeskError::UpstreamUnavailable(_) | RateDeskError::MalformedSheet(_) => {
                ErrorClass::Upstream
            }
            RateDeskError::RefreshInProgress => ErrorClass::Concurrency,
            RateDeskError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Check if retrying the same call can succeed without caller changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Upstream | ErrorClass::Concurrency
        )
    }

    /// Stable code for boundary mappings and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            RateDeskError::InvalidAmount(_) => "INVALID_AMOUNT",
            RateDeskError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            RateDeskError::StaleRate { .. } => "STALE_RATE",
            RateDeskError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            RateDeskError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            RateDeskError::MalformedSheet(_) => "MALFORMED_SHEET",
            RateDeskError::RefreshInProgress => "REFRESH_IN_PROGRESS",
            RateDeskError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias for RateDesk operations.
pub type Result<T> = std::result::Result<T, RateDeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = RateDeskError::UnknownCurrency(CurrencyCode::new("XXX"));
        assert_eq!(err.error_code(), "UNKNOWN_CURRENCY");

        let err = RateDeskError::StaleRate {
            currency: CurrencyCode::new("USD"),
            as_of: NaiveDate::from_ymd_opt(2024, 1, 21).unwrap(),
            lookback_days: 10,
        };
        assert_eq!(err.error_code(), "STALE_RATE");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RateDeskError::UpstreamUnavailable("timeout".into()).is_retryable());
        assert!(RateDeskError::RefreshInProgress.is_retryable());
        assert!(!RateDeskError::InvalidAmount("negative".into()).is_retryable());
        assert!(!RateDeskError::UnknownCurrency(CurrencyCode::new("XXX")).is_retryable());
    }

    #[test]
    fn test_stale_and_not_found_are_distinct() {
        let stale = RateDeskError::StaleRate {
            currency: CurrencyCode::new("USD"),
            as_of: NaiveDate::from_ymd_opt(2024, 1, 21).unwrap(),
            lookback_days: 10,
        };
        let missing = RateDeskError::RecordNotFound {
            currency: CurrencyCode::new("USD"),
            date: NaiveDate::from_ymd_opt(2024, 1, 21).unwrap(),
        };
        assert_ne!(stale.error_code(), missing.error_code());
        assert_eq!(stale.class(), ErrorClass::DataAvailability);
        assert_eq!(missing.class(), ErrorClass::DataAvailability);
    }

    #[test]
    fn test_display_includes_context() {
        let err = RateDeskError::StaleRate {
            currency: CurrencyCode::new("USD"),
            as_of: NaiveDate::from_ymd_opt(2024, 1, 21).unwrap(),
            lookback_days: 10,
        };
        let text = err.to_string();
        assert!(text.contains("USD"));
        assert!(text.contains("10"));
        assert!(text.contains("2024-01-21"));
    }
}
