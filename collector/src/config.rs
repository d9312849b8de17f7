//! Collector configuration.

use std::time::Duration;

use ratedesk_core::{Currency, CurrencyCode, CurrencyRegistry};
use ratedesk_engine::provider::{HttpSheetProviderConfig, DEFAULT_BULLETIN_URL};
use ratedesk_engine::refresh::RefreshConfig;
use ratedesk_engine::resolver::ResolverConfig;
use ratedesk_engine::service::RateServiceConfig;

/// Quoted currencies accepted by default, as they appear on the bulletin.
const DEFAULT_CURRENCIES: &[(&str, &str)] = &[
    ("USD", "US DOLLAR"),
    ("EUR", "EURO"),
    ("GBP", "POUND STERLING"),
    ("CHF", "SWISS FRANC"),
    ("AUD", "AUSTRALIAN DOLLAR"),
    ("CAD", "CANADIAN DOLLAR"),
    ("DKK", "DANISH KRONE"),
    ("SEK", "SWEDISH KRONA"),
    ("NOK", "NORWEGIAN KRONE"),
    ("JPY", "JAPANESE YEN"),
    ("SAR", "SAUDI RIYAL"),
    ("KWD", "KUWAITI DINAR"),
];

/// Main collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Base currency code.
    pub base_code: String,
    /// Base currency display name.
    pub base_name: String,
    /// Quoted currencies as (code, name) pairs.
    pub currencies: Vec<(String, String)>,
    /// Bulletin URL.
    pub bulletin_url: String,
    /// Upstream fetch timeout.
    pub fetch_timeout: Duration,
    /// Time between refresh passes. The bulletin is daily, so a few hours
    /// is plenty.
    pub refresh_interval: Duration,
    /// As-of lookback window in calendar days.
    pub lookback_days: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_code: "TRY".to_string(),
            base_name: "TURKISH LIRA".to_string(),
            currencies: DEFAULT_CURRENCIES
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
            bulletin_url: DEFAULT_BULLETIN_URL.to_string(),
            fetch_timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(6 * 60 * 60),
            lookback_days: 10,
        }
    }
}

impl CollectorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(code) = std::env::var("COLLECTOR_BASE_CODE") {
            config.base_code = code;
        }

        if let Ok(name) = std::env::var("COLLECTOR_BASE_NAME") {
            config.base_name = name;
        }

        if let Ok(raw) = std::env::var("COLLECTOR_CURRENCIES") {
            if let Some(currencies) = parse_currency_list(&raw) {
                config.currencies = currencies;
            }
        }

        if let Ok(url) = std::env::var("COLLECTOR_BULLETIN_URL") {
            config.bulletin_url = url;
        }

        if let Ok(secs) = std::env::var("COLLECTOR_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.fetch_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("COLLECTOR_REFRESH_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.refresh_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(days) = std::env::var("COLLECTOR_LOOKBACK_DAYS") {
            if let Ok(days) = days.parse() {
                config.lookback_days = days;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !CurrencyCode::new(&self.base_code).is_well_formed() {
            return Err(format!("Invalid base currency code: {:?}", self.base_code));
        }

        if self.currencies.is_empty() {
            return Err("Currency list cannot be empty".to_string());
        }

        for (code, _) in &self.currencies {
            if !CurrencyCode::new(code).is_well_formed() {
                return Err(format!("Invalid quoted currency code: {:?}", code));
            }
        }

        if self.bulletin_url.is_empty() {
            return Err("Bulletin URL cannot be empty".to_string());
        }

        if self.refresh_interval.is_zero() {
            return Err("Refresh interval cannot be zero".to_string());
        }

        if self.fetch_timeout.is_zero() {
            return Err("Fetch timeout cannot be zero".to_string());
        }

        Ok(())
    }

    /// Build the currency registry this deployment accepts.
    pub fn registry(&self) -> CurrencyRegistry {
        CurrencyRegistry::new(
            Currency::new(&self.base_code, &self.base_name),
            self.currencies
                .iter()
                .map(|(code, name)| Currency::new(code, name))
                .collect(),
        )
    }

    /// Provider configuration for the bulletin endpoint.
    pub fn provider_config(&self) -> HttpSheetProviderConfig {
        HttpSheetProviderConfig {
            url: self.bulletin_url.clone(),
            timeout: self.fetch_timeout,
            ..HttpSheetProviderConfig::default()
        }
    }

    /// Engine configuration derived from the collector settings.
    pub fn service_config(&self) -> RateServiceConfig {
        let mut config = RateServiceConfig::default();
        config.resolver = ResolverConfig {
            lookback_days: self.lookback_days,
            ..config.resolver
        };
        config.refresh.fetch_timeout = self.fetch_timeout;
        config
    }
}

/// Parse a `CODE:Name,CODE:Name` list. Returns `None` if any entry is
/// malformed, so a typo falls back to the default set instead of silently
/// shrinking it.
fn parse_currency_list(raw: &str) -> Option<Vec<(String, String)>> {
    let mut currencies = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (code, name) = entry.split_once(':')?;
        let code = code.trim();
        let name = name.trim();
        if code.is_empty() || name.is_empty() {
            return None;
        }
        currencies.push((code.to_string(), name.to_string()));
    }
    if currencies.is_empty() {
        return None;
    }
    Some(currencies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_code, "TRY");
        assert_eq!(config.lookback_days, 10);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = CollectorConfig::default();
        config.base_code = "TR1".to_string();
        assert!(config.validate().is_err());

        let mut config = CollectorConfig::default();
        config.currencies.clear();
        assert!(config.validate().is_err());

        let mut config = CollectorConfig::default();
        config.refresh_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_registry_includes_base_and_quoted() {
        let config = CollectorConfig::default();
        let registry = config.registry();

        assert!(registry.is_base(&CurrencyCode::new("TRY")));
        assert!(registry.contains(&CurrencyCode::new("USD")));
        assert_eq!(registry.all().len(), DEFAULT_CURRENCIES.len() + 1);
    }

    #[test]
    fn test_parse_currency_list() {
        let parsed = parse_currency_list("USD:US DOLLAR, EUR : EURO").unwrap();
        assert_eq!(
            parsed,
            vec![
                ("USD".to_string(), "US DOLLAR".to_string()),
                ("EUR".to_string(), "EURO".to_string()),
            ]
        );

        assert!(parse_currency_list("USD").is_none());
        assert!(parse_currency_list("USD:").is_none());
        assert!(parse_currency_list("").is_none());
    }

    #[test]
    fn test_service_config_carries_lookback_and_timeout() {
        let mut config = CollectorConfig::default();
        config.lookback_days = 5;
        config.fetch_timeout = Duration::from_secs(10);

        let service_config = config.service_config();
        assert_eq!(service_config.resolver.lookback_days, 5);
        assert_eq!(service_config.refresh.fetch_timeout, Duration::from_secs(10));
    }
}
