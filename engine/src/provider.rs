//! Sheet provider trait and the HTTP bulletin implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use ratedesk_core::{Clock, CurrencyCode, RateDeskError, RateSheet, Result, SheetRate};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upstream source of the daily rate sheet.
#[async_trait]
pub trait SheetProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Fetch the current daily sheet.
    async fn fetch_daily_sheet(&self) -> Result<RateSheet>;
}

/// Default bulletin endpoint.
pub const DEFAULT_BULLETIN_URL: &str = "https://www.tcmb.gov.tr/kurlar/today.xml";

/// Configuration for the HTTP bulletin provider.
#[derive(Debug, Clone)]
pub struct HttpSheetProviderConfig {
    /// Bulletin URL.
    pub url: String,
    /// HTTP timeout for one fetch.
    pub timeout: Duration,
    /// User-Agent presented upstream.
    pub user_agent: String,
}

impl Default for HttpSheetProviderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BULLETIN_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("ratedesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Fetches the central-bank daily XML bulletin and turns it into a
/// [`RateSheet`].
///
/// Bulletin rows quoted per N units are normalized to per-one-unit rates.
/// Rows missing any of the four quotes are skipped; the bulletin publishes
/// forex-only and banknote-only rows for some currencies.
pub struct HttpSheetProvider {
    client: reqwest::Client,
    config: HttpSheetProviderConfig,
    clock: Arc<dyn Clock>,
}

impl HttpSheetProvider {
    /// Create a provider with the default configuration.
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_config(HttpSheetProviderConfig::default(), clock)
    }

    /// Create a provider with a custom configuration.
    pub fn with_config(config: HttpSheetProviderConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RateDeskError::Internal(format!("http client construction: {e}")))?;
        Ok(Self {
            client,
            config,
            clock,
        })
    }

    fn parse_bulletin(&self, body: &str) -> Result<RateSheet> {
        let doc: BulletinDoc = quick_xml::de::from_str(body)
            .map_err(|e| RateDeskError::MalformedSheet(format!("xml parse error: {e}")))?;

        // The bulletin stamps its own publication date; fall back to today
        // when the attribute is absent or unparseable.
        let effective_date = doc.effective_date().unwrap_or_else(|| self.clock.today());

        let mut rates = Vec::with_capacity(doc.currencies.len());
        for row in doc.currencies {
            let code = row.code.clone();
            match row.into_sheet_rate() {
                Some(rate) => rates.push(rate),
                None => debug!(code = %code, "skipped bulletin row without a full quote set"),
            }
        }

        if rates.is_empty() {
            return Err(RateDeskError::MalformedSheet(
                "bulletin carried no usable rates".to_string(),
            ));
        }

        Ok(RateSheet::new(effective_date, rates))
    }
}

#[async_trait]
impl SheetProvider for HttpSheetProvider {
    fn name(&self) -> &str {
        "http-bulletin"
    }

    async fn fetch_daily_sheet(&self) -> Result<RateSheet> {
        debug!(url = %self.config.url, "fetching daily bulletin");

        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| RateDeskError::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| RateDeskError::UpstreamUnavailable(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| RateDeskError::UpstreamUnavailable(e.to_string()))?;

        let sheet = self.parse_bulletin(&body)?;
        debug!(
            entries = sheet.len(),
            date = %sheet.effective_date,
            "bulletin parsed"
        );
        Ok(sheet)
    }
}

/// Root of the bulletin document.
#[derive(Debug, Deserialize)]
struct BulletinDoc {
    #[serde(rename = "@Tarih")]
    local_date: Option<String>,
    #[serde(rename = "@Date")]
    date: Option<String>,
    #[serde(rename = "Currency", default)]
    currencies: Vec<BulletinRow>,
}

impl BulletinDoc {
    fn effective_date(&self) -> Option<NaiveDate> {
        if let Some(raw) = &self.local_date {
            if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y") {
                return Some(date);
            }
        }
        if let Some(raw) = &self.date {
            if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y") {
                return Some(date);
            }
        }
        None
    }
}

/// One `Currency` element of the bulletin.
#[derive(Debug, Deserialize)]
struct BulletinRow {
    #[serde(rename = "@Kod")]
    code: String,
    #[serde(rename = "Unit")]
    unit: Option<String>,
    #[serde(rename = "Isim")]
    local_name: Option<String>,
    #[serde(rename = "CurrencyName")]
    name: Option<String>,
    #[serde(rename = "ForexBuying")]
    forex_buying: Option<String>,
    #[serde(rename = "ForexSelling")]
    forex_selling: Option<String>,
    #[serde(rename = "BanknoteBuying")]
    banknote_buying: Option<String>,
    #[serde(rename = "BanknoteSelling")]
    banknote_selling: Option<String>,
}

impl BulletinRow {
    /// Convert to a per-one-unit sheet entry, or `None` when any of the
    /// four quotes is missing or non-positive, or when a stated `Unit` is
    /// not a positive integer. An absent unit means per one.
    fn into_sheet_rate(self) -> Option<SheetRate> {
        let unit = match self.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            None => Decimal::ONE,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => Decimal::from(n),
                _ => return None,
            },
        };

        let buy = parse_rate(self.forex_buying.as_deref())?;
        let sell = parse_rate(self.forex_selling.as_deref())?;
        let effective_buy = parse_rate(self.banknote_buying.as_deref())?;
        let effective_sell = parse_rate(self.banknote_selling.as_deref())?;

        let name = self
            .name
            .or(self.local_name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())?;

        Some(SheetRate {
            code: CurrencyCode::new(self.code),
            name,
            buy: buy / unit,
            sell: sell / unit,
            effective_buy: effective_buy / unit,
            effective_sell: effective_sell / unit,
        })
    }
}

fn parse_rate(raw: Option<&str>) -> Option<Decimal> {
    let value = raw?.trim().parse::<Decimal>().ok()?;
    (value > Decimal::ZERO).then_some(value)
}

/// Mock sheet provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockSheetProvider {
    sheet: parking_lot::RwLock<Option<RateSheet>>,
    error: parking_lot::RwLock<Option<RateDeskError>>,
    delay: parking_lot::RwLock<Duration>,
    fetches: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockSheetProvider {
    /// Create a mock with nothing configured.
    pub fn new() -> Self {
        Self {
            sheet: parking_lot::RwLock::new(None),
            error: parking_lot::RwLock::new(None),
            delay: parking_lot::RwLock::new(Duration::ZERO),
            fetches: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Set the sheet returned by the next fetches.
    pub fn set_sheet(&self, sheet: RateSheet) {
        *self.sheet.write() = Some(sheet);
        *self.error.write() = None;
    }

    /// Make the next fetches fail.
    pub fn set_error(&self, error: RateDeskError) {
        *self.error.write() = Some(error);
    }

    /// Delay each fetch by the given duration.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = delay;
    }

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockSheetProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl SheetProvider for MockSheetProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_daily_sheet(&self) -> Result<RateSheet> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let delay = *self.delay.read();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let error = self.error.read().clone();
        if let Some(error) = error {
            return Err(error);
        }

        let sheet = self.sheet.read().clone();
        sheet.ok_or_else(|| {
            RateDeskError::UpstreamUnavailable("mock has no sheet configured".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratedesk_core::FixedClock;
    use rust_decimal_macros::dec;

    const SAMPLE_BULLETIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Tarih_Date Tarih="10.01.2024" Date="01/10/2024" Bulten_No="2024/7">
    <Currency CrossOrder="0" Kod="USD" CurrencyCode="USD">
        <Unit>1</Unit>
        <Isim>ABD DOLARI</Isim>
        <CurrencyName>US DOLLAR</CurrencyName>
        <ForexBuying>30.00</ForexBuying>
        <ForexSelling>30.10</ForexSelling>
        <BanknoteBuying>29.98</BanknoteBuying>
        <BanknoteSelling>30.15</BanknoteSelling>
        <CrossRateUSD/>
        <CrossRateOther/>
    </Currency>
    <Currency CrossOrder="1" Kod="JPY" CurrencyCode="JPY">
        <Unit>100</Unit>
        <Isim>JAPON YENI</Isim>
        <CurrencyName>JAPANESE YEN</CurrencyName>
        <ForexBuying>20.27</ForexBuying>
        <ForexSelling>20.41</ForexSelling>
        <BanknoteBuying>20.20</BanknoteBuying>
        <BanknoteSelling>20.48</BanknoteSelling>
    </Currency>
    <Currency CrossOrder="2" Kod="XDR" CurrencyCode="XDR">
        <Unit>1</Unit>
        <Isim>OZEL CEKME HAKKI (SDR)</Isim>
        <CurrencyName>SPECIAL DRAWING RIGHT (SDR)</CurrencyName>
        <ForexBuying>40.07</ForexBuying>
        <ForexSelling></ForexSelling>
        <BanknoteBuying/>
        <BanknoteSelling/>
    </Currency>
</Tarih_Date>"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider(today: NaiveDate) -> HttpSheetProvider {
        HttpSheetProvider::new(Arc::new(FixedClock::on(today))).unwrap()
    }

    #[test]
    fn test_parse_bulletin_rows_and_date() {
        let provider = provider(date(2024, 2, 1));
        let sheet = provider.parse_bulletin(SAMPLE_BULLETIN).unwrap();

        // The bulletin's own date wins over the clock.
        assert_eq!(sheet.effective_date, date(2024, 1, 10));
        // The partial XDR row is skipped.
        assert_eq!(sheet.len(), 2);

        let usd = &sheet.rates[0];
        assert_eq!(usd.code, CurrencyCode::new("USD"));
        assert_eq!(usd.name, "US DOLLAR");
        assert_eq!(usd.buy, dec!(30.00));
        assert_eq!(usd.effective_sell, dec!(30.15));
    }

    #[test]
    fn test_parse_normalizes_per_unit_quotes() {
        let provider = provider(date(2024, 2, 1));
        let sheet = provider.parse_bulletin(SAMPLE_BULLETIN).unwrap();

        let jpy = &sheet.rates[1];
        assert_eq!(jpy.code, CurrencyCode::new("JPY"));
        assert_eq!(jpy.buy, dec!(0.2027));
        assert_eq!(jpy.sell, dec!(0.2041));
    }

    #[test]
    fn test_parse_falls_back_to_clock_date() {
        let bulletin = r#"<Tarih_Date>
            <Currency Kod="USD">
                <Unit>1</Unit>
                <CurrencyName>US DOLLAR</CurrencyName>
                <ForexBuying>30.00</ForexBuying>
                <ForexSelling>30.10</ForexSelling>
                <BanknoteBuying>29.98</BanknoteBuying>
                <BanknoteSelling>30.15</BanknoteSelling>
            </Currency>
        </Tarih_Date>"#;

        let provider = provider(date(2024, 2, 1));
        let sheet = provider.parse_bulletin(bulletin).unwrap();
        assert_eq!(sheet.effective_date, date(2024, 2, 1));
    }

    #[test]
    fn test_parse_skips_row_with_unparseable_unit() {
        // A garbled unit must not default to per-one and misprice the row.
        let bulletin = r#"<Tarih_Date Tarih="10.01.2024">
            <Currency Kod="JPY">
                <Unit>hundred</Unit>
                <CurrencyName>JAPANESE YEN</CurrencyName>
                <ForexBuying>20.27</ForexBuying>
                <ForexSelling>20.41</ForexSelling>
                <BanknoteBuying>20.20</BanknoteBuying>
                <BanknoteSelling>20.48</BanknoteSelling>
            </Currency>
            <Currency Kod="USD">
                <Unit>1</Unit>
                <CurrencyName>US DOLLAR</CurrencyName>
                <ForexBuying>30.00</ForexBuying>
                <ForexSelling>30.10</ForexSelling>
                <BanknoteBuying>29.98</BanknoteBuying>
                <BanknoteSelling>30.15</BanknoteSelling>
            </Currency>
        </Tarih_Date>"#;

        let provider = provider(date(2024, 2, 1));
        let sheet = provider.parse_bulletin(bulletin).unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.rates[0].code, CurrencyCode::new("USD"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let provider = provider(date(2024, 2, 1));
        let err = provider.parse_bulletin("<html>maintenance</html!").unwrap_err();
        assert!(matches!(err, RateDeskError::MalformedSheet(_)));
    }

    #[test]
    fn test_parse_rejects_bulletin_with_no_usable_rows() {
        let bulletin = r#"<Tarih_Date Tarih="10.01.2024">
            <Currency Kod="XDR">
                <Unit>1</Unit>
                <CurrencyName>SPECIAL DRAWING RIGHT (SDR)</CurrencyName>
                <ForexBuying>40.07</ForexBuying>
            </Currency>
        </Tarih_Date>"#;

        let provider = provider(date(2024, 2, 1));
        let err = provider.parse_bulletin(bulletin).unwrap_err();
        assert!(matches!(err, RateDeskError::MalformedSheet(_)));
    }

    #[tokio::test]
    async fn test_mock_provider_counts_fetches() {
        let mock = MockSheetProvider::new();
        mock.set_sheet(RateSheet::new(
            date(2024, 1, 10),
            vec![SheetRate {
                code: CurrencyCode::new("USD"),
                name: "US DOLLAR".to_string(),
                buy: dec!(30.00),
                sell: dec!(30.10),
                effective_buy: dec!(29.98),
                effective_sell: dec!(30.15),
            }],
        ));

        let sheet = mock.fetch_daily_sheet().await.unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(mock.fetch_count(), 1);

        mock.set_error(RateDeskError::UpstreamUnavailable("down".to_string()));
        assert!(mock.fetch_daily_sheet().await.is_err());
        assert_eq!(mock.fetch_count(), 2);
    }
}
