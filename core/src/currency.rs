//! Currency reference data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alphabetic currency code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a new code, trimming and uppercasing the input.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the code is non-empty and purely alphabetic.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A currency known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Alphabetic code.
    pub code: CurrencyCode,
    /// Display name.
    pub name: String,
}

impl Currency {
    /// Create a new currency.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: CurrencyCode::new(code),
            name: name.into(),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// The closed set of currencies the query surface accepts.
///
/// Always contains the base currency. The store may hold rates for codes
/// outside this set; the registry only gates what callers can ask for.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    base: Currency,
    quoted: Vec<Currency>,
}

impl CurrencyRegistry {
    /// Create a registry from the base currency and the quoted currencies.
    /// A quoted entry that repeats the base code is dropped.
    pub fn new(base: Currency, quoted: Vec<Currency>) -> Self {
        let quoted = quoted.into_iter().filter(|c| c.code != base.code).collect();
        Self { base, quoted }
    }

    /// The base currency.
    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// The base currency code.
    pub fn base_code(&self) -> &CurrencyCode {
        &self.base.code
    }

    /// Check whether a code is the base currency.
    pub fn is_base(&self, code: &CurrencyCode) -> bool {
        *code == self.base.code
    }

    /// Check whether a code is known (base included).
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.is_base(code) || self.quoted.iter().any(|c| c.code == *code)
    }

    /// Look up a currency by code.
    pub fn get(&self, code: &CurrencyCode) -> Option<&Currency> {
        if self.is_base(code) {
            return Some(&self.base);
        }
        self.quoted.iter().find(|c| c.code == *code)
    }

    /// All known currencies, base first.
    pub fn all(&self) -> Vec<Currency> {
        let mut out = Vec::with_capacity(self.quoted.len() + 1);
        out.push(self.base.clone());
        out.extend(self.quoted.iter().cloned());
        out
    }

    /// The quoted currencies (base excluded).
    pub fn quoted(&self) -> &[Currency] {
        &self.quoted
    }
}
