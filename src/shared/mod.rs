//! Shared newtypes used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize
//! identically to the raw format Binance uses, so they can be embedded in
//! wire types without conversion overhead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── SymbolPair ──────────────────────────────────────────────────────────────

/// Newtype for a trading-pair symbol in Binance notation (e.g. `"BTCUSDT"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolPair(String);

/// The pair shown when nothing else is configured.
pub const PAIR_DEFAULT: &str = "BTCUSDT";

impl SymbolPair {
    pub fn new(s: impl Into<String>) -> Self {
        let s: String = s.into();
        Self(s.to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used in stream names (`btcusdt@aggTrade`).
    pub fn stream_name(&self) -> String {
        format!("{}@aggTrade", self.0.to_ascii_lowercase())
    }

    /// Human-readable title for the chart header (e.g. `"BTC/USDT"`).
    ///
    /// Splits on the known quote assets; falls back to the raw symbol.
    pub fn title(&self) -> String {
        for quote in ["USDT", "BUSD", "USDC", "BTC", "ETH"] {
            if let Some(base) = self.0.strip_suffix(quote) {
                if !base.is_empty() {
                    return format!("{}/{}", base, quote);
                }
            }
        }
        self.0.clone()
    }
}

impl Default for SymbolPair {
    fn default() -> Self {
        Self(PAIR_DEFAULT.to_string())
    }
}

impl std::fmt::Display for SymbolPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SymbolPair {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SymbolPair {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl FromStr for SymbolPair {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SymbolPair::new(s))
    }
}

impl Serialize for SymbolPair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SymbolPair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SymbolPair::new(s))
    }
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
