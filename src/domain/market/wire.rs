//! Wire types for Binance market data (REST klines + WS streams).

use crate::shared::SymbolPair;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::DataPoint;

// ─── REST: klines ────────────────────────────────────────────────────────────

/// One row of the `/api/v3/klines` response.
///
/// Binance serializes klines as positional arrays:
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume,
/// trades, takerBase, takerQuote, ignore]`. Prices arrive as decimal strings.
#[derive(Debug, Clone, PartialEq)]
pub struct KlineRow {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
    pub trades: u64,
}

impl KlineRow {
    /// The chart point for this candle: close price at close time.
    pub fn close_point(&self) -> DataPoint {
        DataPoint {
            x: self.close_time,
            y: self.close,
        }
    }
}

impl<'de> Deserialize<'de> for KlineRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        type Raw = (
            i64,     // open time
            Decimal, // open
            Decimal, // high
            Decimal, // low
            Decimal, // close
            Decimal, // volume
            i64,     // close time
            Decimal, // quote asset volume
            u64,     // number of trades
            Decimal, // taker buy base volume
            Decimal, // taker buy quote volume
            serde_json::Value, // unused field
        );
        let raw = Raw::deserialize(deserializer)?;
        Ok(KlineRow {
            open_time: raw.0,
            open: raw.1,
            high: raw.2,
            low: raw.3,
            close: raw.4,
            volume: raw.5,
            close_time: raw.6,
            trades: raw.8,
        })
    }
}

// ─── WS: stream payloads ─────────────────────────────────────────────────────

/// Payload of an `aggTrade` stream event.
#[derive(Debug, Clone, Deserialize)]
pub struct AggTrade {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: SymbolPair,
    #[serde(rename = "a")]
    pub agg_trade_id: u64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "f")]
    pub first_trade_id: u64,
    #[serde(rename = "l")]
    pub last_trade_id: u64,
    #[serde(rename = "T")]
    pub trade_time: i64,
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

/// Payload of a raw `trade` stream event.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeTick {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: SymbolPair,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "T")]
    pub trade_time: i64,
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}
