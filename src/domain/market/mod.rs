//! Market data domain — snapshot rows, stream ticks, chart points.

pub mod client;
pub mod wire;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use client::{BinanceMarketData, MarketData};

/// A single data point on the price chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Unix timestamp in milliseconds.
    pub x: i64,
    /// Trade price.
    pub y: Decimal,
}

impl DataPoint {
    pub fn new(x: i64, y: Decimal) -> Self {
        Self { x, y }
    }
}

impl From<wire::AggTrade> for DataPoint {
    fn from(t: wire::AggTrade) -> Self {
        Self {
            x: t.trade_time,
            y: t.price,
        }
    }
}

impl From<wire::TradeTick> for DataPoint {
    fn from(t: wire::TradeTick) -> Self {
        Self {
            x: t.trade_time,
            y: t.price,
        }
    }
}
