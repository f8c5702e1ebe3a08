//! Market data access — the seam between the session controller and Binance.
//!
//! `MarketData` abstracts the two operations the controller needs: a REST
//! snapshot of recent prices and a push subscription for live trades. The
//! production implementation composes `MarketHttp` and `WsClient`; tests swap
//! in a fake.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::{HttpError, WsError};
use crate::http::{MarketHttp, RetryPolicy};
use crate::shared::SymbolPair;
use crate::ws::native::WsClient;
use crate::ws::{SubscribeParams, WsConfig, WsEvent};

use super::DataPoint;

/// Default kline interval for the snapshot fetch.
pub const SNAPSHOT_INTERVAL: &str = "1s";

/// Default number of candles requested for the snapshot.
pub const SNAPSHOT_LIMIT: u32 = 500;

/// Source of market data for a session.
pub trait MarketData: Send + Sync + 'static {
    /// Fetch the recent price history for a symbol.
    fn snapshot(
        &self,
        symbol: &SymbolPair,
    ) -> impl Future<Output = Result<Vec<DataPoint>, HttpError>> + Send;

    /// Subscribe to live trades for a symbol. Data arrives out-of-band
    /// (through the WS event channel), not as a return value.
    fn subscribe(&self, symbol: &SymbolPair) -> Result<(), WsError>;
}

/// Production `MarketData` backed by the Binance REST and WS endpoints.
pub struct BinanceMarketData {
    http: MarketHttp,
    ws: WsClient,
    snapshot_interval: String,
    snapshot_limit: u32,
    retry: RetryPolicy,
}

impl BinanceMarketData {
    /// Build the client and open the WebSocket connection.
    ///
    /// Returns the client plus the WS event stream; forward the stream into
    /// the session (see `SessionHandle::forward_ws`).
    pub fn connect(api_url: &str, ws_config: WsConfig) -> (Self, mpsc::Receiver<WsEvent>) {
        let (mut ws, events) = WsClient::new(ws_config);
        ws.connect();

        (
            Self {
                http: MarketHttp::new(api_url),
                ws,
                snapshot_interval: SNAPSHOT_INTERVAL.to_string(),
                snapshot_limit: SNAPSHOT_LIMIT,
                retry: RetryPolicy::None,
            },
            events,
        )
    }

    /// Override the snapshot kline interval.
    pub fn with_snapshot_interval(mut self, interval: &str) -> Self {
        self.snapshot_interval = interval.to_string();
        self
    }

    /// Override the retry policy for snapshot fetches.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Close the WebSocket connection.
    pub async fn shutdown(&mut self) {
        self.ws.disconnect().await;
    }
}

impl MarketData for BinanceMarketData {
    async fn snapshot(&self, symbol: &SymbolPair) -> Result<Vec<DataPoint>, HttpError> {
        let rows = self
            .http
            .get_klines(
                symbol,
                &self.snapshot_interval,
                Some(self.snapshot_limit),
                self.retry.clone(),
            )
            .await?;
        Ok(rows.iter().map(|r| r.close_point()).collect())
    }

    fn subscribe(&self, symbol: &SymbolPair) -> Result<(), WsError> {
        self.ws.subscribe(SubscribeParams::agg_trade(symbol.clone()))
    }
}
