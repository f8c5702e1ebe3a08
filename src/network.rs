//! Network URL constants.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.binance.com";

/// Default WebSocket endpoint; streams are attached via SUBSCRIBE requests.
pub const DEFAULT_WS_URL: &str = "wss://stream.binance.com:9443/ws";
