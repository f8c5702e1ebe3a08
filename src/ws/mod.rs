//! WebSocket layer — messages, subscriptions, events.
//!
//! The transport is `tokio-tungstenite` (native.rs). This module defines the
//! shared message/event types for the Binance stream protocol: outbound
//! requests are `{"method": "SUBSCRIBE", "params": [...], "id": n}` frames,
//! inbound frames are either stream events (tagged by `"e"`), request acks,
//! or error payloads.

pub mod native;
pub mod subscriptions;

use crate::domain::market::wire::{AggTrade, TradeTick};
use serde::{Deserialize, Serialize};

pub use subscriptions::{SubscribeParams, Subscription, UnsubscribeParams};

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to server.
#[derive(Debug, Clone)]
pub enum MessageOut {
    Subscribe(SubscribeParams),
    Unsubscribe(UnsubscribeParams),
}

/// The wire form of an outbound request. Request ids are assigned by the
/// connection task so they stay unique per socket.
#[derive(Debug, Clone, Serialize)]
pub struct WsRequest {
    pub method: &'static str,
    pub params: Vec<String>,
    pub id: u64,
}

impl MessageOut {
    pub(crate) fn to_request(&self, id: u64) -> WsRequest {
        match self {
            MessageOut::Subscribe(params) => WsRequest {
                method: "SUBSCRIBE",
                params: params.stream_names(),
                id,
            },
            MessageOut::Unsubscribe(params) => WsRequest {
                method: "UNSUBSCRIBE",
                params: params.stream_names(),
                id,
            },
        }
    }
}

// ─── Inbound messages ────────────────────────────────────────────────────────

/// Raw inbound message from the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageIn {
    /// A stream event (`{"e": "aggTrade", ...}`).
    Event(StreamEvent),
    /// Acknowledgement of a subscribe/unsubscribe request.
    Ack(AckPayload),
    /// Server-side error payload.
    Error(WsErrorPayload),
}

/// A market stream event, tagged by the `"e"` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "e")]
pub enum StreamEvent {
    #[serde(rename = "aggTrade")]
    AggTrade(AggTrade),
    #[serde(rename = "trade")]
    Trade(TradeTick),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AckPayload {
    pub result: Option<serde_json::Value>,
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WsErrorPayload {
    pub code: i64,
    pub msg: String,
}

// ─── WsEvent ─────────────────────────────────────────────────────────────────

/// High-level events emitted by the WS client to the consumer.
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// A parsed stream event from the server.
    Message(StreamEvent),
    /// Connection established.
    Connected,
    /// Connection lost (may trigger reconnect).
    Disconnected { code: Option<u16>, reason: String },
    /// A deserialization, protocol, or server error.
    Error(String),
    /// Reconnection attempts exhausted; the client gave up.
    MaxReconnectReached,
}

// ─── Connection state ────────────────────────────────────────────────────────

/// Socket lifecycle state, mirroring the browser WebSocket readyState codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u16> for ReadyState {
    fn from(v: u16) -> Self {
        match v {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Configuration for the WS client.
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    pub reconnect: bool,
    pub base_reconnect_delay_ms: u32,
    pub max_reconnect_attempts: u32,
    pub ping_interval_ms: u64,
    pub pong_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            reconnect: true,
            base_reconnect_delay_ms: 2000,
            max_reconnect_attempts: 10,
            ping_interval_ms: 30_000,
            pong_timeout_ms: 10_000,
        }
    }
}
