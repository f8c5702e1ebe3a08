//! # livechart
//!
//! Session and reconciliation engine for a live Binance price chart.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core** — Shared newtypes, domain models (market, chart, session)
//! 2. **HTTP API** — `MarketHttp` with per-request retry policies
//! 3. **WebSocket** — `tokio-tungstenite` client with keepalive and reconnect
//! 4. **Session** — `SessionController`: the event loop tying it together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use livechart::prelude::*;
//! use std::sync::Arc;
//!
//! let (market, ws_events) = BinanceMarketData::connect(DEFAULT_API_URL, WsConfig::default());
//! let (controller, handle, mut ui) =
//!     SessionController::new(SymbolPair::from(PAIR_DEFAULT), Arc::new(market));
//!
//! tokio::spawn(controller.run());
//! tokio::spawn({
//!     let handle = handle.clone();
//!     async move { handle.forward_ws(ws_events).await }
//! });
//!
//! while let Some(cmd) = ui.recv().await {
//!     // apply UiCommand to the chart surface
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): wire types, state, clients.
pub mod domain;

/// Unified error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layer 2: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with retry policies.
pub mod http;

// ── Layer 3: WebSocket ───────────────────────────────────────────────────────

/// WebSocket client: messages, subscriptions, events.
pub mod ws;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{SymbolPair, PAIR_DEFAULT};

    // Domain types — market
    pub use crate::domain::market::wire::{AggTrade, KlineRow, TradeTick};
    pub use crate::domain::market::{BinanceMarketData, DataPoint, MarketData};

    // Domain types — chart
    pub use crate::domain::chart::{ChartCommand, ChartReconciler, MarkerSide, MARKER_SHIFT_MS};

    // Domain types — session
    pub use crate::domain::session::{
        reduce, Effect, NoticeKind, NotificationState, Phase, SessionController, SessionEvent,
        SessionHandle, SessionState, UiCommand,
    };

    // Errors
    pub use crate::error::{Error, HttpError, WsError};

    // Network
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_WS_URL};

    // HTTP client
    pub use crate::http::{MarketHttp, RetryConfig, RetryPolicy};

    // WebSocket types
    pub use crate::ws::native::WsClient;
    pub use crate::ws::{
        MessageIn, MessageOut, StreamEvent, SubscribeParams, UnsubscribeParams, WsConfig, WsEvent,
    };
}
