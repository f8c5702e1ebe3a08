//! Session controller — runs the reducer against a market-data source.
//!
//! One tokio task owns the state and processes events strictly in arrival
//! order from a single mpsc channel. Snapshot fetches run as separate tasks
//! and report back through the same channel, so concurrent events (going
//! online mid-fetch, a stream error racing a completion) serialize naturally.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::chart::{ChartCommand, ChartReconciler, MarkerSide};
use crate::domain::market::MarketData;
use crate::shared::SymbolPair;
use crate::ws::{StreamEvent, WsEvent};

use super::reducer::{reduce, Effect};
use super::state::{NoticeKind, SessionState};
use super::SessionEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const UI_CHANNEL_CAPACITY: usize = 256;

/// Commands for the UI layer, emitted as effects execute.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Apply a chart mutation.
    Chart(ChartCommand),
    /// Show or hide the notification banner.
    Notice { visible: bool, text: String },
    /// Enable or disable the deal controls.
    DealVisible(bool),
}

/// Drives a session: owns the state and reconciler, executes effects.
pub struct SessionController<M: MarketData> {
    state: SessionState,
    reconciler: ChartReconciler,
    market: Arc<M>,
    // Weak so the loop ends when every SessionHandle is gone.
    event_tx: mpsc::WeakSender<SessionEvent>,
    event_rx: mpsc::Receiver<SessionEvent>,
    ui_tx: mpsc::Sender<UiCommand>,
}

/// Cloneable handle for feeding events into a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionEvent>,
}

impl<M: MarketData> SessionController<M> {
    /// Build a controller for a symbol.
    ///
    /// Returns the controller (call [`run`](Self::run) on it), a handle for
    /// sending events, and the UI command stream.
    pub fn new(
        symbol: SymbolPair,
        market: Arc<M>,
    ) -> (Self, SessionHandle, mpsc::Receiver<UiCommand>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (ui_tx, ui_rx) = mpsc::channel(UI_CHANNEL_CAPACITY);

        let controller = Self {
            state: SessionState::new(symbol),
            reconciler: ChartReconciler::new(),
            market,
            event_tx: event_tx.downgrade(),
            event_rx,
            ui_tx,
        };

        (controller, SessionHandle { tx: event_tx }, ui_rx)
    }

    /// Run the session to completion.
    ///
    /// Starts immediately, then processes events until all handles are
    /// dropped (and any in-flight fetch has reported back).
    pub async fn run(mut self) {
        tracing::info!(symbol = %self.state.session.symbol, "Session starting");
        self.handle_event(SessionEvent::Start).await;

        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event).await;
        }

        tracing::info!(symbol = %self.state.session.symbol, "Session ended");
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        tracing::debug!(?event, phase = ?self.state.phase, "Session event");
        let effects = reduce(&mut self.state, event);
        for effect in effects {
            self.execute(effect).await;
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::FetchSnapshot => self.spawn_fetch(),

            Effect::Subscribe => {
                if let Err(e) = self.market.subscribe(&self.state.session.symbol) {
                    tracing::warn!("Stream subscribe failed: {}", e);
                }
            }

            Effect::SeedChart(points) => {
                if let Some(cmd) = self.reconciler.seed(points) {
                    self.emit(UiCommand::Chart(cmd)).await;
                }
            }

            Effect::ReconcilePoint(point) => {
                for cmd in self.reconciler.on_data_point(point) {
                    self.emit(UiCommand::Chart(cmd)).await;
                }
            }

            Effect::PlaceMarker(side) => {
                let cmd = match side {
                    MarkerSide::Buy => self.reconciler.on_buy_marker(),
                    MarkerSide::Sale => self.reconciler.on_sale_marker(),
                };
                if let Some(cmd) = cmd {
                    self.emit(UiCommand::Chart(cmd)).await;
                }
            }

            Effect::ShowNotice(kind) => {
                self.emit(UiCommand::Notice {
                    visible: true,
                    text: kind.text().to_string(),
                })
                .await;
            }

            Effect::ClearNotice => {
                self.emit(UiCommand::Notice {
                    visible: false,
                    text: String::new(),
                })
                .await;
            }

            Effect::SetDealVisible(visible) => {
                self.emit(UiCommand::DealVisible(visible)).await;
            }
        }
    }

    /// Spawn the snapshot fetch as its own task so the event loop keeps
    /// serving connectivity and stream events while it runs.
    fn spawn_fetch(&self) {
        let Some(tx) = self.event_tx.upgrade() else {
            return;
        };
        let market = Arc::clone(&self.market);
        let symbol = self.state.session.symbol.clone();

        tokio::spawn(async move {
            let event = match market.snapshot(&symbol).await {
                Ok(points) => {
                    tracing::debug!(points = points.len(), "Snapshot loaded");
                    SessionEvent::SnapshotLoaded(points)
                }
                Err(e) => {
                    tracing::error!("Snapshot fetch failed: {}", e);
                    SessionEvent::SnapshotFailed
                }
            };
            let _ = tx.send(event).await;
        });
    }

    async fn emit(&self, cmd: UiCommand) {
        if self.ui_tx.send(cmd).await.is_err() {
            tracing::debug!("UI command receiver dropped");
        }
    }

    /// Read-only view of the current notice, for embedding callers.
    pub fn notice(&self) -> Option<NoticeKind> {
        self.state.notification.kind()
    }
}

impl SessionHandle {
    /// Send any session event.
    pub async fn send(&self, event: SessionEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Session ended; event dropped");
        }
    }

    pub async fn online(&self) {
        self.send(SessionEvent::Online).await;
    }

    pub async fn offline(&self) {
        self.send(SessionEvent::Offline).await;
    }

    pub async fn buy(&self) {
        self.send(SessionEvent::Buy).await;
    }

    pub async fn sale(&self) {
        self.send(SessionEvent::Sale).await;
    }

    /// Pump WS client events into the session until the stream closes.
    ///
    /// Connect events carry no data and are ignored; recovery is driven by
    /// the first point that flows after an error.
    pub async fn forward_ws(&self, mut events: mpsc::Receiver<WsEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                WsEvent::Message(StreamEvent::AggTrade(t)) => {
                    self.send(SessionEvent::StreamPoint(t.into())).await;
                }
                WsEvent::Message(StreamEvent::Trade(t)) => {
                    self.send(SessionEvent::StreamPoint(t.into())).await;
                }
                WsEvent::Error(reason) => {
                    tracing::warn!("Stream error: {}", reason);
                    self.send(SessionEvent::StreamError).await;
                }
                WsEvent::Disconnected { code, reason } => {
                    tracing::warn!(?code, "Stream disconnected: {}", reason);
                    self.send(SessionEvent::StreamError).await;
                }
                WsEvent::MaxReconnectReached => {
                    tracing::error!("Stream gave up reconnecting");
                    self.send(SessionEvent::StreamError).await;
                }
                WsEvent::Connected => {}
            }
        }
    }
}
