//! WebSocket client for the Binance market stream, on `tokio-tungstenite`.
//!
//! A background tokio task owns the socket. The public `WsClient` talks to it
//! over a command channel and hands parsed events to the consumer over an
//! event channel. The task keeps the connection healthy (ping/pong with a
//! pong deadline), reconnects with exponential backoff and jitter, replays
//! tracked subscriptions after a reconnect, and queues outbound messages
//! written while disconnected.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::ws::subscriptions::Subscription;
use crate::ws::{
    MessageIn, MessageOut, ReadyState, SubscribeParams, UnsubscribeParams, WsConfig, WsEvent,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

enum Command {
    Send(MessageOut),
    Disconnect,
}

/// Why the inner connected loop ended; decides whether to reconnect.
enum Closed {
    ByUser,
    Clean,
    PongTimeout,
    RateLimited,
    Broken(String),
}

/// WebSocket client for the Binance market stream endpoint.
pub struct WsClient {
    config: WsConfig,
    cmd_tx: Option<mpsc::Sender<Command>>,
    event_tx: mpsc::Sender<WsEvent>,
    task: Option<JoinHandle<()>>,
    ready_state: Arc<AtomicU16>,
}

impl WsClient {
    /// Create a client and the receiving half of its event channel.
    /// Does not connect yet.
    pub fn new(config: WsConfig) -> (Self, mpsc::Receiver<WsEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        (
            Self {
                config,
                cmd_tx: None,
                event_tx,
                task: None,
                ready_state: Arc::new(AtomicU16::new(ReadyState::Closed as u16)),
            },
            event_rx,
        )
    }

    /// Spawn the background connection task. Idempotent while a task exists.
    pub fn connect(&mut self) {
        if self.cmd_tx.is_some() {
            return;
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        self.cmd_tx = Some(cmd_tx);
        self.ready_state
            .store(ReadyState::Connecting as u16, Ordering::SeqCst);

        let task = ConnTask {
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            cmd_rx,
            subscriptions: Vec::new(),
            pending: Vec::new(),
            attempts: 0,
            next_id: 0,
            ready_state: Arc::clone(&self.ready_state),
        };
        self.task = Some(tokio::spawn(task.run()));
    }

    /// Gracefully close the connection and wait for the task to finish.
    pub async fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Disconnect).await;
        }
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }
        self.ready_state
            .store(ReadyState::Closed as u16, Ordering::SeqCst);
    }

    /// Queue a message for the connection task.
    pub fn send(&self, msg: MessageOut) -> Result<(), WsError> {
        let Some(tx) = &self.cmd_tx else {
            return Err(WsError::NotConnected);
        };
        tx.try_send(Command::Send(msg)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WsError::SendFailed("Command channel full".into()),
            mpsc::error::TrySendError::Closed(_) => WsError::NotConnected,
        })
    }

    pub fn subscribe(&self, params: SubscribeParams) -> Result<(), WsError> {
        self.send(MessageOut::Subscribe(params))
    }

    pub fn unsubscribe(&self, params: UnsubscribeParams) -> Result<(), WsError> {
        self.send(MessageOut::Unsubscribe(params))
    }

    pub fn is_connected(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from(self.ready_state.load(Ordering::SeqCst))
    }

    /// Tear down the current connection (if any) and start fresh, with the
    /// reconnect counter reset.
    pub async fn restart_connection(&mut self) {
        if self.ready_state() == ReadyState::Connecting {
            tracing::info!("Already connecting, skipping restart");
            return;
        }
        tracing::info!("Manual reconnection requested");
        self.disconnect().await;
        self.connect();
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ─── Connection task ─────────────────────────────────────────────────────────

struct ConnTask {
    config: WsConfig,
    event_tx: mpsc::Sender<WsEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    subscriptions: Vec<SubscribeParams>,
    pending: Vec<MessageOut>,
    attempts: u32,
    next_id: u64,
    ready_state: Arc<AtomicU16>,
}

impl ConnTask {
    async fn run(mut self) {
        loop {
            let (sink, stream) = match self.open_socket().await {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::error!("WebSocket connection failed: {}", e);
                    self.emit(WsEvent::Error(format!("Connection failed: {}", e)));
                    if !self.retry_or_give_up(false).await {
                        return;
                    }
                    continue;
                }
            };

            self.attempts = 0;
            self.set_state(ReadyState::Open);
            self.emit(WsEvent::Connected);

            let mut sink = sink;
            self.flush_pending(&mut sink).await;
            self.resubscribe(&mut sink).await;

            let closed = self.serve(sink, stream).await;
            self.set_state(ReadyState::Closed);

            match closed {
                Closed::ByUser | Closed::Clean => return,
                Closed::RateLimited => {
                    self.set_state(ReadyState::Connecting);
                    if !self.retry_or_give_up(true).await {
                        return;
                    }
                }
                Closed::PongTimeout | Closed::Broken(_) => {
                    self.set_state(ReadyState::Connecting);
                    if !self.retry_or_give_up(false).await {
                        return;
                    }
                }
            }
        }
    }

    /// The inner loop while the socket is open. Returns when it breaks.
    async fn serve(&mut self, mut sink: WsSink, mut stream: SplitStream<WsStream>) -> Closed {
        let mut ping_interval =
            tokio::time::interval(Duration::from_millis(self.config.ping_interval_ms));
        ping_interval.reset(); // skip the immediate first tick

        // Pong watchdog: armed after each ping we send, parked otherwise.
        let parked = tokio::time::Instant::now() + Duration::from_secs(86400);
        let mut pong_armed = false;
        let pong_watchdog = tokio::time::sleep_until(parked);
        tokio::pin!(pong_watchdog);

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch_text(text.as_ref()),
                    Some(Ok(Message::Ping(data))) => {
                        // Binance pings must be answered in kind.
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        pong_armed = false;
                        pong_watchdog.as_mut().reset(parked);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = close_details(frame.as_ref());
                        self.emit(WsEvent::Disconnected { code: Some(code), reason: reason.clone() });
                        return match code {
                            1000 => Closed::Clean,
                            1008 => Closed::RateLimited,
                            _ => Closed::Broken(reason),
                        };
                    }
                    Some(Ok(_)) => {} // Binary, raw frames — not part of the protocol
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        tracing::error!("WebSocket error: {}", reason);
                        self.emit(WsEvent::Disconnected { code: None, reason: reason.clone() });
                        return Closed::Broken(reason);
                    }
                    None => {
                        self.emit(WsEvent::Disconnected { code: None, reason: "Stream ended".into() });
                        return Closed::Broken("Stream ended".into());
                    }
                },

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(msg)) => {
                        self.track(&msg);
                        let id = self.next_id();
                        if let Err(e) = write_msg(&mut sink, &msg, id).await {
                            tracing::warn!("Send failed: {}", e);
                        }
                    }
                    Some(Command::Disconnect) => {
                        let _ = sink.send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "Client disconnect".into(),
                        }))).await;
                        return Closed::ByUser;
                    }
                    // WsClient dropped
                    None => return Closed::ByUser,
                },

                _ = ping_interval.tick() => {
                    if let Err(e) = sink.send(Message::Ping(Bytes::new())).await {
                        tracing::warn!("Failed to send ping: {}", e);
                    } else {
                        pong_armed = true;
                        pong_watchdog.as_mut().reset(
                            tokio::time::Instant::now()
                                + Duration::from_millis(self.config.pong_timeout_ms),
                        );
                    }
                }

                () = &mut pong_watchdog, if pong_armed => {
                    tracing::warn!(
                        "Pong timeout — no response within {}ms",
                        self.config.pong_timeout_ms
                    );
                    self.emit(WsEvent::Disconnected { code: None, reason: "Pong timeout".into() });
                    let _ = sink.close().await;
                    return Closed::PongTimeout;
                }
            }
        }
    }

    /// Parse a text frame and forward it as the matching event.
    fn dispatch_text(&self, text: &str) {
        match serde_json::from_str::<MessageIn>(text) {
            Ok(MessageIn::Event(event)) => self.emit(WsEvent::Message(event)),
            Ok(MessageIn::Ack(ack)) => {
                tracing::debug!(id = ack.id, "Request acknowledged");
            }
            Ok(MessageIn::Error(err)) => {
                tracing::warn!(code = err.code, "Server error: {}", err.msg);
                self.emit(WsEvent::Error(err.msg));
            }
            Err(e) => {
                tracing::warn!("WS deserialization error: {} — raw: {}", e, text);
                self.emit(WsEvent::Error(format!("Deserialization error: {}", e)));
            }
        }
    }

    async fn open_socket(&self) -> Result<(WsSink, SplitStream<WsStream>), String> {
        let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&self.config.url))
            .await
            .map_err(|_| "Connection timeout".to_string())?
            .map_err(|e| e.to_string())?;
        Ok(ws_stream.split())
    }

    /// Back off and return true if another attempt should be made; emits
    /// `MaxReconnectReached` and returns false otherwise. Commands that
    /// arrive during the backoff are queued for the next connection.
    async fn retry_or_give_up(&mut self, rate_limited: bool) -> bool {
        if !self.config.reconnect || self.attempts >= self.config.max_reconnect_attempts {
            self.emit(WsEvent::MaxReconnectReached);
            return false;
        }

        self.attempts += 1;
        let delay = self.backoff_delay(rate_limited);
        tracing::info!(
            "Reconnect attempt {}/{} in {}ms{}",
            self.attempts,
            self.config.max_reconnect_attempts,
            delay.as_millis(),
            if rate_limited { " (rate-limited)" } else { "" }
        );
        tokio::time::sleep(delay).await;

        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match cmd {
                Command::Send(msg) => {
                    self.track(&msg);
                    self.pending.push(msg);
                }
                Command::Disconnect => return false,
            }
        }
        true
    }

    fn backoff_delay(&self, rate_limited: bool) -> Duration {
        let exp = (self.attempts - 1).min(10);
        let base = self.config.base_reconnect_delay_ms.saturating_mul(1u32 << exp);
        let (jitter_max, cap) = if rate_limited {
            (1000u32, 300_000u32) // up to 5 minutes when rate-limited
        } else {
            (500u32, 60_000u32)
        };
        let jitter = rand::random::<u32>() % jitter_max;
        Duration::from_millis(base.saturating_add(jitter).min(cap) as u64)
    }

    async fn flush_pending(&mut self, sink: &mut WsSink) {
        if self.pending.is_empty() {
            return;
        }
        tracing::info!("Flushing {} pending message(s)", self.pending.len());
        for msg in std::mem::take(&mut self.pending) {
            let id = self.next_id();
            if let Err(e) = write_msg(sink, &msg, id).await {
                tracing::warn!("Failed to flush pending message: {}", e);
            }
        }
    }

    async fn resubscribe(&mut self, sink: &mut WsSink) {
        if self.subscriptions.is_empty() {
            return;
        }
        tracing::info!("Resubscribing to {} stream set(s)", self.subscriptions.len());
        for sub in self.subscriptions.clone() {
            let id = self.next_id();
            if let Err(e) = write_msg(sink, &MessageOut::Subscribe(sub), id).await {
                tracing::warn!("Failed to resubscribe: {}", e);
            }
        }
    }

    /// Keep the tracked subscription set in sync with outbound messages, so
    /// reconnects can replay it. Duplicate subscribes are collapsed.
    fn track(&mut self, msg: &MessageOut) {
        match msg {
            MessageOut::Subscribe(params) => {
                if !self.subscriptions.contains(params) {
                    tracing::debug!("Tracking subscription: {:?}", params);
                    self.subscriptions.push(params.clone());
                }
            }
            MessageOut::Unsubscribe(unsub) => {
                self.subscriptions.retain(|s| !s.matches_unsubscribe(unsub));
            }
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn emit(&self, event: WsEvent) {
        let _ = self.event_tx.try_send(event);
    }

    fn set_state(&self, state: ReadyState) {
        self.ready_state.store(state as u16, Ordering::SeqCst);
    }
}

async fn write_msg(sink: &mut WsSink, msg: &MessageOut, id: u64) -> Result<(), String> {
    let json = serde_json::to_string(&msg.to_request(id)).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

fn close_details(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_for_test() -> ConnTask {
        let (event_tx, _event_rx) = mpsc::channel(8);
        let (_cmd_tx, cmd_rx) = mpsc::channel(8);
        ConnTask {
            config: WsConfig::default(),
            event_tx,
            cmd_rx,
            subscriptions: Vec::new(),
            pending: Vec::new(),
            attempts: 0,
            next_id: 0,
            ready_state: Arc::new(AtomicU16::new(ReadyState::Closed as u16)),
        }
    }

    #[test]
    fn test_ws_client_new() {
        let (client, _rx) = WsClient::new(WsConfig::default());
        assert!(client.cmd_tx.is_none());
        assert_eq!(client.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_send_when_not_connected() {
        let (client, _rx) = WsClient::new(WsConfig::default());
        let result = client.subscribe(SubscribeParams::agg_trade("BTCUSDT".into()));
        assert!(matches!(result, Err(WsError::NotConnected)));
    }

    #[tokio::test]
    async fn test_track_dedups_subscribes() {
        let mut task = task_for_test();
        let msg = MessageOut::Subscribe(SubscribeParams::agg_trade("BTCUSDT".into()));
        task.track(&msg);
        task.track(&msg);
        assert_eq!(task.subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn test_track_unsubscribe_removes() {
        let mut task = task_for_test();
        task.track(&MessageOut::Subscribe(SubscribeParams::agg_trade(
            "BTCUSDT".into(),
        )));
        task.track(&MessageOut::Unsubscribe(UnsubscribeParams::AggTrade {
            symbols: vec!["BTCUSDT".into()],
        }));
        assert!(task.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn test_request_ids_increment() {
        let mut task = task_for_test();
        assert_eq!(task.next_id(), 1);
        assert_eq!(task.next_id(), 2);
    }

    #[test]
    fn test_close_details_with_frame() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "goodbye".into(),
        };
        let (code, reason) = close_details(Some(&frame));
        assert_eq!(code, 1000);
        assert_eq!(reason, "goodbye");
    }

    #[test]
    fn test_close_details_no_frame() {
        let (code, reason) = close_details(None);
        assert_eq!(code, 1006);
        assert_eq!(reason, "No close frame");
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected() {
        let (mut client, _rx) = WsClient::new(WsConfig::default());
        client.disconnect().await;
        assert_eq!(client.ready_state(), ReadyState::Closed);
    }
}
