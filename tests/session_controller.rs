//! End-to-end tests for the session controller, driven through a fake
//! market-data source.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::timeout;

use livechart::prelude::*;

// ─── Fake market data ────────────────────────────────────────────────────────

struct FakeMarket {
    snapshot_calls: AtomicU32,
    subscribe_calls: AtomicU32,
    fail_snapshot: AtomicBool,
    snapshot_delay: Duration,
    seed: Vec<DataPoint>,
}

impl FakeMarket {
    fn new(seed: Vec<DataPoint>) -> Self {
        Self {
            snapshot_calls: AtomicU32::new(0),
            subscribe_calls: AtomicU32::new(0),
            fail_snapshot: AtomicBool::new(false),
            snapshot_delay: Duration::ZERO,
            seed,
        }
    }

    fn failing(mut self) -> Self {
        *self.fail_snapshot.get_mut() = true;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = delay;
        self
    }
}

impl MarketData for FakeMarket {
    async fn snapshot(&self, _symbol: &SymbolPair) -> Result<Vec<DataPoint>, HttpError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        if !self.snapshot_delay.is_zero() {
            tokio::time::sleep(self.snapshot_delay).await;
        }
        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(HttpError::Timeout);
        }
        Ok(self.seed.clone())
    }

    fn subscribe(&self, _symbol: &SymbolPair) -> Result<(), WsError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn point(x: i64, y: i64) -> DataPoint {
    DataPoint::new(x, Decimal::from(y))
}

fn spawn_session(
    market: FakeMarket,
) -> (Arc<FakeMarket>, SessionHandle, mpsc::Receiver<UiCommand>) {
    let market = Arc::new(market);
    let (controller, handle, ui_rx) =
        SessionController::new(SymbolPair::from(PAIR_DEFAULT), Arc::clone(&market));
    tokio::spawn(controller.run());
    (market, handle, ui_rx)
}

async fn next_ui(rx: &mut mpsc::Receiver<UiCommand>) -> UiCommand {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for UI command")
        .expect("UI channel closed")
}

/// Drive a session to Ready and drain the startup commands.
async fn ready_session(
    seed: Vec<DataPoint>,
) -> (Arc<FakeMarket>, SessionHandle, mpsc::Receiver<UiCommand>) {
    let (market, handle, mut ui_rx) = spawn_session(FakeMarket::new(seed));
    assert!(matches!(
        next_ui(&mut ui_rx).await,
        UiCommand::Chart(ChartCommand::InitSeries { .. })
    ));
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: false,
            text: String::new()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(true));
    (market, handle, ui_rx)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn startup_seeds_chart_and_subscribes() {
    let (market, _handle, mut ui_rx) = spawn_session(FakeMarket::new(vec![point(1, 10)]));

    match next_ui(&mut ui_rx).await {
        UiCommand::Chart(ChartCommand::InitSeries { primary }) => {
            assert_eq!(primary, vec![point(1, 10)]);
        }
        other => panic!("expected InitSeries, got {other:?}"),
    }
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: false,
            text: String::new()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(true));

    assert_eq!(market.snapshot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(market.subscribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn online_during_fetch_does_not_refetch() {
    let market = FakeMarket::new(vec![point(1, 10)]).with_delay(Duration::from_millis(100));
    let (market, handle, mut ui_rx) = spawn_session(market);

    // Connectivity flaps while the snapshot is still in flight.
    handle.online().await;
    handle.online().await;

    assert!(matches!(
        next_ui(&mut ui_rx).await,
        UiCommand::Chart(ChartCommand::InitSeries { .. })
    ));
    assert_eq!(market.snapshot_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn snapshot_failure_shows_notice_then_online_recovers() {
    let market = FakeMarket::new(vec![point(1, 10)]).failing();
    let (market, handle, mut ui_rx) = spawn_session(market);

    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: true,
            text: "Binance api is unavailable.".to_string()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(false));

    // Connectivity returns and the API is healthy again.
    market.fail_snapshot.store(false, Ordering::SeqCst);
    handle.online().await;

    assert!(matches!(
        next_ui(&mut ui_rx).await,
        UiCommand::Chart(ChartCommand::InitSeries { .. })
    ));
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: false,
            text: String::new()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(true));
    assert_eq!(market.snapshot_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stream_error_recovers_on_next_point() {
    let (_market, handle, mut ui_rx) = ready_session(vec![point(1, 10)]).await;

    handle.send(SessionEvent::StreamError).await;
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: true,
            text: "Error in Binance data stream.".to_string()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(false));

    // The next live point clears the notice and resumes the chart.
    handle.send(SessionEvent::StreamPoint(point(2, 11))).await;
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: false,
            text: String::new()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(true));
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Chart(ChartCommand::AppendPoint { point: point(2, 11) })
    );
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Chart(ChartCommand::RefreshMarkers)
    );
}

#[tokio::test]
async fn empty_snapshot_initializes_from_first_stream_point() {
    let (_market, handle, mut ui_rx) = spawn_session(FakeMarket::new(Vec::new()));

    // No InitSeries for an empty snapshot; startup goes straight to the
    // notice/deal commands.
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: false,
            text: String::new()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(true));

    handle.send(SessionEvent::StreamPoint(point(7, 70))).await;
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Chart(ChartCommand::InitSeries {
            primary: vec![point(7, 70)]
        })
    );
}

#[tokio::test]
async fn deals_place_markers_only_while_visible() {
    let (_market, handle, mut ui_rx) = ready_session(vec![point(1, 10)]).await;

    handle.buy().await;
    match next_ui(&mut ui_rx).await {
        UiCommand::Chart(ChartCommand::AddMarker {
            side: MarkerSide::Buy,
            ..
        }) => {}
        other => panic!("expected buy marker, got {other:?}"),
    }

    // Offline hides the deal controls; deals are ignored until back online.
    handle.offline().await;
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(false));

    handle.sale().await;
    handle.online().await;
    // The next command is the controls coming back, not a marker.
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(true));

    handle.sale().await;
    match next_ui(&mut ui_rx).await {
        UiCommand::Chart(ChartCommand::AddMarker {
            side: MarkerSide::Sale,
            ..
        }) => {}
        other => panic!("expected sale marker, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_error_during_fetch_does_not_discard_snapshot() {
    let market = FakeMarket::new(vec![point(1, 10)]).with_delay(Duration::from_millis(50));
    let (market, handle, mut ui_rx) = spawn_session(market);

    // The eagerly-connecting WS client fails before the snapshot resolves.
    handle.send(SessionEvent::StreamError).await;

    // No notice appears and the snapshot still seeds the chart.
    match next_ui(&mut ui_rx).await {
        UiCommand::Chart(ChartCommand::InitSeries { primary }) => {
            assert_eq!(primary, vec![point(1, 10)]);
        }
        other => panic!("expected InitSeries, got {other:?}"),
    }
    assert_eq!(
        next_ui(&mut ui_rx).await,
        UiCommand::Notice {
            visible: false,
            text: String::new()
        }
    );
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(true));
    assert_eq!(market.subscribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn offline_during_fetch_then_result_still_applies() {
    let market = FakeMarket::new(vec![point(1, 10)]).with_delay(Duration::from_millis(50));
    let (_market, handle, mut ui_rx) = spawn_session(market);

    handle.offline().await;
    assert_eq!(next_ui(&mut ui_rx).await, UiCommand::DealVisible(false));

    // The in-flight fetch completes and still seeds the chart.
    assert!(matches!(
        next_ui(&mut ui_rx).await,
        UiCommand::Chart(ChartCommand::InitSeries { .. })
    ));
}
