//! The pure session reducer: `(state, event) -> effects`.
//!
//! All transition logic lives here so it can be tested without a runtime.
//! The controller interprets the returned effects (spawning fetches, talking
//! to the reconciler, emitting UI commands).

use crate::domain::chart::MarkerSide;
use crate::domain::market::DataPoint;

use super::state::{NoticeKind, Phase, SessionState};
use super::SessionEvent;

/// Side effects requested by a transition, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch the price snapshot for the session symbol.
    FetchSnapshot,
    /// Subscribe to the live trade stream.
    Subscribe,
    /// Seed the chart with snapshot points.
    SeedChart(Vec<DataPoint>),
    /// Feed one live point through the chart reconciler.
    ReconcilePoint(DataPoint),
    /// Place a deal marker on the chart.
    PlaceMarker(MarkerSide),
    /// Show a failure notice.
    ShowNotice(NoticeKind),
    /// Hide whatever notice is showing.
    ClearNotice,
    /// Enable or disable the deal controls.
    SetDealVisible(bool),
}

/// Apply one event to the session state, returning the effects to execute.
pub fn reduce(state: &mut SessionState, event: SessionEvent) -> Vec<Effect> {
    match event {
        SessionEvent::Start => {
            if state.phase != Phase::Idle {
                return Vec::new();
            }
            state.phase = Phase::Initializing;
            vec![Effect::FetchSnapshot]
        }

        SessionEvent::Online => {
            state.online = true;
            if state.session.initialized {
                // Already have data; just bring the controls back.
                state.deal_visible = true;
                return vec![Effect::SetDealVisible(true)];
            }
            if state.phase == Phase::Initializing {
                // A fetch is already in flight; going online again must not
                // start a second one.
                return Vec::new();
            }
            state.phase = Phase::Initializing;
            vec![Effect::FetchSnapshot]
        }

        SessionEvent::Offline => {
            state.online = false;
            state.deal_visible = false;
            vec![Effect::SetDealVisible(false)]
        }

        SessionEvent::SnapshotLoaded(points) => {
            if state.phase != Phase::Initializing {
                // Stale completion from a fetch we no longer care about.
                return Vec::new();
            }
            state.phase = Phase::Ready;
            state.session.initialized = true;
            state.session.subscribed = true;
            state.notification.hide();
            state.deal_visible = true;
            vec![
                Effect::SeedChart(points),
                Effect::ClearNotice,
                Effect::SetDealVisible(true),
                Effect::Subscribe,
            ]
        }

        SessionEvent::SnapshotFailed => {
            if state.phase != Phase::Initializing {
                return Vec::new();
            }
            state.phase = Phase::Degraded;
            state.notification.show(NoticeKind::ApiUnavailable);
            state.deal_visible = false;
            vec![
                Effect::ShowNotice(NoticeKind::ApiUnavailable),
                Effect::SetDealVisible(false),
            ]
        }

        SessionEvent::StreamPoint(point) => {
            let mut effects = Vec::new();
            // A flowing stream is itself the recovery signal for a stream
            // error; API-unavailable notices are only cleared by a
            // successful snapshot.
            if state.notification.is_showing(NoticeKind::StreamError) {
                state.notification.hide();
                state.phase = Phase::Ready;
                state.deal_visible = true;
                effects.push(Effect::ClearNotice);
                effects.push(Effect::SetDealVisible(true));
            }
            effects.push(Effect::ReconcilePoint(point));
            effects
        }

        SessionEvent::StreamError => {
            // Stream failures only mean something once a subscription has
            // been requested. The WS client connects eagerly, so an early
            // connection error must not derail an in-flight snapshot fetch.
            if !state.session.subscribed {
                return Vec::new();
            }
            state.phase = Phase::Degraded;
            state.notification.show(NoticeKind::StreamError);
            state.deal_visible = false;
            vec![
                Effect::ShowNotice(NoticeKind::StreamError),
                Effect::SetDealVisible(false),
            ]
        }

        SessionEvent::Buy => {
            if !state.deal_visible {
                return Vec::new();
            }
            vec![Effect::PlaceMarker(MarkerSide::Buy)]
        }

        SessionEvent::Sale => {
            if !state.deal_visible {
                return Vec::new();
            }
            vec![Effect::PlaceMarker(MarkerSide::Sale)]
        }
    }
}
