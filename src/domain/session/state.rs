//! Session state containers.

use crate::shared::SymbolPair;

/// User-facing text for the API-unavailable notice.
pub const TEXT_API_UNAVAILABLE: &str = "Binance api is unavailable.";

/// User-facing text for the stream-error notice.
pub const TEXT_STREAM_ERROR: &str = "Error in Binance data stream.";

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Created but not started.
    #[default]
    Idle,
    /// Snapshot fetch in flight.
    Initializing,
    /// Chart seeded, stream flowing.
    Ready,
    /// A failure notice is showing; waiting for recovery.
    Degraded,
}

/// Which failure a notice describes. Recovery is keyed on this tag, not on
/// the display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    ApiUnavailable,
    StreamError,
}

impl NoticeKind {
    pub fn text(&self) -> &'static str {
        match self {
            NoticeKind::ApiUnavailable => TEXT_API_UNAVAILABLE,
            NoticeKind::StreamError => TEXT_STREAM_ERROR,
        }
    }
}

/// The single notification slot. Showing a notice replaces any previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    current: Option<NoticeKind>,
}

impl NotificationState {
    pub fn show(&mut self, kind: NoticeKind) {
        self.current = Some(kind);
    }

    pub fn hide(&mut self) {
        self.current = None;
    }

    pub fn visible(&self) -> bool {
        self.current.is_some()
    }

    pub fn kind(&self) -> Option<NoticeKind> {
        self.current
    }

    /// Whether the given notice is the one currently showing.
    pub fn is_showing(&self, kind: NoticeKind) -> bool {
        self.current == Some(kind)
    }

    /// Display text, empty when hidden.
    pub fn text(&self) -> &'static str {
        self.current.map(|k| k.text()).unwrap_or("")
    }
}

/// Identity and progress flags for one session.
#[derive(Debug, Clone)]
pub struct Session {
    pub symbol: SymbolPair,
    /// Set once the first snapshot has been applied.
    pub initialized: bool,
    /// Set once the stream subscription has been requested.
    pub subscribed: bool,
}

/// The whole mutable state the reducer operates on.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub session: Session,
    pub notification: NotificationState,
    /// Last known connectivity. Assumed online until told otherwise.
    pub online: bool,
    /// Whether deal controls (buy/sale) are enabled.
    pub deal_visible: bool,
}

impl SessionState {
    pub fn new(symbol: SymbolPair) -> Self {
        Self {
            phase: Phase::Idle,
            session: Session {
                symbol,
                initialized: false,
                subscribed: false,
            },
            notification: NotificationState::default(),
            online: true,
            deal_visible: false,
        }
    }
}
