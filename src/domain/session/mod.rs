//! Session domain — lifecycle state machine for a live chart session.
//!
//! A session moves through `Idle → Initializing → Ready`, dropping to
//! `Degraded` on snapshot or stream failures and recovering when data flows
//! again. The `reduce` function is the pure core; `SessionController` wires
//! it to a market-data source and a UI command channel.

pub mod controller;
pub mod reducer;
pub mod state;

use crate::domain::market::DataPoint;

pub use controller::{SessionController, SessionHandle, UiCommand};
pub use reducer::{reduce, Effect};
pub use state::{NoticeKind, NotificationState, Phase, SessionState};

/// Everything that can happen to a session, from the UI, the network layer,
/// or the snapshot fetch.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Begin the session (first and only transition out of `Idle`).
    Start,
    /// Connectivity regained.
    Online,
    /// Connectivity lost.
    Offline,
    /// Snapshot fetch completed.
    SnapshotLoaded(Vec<DataPoint>),
    /// Snapshot fetch failed.
    SnapshotFailed,
    /// A live price point arrived on the stream.
    StreamPoint(DataPoint),
    /// The stream reported an error or dropped.
    StreamError,
    /// User placed a buy deal.
    Buy,
    /// User placed a sale deal.
    Sale,
}
