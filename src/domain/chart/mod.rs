//! Chart domain — reconciliation commands and marker types.

pub mod state;

use serde::{Deserialize, Serialize};

use crate::domain::market::DataPoint;

pub use state::ChartReconciler;

/// Markers are shifted back from wall-clock time so they land on a point
/// that is already drawn rather than ahead of the series.
pub const MARKER_SHIFT_MS: i64 = 2000;

/// Which side of a deal a marker represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerSide {
    Buy,
    Sale,
}

/// Instructions for the chart surface, emitted by the reconciler.
///
/// The reconciler owns the series model; these commands tell whatever is
/// rendering it (a UI binding, a test harness) what changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartCommand {
    /// Replace the whole primary series.
    InitSeries { primary: Vec<DataPoint> },
    /// Append one point to the existing primary series.
    AppendPoint { point: DataPoint },
    /// Marker overlays must be redrawn against the current series.
    RefreshMarkers,
    /// A new deal marker was placed at the given x.
    AddMarker { side: MarkerSide, x: i64 },
}
