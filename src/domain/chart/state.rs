//! Chart series state and reconciliation.

use crate::domain::market::DataPoint;
use crate::shared::now_millis;

use super::{ChartCommand, MarkerSide, MARKER_SHIFT_MS};

#[derive(Debug, Clone, Default)]
struct SeriesSet {
    primary: Vec<DataPoint>,
    buy_markers: Vec<i64>,
    sale_markers: Vec<i64>,
}

/// Owns the chart series model and decides how each incoming point or marker
/// maps onto chart commands.
///
/// The series collection stays absent until either a non-empty snapshot is
/// seeded or the first stream point arrives; stream points received before
/// that initialize the series rather than appending to nothing.
#[derive(Debug, Clone, Default)]
pub struct ChartReconciler {
    series: Option<SeriesSet>,
}

impl ChartReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the series from a snapshot.
    ///
    /// An empty snapshot leaves the collection absent, so the next stream
    /// point initializes the series instead.
    pub fn seed(&mut self, points: Vec<DataPoint>) -> Option<ChartCommand> {
        if points.is_empty() {
            return None;
        }
        self.series = Some(SeriesSet {
            primary: points.clone(),
            ..Default::default()
        });
        Some(ChartCommand::InitSeries { primary: points })
    }

    /// Reconcile one live stream point against the series.
    pub fn on_data_point(&mut self, point: DataPoint) -> Vec<ChartCommand> {
        match &mut self.series {
            None => {
                self.series = Some(SeriesSet {
                    primary: vec![point.clone()],
                    ..Default::default()
                });
                vec![ChartCommand::InitSeries {
                    primary: vec![point],
                }]
            }
            Some(set) => {
                set.primary.push(point.clone());
                vec![
                    ChartCommand::AppendPoint { point },
                    ChartCommand::RefreshMarkers,
                ]
            }
        }
    }

    /// Place a buy marker at the shifted current time.
    pub fn on_buy_marker(&mut self) -> Option<ChartCommand> {
        self.add_marker(MarkerSide::Buy)
    }

    /// Place a sale marker at the shifted current time.
    pub fn on_sale_marker(&mut self) -> Option<ChartCommand> {
        self.add_marker(MarkerSide::Sale)
    }

    fn add_marker(&mut self, side: MarkerSide) -> Option<ChartCommand> {
        let set = self.series.as_mut()?;
        let x = now_millis() - MARKER_SHIFT_MS;
        match side {
            MarkerSide::Buy => set.buy_markers.push(x),
            MarkerSide::Sale => set.sale_markers.push(x),
        }
        Some(ChartCommand::AddMarker { side, x })
    }

    pub fn has_series(&self) -> bool {
        self.series.is_some()
    }

    pub fn primary(&self) -> &[DataPoint] {
        self.series.as_ref().map(|s| s.primary.as_slice()).unwrap_or(&[])
    }

    pub fn buy_markers(&self) -> &[i64] {
        self.series.as_ref().map(|s| s.buy_markers.as_slice()).unwrap_or(&[])
    }

    pub fn sale_markers(&self) -> &[i64] {
        self.series.as_ref().map(|s| s.sale_markers.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn point(x: i64, y: i64) -> DataPoint {
        DataPoint::new(x, Decimal::from(y))
    }

    #[test]
    fn test_seed_then_append() {
        let mut rec = ChartReconciler::new();
        let cmd = rec.seed(vec![point(1, 10), point(2, 11)]);
        assert!(matches!(cmd, Some(ChartCommand::InitSeries { .. })));

        let cmds = rec.on_data_point(point(3, 12));
        assert_eq!(cmds.len(), 2);
        assert!(matches!(cmds[0], ChartCommand::AppendPoint { .. }));
        assert_eq!(cmds[1], ChartCommand::RefreshMarkers);
        assert_eq!(rec.primary().len(), 3);
    }

    #[test]
    fn test_empty_seed_leaves_series_absent() {
        let mut rec = ChartReconciler::new();
        assert!(rec.seed(Vec::new()).is_none());
        assert!(!rec.has_series());

        // First stream point initializes rather than appends.
        let cmds = rec.on_data_point(point(5, 100));
        assert_eq!(
            cmds,
            vec![ChartCommand::InitSeries {
                primary: vec![point(5, 100)]
            }]
        );
        assert!(rec.has_series());
    }

    #[test]
    fn test_marker_before_series_is_noop() {
        let mut rec = ChartReconciler::new();
        assert!(rec.on_buy_marker().is_none());
        assert!(rec.buy_markers().is_empty());
    }

    #[test]
    fn test_marker_shifted_back_from_now() {
        let mut rec = ChartReconciler::new();
        rec.seed(vec![point(1, 10)]);

        let before = now_millis();
        let cmd = rec.on_sale_marker().unwrap();
        let after = now_millis();

        match cmd {
            ChartCommand::AddMarker {
                side: MarkerSide::Sale,
                x,
            } => {
                assert!(x >= before - MARKER_SHIFT_MS);
                assert!(x <= after - MARKER_SHIFT_MS);
            }
            other => panic!("expected AddMarker, got {other:?}"),
        }
        assert_eq!(rec.sale_markers().len(), 1);
        // Only the sale series grows.
        assert_eq!(rec.primary().len(), 1);
        assert!(rec.buy_markers().is_empty());
    }
}
