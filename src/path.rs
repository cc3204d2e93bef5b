// path.rs — Integrated camera path in arbitrary map units.

use serde::{Deserialize, Serialize};

use crate::motion::Translation;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

/// Append-only path starting at the origin.
///
/// Each applied translation adds `(-dx / divisor, -dy / divisor)` to the
/// last point. The divisor is independent of the canvas scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    divisor: f64,
    points: Vec<MapPoint>,
}

impl Path {
    pub fn new(divisor: f64) -> Self {
        Path {
            divisor,
            points: vec![MapPoint::default()],
        }
    }

    /// Append the next position and return it.
    pub fn integrate(&mut self, t: Translation) -> MapPoint {
        let last = self.last();
        let next = MapPoint {
            x: last.x - t.dx / self.divisor,
            y: last.y - t.dy / self.divisor,
        };
        self.points.push(next);
        next
    }

    pub fn last(&self) -> MapPoint {
        // Never empty: the origin is pushed in `new`.
        self.points.last().copied().unwrap_or_default()
    }

    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
