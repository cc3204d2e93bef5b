// motion.rs — Frame-to-frame translation estimate from sparse flow.
//
// Two operations, both stateless; the orchestration loop owns the
// previous frame and point set:
//
//   redetect(gray)              → fresh Shi-Tomasi point set
//   track(prev, curr, points)   → (median translation, surviving points)
//
// Translation rules after tracking:
//   - no point found at all   → (0, 0), previous points returned unchanged
//   - fewer than 8 found      → (0, 0), found subset
//   - otherwise               → per-axis median of curr - prev, found subset
//
// Detector and tracker sit behind traits so the loop can be driven by
// scripted stand-ins in tests.

use crate::config::Config;
use crate::corners::GoodFeaturesDetector;
use crate::image::Image;
use crate::klt::{KltTracker, TrackedPoint};
use crate::points::PointSet;
use crate::pyramid::{Pyramid, DEFAULT_SIGMA};

/// Below this many found correspondences the translation is forced to zero.
pub const MIN_CORRESPONDENCES: usize = 8;

/// Produces feature positions for a grayscale frame.
pub trait FeatureDetector {
    fn detect(&self, image: &Image<u8>) -> PointSet;
}

/// Tracks points between two grayscale frames.
///
/// Must return exactly one result per input point, in order.
pub trait FlowTracker {
    fn track(&self, prev: &Image<u8>, curr: &Image<u8>, points: &PointSet) -> Vec<TrackedPoint>;
}

impl FeatureDetector for GoodFeaturesDetector {
    fn detect(&self, image: &Image<u8>) -> PointSet {
        GoodFeaturesDetector::detect(self, image)
    }
}

impl FlowTracker for KltTracker {
    fn track(&self, prev: &Image<u8>, curr: &Image<u8>, points: &PointSet) -> Vec<TrackedPoint> {
        if points.is_empty() {
            return Vec::new();
        }
        let prev_pyr = Pyramid::build(prev, self.max_levels.max(1), DEFAULT_SIGMA);
        let curr_pyr = Pyramid::build(curr, self.max_levels.max(1), DEFAULT_SIGMA);
        KltTracker::track(self, &prev_pyr, &curr_pyr, points.as_slice())
    }
}

/// Pixel displacement of the scene between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Translation {
    pub dx: f64,
    pub dy: f64,
}

impl Translation {
    pub const ZERO: Translation = Translation { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Translation { dx, dy }
    }
}

/// Result of one tracking step.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionEstimate {
    pub translation: Translation,
    /// Point set to carry into the next step.
    pub points: PointSet,
    /// How many input points the tracker found.
    pub found: usize,
}

/// Apply the translation rules to tracker output.
///
/// `tracks[i]` must correspond to `prev[i]`.
pub fn estimate_translation(prev: &PointSet, tracks: &[TrackedPoint]) -> MotionEstimate {
    debug_assert_eq!(prev.len(), tracks.len());

    let (good_prev, good_curr): (Vec<_>, Vec<_>) = prev
        .iter()
        .zip(tracks)
        .filter(|(_, t)| t.is_found())
        .map(|(p, t)| (*p, t.point))
        .unzip();

    if good_curr.is_empty() {
        return MotionEstimate {
            translation: Translation::ZERO,
            points: prev.clone(),
            found: 0,
        };
    }

    let found = good_curr.len();
    let translation = if found < MIN_CORRESPONDENCES {
        Translation::ZERO
    } else {
        let mut dxs: Vec<f64> = Vec::with_capacity(found);
        let mut dys: Vec<f64> = Vec::with_capacity(found);
        for (p, c) in good_prev.iter().zip(&good_curr) {
            dxs.push(f64::from(c.x - p.x));
            dys.push(f64::from(c.y - p.y));
        }
        Translation::new(median(&mut dxs), median(&mut dys))
    };

    MotionEstimate {
        translation,
        points: PointSet::from(good_curr),
        found,
    }
}

/// Median; even counts average the two middle values. Empty input is 0.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        0.5 * (values[mid - 1] + values[mid])
    }
}

/// Detector plus tracker, the two black boxes of the motion step.
pub struct MotionEstimator {
    detector: Box<dyn FeatureDetector>,
    tracker: Box<dyn FlowTracker>,
}

impl MotionEstimator {
    /// Shi-Tomasi detection and pyramidal KLT, tuned from `config`.
    pub fn new(config: &Config) -> Self {
        Self::with_components(
            Box::new(GoodFeaturesDetector::from_config(config)),
            Box::new(KltTracker::from_config(config)),
        )
    }

    pub fn with_components(
        detector: Box<dyn FeatureDetector>,
        tracker: Box<dyn FlowTracker>,
    ) -> Self {
        MotionEstimator { detector, tracker }
    }

    /// Fresh point set for `gray`. May be empty.
    pub fn redetect(&self, gray: &Image<u8>) -> PointSet {
        self.detector.detect(gray)
    }

    /// Track `prev_points` from `prev` to `curr` and estimate the translation.
    pub fn track(&self, prev: &Image<u8>, curr: &Image<u8>, prev_points: &PointSet) -> MotionEstimate {
        let tracks = self.tracker.track(prev, curr, prev_points);
        estimate_translation(prev_points, &tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::klt::TrackStatus;
    use crate::points::Point2;

    fn grid_points(n: usize) -> PointSet {
        (0..n).map(|i| Point2::new(10.0 + i as f32, 20.0)).collect()
    }

    fn shifted(points: &PointSet, dx: f32, dy: f32, status: TrackStatus) -> Vec<TrackedPoint> {
        points
            .iter()
            .map(|p| TrackedPoint {
                point: Point2::new(p.x + dx, p.y + dy),
                status,
            })
            .collect()
    }

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn test_uniform_shift() {
        let prev = grid_points(10);
        let est = estimate_translation(&prev, &shifted(&prev, 2.0, -1.0, TrackStatus::Tracked));
        assert!((est.translation.dx - 2.0).abs() < 1e-6);
        assert!((est.translation.dy + 1.0).abs() < 1e-6);
        assert_eq!(est.points.len(), 10);
        assert_eq!(est.found, 10);
    }

    #[test]
    fn test_median_rejects_outliers() {
        let prev = grid_points(9);
        let mut tracks = shifted(&prev, 1.0, 0.0, TrackStatus::Tracked);
        tracks[0].point.x += 500.0;
        tracks[1].point.y -= 300.0;
        let est = estimate_translation(&prev, &tracks);
        assert!((est.translation.dx - 1.0).abs() < 1e-6);
        assert!(est.translation.dy.abs() < 1e-6);
    }

    #[test]
    fn test_too_few_found_gives_zero_and_subset() {
        let prev = grid_points(12);
        let mut tracks = shifted(&prev, 5.0, 5.0, TrackStatus::Tracked);
        for t in tracks.iter_mut().skip(7) {
            t.status = TrackStatus::Lost;
        }
        let est = estimate_translation(&prev, &tracks);
        assert_eq!(est.translation, Translation::ZERO);
        assert_eq!(est.found, 7);
        let expected: PointSet = tracks[..7].iter().map(|t| t.point).collect();
        assert_eq!(est.points, expected);
    }

    #[test]
    fn test_nothing_found_keeps_previous() {
        let prev = grid_points(6);
        let est = estimate_translation(&prev, &shifted(&prev, 1.0, 1.0, TrackStatus::OutOfBounds));
        assert_eq!(est.translation, Translation::ZERO);
        assert_eq!(est.points, prev);
        assert_eq!(est.found, 0);
    }

    #[test]
    fn test_exactly_eight_found_is_enough() {
        let prev = grid_points(8);
        let est = estimate_translation(&prev, &shifted(&prev, -3.0, 0.5, TrackStatus::Tracked));
        assert!((est.translation.dx + 3.0).abs() < 1e-6);
        assert!((est.translation.dy - 0.5).abs() < 1e-6);
    }
}
