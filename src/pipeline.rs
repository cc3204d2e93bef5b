// pipeline.rs — The per-frame odometry loop.
//
// State machine over sampled frames:
//
//   Init      first frame: detect points, stamp its edges at the
//             centered cursor, path untouched → Tracking
//   Tracking  if fewer than 20 points survive, re-detect on the
//             PREVIOUS frame; if that finds nothing, skip the frame
//             (previous frame advances, path and canvas untouched);
//             otherwise track, append a path point, move and clamp the
//             cursor, stamp the current edges
//   Done      `finish` consumes the loop and hands back path + canvas
//
// Only the previous grayscale frame and point set are carried between
// frames.

use std::path::Path as FsPath;

use tracing::{debug, info, trace};

use crate::canvas::{Canvas, Cursor};
use crate::config::Config;
use crate::convert::rgb_to_gray;
use crate::edges::CannyDetector;
use crate::error::Result;
use crate::export::{write_outputs, OutputPaths};
use crate::image::Image;
use crate::motion::{FeatureDetector, FlowTracker, MotionEstimator, Translation};
use crate::path::{MapPoint, Path};
use crate::points::PointSet;
use crate::source::{open_video, sample, Frame};

/// Re-detect when fewer points than this survive tracking.
pub const REDETECT_BELOW: usize = 20;

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// First frame: points detected, edges stamped at the start cursor.
    Initialized { points: usize },
    /// Motion update applied.
    Applied {
        translation: Translation,
        position: MapPoint,
        cursor: Cursor,
        /// Points carried into the next frame.
        points: usize,
        redetected: bool,
    },
    /// Re-detection found nothing; only the previous frame advanced.
    Skipped,
}

/// Counters over a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub frames: usize,
    pub applied: usize,
    pub skipped: usize,
    pub redetections: usize,
}

/// Final products of a run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub path: Path,
    pub canvas: Canvas,
    pub summary: RunSummary,
}

enum State {
    Init,
    Tracking {
        prev_gray: Image<u8>,
        prev_points: PointSet,
    },
}

/// Owns the path, canvas and cursor for one run.
pub struct Odometry<'a> {
    config: &'a Config,
    estimator: MotionEstimator,
    edges: CannyDetector,
    state: State,
    path: Path,
    canvas: Canvas,
    cursor: Cursor,
    summary: RunSummary,
}

impl<'a> Odometry<'a> {
    /// Fails with `Error::InvalidConfig` when `config` does not validate.
    pub fn new(config: &'a Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_estimator(config, MotionEstimator::new(config)))
    }

    /// Substitute the detector and tracker.
    pub fn with_components(
        config: &'a Config,
        detector: Box<dyn FeatureDetector>,
        tracker: Box<dyn FlowTracker>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_estimator(
            config,
            MotionEstimator::with_components(detector, tracker),
        ))
    }

    fn with_estimator(config: &'a Config, estimator: MotionEstimator) -> Self {
        Odometry {
            config,
            estimator,
            edges: CannyDetector::from_config(config),
            state: State::Init,
            path: Path::new(config.path_divisor),
            canvas: Canvas::new(config.canvas_size),
            cursor: Cursor::centered(config.canvas_size),
            summary: RunSummary::default(),
        }
    }

    /// Feed one sampled frame.
    pub fn process_frame(&mut self, frame: &Frame) -> StepOutcome {
        let outcome = self.process(rgb_to_gray(&frame.image));
        trace!(index = frame.index, ?outcome, "frame processed");
        outcome
    }

    /// Feed one grayscale frame.
    pub fn process(&mut self, gray: Image<u8>) -> StepOutcome {
        self.summary.frames += 1;

        let (prev_gray, mut prev_points) = match std::mem::replace(&mut self.state, State::Init) {
            State::Init => {
                let points = self.estimator.redetect(&gray);
                self.stamp_edges(&gray);
                let outcome = StepOutcome::Initialized {
                    points: points.len(),
                };
                debug!(points = points.len(), "initialized");
                self.state = State::Tracking {
                    prev_gray: gray,
                    prev_points: points,
                };
                return outcome;
            }
            State::Tracking {
                prev_gray,
                prev_points,
            } => (prev_gray, prev_points),
        };

        let redetected = prev_points.len() < REDETECT_BELOW;
        if redetected {
            prev_points = self.estimator.redetect(&prev_gray);
            self.summary.redetections += 1;
            debug!(points = prev_points.len(), "re-detected on previous frame");
        }

        if prev_points.is_empty() {
            debug!("no features to track, skipping motion update");
            self.summary.skipped += 1;
            self.state = State::Tracking {
                prev_gray: gray,
                prev_points,
            };
            return StepOutcome::Skipped;
        }

        let estimate = self.estimator.track(&prev_gray, &gray, &prev_points);
        let t = estimate.translation;

        let position = self.path.integrate(t);
        self.cursor = self
            .cursor
            .advance(t, self.config.pixels_per_step, self.config.canvas_size);
        self.stamp_edges(&gray);
        self.summary.applied += 1;

        debug!(
            dx = t.dx,
            dy = t.dy,
            found = estimate.found,
            cursor_x = self.cursor.x,
            cursor_y = self.cursor.y,
            "motion applied"
        );

        let outcome = StepOutcome::Applied {
            translation: t,
            position,
            cursor: self.cursor,
            points: estimate.points.len(),
            redetected,
        };
        self.state = State::Tracking {
            prev_gray: gray,
            prev_points: estimate.points,
        };
        outcome
    }

    fn stamp_edges(&mut self, gray: &Image<u8>) {
        let mask = self.edges.detect(gray);
        self.canvas.stamp(&mask, self.cursor);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Points that will be tracked from the next frame. Empty before the
    /// first frame.
    pub fn current_points(&self) -> Option<&PointSet> {
        match &self.state {
            State::Init => None,
            State::Tracking { prev_points, .. } => Some(prev_points),
        }
    }

    /// End the run.
    pub fn finish(self) -> RunOutput {
        let s = self.summary;
        info!(
            frames = s.frames,
            applied = s.applied,
            skipped = s.skipped,
            redetections = s.redetections,
            path_points = self.path.len(),
            "odometry finished"
        );
        RunOutput {
            path: self.path,
            canvas: self.canvas,
            summary: s,
        }
    }
}

/// Run the loop over already-sampled frames.
pub fn run<I>(frames: I, config: &Config) -> Result<RunOutput>
where
    I: IntoIterator<Item = Frame>,
{
    let mut odo = Odometry::new(config)?;
    for frame in frames {
        odo.process_frame(&frame);
    }
    Ok(odo.finish())
}

/// Decode `video`, run the loop and write all outputs into `out_dir`.
///
/// Nothing is written when the configuration is invalid or the video
/// cannot be opened.
pub fn run_video(video: &FsPath, out_dir: &FsPath, config: &Config) -> Result<OutputPaths> {
    config.validate()?;
    let source = open_video(video)?;
    info!(video = %video.display(), step = config.frame_step, max_frames = config.max_frames, "processing video");

    let frames = sample(source, config.frame_step, config.max_frames);
    let output = run(frames, config)?;

    std::fs::create_dir_all(out_dir)?;
    write_outputs(out_dir, &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::klt::{TrackStatus, TrackedPoint};
    use crate::points::Point2;

    struct FixedDetector(usize);

    impl FeatureDetector for FixedDetector {
        fn detect(&self, _image: &Image<u8>) -> PointSet {
            (0..self.0).map(|i| Point2::new(i as f32, i as f32)).collect()
        }
    }

    struct ShiftTracker(f32, f32);

    impl FlowTracker for ShiftTracker {
        fn track(&self, _prev: &Image<u8>, _curr: &Image<u8>, points: &PointSet) -> Vec<TrackedPoint> {
            points
                .iter()
                .map(|p| TrackedPoint {
                    point: Point2::new(p.x + self.0, p.y + self.1),
                    status: TrackStatus::Tracked,
                })
                .collect()
        }
    }

    fn small_config() -> Config {
        Config {
            canvas_size: 50,
            ..Config::default()
        }
    }

    #[test]
    fn test_state_transitions() {
        let cfg = small_config();
        let mut odo =
            Odometry::with_components(&cfg, Box::new(FixedDetector(30)), Box::new(ShiftTracker(10.0, 0.0))).unwrap();
        assert!(odo.current_points().is_none());

        let gray = Image::new(8, 8);
        assert_eq!(odo.process(gray.clone()), StepOutcome::Initialized { points: 30 });
        assert_eq!(odo.path().len(), 1);

        match odo.process(gray) {
            StepOutcome::Applied {
                translation,
                position,
                cursor,
                redetected,
                ..
            } => {
                assert_eq!(translation, Translation::new(10.0, 0.0));
                assert_eq!(position, MapPoint { x: -0.2, y: 0.0 });
                // round(-10 * 2.5 / 10) = round(-2.5) = -3
                assert_eq!(cursor, Cursor { x: 22, y: 25 });
                assert!(!redetected);
            }
            other => panic!("expected Applied, got {other:?}"),
        }

        let out = odo.finish();
        assert_eq!(out.path.len(), 2);
        assert_eq!(out.summary.applied, 1);
        assert_eq!(out.summary.frames, 2);
    }

    #[test]
    fn test_low_count_triggers_redetect() {
        let cfg = small_config();
        let mut odo =
            Odometry::with_components(&cfg, Box::new(FixedDetector(10)), Box::new(ShiftTracker(0.0, 0.0))).unwrap();
        let gray = Image::new(8, 8);
        odo.process(gray.clone());
        match odo.process(gray) {
            StepOutcome::Applied { redetected, points, .. } => {
                assert!(redetected);
                assert_eq!(points, 10);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
        assert_eq!(odo.summary().redetections, 1);
    }

    #[test]
    fn test_empty_detection_skips() {
        let cfg = small_config();
        let mut odo =
            Odometry::with_components(&cfg, Box::new(FixedDetector(0)), Box::new(ShiftTracker(1.0, 1.0))).unwrap();
        let gray = Image::new(8, 8);
        odo.process(gray.clone());
        assert_eq!(odo.process(gray.clone()), StepOutcome::Skipped);
        assert_eq!(odo.process(gray), StepOutcome::Skipped);
        let out = odo.finish();
        assert_eq!(out.path.len(), 1);
        assert_eq!(out.summary.skipped, 2);
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let cfg = Config {
            block_size: 4,
            ..small_config()
        };
        assert!(matches!(Odometry::new(&cfg), Err(crate::Error::InvalidConfig(_))));
        let scripted = Odometry::with_components(&cfg, Box::new(FixedDetector(30)), Box::new(ShiftTracker(0.0, 0.0)));
        assert!(scripted.is_err());
    }
}
