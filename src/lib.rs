// trailmap: prototype visual odometry
//
// Video frames → grayscale → Shi-Tomasi points → pyramidal KLT →
// median translation → integrated path, plus Canny edge masks stamped
// onto a shared canvas at a cursor that follows the motion.

pub mod image;
pub mod convert;
pub mod convolution;
pub mod gradient;
pub mod pyramid;

pub mod points;
pub mod occupancy;
pub mod corners;
pub mod klt;
pub mod edges;

pub mod motion;
pub mod canvas;
pub mod path;

pub mod config;
pub mod error;
pub mod source;
pub mod pipeline;
pub mod export;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{run, run_video, Odometry, RunOutput, RunSummary, StepOutcome};
