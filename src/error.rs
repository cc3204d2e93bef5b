// error.rs — Library error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open video {path}: {reason}")]
    VideoOpen { path: PathBuf, reason: String },

    #[error(
        "unsupported video input {0}: only frame directories and GIFs are built in; \
         rebuild with `--features opencv` to read .mp4/.avi and other containers"
    )]
    UnsupportedVideo(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("plotting failed: {0}")]
    Plot(String),

    #[cfg(feature = "opencv")]
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
