// source.rs — Video decoding into a sampled, finite frame stream.
//
// A `FrameSource` hands out decoded RGB frames one at a time until it
// runs dry. `SampledFrames` wraps a source, keeps every `step`-th frame
// by original index and stops after `max_frames` kept frames. The
// source is dropped, releasing its decoder, the moment the stream ends
// or the cap is reached.
//
// Backends:
//   - a directory of still images, visited in file-name order
//   - an animated GIF
//   - any container OpenCV's VideoCapture opens (`opencv` feature)

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frames, RgbImage};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// File extensions accepted in a frame directory.
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "pgm", "ppm"];

/// One sampled frame with its index in the original stream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: RgbImage,
}

/// A decoder producing frames in stream order.
///
/// `None` means end of stream. Decode failures after opening are logged
/// and reported as end of stream.
pub trait FrameSource {
    fn read(&mut self) -> Option<RgbImage>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Option<RgbImage> {
        (**self).read()
    }
}

/// Still frames from a directory, sorted by file name.
pub struct ImageSequence {
    paths: std::vec::IntoIter<PathBuf>,
}

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && has_frame_extension(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(Error::VideoOpen {
                path: dir.to_path_buf(),
                reason: "directory contains no image frames".into(),
            });
        }
        paths.sort();
        debug!(frames = paths.len(), dir = %dir.display(), "opened frame directory");
        Ok(ImageSequence {
            paths: paths.into_iter(),
        })
    }
}

impl FrameSource for ImageSequence {
    fn read(&mut self) -> Option<RgbImage> {
        let path = self.paths.next()?;
        match image::open(&path) {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "frame decode failed, ending stream");
                None
            }
        }
    }
}

/// Frames of an animated GIF.
pub struct GifFrames {
    frames: Frames<'static>,
}

impl GifFrames {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::VideoOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| Error::VideoOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(GifFrames {
            frames: decoder.into_frames(),
        })
    }
}

impl FrameSource for GifFrames {
    fn read(&mut self) -> Option<RgbImage> {
        match self.frames.next()? {
            Ok(frame) => Some(DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8()),
            Err(e) => {
                warn!(error = %e, "gif frame decode failed, ending stream");
                None
            }
        }
    }
}

#[cfg(feature = "opencv")]
pub use self::capture::OpenCvCapture;

#[cfg(feature = "opencv")]
mod capture {
    use std::path::Path;

    use image::RgbImage;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::{imgproc, videoio};
    use tracing::warn;

    use super::FrameSource;
    use crate::error::{Error, Result};

    /// Any container OpenCV can decode.
    pub struct OpenCvCapture {
        cap: videoio::VideoCapture,
        frame: Mat,
    }

    impl OpenCvCapture {
        pub fn open(path: &Path) -> Result<Self> {
            let name = path.to_string_lossy();
            let cap = videoio::VideoCapture::from_file(&name, videoio::CAP_ANY)?;
            if !cap.is_opened()? {
                return Err(Error::VideoOpen {
                    path: path.to_path_buf(),
                    reason: "VideoCapture could not open the file".into(),
                });
            }
            Ok(OpenCvCapture {
                cap,
                frame: Mat::default(),
            })
        }

        fn grab(&mut self) -> Result<Option<RgbImage>> {
            if !self.cap.read(&mut self.frame)? || self.frame.empty() {
                return Ok(None);
            }
            let mut rgb = Mat::default();
            imgproc::cvt_color(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
            let (w, h) = (rgb.cols() as u32, rgb.rows() as u32);
            Ok(RgbImage::from_raw(w, h, rgb.data_bytes()?.to_vec()))
        }
    }

    impl FrameSource for OpenCvCapture {
        fn read(&mut self) -> Option<RgbImage> {
            match self.grab() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "video decode failed, ending stream");
                    None
                }
            }
        }
    }

    impl Drop for OpenCvCapture {
        fn drop(&mut self) {
            if let Err(e) = self.cap.release() {
                warn!(error = %e, "failed to release video capture");
            }
        }
    }
}

/// Open `path` with the backend matching its kind.
///
/// Fails before any frame is decoded when the input is missing or no
/// backend accepts it.
pub fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    if !path.exists() {
        return Err(Error::VideoOpen {
            path: path.to_path_buf(),
            reason: "no such file or directory".into(),
        });
    }
    if path.is_dir() {
        return Ok(Box::new(ImageSequence::open(path)?));
    }
    if extension_is(path, "gif") {
        return Ok(Box::new(GifFrames::open(path)?));
    }
    open_container(path)
}

#[cfg(feature = "opencv")]
fn open_container(path: &Path) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(OpenCvCapture::open(path)?))
}

#[cfg(not(feature = "opencv"))]
fn open_container(path: &Path) -> Result<Box<dyn FrameSource>> {
    Err(Error::UnsupportedVideo(path.to_path_buf()))
}

fn extension_is(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn has_frame_extension(path: &Path) -> bool {
    FRAME_EXTENSIONS.iter().any(|ext| extension_is(path, ext))
}

/// Strided, capped view of a frame source.
pub struct SampledFrames<S: FrameSource> {
    source: Option<S>,
    step: usize,
    max_frames: usize,
    next_index: usize,
    yielded: usize,
}

/// Keep frames with `index % step == 0`, at most `max_frames` of them.
///
/// A `step` of 0 is treated as 1.
pub fn sample<S: FrameSource>(source: S, step: usize, max_frames: usize) -> SampledFrames<S> {
    SampledFrames {
        source: Some(source),
        step: step.max(1),
        max_frames,
        next_index: 0,
        yielded: 0,
    }
}

impl<S: FrameSource> SampledFrames<S> {
    /// True once the underlying source has been dropped.
    pub fn is_released(&self) -> bool {
        self.source.is_none()
    }

    /// Frames yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl<S: FrameSource> Iterator for SampledFrames<S> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.yielded >= self.max_frames {
            self.source = None;
            return None;
        }
        let source = self.source.as_mut()?;
        loop {
            let Some(image) = source.read() else {
                self.source = None;
                return None;
            };
            let index = self.next_index;
            self.next_index += 1;
            if index % self.step == 0 {
                self.yielded += 1;
                if self.yielded >= self.max_frames {
                    self.source = None;
                }
                return Some(Frame { index, image });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        left: usize,
    }

    impl FrameSource for Counter {
        fn read(&mut self) -> Option<RgbImage> {
            if self.left == 0 {
                return None;
            }
            self.left -= 1;
            Some(RgbImage::new(1, 1))
        }
    }

    #[test]
    fn test_stride_counts_original_frames() {
        let idx: Vec<usize> = sample(Counter { left: 7 }, 3, 100).map(|f| f.index).collect();
        assert_eq!(idx, vec![0, 3, 6]);
    }

    #[test]
    fn test_cap_counts_yielded_frames() {
        let mut it = sample(Counter { left: 100 }, 2, 3);
        let idx: Vec<usize> = it.by_ref().map(|f| f.index).collect();
        assert_eq!(idx, vec![0, 2, 4]);
        assert!(it.is_released());
        assert_eq!(it.yielded(), 3);
    }

    #[test]
    fn test_released_at_end_of_stream() {
        let mut it = sample(Counter { left: 2 }, 1, 10);
        assert!(!it.is_released());
        assert_eq!(it.by_ref().count(), 2);
        assert!(it.is_released());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_zero_step_is_every_frame() {
        assert_eq!(sample(Counter { left: 4 }, 0, 10).count(), 4);
    }

    #[test]
    fn test_missing_path_fails() {
        let err = open_video(Path::new("/definitely/not/here.mp4"))
            .err()
            .expect("missing input must fail");
        assert!(matches!(err, Error::VideoOpen { .. }), "{err}");
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        assert!(extension_is(Path::new("a/B.GIF"), "gif"));
        assert!(has_frame_extension(Path::new("x/0001.Png")));
        assert!(!has_frame_extension(Path::new("x/notes.txt")));
    }
}
