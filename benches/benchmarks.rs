// benches/benchmarks.rs -- Per-stage and full-pipeline benchmarks.
//
// Synthetic benchmarks (always run):
//   cargo bench
//
// With a real frame directory or GIF:
//   TRAILMAP_VIDEO=/path/to/frames cargo bench
//
// The video benchmark preloads the first 50 sampled frames and runs the
// whole odometry loop over them with the default configuration.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use trailmap::canvas::{Canvas, Cursor};
use trailmap::convert::rgb_to_gray;
use trailmap::corners::GoodFeaturesDetector;
use trailmap::edges::CannyDetector;
use trailmap::image::Image;
use trailmap::klt::{KltTracker, LkMethod};
use trailmap::pyramid::{Pyramid, DEFAULT_SIGMA};
use trailmap::source::{open_video, sample};
use trailmap::{Config, Odometry};

use std::env;
use std::path::PathBuf;

// ============================================================
// Helpers
// ============================================================

/// Synthetic textured frame (gradient background + rectangles).
fn make_scene(w: usize, h: usize, dx: usize, dy: usize) -> Image<u8> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let base = (((x + dx) * 200 / w) + ((y + dy) * 55 / h)) as u8;
            img.set(x, y, base);
        }
    }
    for rect in 0..6 {
        let rx = (50 + rect * 100 + dx) % w;
        let ry = (40 + (rect % 3) * 100 + dy) % h;
        let bright = 180u8.wrapping_add(rect as u8 * 10);
        for y in ry..(ry + 60).min(h) {
            for x in rx..(rx + 80).min(w) {
                img.set(x, y, bright);
            }
        }
    }
    img
}

// ============================================================
// Per-stage benchmarks (synthetic, always runnable)
// ============================================================

fn bench_pyramid(c: &mut Criterion) {
    let img = make_scene(640, 360, 0, 0);

    let mut group = c.benchmark_group("pyramid");
    group.bench_function("build_4level_640x360", |b| {
        b.iter(|| Pyramid::build(&img, 4, DEFAULT_SIGMA))
    });
    group.finish();
}

fn bench_corners(c: &mut Criterion) {
    let img = make_scene(640, 360, 0, 0);
    let det = GoodFeaturesDetector::from_config(&Config::default());

    let mut group = c.benchmark_group("shi_tomasi");
    group.bench_function("detect_640x360", |b| b.iter(|| det.detect(&img)));
    group.finish();
}

fn bench_klt(c: &mut Criterion) {
    let img1 = make_scene(640, 360, 0, 0);
    let img2 = make_scene(640, 360, 3, 2);

    let pyr1 = Pyramid::build(&img1, 4, DEFAULT_SIGMA);
    let pyr2 = Pyramid::build(&img2, 4, DEFAULT_SIGMA);

    let features = GoodFeaturesDetector::from_config(&Config::default()).detect(&img1);

    let mut group = c.benchmark_group("klt");
    for (name, method) in [
        ("FA", LkMethod::ForwardAdditive),
        ("IC", LkMethod::InverseCompositional),
    ] {
        group.bench_function(BenchmarkId::new(name, format!("{}feat_4pyr", features.len())), |b| {
            let tracker = KltTracker::with_method(10, 30, 0.01, 4, method);
            b.iter(|| tracker.track(&pyr1, &pyr2, features.as_slice()))
        });
    }
    group.finish();
}

fn bench_canny(c: &mut Criterion) {
    let img = make_scene(640, 360, 0, 0);
    let det = CannyDetector::from_config(&Config::default());
    let mask = det.detect(&img);

    let mut group = c.benchmark_group("canny");
    group.bench_function("detect_640x360", |b| b.iter(|| det.detect(&img)));
    group.bench_function("stamp_900_canvas", |b| {
        let mut canvas = Canvas::new(900);
        b.iter(|| canvas.stamp(&mask, Cursor::centered(900)))
    });
    group.finish();
}

fn bench_odometry_synthetic(c: &mut Criterion) {
    let frames: Vec<Image<u8>> = (0..10).map(|i| make_scene(640, 360, i * 3, i * 2)).collect();
    let config = Config::default();

    let mut group = c.benchmark_group("odometry");
    group.sample_size(20);
    group.bench_function("synthetic_640x360_10frames", |b| {
        b.iter(|| {
            let mut odo = Odometry::new(&config).unwrap();
            for frame in &frames {
                odo.process(frame.clone());
            }
            odo.finish()
        })
    });
    group.finish();
}

// ============================================================
// Real video benchmark (optional, needs TRAILMAP_VIDEO env var)
// ============================================================

fn bench_video(c: &mut Criterion) {
    let video = match env::var("TRAILMAP_VIDEO") {
        Ok(p) => PathBuf::from(p),
        Err(_) => {
            eprintln!("TRAILMAP_VIDEO not set, skipping video benchmark.");
            return;
        }
    };

    let config = Config::default();
    let source = match open_video(&video) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Cannot open {}: {}", video.display(), e);
            return;
        }
    };

    // Preload frames into memory to bench processing only, not decoding.
    let frames: Vec<Image<u8>> = sample(source, config.frame_step, 50)
        .map(|f| rgb_to_gray(&f.image))
        .collect();
    if frames.is_empty() {
        eprintln!("No frames decoded from {}", video.display());
        return;
    }
    eprintln!(
        "Video benchmark ready: {}x{}, {} frames",
        frames[0].width(),
        frames[0].height(),
        frames.len()
    );

    let mut group = c.benchmark_group("video");
    group.sample_size(10);
    group.bench_function(format!("odometry_{}frames", frames.len()), |b| {
        b.iter(|| {
            let mut odo = Odometry::new(&config).unwrap();
            for frame in &frames {
                odo.process(frame.clone());
            }
            odo.finish()
        })
    });
    group.finish();
}

// ============================================================
// Register
// ============================================================

criterion_group!(
    benches,
    bench_pyramid,
    bench_corners,
    bench_klt,
    bench_canny,
    bench_odometry_synthetic,
    bench_video,
);
criterion_main!(benches);
