// export.rs — Writing run products to disk.
//
//   estimated_path.png   line plot of the path, equal aspect, gridded
//   estimated_path.csv   `i,x,y`, one row per path point
//   edge_map.png         the canvas as 8-bit grayscale
//
// Plot text needs a TrueType font. The first one found on the system is
// registered once per process; without one the plot is still drawn,
// just without title and axis labels.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::convert::to_gray_image;
use crate::error::{Error, Result};
use crate::path::MapPoint;
use crate::pipeline::RunOutput;

pub const PLOT_FILE: &str = "estimated_path.png";
pub const CSV_FILE: &str = "estimated_path.csv";
pub const EDGE_MAP_FILE: &str = "edge_map.png";

pub const PLOT_TITLE: &str = "Estimated Camera Path (Prototype)";
pub const PLOT_X_DESC: &str = "X (arbitrary units)";
pub const PLOT_Y_DESC: &str = "Y (arbitrary units)";

const PLOT_SIZE: (u32, u32) = (960, 720);
const MARGIN: u32 = 20;
const X_LABEL_AREA: u32 = 50;
const Y_LABEL_AREA: u32 = 70;
const TITLE_HEIGHT: u32 = 40;

/// Environment variable naming a TTF file to use for plot text.
pub const FONT_ENV: &str = "TRAILMAP_FONT";

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Where `write_outputs` put each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub plot: PathBuf,
    pub edge_map: PathBuf,
    pub csv: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        OutputPaths {
            plot: dir.join(PLOT_FILE),
            edge_map: dir.join(EDGE_MAP_FILE),
            csv: dir.join(CSV_FILE),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [self.plot.as_path(), self.edge_map.as_path(), self.csv.as_path()].into_iter()
    }
}

/// Write all three products into an existing directory: plot, edge map,
/// then CSV. Stops at the first failure.
pub fn write_outputs(dir: &Path, output: &RunOutput) -> Result<OutputPaths> {
    let paths = OutputPaths::in_dir(dir);
    write_path_plot(&paths.plot, output.path.points())?;
    write_canvas_png(&paths.edge_map, &output.canvas)?;
    write_path_csv(&paths.csv, output.path.points())?;
    Ok(paths)
}

#[derive(Debug, Serialize, Deserialize)]
struct PathRow {
    i: usize,
    x: f64,
    y: f64,
}

pub fn write_path_csv(file: &Path, points: &[MapPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file)?;
    for (i, p) in points.iter().enumerate() {
        writer.serialize(PathRow { i, x: p.x, y: p.y })?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a path written by `write_path_csv`.
pub fn read_path_csv(file: &Path) -> Result<Vec<MapPoint>> {
    let mut reader = csv::Reader::from_path(file)?;
    let mut points = Vec::new();
    for row in reader.deserialize() {
        let row: PathRow = row?;
        points.push(MapPoint { x: row.x, y: row.y });
    }
    Ok(points)
}

pub fn write_canvas_png(file: &Path, canvas: &Canvas) -> Result<()> {
    to_gray_image(canvas.as_image()).save(file)?;
    Ok(())
}

pub fn write_path_plot(file: &Path, points: &[MapPoint]) -> Result<()> {
    let with_text = font_available();
    let root = BitMapBackend::new(file, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (x_area, y_area, title) = if with_text {
        (X_LABEL_AREA, Y_LABEL_AREA, TITLE_HEIGHT)
    } else {
        (0, 0, 0)
    };
    let plot_w = PLOT_SIZE.0.saturating_sub(2 * MARGIN + y_area).max(1);
    let plot_h = PLOT_SIZE.1.saturating_sub(2 * MARGIN + x_area + title).max(1);
    let (x_range, y_range) = equal_aspect_ranges(points, plot_w, plot_h);

    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(MARGIN)
        .x_label_area_size(x_area)
        .y_label_area_size(y_area);
    if with_text {
        builder.caption(PLOT_TITLE, ("sans-serif", 24));
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err)?;

    {
        let mut mesh = chart.configure_mesh();
        if with_text {
            mesh.x_desc(PLOT_X_DESC).y_desc(PLOT_Y_DESC);
        }
        mesh.draw().map_err(plot_err)?;
    }

    chart
        .draw_series(LineSeries::new(points.iter().map(|p| (p.x, p.y)), &BLUE))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    debug!(file = %file.display(), points = points.len(), with_text, "path plot written");
    Ok(())
}

/// Axis ranges whose units-per-pixel match on both axes.
///
/// The data box gets 5% padding and a minimum span of 1 unit, then the
/// shorter side (relative to the plot's pixel size) is widened about its
/// center.
pub fn equal_aspect_ranges(
    points: &[MapPoint],
    plot_w: u32,
    plot_h: u32,
) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let (mut x0, mut x1, mut y0, mut y1) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let mut first = true;
    for p in points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
        if first {
            (x0, x1, y0, y1) = (p.x, p.x, p.y, p.y);
            first = false;
        } else {
            x0 = x0.min(p.x);
            x1 = x1.max(p.x);
            y0 = y0.min(p.y);
            y1 = y1.max(p.y);
        }
    }

    let span_x = ((x1 - x0) * 1.1).max(1.0);
    let span_y = ((y1 - y0) * 1.1).max(1.0);
    let per_px = (span_x / plot_w.max(1) as f64).max(span_y / plot_h.max(1) as f64);
    let half_w = 0.5 * per_px * plot_w.max(1) as f64;
    let half_h = 0.5 * per_px * plot_h.max(1) as f64;
    let (cx, cy) = (0.5 * (x0 + x1), 0.5 * (y0 + y1));
    (cx - half_w..cx + half_w, cy - half_h..cy + half_h)
}

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Register a system font under "sans-serif" on first use.
fn font_available() -> bool {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    *REGISTERED.get_or_init(register_system_font)
}

fn register_system_font() -> bool {
    let from_env = std::env::var_os(FONT_ENV).map(PathBuf::from);
    let candidates = from_env
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        if !looks_like_font(&bytes) {
            debug!(font = %path.display(), "not a TrueType/OpenType file");
            continue;
        }
        // plotters keeps the font for the life of the process.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match register_font("sans-serif", FontStyle::Normal, bytes) {
            Ok(()) => {
                debug!(font = %path.display(), "registered plot font");
                return true;
            }
            Err(_) => debug!(font = %path.display(), "unusable font"),
        }
    }
    warn!("no TrueType font found, path plot will have no text (set {FONT_ENV} to a .ttf file)");
    false
}

/// sfnt header check: TrueType, OpenType/CFF, Apple `true` or a collection.
fn looks_like_font(bytes: &[u8]) -> bool {
    const MIN_LEN: usize = 12;
    if bytes.len() < MIN_LEN {
        return false;
    }
    matches!(
        &bytes[..4],
        [0x00, 0x01, 0x00, 0x00] | b"OTTO" | b"true" | b"ttcf"
    )
}
