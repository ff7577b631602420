//! Output rendering
//!
//! The accuracy banner and the confusion-matrix heatmap, either as colored
//! terminal text or as an SVG image.

mod svg;
mod terminal;

pub use svg::{heatmap_svg, write_heatmap, HeatmapSvg};
pub use terminal::{accuracy_banner, class_legend, heatmap_grid, render_halt, render_report, HeatmapGrid};

/// Title of the heatmap image
pub const HEATMAP_TITLE: &str = "Confusion matrix of predicted vs. actual values";
pub const X_AXIS_LABEL: &str = "Predicted";
pub const Y_AXIS_LABEL: &str = "Actual";

/// Fixed tick labels of the heatmap axes
pub const TICK_LABELS: [&str; 5] = ["1", "2", "3", "4", "5"];

/// Tick labels for an `n`-class matrix. Positions past the fixed list are blank.
pub fn tick_labels(n: usize) -> Vec<&'static str> {
    (0..n).map(|i| TICK_LABELS.get(i).copied().unwrap_or("")).collect()
}

/// Heatmap intensity of a cell in `[0, 1]`
pub(crate) fn intensity(count: usize, max: usize) -> f64 {
    if max == 0 {
        0.0
    } else {
        count as f64 / max as f64
    }
}

/// Sequential blue palette, light for low counts and dark for high ones
pub(crate) fn blues(t: f64) -> (u8, u8, u8) {
    const LOW: (f64, f64, f64) = (247.0, 251.0, 255.0);
    const HIGH: (f64, f64, f64) = (8.0, 48.0, 107.0);
    let t = t.clamp(0.0, 1.0);
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    (mix(LOW.0, HIGH.0), mix(LOW.1, HIGH.1), mix(LOW.2, HIGH.2))
}
