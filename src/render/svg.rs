//! SVG heatmap export

use super::{blues, intensity, tick_labels, HEATMAP_TITLE, X_AXIS_LABEL, Y_AXIS_LABEL};
use crate::error::Result;
use crate::evaluation::ConfusionMatrix;
use std::fmt;
use std::path::Path;
use tracing::info;

const CELL: f64 = 72.0;
const MARGIN_LEFT: f64 = 96.0;
const MARGIN_TOP: f64 = 64.0;
const MARGIN_BOTTOM: f64 = 72.0;
const MARGIN_RIGHT: f64 = 32.0;

/// Annotated confusion-matrix heatmap as an SVG document
pub struct HeatmapSvg<'a>(pub &'a ConfusionMatrix);

impl fmt::Display for HeatmapSvg<'_> {
    fn fmt(&self, svg: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cm = self.0;
        let n = cm.n_classes();
        let ticks = tick_labels(n);
        let max = cm.max_count();
        let grid = CELL * n as f64;
        let width = MARGIN_LEFT + grid + MARGIN_RIGHT;
        let height = MARGIN_TOP + grid + MARGIN_BOTTOM;

        writeln!(
            svg,
            "<svg xmlns='http://www.w3.org/2000/svg' width='{:.0}' height='{:.0}' viewBox='0 0 {:.0} {:.0}' role='img'>",
            width, height, width, height
        )?;
        writeln!(svg, "  <rect width='100%' height='100%' fill='#ffffff'/>")?;
        writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' text-anchor='middle' font-family='sans-serif' font-size='16' font-weight='600'>{}</text>",
            width / 2.0,
            MARGIN_TOP / 2.0,
            HEATMAP_TITLE
        )?;

        for (i, row) in cm.matrix().iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                let t = intensity(count, max);
                let (r, g, b) = blues(t);
                let x = MARGIN_LEFT + CELL * j as f64;
                let y = MARGIN_TOP + CELL * i as f64;
                let text_fill = if t > 0.5 { "#ffffff" } else { "#1a1a1a" };
                writeln!(
                    svg,
                    "  <rect x='{:.1}' y='{:.1}' width='{:.1}' height='{:.1}' fill='#{:02x}{:02x}{:02x}'/>",
                    x, y, CELL, CELL, r, g, b
                )?;
                writeln!(
                    svg,
                    "  <text x='{:.1}' y='{:.1}' text-anchor='middle' dominant-baseline='central' font-family='sans-serif' font-size='14' fill='{}'>{}</text>",
                    x + CELL / 2.0,
                    y + CELL / 2.0,
                    text_fill,
                    count
                )?;
            }
        }

        for (k, tick) in ticks.iter().enumerate() {
            let center = CELL * k as f64 + CELL / 2.0;
            writeln!(
                svg,
                "  <text x='{:.1}' y='{:.1}' text-anchor='middle' font-family='sans-serif' font-size='12'>{}</text>",
                MARGIN_LEFT + center,
                MARGIN_TOP + grid + 18.0,
                tick
            )?;
            writeln!(
                svg,
                "  <text x='{:.1}' y='{:.1}' text-anchor='end' dominant-baseline='central' font-family='sans-serif' font-size='12'>{}</text>",
                MARGIN_LEFT - 8.0,
                MARGIN_TOP + center,
                tick
            )?;
        }

        writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' text-anchor='middle' font-family='sans-serif' font-size='13'>{}</text>",
            MARGIN_LEFT + grid / 2.0,
            MARGIN_TOP + grid + 48.0,
            X_AXIS_LABEL
        )?;
        let (lx, ly) = (MARGIN_LEFT - 48.0, MARGIN_TOP + grid / 2.0);
        writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' text-anchor='middle' transform='rotate(-90 {:.1} {:.1})' font-family='sans-serif' font-size='13'>{}</text>",
            lx, ly, lx, ly, Y_AXIS_LABEL
        )?;
        writeln!(svg, "</svg>")
    }
}

pub fn heatmap_svg(cm: &ConfusionMatrix) -> String {
    HeatmapSvg(cm).to_string()
}

/// Write the heatmap SVG to `path`
pub fn write_heatmap(cm: &ConfusionMatrix, path: &Path) -> Result<()> {
    std::fs::write(path, heatmap_svg(cm))?;
    info!(path = %path.display(), classes = cm.n_classes(), "heatmap written");
    Ok(())
}
