//! Terminal output

use super::{blues, intensity, tick_labels, X_AXIS_LABEL, Y_AXIS_LABEL};
use crate::evaluation::ConfusionMatrix;
use crate::page::{Halt, PageReport, RETRY_LABEL};
use colored::*;
use std::fmt;

const CELL: usize = 6;

/// The informational accuracy banner
pub fn accuracy_banner(accuracy_percent: f64) -> String {
    format!(
        "  {} The model's classification accuracy is {}%",
        "ℹ".truecolor(120, 170, 255),
        format!("{:.2}", accuracy_percent).white().bold()
    )
}

/// Annotated heatmap grid, actual classes as rows and predictions as columns
pub struct HeatmapGrid<'a>(pub &'a ConfusionMatrix);

impl fmt::Display for HeatmapGrid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cm = self.0;
        let n = cm.n_classes();
        let ticks = tick_labels(n);
        let max = cm.max_count();
        let label_w = Y_AXIS_LABEL.len() + 3;

        let x_label = format!("{:^width$}", X_AXIS_LABEL, width = n * CELL);
        writeln!(f, "  {:label_w$}{}", "", x_label.truecolor(140, 140, 140))?;
        write!(f, "  {:label_w$}", "")?;
        for tick in &ticks {
            write!(f, "{:^w$}", tick, w = CELL)?;
        }
        writeln!(f)?;

        for (i, row) in cm.matrix().iter().enumerate() {
            let axis = if i == n / 2 { Y_AXIS_LABEL } else { "" };
            let axis = format!("{:<w$}", axis, w = label_w - 3);
            write!(f, "  {}{:>2} ", axis.truecolor(140, 140, 140), ticks[i])?;
            for &count in row {
                let t = intensity(count, max);
                let (r, g, b) = blues(t);
                let text = format!("{:^w$}", count, w = CELL);
                let cell = if t > 0.5 {
                    text.white().on_truecolor(r, g, b)
                } else {
                    text.black().on_truecolor(r, g, b)
                };
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn heatmap_grid(cm: &ConfusionMatrix) -> String {
    HeatmapGrid(cm).to_string()
}

/// "code = name" pairs for a text target
pub fn class_legend(names: &[String]) -> String {
    let pairs: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = {}", i + 1, name))
        .collect();
    format!("  {} {}", "Classes:".truecolor(140, 140, 140), pairs.join(", "))
}

struct ReportView<'a>(&'a PageReport);

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "{}", accuracy_banner(report.accuracy_percent))?;
        writeln!(f)?;
        write!(f, "{}", HeatmapGrid(&report.confusion))?;
        if let Some(names) = &report.class_names {
            writeln!(f)?;
            writeln!(f, "{}", class_legend(names))?;
        }
        Ok(())
    }
}

/// Banner and heatmap of a successful render
pub fn render_report(report: &PageReport) -> String {
    ReportView(report).to_string()
}

/// Message for a halted render
pub fn render_halt(halt: &Halt) -> String {
    match halt {
        Halt::NotLoggedIn => format!("  {} {}", "✗".red(), halt.message().red()),
        Halt::MissingNeighbors | Halt::InvalidNeighbors { .. } => {
            format!("  {} {}", "!".yellow(), halt.to_string().yellow())
        }
        Halt::ModelUnavailable { reason } => format!(
            "  {} {}\n  {}\n  [ {} ]",
            "!".yellow(),
            halt.message().yellow(),
            reason.truecolor(100, 100, 100),
            RETRY_LABEL.white().bold()
        ),
    }
}
