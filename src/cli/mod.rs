//! knn-explorer CLI Module
//!
//! Command-line front-end of the page: one-shot renders, an interactive
//! widget loop, dataset inspection and dataset sealing.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{
    FeatureSelection, PageConfig, VariableCatalog, NEIGHBORS_MAX, NEIGHBORS_MIN, TRAIN_FRACTION_MAX,
    TRAIN_FRACTION_MIN, TRAIN_FRACTION_STEP,
};
use crate::data::{DatasetInfo, DatasetLoader, SealedCsv, DATA_KEY_ENV};
use crate::page::{Halt, KnnPage, PageOutcome, RETRY_LABEL};
use crate::preprocessing::ScalingMode;
use crate::render::{render_halt, render_report, write_heatmap};
use crate::selection::available_categorical;
use crate::session::{require_logged_user, InMemorySession, LOGGED_USER_KEY};
use crate::training::WeightScheme;

/// Environment variable read for the logged-in user
pub const USER_ENV: &str = "KNN_EXPLORER_USER";

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "knn-explorer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Explore k-nearest-neighbors classification on a tabular dataset")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the page once and print accuracy and confusion matrix
    Run(PageArgs),

    /// Adjust the page widgets interactively, re-rendering after each change
    Interactive(PageArgs),

    /// Show dataset columns and their catalog groups
    Columns {
        /// Dataset file (CSV, or sealed CSV ending in .enc)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Variable catalog (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Seal a CSV file for use as an encrypted dataset
    Seal {
        /// Plain CSV input
        #[arg(short, long)]
        input: PathBuf,

        /// Sealed output file (conventionally ending in .enc)
        #[arg(short, long)]
        output: PathBuf,

        /// Base64 key; a new key is generated and printed when absent
        #[arg(long, env = DATA_KEY_ENV, hide_env_values = true)]
        key: Option<String>,
    },
}

/// Widget values and page inputs shared by `run` and `interactive`
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Dataset file (CSV, or sealed CSV ending in .enc)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Variable catalog (JSON); inferred from column prefixes when absent
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Page configuration (JSON); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target column
    #[arg(short, long)]
    pub target: Option<String>,

    /// Time features (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub time: Option<Vec<String>>,

    /// Categorical features (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub categorical: Option<Vec<String>>,

    /// Supplemental features (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub supplemental: Option<Vec<String>>,

    /// Fraction of rows used for training (0.5 - 0.9)
    #[arg(long)]
    pub train_size: Option<f64>,

    /// Number of neighbors (2 - 10); 0 leaves it unset
    #[arg(short = 'k', long)]
    pub neighbors: Option<usize>,

    /// Neighbor weighting (uniform, distance)
    #[arg(long)]
    pub weights: Option<WeightScheme>,

    /// Test-partition scaling (train-fitted, per-partition)
    #[arg(long)]
    pub scaling: Option<ScalingMode>,

    /// Logged-in user name
    #[arg(long, env = USER_ENV)]
    pub user: Option<String>,

    /// Write the confusion-matrix heatmap to this SVG file
    #[arg(long)]
    pub heatmap: Option<PathBuf>,
}

fn non_empty(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl PageArgs {
    /// Configuration file values overridden by the given flags
    pub fn page_config(&self, catalog: &VariableCatalog) -> anyhow::Result<PageConfig> {
        let mut config = match &self.config {
            Some(path) => PageConfig::load(path)?,
            None => PageConfig::default(),
        };

        if let Some(data) = &self.data {
            config.dataset_path = data.clone();
        }
        if let Some(target) = &self.target {
            config.target = Some(target.clone());
        }
        if let Some(ts) = self.train_size {
            config.split.train_fraction = ts;
        }
        if let Some(k) = self.neighbors {
            config.knn.n_neighbors = if k == 0 { None } else { Some(k) };
        }
        if let Some(weights) = self.weights {
            config.knn.weights = weights;
        }
        if let Some(scaling) = self.scaling {
            config.split.scaling = scaling;
        }

        if self.time.is_some() || self.categorical.is_some() || self.supplemental.is_some() {
            let target = config
                .target
                .clone()
                .or_else(|| catalog.categorical.first().cloned())
                .unwrap_or_default();
            let mut features = config
                .features
                .clone()
                .unwrap_or_else(|| FeatureSelection::defaults(catalog, &target));
            if let Some(time) = &self.time {
                features.time = non_empty(time);
            }
            if let Some(categorical) = &self.categorical {
                features.categorical = non_empty(categorical);
            }
            if let Some(supplemental) = &self.supplemental {
                features.supplemental = non_empty(supplemental);
            }
            config.features = Some(features);
        }

        Ok(config)
    }

    /// Dataset path before any configuration file is read
    fn dataset_hint(&self) -> anyhow::Result<PathBuf> {
        if let Some(data) = &self.data {
            return Ok(data.clone());
        }
        Ok(match &self.config {
            Some(path) => PageConfig::load(path)?.dataset_path,
            None => PageConfig::default().dataset_path,
        })
    }

    fn session(&self) -> Arc<InMemorySession> {
        let session = InMemorySession::new();
        if let Some(user) = &self.user {
            session.insert(LOGGED_USER_KEY, user);
        }
        Arc::new(session)
    }
}

/// Load the catalog file, or group the dataset's columns by name prefix
fn resolve_catalog(catalog: Option<&Path>, page: &KnnPage, dataset: &Path) -> anyhow::Result<VariableCatalog> {
    let catalog = match catalog {
        Some(path) => VariableCatalog::load(path)?,
        None => {
            let probe = PageConfig::new().with_dataset(dataset);
            let df = page.dataset(&probe)?;
            let catalog = VariableCatalog::from_columns(&DatasetInfo::from_frame(&df).column_names());
            catalog.validate()?;
            catalog
        }
    };
    Ok(catalog)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn print_outcome(outcome: &PageOutcome, heatmap: Option<&Path>) -> anyhow::Result<()> {
    println!();
    match outcome {
        PageOutcome::Rendered(report) => {
            println!("  {:<12} {}", muted("Target"), report.target);
            println!("  {:<12} {}", muted("Features"), report.features.join(", "));
            println!(
                "  {:<12} {} train / {} test",
                muted("Rows"),
                report.n_train,
                report.n_test
            );
            println!(
                "  {:<12} k = {}{}",
                muted("Model"),
                report.n_neighbors,
                if report.model_from_cache { dim("  (cached)") } else { "".normal() }
            );
            println!();
            print!("{}", render_report(report));
            if let Some(path) = heatmap {
                write_heatmap(&report.confusion, path)?;
                println!();
                println!("  {} {}", ok("✓"), dim(&format!("heatmap → {}", path.display())));
            }
        }
        PageOutcome::Halted(halt) => println!("{}", render_halt(halt)),
    }
    println!();
    Ok(())
}

pub fn cmd_run(args: &PageArgs) -> anyhow::Result<()> {
    section("k-NN Explorer");

    // Catalog inference reads the dataset, so the guard runs first
    let session = args.session();
    if require_logged_user(session.as_ref()).is_err() {
        return print_outcome(&PageOutcome::Halted(Halt::NotLoggedIn), None);
    }
    let page = KnnPage::new(session);
    let dataset = args.dataset_hint()?;
    let catalog = resolve_catalog(args.catalog.as_deref(), &page, &dataset)?;
    let config = args.page_config(&catalog)?;

    step_run("Rendering page");
    let start = Instant::now();
    let outcome = page.render(&config, &catalog)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_outcome(&outcome, args.heatmap.as_deref())
}

pub fn cmd_columns(data: Option<&Path>, catalog: Option<&Path>) -> anyhow::Result<()> {
    section("Dataset Columns");

    let path = data
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PageConfig::default().dataset_path);
    let df = DatasetLoader::new().load(&path)?;
    let info = DatasetInfo::from_frame(&df);
    let catalog = match catalog {
        Some(p) => VariableCatalog::load(p)?,
        None => VariableCatalog::from_columns(&info.column_names()),
    };

    println!("  {:<12} {}", muted("File"), path.display());
    println!("  {:<12} {}", muted("Rows"), info.n_rows);
    println!("  {:<12} {}", muted("Columns"), info.columns.len());
    println!();

    println!("  {:<24} {:<12} {:>6}  {}", muted("Column"), muted("Type"), muted("Nulls"), muted("Group"));
    println!("  {}", dim(&"─".repeat(56)));

    for (name, dtype, nulls) in &info.columns {
        let group = if catalog.time.contains(name) {
            "time"
        } else if catalog.categorical.contains(name) {
            "categorical"
        } else if catalog.supplemental.contains(name) {
            "supplemental"
        } else {
            "-"
        };
        println!(
            "  {:<24} {:<12} {:>6}  {}",
            name,
            dtype.truecolor(140, 140, 140),
            nulls,
            group
        );
    }

    println!();
    Ok(())
}

pub fn cmd_seal(input: &Path, output: &Path, key: Option<&str>) -> anyhow::Result<()> {
    section("Seal");

    let (sealer, generated) = match key {
        Some(k) => (SealedCsv::from_base64(k)?, None),
        None => {
            let k = SealedCsv::generate_key();
            (SealedCsv::from_base64(&k)?, Some(k))
        }
    };

    step_run(&format!("Sealing {}", input.display()));
    let plain = std::fs::read(input)?;
    let sealed = sealer.seal(&plain)?;
    std::fs::write(output, &sealed)?;
    step_done(&format!("{} → {} bytes", plain.len(), sealed.len()));

    if let Some(k) = generated {
        println!();
        println!("  {:<12} {}", muted("Key"), k.white().bold());
        println!("  {}", dim(&format!("export {}=<key> to read the sealed dataset", DATA_KEY_ENV)));
    }
    println!();
    Ok(())
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner(user: Option<&str>, dataset: &Path) {
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "k-NN Explorer".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("User   ", user.unwrap_or("-")));
    line_box(&kv("Dataset", &dataset.display().to_string()));
    line_box_empty();
    line_box_bottom();
}

fn theme() -> dialoguer::theme::ColorfulTheme {
    use dialoguer::console::{style, Style};

    dialoguer::theme::ColorfulTheme {
        active_item_prefix: style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: Style::new().for_stderr().white().bold(),
        inactive_item_prefix: style("   ".to_string()).for_stderr(),
        inactive_item_style: Style::new().for_stderr().color256(245),
        prompt_prefix: style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: Style::new().for_stderr().white().bold(),
        ..dialoguer::theme::ColorfulTheme::default()
    }
}

fn pick_many(
    theme: &dialoguer::theme::ColorfulTheme,
    prompt: &str,
    choices: &[String],
    selected: &[String],
) -> anyhow::Result<Vec<String>> {
    use dialoguer::MultiSelect;

    let defaults: Vec<bool> = choices.iter().map(|c| selected.contains(c)).collect();
    let picked = MultiSelect::with_theme(theme)
        .with_prompt(prompt)
        .items(choices)
        .defaults(&defaults)
        .interact()?;
    Ok(picked.into_iter().map(|i| choices[i].clone()).collect())
}

pub fn cmd_interactive(args: &PageArgs) -> anyhow::Result<()> {
    use dialoguer::{Input, Select};

    let session = args.session();
    let dataset = args.dataset_hint()?;
    print_banner(args.user.as_deref(), &dataset);
    if require_logged_user(session.as_ref()).is_err() {
        return print_outcome(&PageOutcome::Halted(Halt::NotLoggedIn), None);
    }
    let page = KnnPage::new(session);

    let catalog = resolve_catalog(args.catalog.as_deref(), &page, &dataset)?;
    let mut config = args.page_config(&catalog)?;
    let theme = theme();

    loop {
        let outcome = page.render(&config, &catalog)?;
        print_outcome(&outcome, args.heatmap.as_deref())?;

        let target = config
            .target
            .clone()
            .or_else(|| catalog.categorical.first().cloned())
            .unwrap_or_default();
        let mut features = config
            .features
            .clone()
            .unwrap_or_else(|| FeatureSelection::defaults(&catalog, &target));

        let retry = outcome.halt().map(|h| h.is_retryable()).unwrap_or(false);
        let mut items: Vec<String> = Vec::new();
        if retry {
            items.push(RETRY_LABEL.to_string());
        }
        items.extend([
            format!("Target                {}", target),
            format!("Time features         {} selected", features.time.len()),
            format!("Categorical features  {} selected", features.categorical.len()),
            format!("Supplemental features {} selected", features.supplemental.len()),
            format!("Train size            {:.2}", config.split.train_fraction),
            format!(
                "Neighbors             {}",
                config.knn.n_neighbors.map(|k| k.to_string()).unwrap_or_else(|| "-".into())
            ),
            format!("Weights               {}", config.knn.weights),
            "Cache stats".to_string(),
            "Exit".to_string(),
        ]);
        let offset = usize::from(retry);

        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("Adjust a widget")
            .items(items.as_slice())
            .default(0)
            .interact_opt()?;

        let choice = match sel {
            Some(i) if i < offset => continue,
            Some(i) => i - offset,
            None => break,
        };

        match choice {
            0 => {
                let targets = catalog.targets();
                let current = targets.iter().position(|t| *t == target).unwrap_or(0);
                let idx = Select::with_theme(&theme)
                    .with_prompt("Target")
                    .items(targets)
                    .default(current)
                    .interact()?;
                let new_target = targets[idx].clone();
                if new_target != target {
                    features.retarget(&catalog, &new_target);
                }
                config.target = Some(new_target);
                config.features = Some(features);
            }
            1 => {
                features.time = pick_many(&theme, "Time features", &catalog.time, &features.time)?;
                config.features = Some(features);
            }
            2 => {
                let choices = available_categorical(&catalog, &target);
                features.categorical =
                    pick_many(&theme, "Categorical features", &choices, &features.categorical)?;
                config.features = Some(features);
            }
            3 => {
                features.supplemental =
                    pick_many(&theme, "Supplemental features", &catalog.supplemental, &features.supplemental)?;
                config.features = Some(features);
            }
            4 => {
                let ts: f64 = Input::with_theme(&theme)
                    .with_prompt(format!(
                        "Train size ({} - {}, step {})",
                        TRAIN_FRACTION_MIN, TRAIN_FRACTION_MAX, TRAIN_FRACTION_STEP
                    ))
                    .default(config.split.train_fraction)
                    .validate_with(|v: &f64| -> Result<(), String> {
                        if (TRAIN_FRACTION_MIN..=TRAIN_FRACTION_MAX).contains(v) {
                            Ok(())
                        } else {
                            Err(format!("must be between {} and {}", TRAIN_FRACTION_MIN, TRAIN_FRACTION_MAX))
                        }
                    })
                    .interact_text()?;
                config.split.train_fraction = ts;
            }
            5 => {
                let raw: String = Input::with_theme(&theme)
                    .with_prompt(format!("Neighbors ({} - {}, empty to clear)", NEIGHBORS_MIN, NEIGHBORS_MAX))
                    .allow_empty(true)
                    .validate_with(|v: &String| -> Result<(), String> {
                        if v.trim().is_empty() {
                            return Ok(());
                        }
                        match v.trim().parse::<usize>() {
                            Ok(0) => Ok(()),
                            Ok(k) if (NEIGHBORS_MIN..=NEIGHBORS_MAX).contains(&k) => Ok(()),
                            _ => Err(format!("must be between {} and {}", NEIGHBORS_MIN, NEIGHBORS_MAX)),
                        }
                    })
                    .interact_text()?;
                config.knn.n_neighbors = raw.trim().parse::<usize>().ok().filter(|k| *k > 0);
            }
            6 => {
                let schemes = [WeightScheme::Uniform, WeightScheme::Distance];
                let current = schemes.iter().position(|w| *w == config.knn.weights).unwrap_or(0);
                let idx = Select::with_theme(&theme)
                    .with_prompt("Weights")
                    .items(&["uniform", "distance"][..])
                    .default(current)
                    .interact()?;
                config.knn.weights = schemes[idx];
            }
            7 => {
                section("Caches");
                for (name, stats) in [
                    ("Dataset", page.dataset_cache_stats()),
                    ("Model", page.model_cache_stats()),
                ] {
                    println!(
                        "  {:<12} {} hits / {} misses / {} entries ({:.0}% hit rate)",
                        muted(name),
                        stats.hits,
                        stats.misses,
                        stats.entries,
                        stats.hit_rate() * 100.0
                    );
                }
            }
            _ => break,
        }
    }

    println!();
    println!("  {}", dim("goodbye"));
    println!();
    Ok(())
}
