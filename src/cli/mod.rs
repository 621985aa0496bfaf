//! Command-line interface: EDA and training runs over a CSV/JSON file.
//!
//! Results go to stdout (or `--output`) as JSON; progress lines go to stderr.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::eda::{self, TopValueCharts};
use crate::pipeline::TrainingPipeline;
use crate::preprocessing::Table;
use crate::store::{InMemoryResultStore, ResultStore};
use crate::training::ModelKind;
use crate::utils::{DataLoader, FileInfo};
use crate::visualization::ChartRenderer;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    eprint!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    eprintln!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    eprintln!();
    eprintln!("  {}", title.white().bold());
    eprintln!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    eprintln!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabular-insight")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Automated EDA, regression training and forecasting for tabular data")]
#[command(long_about = None)]
pub struct Cli {
    /// Owner recorded with saved results
    #[arg(long, global = true, default_value = "local")]
    pub owner: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a regression model and report metrics
    Train {
        /// Input data file (CSV, TSV or JSON lines)
        data: PathBuf,

        /// Model id (see `models`); unknown ids train a random forest
        #[arg(short, long, default_value = "random_forest")]
        model: String,

        /// Target column; inferred from column names when omitted
        #[arg(short, long)]
        target: Option<String>,

        /// Downsample and attach diagnostic charts
        #[arg(long)]
        diagnostics: bool,

        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a dataset
    Eda {
        /// Input data file (CSV, TSV or JSON lines)
        data: PathBuf,

        /// Skip product charts
        #[arg(long)]
        no_charts: bool,

        /// Write the JSON summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List recognized model ids
    Models,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    store: &dyn ResultStore,
    owner: &str,
    data_path: &Path,
    model_id: &str,
    target: Option<&str>,
    diagnostics: bool,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = match config_path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::from_env(),
    };
    if diagnostics {
        config = config.with_diagnostics(true);
    }

    let (table, info) = load_table(data_path)?;

    if ModelKind::is_fallback(model_id) {
        eprintln!("  {} unknown model id '{}', using {}", "!".yellow(), model_id, ModelKind::RandomForest);
    }
    step_run(&format!("Training {}", ModelKind::from_id(model_id).to_string().as_str().cyan()));
    let start = Instant::now();
    let result = TrainingPipeline::new(config).run(&table, target, model_id)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    let json = result.to_json();
    let saved = store.save_model(owner, &info.file_name, json.clone(), model_id, Some(&result.target_column), &info.shape_label());

    eprintln!();
    kv("Target", &result.target_column);
    kv("Features", &result.features_used.join(", "));
    kv("RMSE", &format!("{}", result.rmse()));
    kv("R²", &format!("{}", result.r2_score()));
    kv("Forecast", if result.forecast.is_some() { "yes" } else { "no" });
    if let Some(d) = &result.diagnostics {
        kv("Diagnostics", &d.names().join(", "));
    }
    kv("Saved", &format!("{}/{} ({})", saved.owner, saved.file_name, saved.data_shape));
    eprintln!();

    write_json(&json, output)
}

pub fn cmd_eda(store: &dyn ResultStore, owner: &str, data_path: &Path, no_charts: bool, output: Option<&Path>) -> anyhow::Result<()> {
    section("EDA");

    let (table, info) = load_table(data_path)?;

    step_run("Summarizing");
    let start = Instant::now();
    let report = if no_charts {
        eda::summarize(&table, &eda::NoCharts)?
    } else {
        eda::summarize(&table, &TopValueCharts::new(ChartRenderer::default()))?
    };
    step_done(&format!("{:.2?}", start.elapsed()));

    let json = report.to_json();
    let saved = store.save_eda(owner, &info.file_name, json.clone(), report.inferred_target.as_deref(), &info.shape_label());

    eprintln!();
    kv("Shape", &saved.data_shape);
    kv("Target", if saved.inferred_target.is_empty() { "-" } else { saved.inferred_target.as_str() });
    kv("Date column", report.date_column_used.as_deref().unwrap_or("-"));
    kv("Charts", &report.graphs.len().to_string());
    eprintln!();

    write_json(&json, output)
}

pub fn cmd_models() -> anyhow::Result<()> {
    section("Models");
    for kind in ModelKind::ALL {
        println!("  {:<20} {}", kind.id().cyan(), muted(kind.description()));
    }
    println!();
    Ok(())
}

/// Run the parsed command against a fresh in-memory store
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let store = InMemoryResultStore::new();
    match cli.command {
        Commands::Train { data, model, target, diagnostics, config, output } => cmd_train(
            &store,
            &cli.owner,
            &data,
            &model,
            target.as_deref(),
            diagnostics,
            config.as_deref(),
            output.as_deref(),
        ),
        Commands::Eda { data, no_charts, output } => cmd_eda(&store, &cli.owner, &data, no_charts, output.as_deref()),
        Commands::Models => cmd_models(),
    }
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn load_table(path: &Path) -> anyhow::Result<(Table, FileInfo)> {
    step_run("Loading data");
    let start = Instant::now();
    let loader = DataLoader::new();
    let df = loader.load_auto(path)?;
    let table = Table::from_dataframe(&df)?;
    let info = FileInfo {
        file_name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
        file_size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        n_rows: df.height(),
        n_cols: df.width(),
    };
    step_done(&format!("{} rows × {} cols in {:.2?}", info.n_rows, info.n_cols, start.elapsed()));
    Ok((table, info))
}

fn write_json(json: &serde_json::Value, output: Option<&Path>) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(json)?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            eprintln!("  {} wrote {}", ok("✓"), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
