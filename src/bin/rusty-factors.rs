//! rusty-factors CLI - batch feature generation and cross-sectional ranking
//!
//! ## Example Usage
//!
//! ```bash
//! # Per-instrument feature tables
//! rusty-factors features bars.csv --output-dir features/
//!
//! # Features for every instrument, ranked across instruments per minute
//! rusty-factors rank bars.csv --output ranked.csv
//!
//! # List the output columns of a window catalog
//! rusty-factors columns --windows 5,10,15 --json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rusty_factors::config::{EngineConfig, WindowCatalog};
use rusty_factors::cross_section::{CrossSectionalRanker, SnapshotBuilder};
use rusty_factors::data::{io, BarStore};
use rusty_factors::pipeline::{FeatureKey, FeaturePipeline, FeatureTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

/// rusty-factors: minute-bar feature engine
#[derive(Parser)]
#[command(name = "rusty-factors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Minute-bar technical features and cross-sectional ranks", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the window catalog (comma separated minutes)
    #[arg(short, long, global = true, value_delimiter = ',')]
    windows: Option<Vec<u32>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute per-instrument feature tables
    Features {
        /// Bar CSV file
        #[arg(value_name = "BARS")]
        input: PathBuf,

        /// Directory for `<symbol>.csv` outputs
        #[arg(short, long, default_value = "features")]
        output_dir: PathBuf,

        /// Keep intermediate columns
        #[arg(long)]
        keep_intermediates: bool,
    },

    /// Compute features and rank them across instruments
    Rank {
        /// Bar CSV file
        #[arg(value_name = "BARS")]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "ranked.csv")]
        output: PathBuf,

        /// Rank raw bar fields only, without computing features
        #[arg(long)]
        raw: bool,
    },

    /// List output columns and their roles
    Columns {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Config {
    #[serde(default)]
    engine: EngineConfig,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".rusty-factors").join("config.toml"))
}

impl Config {
    fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Config::default()),
            },
        };
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(windows) = &cli.windows {
        config.engine.windows = WindowCatalog::new(windows)?;
    }

    if cli.verbose {
        println!(
            "{} v{}",
            "rusty-factors".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        let windows: Vec<String> = config
            .engine
            .windows
            .windows()
            .iter()
            .map(|w| w.to_string())
            .collect();
        println!("Windows: {}", windows.join(",").dimmed());
    }

    match cli.command {
        Commands::Features {
            input,
            output_dir,
            keep_intermediates,
        } => {
            config.engine.keep_intermediates |= keep_intermediates;
            run_features(&input, &output_dir, config.engine)
        }
        Commands::Rank { input, output, raw } => run_rank(&input, &output, raw, config.engine),
        Commands::Columns { json } => list_columns(&config.engine, json),
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn load_bars(input: &Path) -> Result<BarStore> {
    if !input.exists() {
        bail!("Bar file not found: {}", input.display());
    }
    let store = io::read_bars_csv(input)
        .with_context(|| format!("Failed to load bars from {}", input.display()))?;
    println!(
        "  {} {} bars, {} instruments",
        "Loaded:".bold(),
        store.bar_count(),
        store.len()
    );
    Ok(store)
}

/// Successful tables, reporting failures
fn compute_tables(store: &BarStore, config: EngineConfig) -> Result<Vec<FeatureTable>> {
    let pipeline = FeaturePipeline::new(config)?;
    let pb = progress_bar(store.len())?;
    pb.set_message("computing features");

    let mut tables = Vec::with_capacity(store.len());
    for (symbol, result) in pipeline.process_universe(store) {
        match result {
            Ok(table) => tables.push(table),
            Err(e) => pb.println(format!("  {} {}: {}", "Skipped".yellow(), symbol, e)),
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    Ok(tables)
}

fn run_features(input: &Path, output_dir: &Path, config: EngineConfig) -> Result<()> {
    println!("{}", "Computing features...".cyan().bold());
    let start = Instant::now();

    let store = load_bars(input)?;
    let tables = compute_tables(&store, config)?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    for table in &tables {
        let symbol = table.symbol().unwrap_or("unknown");
        let path = output_dir.join(format!("{}.csv", symbol));
        io::write_feature_table_csv(table, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!(
        "{} {} tables written to {} in {:.2?}",
        "✓".green().bold(),
        tables.len(),
        output_dir.display(),
        start.elapsed()
    );
    Ok(())
}

fn run_rank(input: &Path, output: &Path, raw: bool, config: EngineConfig) -> Result<()> {
    println!("{}", "Ranking cross-sections...".cyan().bold());
    let start = Instant::now();

    let store = load_bars(input)?;
    let ranker = CrossSectionalRanker::new(config.rank.clone())?;

    let mut builder = SnapshotBuilder::new();
    if raw {
        for (symbol, bars) in store.iter() {
            builder.push_bars(symbol, bars)?;
        }
    } else {
        for table in compute_tables(&store, config)? {
            builder.push_table(&table)?;
        }
    }
    let snapshots = builder.build()?;

    let mut ranked = Vec::with_capacity(snapshots.len());
    for (timestamp, result) in ranker.rank_all(&snapshots) {
        match result {
            Ok(r) => ranked.push(r),
            Err(e) => log::warn!("Skipping snapshot {}: {}", timestamp, e),
        }
    }

    io::write_ranked_csv(&ranked, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} {} snapshots written to {} in {:.2?}",
        "✓".green().bold(),
        ranked.len(),
        output.display(),
        start.elapsed()
    );
    Ok(())
}

fn list_columns(config: &EngineConfig, json: bool) -> Result<()> {
    let keys = if config.keep_intermediates {
        FeatureKey::catalog(&config.windows)
    } else {
        FeatureKey::output_catalog(&config.windows)
    };

    if json {
        let entries: Vec<serde_json::Value> = keys
            .iter()
            .map(|k| serde_json::json!({ "name": k.to_string(), "role": k.role() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for key in &keys {
        let role = format!("{:?}", key.role());
        println!("{:<32} {}", key.to_string(), role.dimmed());
    }
    println!("{} {} columns", "Total:".bold(), keys.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = vec!["rusty-factors", "columns"];
        let _cli = Cli::try_parse_from(args).unwrap();
    }

    #[test]
    fn test_window_override() {
        let args = vec!["rusty-factors", "--windows", "5,10,15", "columns", "--json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.windows, Some(vec![5, 10, 15]));
    }

    #[test]
    fn test_rank_command() {
        let args = vec!["rusty-factors", "rank", "bars.csv", "--output", "out.csv", "--raw"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Commands::Rank { raw: true, .. }));
    }

    #[test]
    fn test_config_from_toml() {
        let config: Config = toml::from_str(
            "[engine]\nwindows = [5, 15]\nkeep_intermediates = true\n\n[engine.rank]\nmin_observations = 3\n",
        )
        .unwrap();
        assert_eq!(config.engine.windows.len(), 2);
        assert!(config.engine.keep_intermediates);
        assert_eq!(config.engine.rank.min_observations, 3);
        assert_eq!(config.engine.rank.exclude.len(), 9);
    }
}
