//! CLI for the fillrate shift analytics library.
//!
//! This binary provides a command-line interface for discovering views,
//! inspecting their output schemas, and running them against a wide
//! worker export.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fillrate::schema::{
    QUANTITY_RESPONSES, SHIFT_NUMBER, SHIFT_REGION, SHIFT_START_TIME, TASK_GROUP, TASK_TYPE,
};
use fillrate::views::{FillRateByDimension, FillRateByDimensionConfig};
use fillrate::{
    ConfigurableView, DerivedCache, DerivedTables, Filter, FillRateError, FilterSet, View,
    ViewCategory, ViewRegistry,
};

#[derive(Parser)]
#[command(name = "fillrate")]
#[command(about = "Shift fill-rate and worker retention analytics", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available views
    List,
    /// Show information about a specific view
    Info {
        /// View name
        view: String,
    },
    /// Load a worker export and print its derived table shapes
    Summary {
        /// Path to the delimited worker export
        file: PathBuf,
    },
    /// Compute a view over a worker export
    Compute {
        /// Path to the delimited worker export
        file: PathBuf,
        /// View to compute
        #[arg(long)]
        view: String,
        /// Keep only rows where a column matches, e.g. --keep shift_region=R1,R2
        #[arg(long, value_name = "COL=V1,V2")]
        keep: Vec<String>,
        /// Keep only workers where a 0/1 flag matches, e.g. --flag opened_push_flg=1
        #[arg(long, value_name = "COL=0,1")]
        flag: Vec<String>,
        /// Keep only workers with a response count in this range, e.g. --responses 1..50
        #[arg(long, value_name = "MIN..MAX")]
        responses: Option<String>,
        /// Keep only shifts starting on or after this date
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,
        /// Keep only shifts starting on or before this date
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,
        /// Override the group truncation of a by-dimension view
        #[arg(long, value_name = "N")]
        top_n: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = ViewRegistry::with_defaults();

    let result = match cli.command {
        Commands::List => {
            list_views(&registry);
            Ok(())
        }
        Commands::Info { view } => {
            show_view_info(&registry, &view);
            Ok(())
        }
        Commands::Summary { file } => summarize(&registry, &file),
        Commands::Compute {
            file,
            view,
            keep,
            flag,
            responses,
            from,
            to,
            top_n,
        } => {
            let options = ComputeOptions {
                keep,
                flags: flag,
                responses,
                from,
                to,
                top_n,
            };
            compute_view(&registry, &file, &view, &options)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// List all available views grouped by category.
fn list_views(registry: &ViewRegistry) {
    let all_info = registry.all_info();

    // Group views by category
    let mut by_category: HashMap<ViewCategory, Vec<_>> = HashMap::new();
    for info in all_info {
        by_category.entry(info.category).or_default().push(info);
    }

    println!("Available Views ({} total)\n", registry.len());

    // Sort categories for consistent output
    let mut categories: Vec<_> = by_category.keys().copied().collect();
    categories.sort_by_key(|c| format!("{}", c));

    for category in categories {
        println!("{}:", category);
        let mut views = by_category.remove(&category).unwrap_or_default();
        views.sort_by_key(|v| v.name.clone());

        for info in views {
            println!("  {} - {}", info.name, info.description);
        }
        println!();
    }
}

/// Show detailed information about a specific view.
fn show_view_info(registry: &ViewRegistry, view_name: &str) {
    let all_info = registry.all_info();

    let info = all_info
        .iter()
        .find(|v| v.name == view_name)
        .unwrap_or_else(|| {
            eprintln!("Error: View '{}' not found", view_name);
            eprintln!("\nAvailable views:");
            for info in &all_info {
                eprintln!("  {}", info.name);
            }
            std::process::exit(1);
        });

    println!("View: {}", info.name);
    println!("Category: {}", info.category);
    println!("Description: {}", info.description);
    println!("Output columns:");
    for col in &info.output_columns {
        println!("  - {}", col);
    }
}

/// Load a worker export and print shapes plus the overall fill rate.
fn summarize(registry: &ViewRegistry, file: &Path) -> fillrate::Result<()> {
    let tables = load_tables(file)?;

    println!("Workers: {} rows", tables.workers.height());
    println!("Shifts:  {} rows", tables.shifts.height());

    match FilterSet::default().apply(&tables)? {
        Some(filtered) => {
            let overall = registry.compute("overall_fill_rate", &filtered)?;
            println!("\n{}", overall);
        }
        None => println!("\nNo rows match the current filters."),
    }

    Ok(())
}

/// Filter and display options of the `compute` subcommand.
struct ComputeOptions {
    keep: Vec<String>,
    flags: Vec<String>,
    responses: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    top_n: Option<usize>,
}

/// Compute a single view over a (possibly filtered) worker export.
fn compute_view(
    registry: &ViewRegistry,
    file: &Path,
    view_name: &str,
    options: &ComputeOptions,
) -> fillrate::Result<()> {
    // Fail on an unknown view before touching the input file.
    if registry.get(view_name).is_none() {
        eprintln!("Error: View '{}' not found", view_name);
        eprintln!("\nAvailable views:");
        let mut names = registry.names();
        names.sort_unstable();
        for name in names {
            eprintln!("  {}", name);
        }
        std::process::exit(1);
    }

    let filter_set = build_filter_set(
        &options.keep,
        &options.flags,
        options.responses.as_deref(),
        options.from,
        options.to,
    )?;
    let tables = load_tables(file)?;

    match filter_set.apply(&tables)? {
        Some(filtered) => {
            let output = match options.top_n {
                Some(n) => top_n_override(registry, view_name, n)?.compute(&filtered)?,
                None => registry.compute(view_name, &filtered)?,
            };
            println!("{}", output);
        }
        None => println!("No rows match the current filters."),
    }

    Ok(())
}

/// Rebuild a by-dimension view with a custom top-N truncation.
fn top_n_override(
    registry: &ViewRegistry,
    view_name: &str,
    n: usize,
) -> fillrate::Result<FillRateByDimension> {
    let Some(dimension) = view_name.strip_prefix("fill_rate_by_") else {
        return Err(FillRateError::Computation(format!(
            "--top-n only applies to by-dimension views, not '{}'",
            view_name
        )));
    };
    // The prefix match above only holds for registered dimension views.
    debug_assert!(registry.get(view_name).is_some());
    Ok(FillRateByDimension::with_config(
        FillRateByDimensionConfig {
            dimension: dimension.to_string(),
            top_n: Some(n),
        },
    ))
}

/// Read the file through the derivation cache.
fn load_tables(file: &Path) -> fillrate::Result<Arc<DerivedTables>> {
    let bytes = std::fs::read(file).map_err(|source| FillRateError::FileRead {
        path: file.to_path_buf(),
        source,
    })?;
    DerivedCache::new().load(&bytes)
}

/// Columns that live on the long shift table rather than the worker table.
const SHIFT_LEVEL_COLUMNS: &[&str] = &[SHIFT_NUMBER, SHIFT_REGION, TASK_GROUP, TASK_TYPE];

/// Translate CLI filter options into a [`FilterSet`].
fn build_filter_set(
    keep: &[String],
    flags: &[String],
    responses: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> fillrate::Result<FilterSet> {
    let mut set = FilterSet::default();

    for spec in keep {
        let (column, values) = split_spec(spec)?;
        let values: Vec<String> = values.split(',').map(str::to_owned).collect();
        let filter = Filter::any_of(column, values);
        if SHIFT_LEVEL_COLUMNS.contains(&column) {
            set.shifts.push(filter);
        } else {
            set.workers.push(filter);
        }
    }

    for spec in flags {
        let (column, values) = split_spec(spec)?;
        let values = values
            .split(',')
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| {
                    FillRateError::Computation(format!("invalid flag value '{}' in '{}'", v, spec))
                })
            })
            .collect::<fillrate::Result<Vec<f64>>>()?;
        set.workers.push(Filter::any_of_numeric(column, values));
    }

    if let Some(range) = responses {
        let (min, max) = range.split_once("..").ok_or_else(|| {
            FillRateError::Computation(format!("invalid range '{}', expected MIN..MAX", range))
        })?;
        let min: f64 = min.trim().parse().map_err(|_| {
            FillRateError::Computation(format!("invalid range bound '{}'", range))
        })?;
        let max: f64 = max.trim().parse().map_err(|_| {
            FillRateError::Computation(format!("invalid range bound '{}'", range))
        })?;
        set.workers.push(Filter::between(QUANTITY_RESPONSES, min, max));
    }

    if from.is_some() || to.is_some() {
        let start = from.unwrap_or(NaiveDate::MIN);
        let end = to.unwrap_or(NaiveDate::MAX);
        set.shifts.push(Filter::date_between(SHIFT_START_TIME, start, end));
    }

    Ok(set)
}

/// Split a `COL=VALUES` option into its two halves.
fn split_spec(spec: &str) -> fillrate::Result<(&str, &str)> {
    spec.split_once('=').ok_or_else(|| {
        FillRateError::Computation(format!("invalid filter '{}', expected COL=VALUES", spec))
    })
}
