//! `beforeafter` CLI - record before/after image sets and score the change.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beforeafter::record::{self, parse_date};
use beforeafter::{Config, Pipeline, RawImageInput, RecordDraft, RecordStore, SortOrder};

/// Record before/after image sets and measure how much changed.
#[derive(Parser, Debug)]
#[command(name = "beforeafter")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Record store file. Defaults to the platform data directory.
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Longer-side cap in pixels for normalized images.
    #[arg(long, global = true, default_value = "800", value_name = "PX")]
    max_dimension: u32,

    /// JPEG quality (0.0-1.0).
    #[arg(short, long, global = true, default_value = "0.8", value_name = "FLOAT")]
    quality: f32,

    /// Reject input files larger than this many bytes.
    #[arg(long, global = true, default_value = "10485760", value_name = "BYTES")]
    max_file_size: u64,

    /// Side length of the comparison grid used for scoring.
    #[arg(long, global = true, default_value = "64", value_name = "PX")]
    grid_size: u32,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize an image and print (or write) its data URL.
    Normalize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Write the data URL here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Normalize two images and print their change score.
    Score {
        #[arg(value_name = "BEFORE")]
        before: PathBuf,

        #[arg(value_name = "AFTER")]
        after: PathBuf,
    },

    /// Create a record from before/after images and add it to the store.
    Add {
        #[arg(short, long)]
        title: String,

        /// Record date (YYYY-MM-DD). Defaults to today.
        #[arg(short, long, value_name = "DATE")]
        date: Option<String>,

        #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
        before: Vec<PathBuf>,

        #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
        after: Vec<PathBuf>,
    },

    /// List stored records.
    List {
        /// Only show records whose title contains this text.
        #[arg(short, long, default_value = "")]
        search: String,

        #[arg(long, value_enum, default_value_t = Sort::Newest)]
        sort: Sort,
    },

    /// Change the title and/or date of a record.
    Edit {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, value_name = "DATE")]
        date: Option<String>,
    },

    /// Delete a record.
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Merge records from a JSON export into the store.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write all records to a JSON file.
    Export {
        /// Defaults to before-after-records-YYYY-MM-DD.json.
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Sort {
    Newest,
    Oldest,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Newest => Self::NewestFirst,
            Sort::Oldest => Self::OldestFirst,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("beforeafter={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[allow(clippy::too_many_lines)]
fn run(args: &Args) -> Result<()> {
    let config = Config {
        max_dimension: args.max_dimension,
        quality: args.quality,
        max_file_size: args.max_file_size,
        grid_size: args.grid_size,
    };

    match &args.command {
        Command::Normalize { input, output } => {
            let pipeline = Pipeline::new(config).context("Invalid configuration")?;
            let image = pipeline
                .normalize(&read_input(&pipeline, input)?)
                .with_context(|| format!("Failed to normalize {}", input.display()))?;

            match output {
                Some(path) => fs::write(path, image.as_str())
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{image}"),
            }
        }

        Command::Score { before, after } => {
            let pipeline = Pipeline::new(config).context("Invalid configuration")?;
            let inputs = [read_input(&pipeline, before)?, read_input(&pipeline, after)?];
            let images = pipeline
                .try_normalize_all(&inputs)
                .context("Failed to normalize images")?;

            let score = pipeline
                .score(&images[0], &images[1])
                .context("Failed to score images")?;
            println!("{score}");
        }

        Command::Add {
            title,
            date,
            before,
            after,
        } => {
            let pipeline = Pipeline::new(config).context("Invalid configuration")?;
            let draft = RecordDraft {
                title: title.clone(),
                date: date.as_deref().map(parse_date).transpose()?,
                before: before
                    .iter()
                    .map(|p| read_input(&pipeline, p))
                    .collect::<Result<_>>()?,
                after: after
                    .iter()
                    .map(|p| read_input(&pipeline, p))
                    .collect::<Result<_>>()?,
            };

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .expect("valid template"),
            );
            spinner.set_message("Processing images");
            spinner.enable_steady_tick(Duration::from_millis(100));

            let built = draft.build(&pipeline);
            spinner.finish_and_clear();
            let new_record = built.context("Failed to create record")?;

            let store = open_store(args)?;
            let mut records = store.load()?;
            let summary = format!(
                "Added {} \"{}\" (change score: {})",
                new_record.id,
                new_record.title,
                new_record
                    .change_score
                    .map_or_else(|| "none".to_string(), |s| s.to_string())
            );
            records.push(new_record);
            store.save(&records).context("Failed to save records")?;

            println!("{summary}");
        }

        Command::List { search, sort } => {
            let records = open_store(args)?.load()?;

            for item in record::search(&records, search, (*sort).into()) {
                let score = item
                    .change_score
                    .map_or_else(|| "-".to_string(), |s| s.to_string());
                println!(
                    "{}\t{}\t{:>3}\t{}/{}\t{}",
                    item.id,
                    item.date,
                    score,
                    item.images.before.len(),
                    item.images.after.len(),
                    item.title
                );
            }
        }

        Command::Edit { id, title, date } => {
            if title.is_none() && date.is_none() {
                anyhow::bail!("Nothing to change: pass --title and/or --date");
            }

            let store = open_store(args)?;
            let mut records = store.load()?;
            let item = records
                .iter_mut()
                .find(|r| &r.id == id)
                .with_context(|| format!("Record {id} not found"))?;
            item.update(title.as_deref(), date.as_deref())?;

            store.save(&records).context("Failed to save records")?;
            println!("Updated {id}");
        }

        Command::Remove { id } => {
            let store = open_store(args)?;
            let mut records = store.load()?;
            let removed = record::remove(&mut records, id)?;

            store.save(&records).context("Failed to save records")?;
            println!("Removed {} \"{}\"", removed.id, removed.title);
        }

        Command::Import { file } => {
            let import = RecordStore::import(file)
                .with_context(|| format!("Failed to import {}", file.display()))?;

            let store = open_store(args)?;
            let mut records = store.load()?;
            let added = record::merge(&mut records, import.records);
            store.save(&records).context("Failed to save records")?;

            println!("Imported {added} records ({} invalid skipped)", import.skipped);
        }

        Command::Export { file } => {
            let records = open_store(args)?.load()?;
            let path = file.clone().unwrap_or_else(|| {
                PathBuf::from(record::default_export_name(
                    chrono::Utc::now().date_naive(),
                ))
            });

            RecordStore::export(&records, &path)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            println!("Exported {} records to {}", records.len(), path.display());
        }
    }

    Ok(())
}

fn read_input(pipeline: &Pipeline, path: &Path) -> Result<RawImageInput> {
    // Validate input file exists
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }

    pipeline
        .open(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn open_store(args: &Args) -> Result<RecordStore> {
    match &args.store {
        Some(path) => Ok(RecordStore::new(path)),
        None => RecordStore::default_location().context("Failed to open record store"),
    }
}
