use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gtfs_pack::{
    apply_delta, build_delta, build_snapshot, inspect, merge_deltas, Block, BuildOptions, Delta,
    PreviousRun, Query, Snapshot,
};

mod ingest;
mod mapped;

#[derive(Parser, Debug)]
#[command(name = "gtfs-pack")]
#[command(about = "Packs GTFS feeds into compact versioned files and deltas")]
#[command(version)]
struct Args {
    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack a GTFS directory or ZIP archive
    Pack {
        input: PathBuf,
        /// Output file; `%` is replaced by the version
        #[arg(short, long)]
        output: String,
        /// Previous snapshot of the same feed, to keep its ids
        #[arg(short, long)]
        prev: Option<PathBuf>,
        /// Source url stored in the header
        #[arg(short, long)]
        url: Option<String>,
        /// Build date, today when absent
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Write blocks without compression
        #[arg(short, long)]
        raw: bool,
    },
    /// Compute the delta between two snapshots
    Delta {
        old: PathBuf,
        new: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        raw: bool,
    },
    /// Merge two consecutive deltas
    Dmerge {
        old: PathBuf,
        new: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        raw: bool,
    },
    /// Apply a delta to a snapshot
    Apply {
        snapshot: PathBuf,
        delta: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        raw: bool,
    },
    /// Print the header, or the records of one block, as JSON lines
    Info {
        file: PathBuf,
        /// Block name, such as `stops` or `fare_links`
        block: Option<String>,
        /// Stable or source id to filter by
        #[arg(short, long)]
        id: Option<String>,
    },
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let data = mapped::map_file(path)?;
    Snapshot::from_bytes(&data).with_context(|| format!("Cannot read snapshot {:?}", path))
}

fn read_delta(path: &Path) -> Result<Delta> {
    let data = mapped::map_file(path)?;
    Delta::from_bytes(&data).with_context(|| format!("Cannot read delta {:?}", path))
}

fn write(path: &Path, data: &[u8]) -> Result<()> {
    log::info!("Writing {} bytes to {:?}", data.len(), path);
    std::fs::write(path, data).with_context(|| format!("Cannot write {:?}", path))
}

fn pack(
    input: &Path,
    output: &str,
    prev: Option<&Path>,
    options: &BuildOptions,
    compress: bool,
) -> Result<()> {
    let previous = match prev {
        Some(path) => {
            let data = mapped::map_file(path)?;
            Some(
                PreviousRun::from_bytes(&data)
                    .with_context(|| format!("Cannot read previous snapshot {:?}", path))?,
            )
        }
        None => None,
    };
    let raw = ingest::read_feed(input)?;
    let snapshot = build_snapshot(&raw, previous.as_ref(), options)?;
    let output = output.replace('%', &snapshot.version.to_string());
    write(Path::new(&output), &snapshot.to_bytes(compress)?)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()?;

    match args.command {
        Command::Pack {
            input,
            output,
            prev,
            url,
            date,
            raw,
        } => {
            let options = BuildOptions {
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                original_url: url,
            };
            pack(&input, &output, prev.as_deref(), &options, !raw)?;
        }
        Command::Delta {
            old,
            new,
            output,
            raw,
        } => {
            let delta = build_delta(&read_snapshot(&old)?, &read_snapshot(&new)?)?;
            write(&output, &delta.to_bytes(!raw)?)?;
        }
        Command::Dmerge {
            old,
            new,
            output,
            raw,
        } => {
            let merged = merge_deltas(&read_delta(&old)?, &read_delta(&new)?)?;
            write(&output, &merged.to_bytes(!raw)?)?;
        }
        Command::Apply {
            snapshot,
            delta,
            output,
            raw,
        } => {
            let result = apply_delta(&read_snapshot(&snapshot)?, &read_delta(&delta)?)?;
            write(&output, &result.to_bytes(!raw)?)?;
        }
        Command::Info { file, block, id } => {
            let block = match block {
                Some(name) => Some(
                    Block::from_name(&name)
                        .with_context(|| format!("Unknown block {:?}", name))?,
                ),
                None => None,
            };
            let data = mapped::map_file(&file)?;
            for value in inspect(&data, &Query { block, id })? {
                println!("{}", value);
            }
        }
    }
    Ok(())
}
