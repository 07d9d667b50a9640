//! VellumDB command-line tool
//!
//! Runs a quick insert benchmark or prints what a collection file holds.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};
use vellumdb::{Config, IndexDefinition, JournalSyncStrategy, Session};

/// VellumDB
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(about = "Embedded transactional object store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./vellum_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert objects with sequential ids and report the elapsed time
    Bench {
        /// Number of objects to insert
        #[arg(short, long, default_value = "1000")]
        count: u64,

        /// B-tree degree of the indexes
        #[arg(long, default_value = "12")]
        degree: usize,

        /// When the journal is synced
        #[arg(long, value_enum, default_value = "every-write")]
        sync: SyncArg,

        /// Collection file to write into
        #[arg(short, long, default_value = "bench")]
        file: String,
    },

    /// Print the layout of a collection file
    Inspect {
        /// Collection file name
        file: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SyncArg {
    EveryWrite,
    OnCommit,
}

impl From<SyncArg> for JournalSyncStrategy {
    fn from(arg: SyncArg) -> Self {
        match arg {
            SyncArg::EveryWrite => JournalSyncStrategy::EveryWrite,
            SyncArg::OnCommit => JournalSyncStrategy::OnCommit,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BenchObject {
    id: u64,
    bucket: u32,
    payload: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vellumdb=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    tracing::info!("VellumDB v{}", vellumdb::VERSION);

    let result = match args.command {
        Commands::Bench {
            count,
            degree,
            sync,
            file,
        } => bench(args.data_dir, count, degree, sync.into(), &file),
        Commands::Inspect { file } => inspect(args.data_dir, &file),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn bench(
    data_dir: PathBuf,
    count: u64,
    degree: usize,
    sync: JournalSyncStrategy,
    file: &str,
) -> vellumdb::Result<()> {
    let config = Config::builder()
        .data_dir(data_dir)
        .btree_degree(degree)
        .journal_sync_strategy(sync)
        .build();

    let session = Session::open(config)?;
    let definition = IndexDefinition::new(|o: &BenchObject| (o.id,))
        .index("bucket", |o: &BenchObject| (o.bucket,));
    let objects = session.collection_file(file)?.collection("objects", definition)?;

    let start = Instant::now();
    for id in 0..count {
        objects.persist(&BenchObject {
            id,
            bucket: (id % 16) as u32,
            payload: format!("object-{}", id),
        })?;
    }
    let elapsed = start.elapsed();

    let per_second = count as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "inserted {} objects in {:.2?} ({:.0} objects/s)",
        count, elapsed, per_second
    );
    println!("collection now holds {} objects", objects.len()?);
    Ok(())
}

fn inspect(data_dir: PathBuf, file: &str) -> vellumdb::Result<()> {
    let session = Session::open(Config::builder().data_dir(data_dir).build())?;

    let recovery = session.recovery();
    if !recovery.is_clean() {
        println!(
            "recovery: {} replayed, {} rolled back, torn tail: {}",
            recovery.entries_replayed, recovery.entries_rolled_back, recovery.was_truncated
        );
    }

    let file = session.collection_file(file)?;
    let records = file.records().lock();

    println!("file:   {}", file.name());
    println!("length: {} bytes", records.storage_len()?);

    println!("named records:");
    for (name, address) in records.named_records() {
        println!("  {:<40} @ {}", name, address);
    }

    let empty = records.empty_records();
    let reusable: u64 = empty.iter().map(|slot| slot.allocated_size as u64).sum();
    println!("recycled slots: {} ({} bytes reusable)", empty.len(), reusable);
    Ok(())
}
