//! expertise-node: replay host for the expertise ledger.
//!
//! `replay`:
//!   1. Build the genesis ledger from a JSON params file
//!   2. Stream blocks from a JSON-lines file on a reader task
//!   3. Apply every transaction on the single writer, finalize every block
//!   4. Optionally persist the result to a sled snapshot
//!   5. Print the report (state hash, usage, object counts) on stdout
//!
//! `inspect` reloads a snapshot and prints the same report.
//!
//! Logs go to stderr so stdout stays machine-readable.

mod block;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info};

use expertise_genesis::{apply_genesis, Genesis, GenesisParams};
use expertise_history::{EciHistoryIndex, EciHistoryQuery};
use expertise_state::{Engine, Ledger, SnapshotDb};

use crate::block::{stream_blocks, Block};

const META_HEIGHT: &str = "height";

#[derive(Parser, Debug)]
#[command(
    name = "expertise-node",
    version,
    about = "Replays and inspects an expertise contribution ledger"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply genesis and replay a block stream.
    Replay {
        /// Genesis params JSON.
        #[arg(long)]
        genesis: PathBuf,

        /// JSON-lines block stream.
        #[arg(long)]
        blocks: PathBuf,

        /// Persist the final ledger to this directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Print the report of a persisted ledger.
    Inspect {
        #[arg(long, default_value = "~/.expertise/data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,expertise=debug")),
        )
        .init();

    match Args::parse().command {
        Command::Replay { genesis, blocks, data_dir } => replay(genesis, blocks, data_dir).await,
        Command::Inspect { data_dir } => inspect(&data_dir),
    }
}

async fn replay(genesis: PathBuf, blocks: PathBuf, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    info!("expertise node starting replay");

    // ── Genesis ───────────────────────────────────────────────────────────────
    let params = GenesisParams::load(&genesis)
        .with_context(|| format!("loading genesis params {}", genesis.display()))?;
    let Genesis { ledger, accounts } = apply_genesis(&params).context("applying genesis")?;
    let mut engine = Engine::new(ledger, accounts, EciHistoryIndex::new());

    // ── Block stream ──────────────────────────────────────────────────────────
    let (tx, mut rx) = mpsc::channel::<Block>(512);
    let reader = tokio::spawn(stream_blocks(blocks, tx));

    let mut height: u64 = 0;
    let mut clock = params.genesis_time;
    while let Some(block) = rx.recv().await {
        let now = block.unix_time();
        if now < clock {
            anyhow::bail!("block {} at {} precedes chain time {}", height + 1, block.timestamp, clock);
        }
        for (index, txn) in block.transactions.iter().enumerate() {
            if let Err(e) = engine.apply(txn, now) {
                debug!(height = height + 1, index, error = %e, "transaction skipped");
            }
        }
        engine.finalize_block(now);
        height += 1;
        clock = now;
    }
    reader.await.context("block reader task failed")??;
    info!(height, applied = engine.applied_count(), rejected = engine.rejected_count(), "replay finished");

    // ── Persistence ───────────────────────────────────────────────────────────
    if let Some(dir) = data_dir {
        let dir = expand_tilde(&dir);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
        let db = SnapshotDb::open(&dir).context("opening snapshot database")?;
        db.put_meta(META_HEIGHT, &height.to_be_bytes())?;
        db.save(engine.ledger()).context("saving ledger snapshot")?;
    }

    // ── Report ────────────────────────────────────────────────────────────────
    println!("blocks={height}");
    println!("transactions_applied={}", engine.applied_count());
    println!("transactions_rejected={}", engine.rejected_count());
    println!("history_events={}", engine.sink().recorded());
    print_report(engine.ledger())?;
    for (discipline, stats) in EciHistoryQuery::new(engine.sink()).discipline_stats() {
        println!(
            "discipline_eci {discipline} total={} research={} contributions={}",
            stats.total_research_eci, stats.research_count, stats.contributions
        );
    }
    Ok(())
}

fn inspect(data_dir: &Path) -> anyhow::Result<()> {
    let dir = expand_tilde(data_dir);
    let db = SnapshotDb::open(&dir)
        .with_context(|| format!("opening snapshot database {}", dir.display()))?;
    let ledger = db
        .load()
        .context("loading ledger snapshot")?
        .with_context(|| format!("no ledger snapshot in {}", dir.display()))?;
    if let Some(bytes) = db.get_meta(META_HEIGHT)? {
        let raw: [u8; 8] = bytes.as_slice().try_into().context("corrupt height record")?;
        println!("blocks={}", u64::from_be_bytes(raw));
    }
    print_report(&ledger)
}

fn print_report(ledger: &Ledger) -> anyhow::Result<()> {
    println!("state_hash={}", ledger.state_hash().context("hashing ledger state")?);
    println!("expertise_used_last_week={}", ledger.get_expertise_used_last_week());
    println!("total_used_expertise={}", ledger.stats().total_used_expertise);
    println!("disciplines={}", ledger.disciplines().len());
    println!("expert_tokens={}", ledger.expert_tokens().len());
    println!("research={}", ledger.research_table().len());
    println!("research_contents={}", ledger.research_contents().len());
    println!("reviews={}", ledger.reviews().len());
    println!("review_votes={}", ledger.review_votes().len());
    println!("eci_stale={}", ledger.audit_eci().context("auditing ECI")?.len());
    Ok(())
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
