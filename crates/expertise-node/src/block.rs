use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use expertise_core::operation::Operation;
use expertise_core::types::Timestamp;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// One line of a block stream: a timestamp and its transactions, each an
/// ordered list of operations applied atomically.
#[derive(Clone, Debug, Deserialize)]
pub struct Block {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub transactions: Vec<Vec<Operation>>,
}

impl Block {
    pub fn unix_time(&self) -> Timestamp {
        self.timestamp.timestamp()
    }
}

/// Read a JSON-lines block file and feed the blocks into `tx` in order.
/// Blank lines and lines starting with `#` are skipped.
pub async fn stream_blocks(path: PathBuf, tx: mpsc::Sender<Block>) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("opening block stream {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("reading block stream")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let block: Block = serde_json::from_str(line)
            .with_context(|| format!("{}:{line_no}: malformed block", path.display()))?;
        debug!(line = line_no, txs = block.transactions.len(), "block read");
        if tx.send(block).await.is_err() {
            // Receiver gone; the applier stopped early.
            break;
        }
    }
    Ok(())
}
