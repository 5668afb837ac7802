//! End-to-end replay test for expertise-node.
//!
//! Runs the built binary over a small genesis and block stream, twice, and
//! checks both runs and the persisted snapshot report the same state.
//!
//! Run with:
//!   cargo test -p expertise-node --test replay

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

// ── Fixtures ──────────────────────────────────────────────────────────────────

struct TempDir(PathBuf);

impl TempDir {
    fn new(tag: &str) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("expertise_node_{tag}_{nanos}"));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn genesis_json() -> serde_json::Value {
    serde_json::json!({
        "genesis_time": 1_704_067_000,
        "disciplines": [{ "name": "Mathematics" }],
        "accounts": ["john", "mary", "alice", "bob"],
        "expert_tokens": [
            { "account": "john",  "discipline": "Mathematics", "amount": 10000 },
            { "account": "alice", "discipline": "Mathematics", "amount": 10000 },
            { "account": "bob",   "discipline": "Mathematics", "amount": 10000 }
        ],
        "research": [{ "research_group_id": 1, "disciplines": ["Mathematics"] }]
    })
}

fn vote(voter: &str, weight: i64) -> serde_json::Value {
    serde_json::json!([{
        "type": "vote_for_review",
        "voter": voter,
        "review_id": 0,
        "discipline_id": 1,
        "weight": weight
    }])
}

fn blocks_jsonl() -> String {
    let blocks = [
        serde_json::json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "transactions": [[{
                "type": "create_research_content",
                "research_id": 0,
                "content_type": "milestone_article",
                "authors": ["mary"]
            }]]
        }),
        serde_json::json!({
            "timestamp": "2024-01-01T00:01:00Z",
            "transactions": [[{
                "type": "create_review",
                "author": "john",
                "research_content_id": 0,
                "is_positive": true,
                "content": "Rigorous and well argued.",
                "weight": 10000,
                "assessment_criteria": [[1, 5]]
            }]]
        }),
        serde_json::json!({
            "timestamp": "2024-01-01T01:01:00Z",
            // The last vote is john's on his own review and must be rejected.
            "transactions": [vote("alice", 5000), vote("bob", -2000), vote("john", 1000)]
        }),
    ];
    let mut out = String::from("# expertise replay fixture\n");
    for b in blocks {
        out.push_str(&b.to_string());
        out.push('\n');
    }
    out
}

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let genesis = dir.join("genesis.json");
    let blocks = dir.join("blocks.jsonl");
    std::fs::write(&genesis, genesis_json().to_string()).unwrap();
    std::fs::write(&blocks, blocks_jsonl()).unwrap();
    (genesis, blocks)
}

// ── Runner ────────────────────────────────────────────────────────────────────

fn run(args: &[&str]) -> BTreeMap<String, String> {
    let out = Command::new(env!("CARGO_BIN_EXE_expertise-node"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn expertise-node");
    assert!(
        out.status.success(),
        "expertise-node {args:?} failed:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn replay(genesis: &Path, blocks: &Path, data_dir: Option<&Path>) -> BTreeMap<String, String> {
    let mut args = vec![
        "replay".to_string(),
        "--genesis".to_string(),
        genesis.display().to_string(),
        "--blocks".to_string(),
        blocks.display().to_string(),
    ];
    if let Some(dir) = data_dir {
        args.push("--data-dir".to_string());
        args.push(dir.display().to_string());
    }
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run(&refs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn replay_reports_expected_state() {
    let tmp = TempDir::new("report");
    let (genesis, blocks) = write_inputs(tmp.path());
    let report = replay(&genesis, &blocks, None);

    assert_eq!(report["blocks"], "3");
    assert_eq!(report["transactions_applied"], "4");
    assert_eq!(report["transactions_rejected"], "1");
    assert_eq!(report["reviews"], "1");
    assert_eq!(report["review_votes"], "2");
    // 10000 for the review, 5000 and 2000 for the two votes.
    assert_eq!(report["expertise_used_last_week"], "17000");
    assert_eq!(report["total_used_expertise"], "17000");
    assert_eq!(report["eci_stale"], "0");
    assert_eq!(report["state_hash"].len(), 64);
}

#[test]
fn two_replays_agree() {
    let tmp = TempDir::new("determinism");
    let (genesis, blocks) = write_inputs(tmp.path());
    let a = replay(&genesis, &blocks, None);
    let b = replay(&genesis, &blocks, None);
    assert_eq!(a["state_hash"], b["state_hash"]);
    assert_eq!(a, b);
}

#[test]
fn persisted_snapshot_matches_replay() {
    let tmp = TempDir::new("persist");
    let (genesis, blocks) = write_inputs(tmp.path());
    let data_dir = tmp.path().join("data");
    let replayed = replay(&genesis, &blocks, Some(&data_dir));

    let inspected = run(&["inspect", "--data-dir", data_dir.to_str().unwrap()]);
    assert_eq!(inspected["state_hash"], replayed["state_hash"]);
    assert_eq!(inspected["blocks"], "3");
    assert_eq!(inspected["reviews"], "1");
}

#[test]
fn malformed_block_stream_fails() {
    let tmp = TempDir::new("malformed");
    let (genesis, blocks) = write_inputs(tmp.path());
    std::fs::write(&blocks, "{ not json }\n").unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_expertise-node"))
        .args(["replay", "--genesis"])
        .arg(&genesis)
        .arg("--blocks")
        .arg(&blocks)
        .output()
        .unwrap();
    assert!(!out.status.success());
}
