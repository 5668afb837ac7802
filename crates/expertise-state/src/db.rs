use expertise_core::config::LedgerConfig;
use expertise_core::error::EciError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::ledger::{Ledger, LedgerParts};
use crate::stats::ExpertiseStats;
use crate::store::{Record, Table};

/// Snapshot database backed by sled.
///
/// Named trees, one per ledger table, keyed by big-endian object id:
///   disciplines, expert_tokens, research, research_contents, reviews,
///   review_votes, total_votes, relations  : id bytes → bincode(row)
///   meta                                  : utf8 key  → raw bytes
///
/// `meta` holds the config, the usage stats, each table's next id, and any
/// host keys written through `put_meta`.
pub struct SnapshotDb {
    db: sled::Db,
    disciplines: sled::Tree,
    expert_tokens: sled::Tree,
    research: sled::Tree,
    research_contents: sled::Tree,
    reviews: sled::Tree,
    review_votes: sled::Tree,
    total_votes: sled::Tree,
    relations: sled::Tree,
    meta: sled::Tree,
}

const META_CONFIG: &str = "config";
const META_STATS: &str = "stats";

fn storage(e: sled::Error) -> EciError {
    EciError::Storage(e.to_string())
}

impl SnapshotDb {
    /// Open or create the snapshot database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EciError> {
        let db = sled::open(path).map_err(storage)?;
        let disciplines       = db.open_tree("disciplines").map_err(storage)?;
        let expert_tokens     = db.open_tree("expert_tokens").map_err(storage)?;
        let research          = db.open_tree("research").map_err(storage)?;
        let research_contents = db.open_tree("research_contents").map_err(storage)?;
        let reviews           = db.open_tree("reviews").map_err(storage)?;
        let review_votes      = db.open_tree("review_votes").map_err(storage)?;
        let total_votes       = db.open_tree("total_votes").map_err(storage)?;
        let relations         = db.open_tree("relations").map_err(storage)?;
        let meta              = db.open_tree("meta").map_err(storage)?;
        Ok(Self {
            db,
            disciplines,
            expert_tokens,
            research,
            research_contents,
            reviews,
            review_votes,
            total_votes,
            relations,
            meta,
        })
    }

    // ── Snapshots ────────────────────────────────────────────────────────────

    /// Replace the stored snapshot with `ledger` and flush.
    pub fn save(&self, ledger: &Ledger) -> Result<(), EciError> {
        self.save_table("disciplines", &self.disciplines, ledger.disciplines())?;
        self.save_table("expert_tokens", &self.expert_tokens, ledger.expert_tokens())?;
        self.save_table("research", &self.research, ledger.research_table())?;
        self.save_table("research_contents", &self.research_contents, ledger.research_contents())?;
        self.save_table("reviews", &self.reviews, ledger.reviews())?;
        self.save_table("review_votes", &self.review_votes, ledger.review_votes())?;
        self.save_table("total_votes", &self.total_votes, ledger.total_votes_table())?;
        self.save_table("relations", &self.relations, ledger.relations())?;
        self.put_meta(META_CONFIG, &encode(ledger.config())?)?;
        self.put_meta(META_STATS, &encode(ledger.stats())?)?;
        self.flush()?;
        info!(
            disciplines = ledger.disciplines().len(),
            reviews = ledger.reviews().len(),
            votes = ledger.review_votes().len(),
            "ledger snapshot saved"
        );
        Ok(())
    }

    /// Load the stored snapshot, or `None` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<Ledger>, EciError> {
        let Some(config) = self.get_meta(META_CONFIG)? else {
            return Ok(None);
        };
        let config: LedgerConfig = decode(&config)?;
        let stats: ExpertiseStats = match self.get_meta(META_STATS)? {
            Some(bytes) => decode(&bytes)?,
            None => ExpertiseStats::new(config.blocks_per_week),
        };
        let parts = LedgerParts {
            config,
            disciplines: self.load_table("disciplines", &self.disciplines)?,
            tokens: self.load_table("expert_tokens", &self.expert_tokens)?,
            research: self.load_table("research", &self.research)?,
            contents: self.load_table("research_contents", &self.research_contents)?,
            reviews: self.load_table("reviews", &self.reviews)?,
            review_votes: self.load_table("review_votes", &self.review_votes)?,
            total_votes: self.load_table("total_votes", &self.total_votes)?,
            relations: self.load_table("relations", &self.relations)?,
            stats,
        };
        Ok(Some(Ledger::from_parts(parts)))
    }

    fn save_table<T: Record + Serialize>(
        &self,
        name: &str,
        tree: &sled::Tree,
        table: &Table<T>,
    ) -> Result<(), EciError> {
        tree.clear().map_err(storage)?;
        for row in table.iter() {
            let id: u64 = row.id().into();
            tree.insert(id.to_be_bytes(), encode(row)?).map_err(storage)?;
        }
        self.put_meta(&format!("next_id:{name}"), &table.next_id().to_be_bytes())
    }

    fn load_table<T: Record + DeserializeOwned>(
        &self,
        name: &str,
        tree: &sled::Tree,
    ) -> Result<Table<T>, EciError> {
        let mut rows = Vec::new();
        for item in tree.iter() {
            let (_, bytes) = item.map_err(storage)?;
            rows.push(decode::<T>(&bytes)?);
        }
        let next_id = match self.get_meta(&format!("next_id:{name}"))? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| EciError::Serialization(format!("bad next_id for {name}")))?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        Ok(Table::from_rows(rows, next_id))
    }

    // ── Meta ─────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), EciError> {
        self.meta.insert(key.as_bytes(), value).map_err(storage)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, EciError> {
        Ok(self.meta.get(key.as_bytes()).map_err(storage)?.map(|v| v.to_vec()))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), EciError> {
        self.db.flush().map_err(storage)?;
        Ok(())
    }
}

fn encode<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>, EciError> {
    bincode::serialize(value).map_err(|e| EciError::Serialization(e.to_string()))
}

fn decode<V: DeserializeOwned>(bytes: &[u8]) -> Result<V, EciError> {
    bincode::deserialize(bytes).map_err(|e| EciError::Serialization(e.to_string()))
}
