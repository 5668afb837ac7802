use expertise_core::config::LedgerConfig;
use expertise_core::constants::ROOT_DISCIPLINE_NAME;
use expertise_core::error::EciError;
use expertise_core::schema::{
    Discipline, ExpertToken, Research, ResearchContent, ResearchDisciplineRelation, Review,
    ReviewVote, TotalVotes,
};
use expertise_core::types::Share;
use serde::Serialize;
use tracing::debug;

use crate::stats::{ExpertiseStats, StatsCheckpoint};
use crate::store::{Record, Table};

/// The expertise subsystem's complete state.
///
/// One value per chain instance; every service is a method on it, so all
/// shared aggregates travel with the ledger instead of living in globals.
#[derive(Clone, Debug)]
pub struct Ledger {
    pub(crate) config: LedgerConfig,
    pub(crate) disciplines: Table<Discipline>,
    pub(crate) tokens: Table<ExpertToken>,
    pub(crate) research: Table<Research>,
    pub(crate) contents: Table<ResearchContent>,
    pub(crate) reviews: Table<Review>,
    pub(crate) review_votes: Table<ReviewVote>,
    pub(crate) total_votes: Table<TotalVotes>,
    pub(crate) relations: Table<ResearchDisciplineRelation>,
    pub(crate) stats: ExpertiseStats,
    stats_checkpoint: Option<StatsCheckpoint>,
}

/// Persisted form of a ledger; see `SnapshotDb`.
pub(crate) struct LedgerParts {
    pub config: LedgerConfig,
    pub disciplines: Table<Discipline>,
    pub tokens: Table<ExpertToken>,
    pub research: Table<Research>,
    pub contents: Table<ResearchContent>,
    pub reviews: Table<Review>,
    pub review_votes: Table<ReviewVote>,
    pub total_votes: Table<TotalVotes>,
    pub relations: Table<ResearchDisciplineRelation>,
    pub stats: ExpertiseStats,
}

impl Ledger {
    /// Empty ledger holding only the root discipline.
    pub fn new(config: LedgerConfig) -> Result<Self, EciError> {
        config.validate()?;
        let mut disciplines = Table::new();
        disciplines
            .insert(|id| Discipline {
                id,
                name: ROOT_DISCIPLINE_NAME.to_string(),
                parent_id: None,
                total_expertise_amount: 0,
                total_active_weight: 0,
            })
            .map_err(|_| EciError::DisciplineExists(ROOT_DISCIPLINE_NAME.to_string()))?;
        let stats = ExpertiseStats::new(config.blocks_per_week);
        Ok(Self {
            config,
            disciplines,
            tokens: Table::new(),
            research: Table::new(),
            contents: Table::new(),
            reviews: Table::new(),
            review_votes: Table::new(),
            total_votes: Table::new(),
            relations: Table::new(),
            stats,
            stats_checkpoint: None,
        })
    }

    pub(crate) fn from_parts(parts: LedgerParts) -> Self {
        Self {
            config: parts.config,
            disciplines: parts.disciplines,
            tokens: parts.tokens,
            research: parts.research,
            contents: parts.contents,
            reviews: parts.reviews,
            review_votes: parts.review_votes,
            total_votes: parts.total_votes,
            relations: parts.relations,
            stats: parts.stats,
            stats_checkpoint: None,
        }
    }

    // ── Read access ──────────────────────────────────────────────────────────

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn disciplines(&self) -> &Table<Discipline> {
        &self.disciplines
    }

    pub fn expert_tokens(&self) -> &Table<ExpertToken> {
        &self.tokens
    }

    pub fn research_table(&self) -> &Table<Research> {
        &self.research
    }

    pub fn research_contents(&self) -> &Table<ResearchContent> {
        &self.contents
    }

    pub fn reviews(&self) -> &Table<Review> {
        &self.reviews
    }

    pub fn review_votes(&self) -> &Table<ReviewVote> {
        &self.review_votes
    }

    pub fn total_votes_table(&self) -> &Table<TotalVotes> {
        &self.total_votes
    }

    pub fn relations(&self) -> &Table<ResearchDisciplineRelation> {
        &self.relations
    }

    pub fn stats(&self) -> &ExpertiseStats {
        &self.stats
    }

    pub fn get_expertise_used_last_week(&self) -> i64 {
        self.stats.get_expertise_used_last_week()
    }

    // ── Undo sessions ────────────────────────────────────────────────────────

    /// Start recording undo state on every table.
    pub fn begin_session(&mut self) {
        self.disciplines.begin();
        self.tokens.begin();
        self.research.begin();
        self.contents.begin();
        self.reviews.begin();
        self.review_votes.begin();
        self.total_votes.begin();
        self.relations.begin();
        self.stats_checkpoint = Some(self.stats.checkpoint());
    }

    pub fn commit_session(&mut self) {
        self.disciplines.commit();
        self.tokens.commit();
        self.research.commit();
        self.contents.commit();
        self.reviews.commit();
        self.review_votes.commit();
        self.total_votes.commit();
        self.relations.commit();
        self.stats_checkpoint = None;
    }

    /// Undo every mutation since `begin_session`.
    pub fn rollback_session(&mut self) {
        self.disciplines.rollback();
        self.tokens.rollback();
        self.research.rollback();
        self.contents.rollback();
        self.reviews.rollback();
        self.review_votes.rollback();
        self.total_votes.rollback();
        self.relations.rollback();
        if let Some(cp) = self.stats_checkpoint.take() {
            self.stats.restore(cp);
        }
        debug!("ledger session rolled back");
    }

    // ── Blocks ───────────────────────────────────────────────────────────────

    pub fn on_block_finalized(&mut self) {
        self.stats.on_block_finalized();
    }

    // ── Determinism ──────────────────────────────────────────────────────────

    /// BLAKE3 digest (hex) over every table in id order, the stats and the
    /// config. Equal on every node that replayed the same operations.
    pub fn state_hash(&self) -> Result<String, EciError> {
        let mut hasher = blake3::Hasher::new();
        hash_value(&mut hasher, "config", &self.config)?;
        hash_table(&mut hasher, "disciplines", &self.disciplines)?;
        hash_table(&mut hasher, "expert_tokens", &self.tokens)?;
        hash_table(&mut hasher, "research", &self.research)?;
        hash_table(&mut hasher, "research_contents", &self.contents)?;
        hash_table(&mut hasher, "reviews", &self.reviews)?;
        hash_table(&mut hasher, "review_votes", &self.review_votes)?;
        hash_table(&mut hasher, "total_votes", &self.total_votes)?;
        hash_table(&mut hasher, "relations", &self.relations)?;
        hash_value(&mut hasher, "stats", &self.stats)?;
        Ok(hex::encode(hasher.finalize().as_bytes()))
    }
}

/// `current + delta` for share counters; overflow is a rejected delta.
pub(crate) fn add_share(current: Share, delta: Share) -> Result<Share, EciError> {
    current.checked_add(delta).ok_or(EciError::CounterOverflow { current, delta })
}

fn hash_value<V: Serialize>(h: &mut blake3::Hasher, tag: &str, v: &V) -> Result<(), EciError> {
    let bytes = bincode::serialize(v).map_err(|e| EciError::Serialization(e.to_string()))?;
    h.update(tag.as_bytes());
    h.update(&bytes);
    Ok(())
}

fn hash_table<T: Record + Serialize>(
    h: &mut blake3::Hasher,
    tag: &str,
    table: &Table<T>,
) -> Result<(), EciError> {
    h.update(tag.as_bytes());
    h.update(&table.next_id().to_le_bytes());
    for row in table.iter() {
        let bytes = bincode::serialize(row).map_err(|e| EciError::Serialization(e.to_string()))?;
        h.update(&bytes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertise_core::types::DisciplineId;

    #[test]
    fn new_ledger_has_root_discipline() {
        let ledger = Ledger::new(LedgerConfig::default()).unwrap();
        let root = ledger.disciplines().get(DisciplineId(0)).unwrap();
        assert_eq!(root.name, ROOT_DISCIPLINE_NAME);
        assert!(root.parent_id.is_none());
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = LedgerConfig { regeneration_seconds: 0, ..LedgerConfig::default() };
        assert!(Ledger::new(cfg).is_err());
    }

    #[test]
    fn identical_ledgers_hash_identically() {
        let a = Ledger::new(LedgerConfig::default()).unwrap();
        let b = Ledger::new(LedgerConfig::default()).unwrap();
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());

        let c = Ledger::new(LedgerConfig { blocks_per_week: 7, ..LedgerConfig::default() }).unwrap();
        assert_ne!(a.state_hash().unwrap(), c.state_hash().unwrap());
    }

    #[test]
    fn share_counters_reject_overflow() {
        assert_eq!(add_share(5, -7).unwrap(), -2);
        assert!(matches!(
            add_share(Share::MAX, 1),
            Err(EciError::CounterOverflow { current: Share::MAX, delta: 1 })
        ));
    }
}
