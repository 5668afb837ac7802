//! Chain-wide expertise usage counters.
//!
//! Fed by every charge; rolled into a weekly ring buffer once per block.

use expertise_core::error::EciError;
use expertise_core::types::{DisciplineId, Share};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::ledger::add_share;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertiseStats {
    /// Never decreases.
    pub total_used_expertise: Share,
    /// Reset to 0 at the end of every block.
    pub used_expertise_per_block: Share,
    pub used_expertise_by_discipline: BTreeMap<DisciplineId, Share>,
    /// One slot per block of the trailing week.
    last_week: Vec<Share>,
    cursor: usize,
    /// Sum of `last_week`, maintained incrementally.
    used_expertise_last_week: Share,
}

/// The per-transaction part of the stats, saved for rollback.
#[derive(Clone, Debug)]
pub(crate) struct StatsCheckpoint {
    total_used_expertise: Share,
    used_expertise_per_block: Share,
    used_expertise_by_discipline: BTreeMap<DisciplineId, Share>,
}

impl ExpertiseStats {
    pub fn new(blocks_per_week: usize) -> Self {
        Self {
            total_used_expertise: 0,
            used_expertise_per_block: 0,
            used_expertise_by_discipline: BTreeMap::new(),
            last_week: vec![0; blocks_per_week.max(1)],
            cursor: 0,
            used_expertise_last_week: 0,
        }
    }

    /// Checks that `amount` more usage fits. The total bounds every other
    /// counter, so only it is checked.
    pub fn can_charge(&self, amount: Share) -> Result<(), EciError> {
        if amount < 0 {
            return Err(EciError::InvalidDelta { current: self.total_used_expertise, delta: amount });
        }
        add_share(self.total_used_expertise, amount).map(|_| ())
    }

    pub fn on_charge(&mut self, discipline: DisciplineId, amount: Share) -> Result<(), EciError> {
        self.can_charge(amount)?;
        self.total_used_expertise += amount;
        self.used_expertise_per_block += amount;
        *self.used_expertise_by_discipline.entry(discipline).or_insert(0) += amount;
        Ok(())
    }

    /// Push this block's usage into the ring buffer and reset the block counter.
    pub fn on_block_finalized(&mut self) {
        let evicted = self.last_week[self.cursor];
        self.last_week[self.cursor] = self.used_expertise_per_block;
        self.used_expertise_last_week += self.used_expertise_per_block - evicted;
        self.cursor = (self.cursor + 1) % self.last_week.len();
        debug!(
            used = self.used_expertise_per_block,
            last_week = self.used_expertise_last_week,
            "expertise usage rolled"
        );
        self.used_expertise_per_block = 0;
    }

    pub fn get_expertise_used_last_week(&self) -> Share {
        self.used_expertise_last_week
    }

    pub fn window_len(&self) -> usize {
        self.last_week.len()
    }

    pub(crate) fn checkpoint(&self) -> StatsCheckpoint {
        StatsCheckpoint {
            total_used_expertise: self.total_used_expertise,
            used_expertise_per_block: self.used_expertise_per_block,
            used_expertise_by_discipline: self.used_expertise_by_discipline.clone(),
        }
    }

    pub(crate) fn restore(&mut self, cp: StatsCheckpoint) {
        self.total_used_expertise = cp.total_used_expertise;
        self.used_expertise_per_block = cp.used_expertise_per_block;
        self.used_expertise_by_discipline = cp.used_expertise_by_discipline;
    }
}
