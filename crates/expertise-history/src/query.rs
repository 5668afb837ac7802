use std::collections::BTreeMap;

use expertise_core::history::{ContributionType, EciDiff};
use expertise_core::types::{
    AccountName, DisciplineId, ResearchContentId, ResearchId, Share, Timestamp,
};
use expertise_state::eci::EciEntity;
use serde::Serialize;

use crate::index::EciHistoryIndex;

/// Optional constraints on history records. Empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EciHistoryFilter {
    pub contribution_type: Option<ContributionType>,
    /// Keep only diffs that carry a score for this criteria id.
    pub assessment_criteria: Option<u16>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl EciHistoryFilter {
    pub fn matches(&self, diff: &EciDiff) -> bool {
        self.contribution_type.map_or(true, |t| t == diff.contribution_type)
            && self
                .assessment_criteria
                .map_or(true, |c| diff.assessment_criteria.contains_key(&c))
            && self.from.map_or(true, |from| diff.timestamp >= from)
            && self.to.map_or(true, |to| diff.timestamp <= to)
    }
}

/// Aggregate view over one entity's history in one discipline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EciSummary {
    pub current: Share,
    pub changes: usize,
    pub increases: usize,
    pub decreases: usize,
    pub net_change: Share,
    pub first_at: Timestamp,
    pub last_at: Timestamp,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DisciplineEciStats {
    /// Sum of the latest ECI of every research with history here.
    pub total_research_eci: Share,
    pub research_count: usize,
    pub contributions: usize,
}

/// Query helpers over an `EciHistoryIndex`.
pub struct EciHistoryQuery<'a> {
    index: &'a EciHistoryIndex,
}

impl<'a> EciHistoryQuery<'a> {
    pub fn new(index: &'a EciHistoryIndex) -> Self {
        Self { index }
    }

    pub fn content_history(
        &self,
        content_id: ResearchContentId,
        discipline_id: DisciplineId,
        filter: &EciHistoryFilter,
    ) -> Vec<&'a EciDiff> {
        self.index
            .content_history
            .get(&(content_id, discipline_id))
            .map(|diffs| diffs.iter().filter(|d| filter.matches(d)).collect())
            .unwrap_or_default()
    }

    pub fn research_history(
        &self,
        research_id: ResearchId,
        discipline_id: DisciplineId,
        filter: &EciHistoryFilter,
    ) -> Vec<&'a EciDiff> {
        self.index
            .research_history
            .get(&(research_id, discipline_id))
            .map(|diffs| diffs.iter().filter(|d| filter.matches(d)).collect())
            .unwrap_or_default()
    }

    /// ECI changes credited to `account` in `discipline_id`, oldest first.
    pub fn account_history(
        &self,
        account: &AccountName,
        discipline_id: DisciplineId,
        filter: &EciHistoryFilter,
    ) -> Vec<&'a EciDiff> {
        self.index
            .account_history
            .get(&(account.clone(), discipline_id))
            .map(|diffs| diffs.iter().filter(|d| filter.matches(d)).collect())
            .unwrap_or_default()
    }

    /// Disciplines in which `account` has any credited history.
    pub fn account_disciplines(&self, account: &AccountName) -> Vec<DisciplineId> {
        let lo = (account.clone(), DisciplineId(0));
        let hi = (account.clone(), DisciplineId(u64::MAX));
        self.index.account_history.range(lo..=hi).map(|((_, d), _)| *d).collect()
    }

    /// Net ECI movement `account` caused in `discipline_id`.
    pub fn account_net_change(&self, account: &AccountName, discipline_id: DisciplineId) -> Share {
        self.account_history(account, discipline_id, &EciHistoryFilter::default())
            .iter()
            .map(|d| d.diff())
            .sum()
    }

    /// Contents cited by `content_id`.
    pub fn references_of(&self, content_id: ResearchContentId) -> Vec<ResearchContentId> {
        self.index
            .references
            .get(&content_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Contents citing `content_id`.
    pub fn cited_by(&self, content_id: ResearchContentId) -> Vec<ResearchContentId> {
        self.index
            .cited_by
            .get(&content_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Research of a content seen in a citation, if any.
    pub fn research_of(&self, content_id: ResearchContentId) -> Option<ResearchId> {
        self.index.content_research.get(&content_id).copied()
    }

    pub fn summary(&self, entity: EciEntity, discipline_id: DisciplineId) -> Option<EciSummary> {
        let all = EciHistoryFilter::default();
        let diffs = match entity {
            EciEntity::ResearchContent(id) => self.content_history(id, discipline_id, &all),
            EciEntity::Research(id) => self.research_history(id, discipline_id, &all),
        };
        let (first, last) = (diffs.first()?, diffs.last()?);
        Some(EciSummary {
            current: last.new_value,
            changes: diffs.len(),
            increases: diffs.iter().filter(|d| d.is_increased()).count(),
            decreases: diffs.iter().filter(|d| d.diff() < 0).count(),
            net_change: last.new_value - first.previous_value,
            first_at: first.timestamp,
            last_at: last.timestamp,
        })
    }

    pub fn discipline_stats(&self) -> BTreeMap<DisciplineId, DisciplineEciStats> {
        let mut out: BTreeMap<DisciplineId, DisciplineEciStats> = BTreeMap::new();
        for ((_, discipline_id), diffs) in &self.index.research_history {
            let stats = out.entry(*discipline_id).or_default();
            stats.research_count += 1;
            stats.contributions += diffs.len();
            stats.total_research_eci += diffs.last().map_or(0, |d| d.new_value);
        }
        out
    }

    /// One-line description of an entity's ECI in a discipline.
    pub fn describe(&self, entity: EciEntity, discipline_id: DisciplineId) -> String {
        let label = match entity {
            EciEntity::ResearchContent(id) => id.to_string(),
            EciEntity::Research(id) => id.to_string(),
        };
        match self.summary(entity, discipline_id) {
            Some(s) => format!(
                "{label} | {discipline_id} | eci {} | {} changes ({} up, {} down) | net {:+} | {}..{}",
                s.current, s.changes, s.increases, s.decreases, s.net_change, s.first_at, s.last_at
            ),
            None => format!("{label} | {discipline_id} | no history"),
        }
    }
}
