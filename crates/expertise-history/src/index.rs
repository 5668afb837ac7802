use std::collections::{BTreeMap, BTreeSet};

use expertise_core::history::{EciDiff, VirtualOperation};
use expertise_core::types::{AccountName, DisciplineId, ResearchContentId, ResearchId};
use expertise_state::sink::EventSink;
use tracing::trace;

/// In-memory history store fed by virtual operations.
#[derive(Clone, Debug, Default)]
pub struct EciHistoryIndex {
    pub(crate) content_history: BTreeMap<(ResearchContentId, DisciplineId), Vec<EciDiff>>,
    pub(crate) research_history: BTreeMap<(ResearchId, DisciplineId), Vec<EciDiff>>,
    pub(crate) account_history: BTreeMap<(AccountName, DisciplineId), Vec<EciDiff>>,
    /// citing content → cited contents
    pub(crate) references: BTreeMap<ResearchContentId, BTreeSet<ResearchContentId>>,
    /// cited content → citing contents
    pub(crate) cited_by: BTreeMap<ResearchContentId, BTreeSet<ResearchContentId>>,
    pub(crate) content_research: BTreeMap<ResearchContentId, ResearchId>,
    recorded: u64,
}

impl EciHistoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations indexed so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }
}

impl EventSink for EciHistoryIndex {
    fn record(&mut self, op: VirtualOperation) {
        trace!(op = op.name(), "indexing virtual operation");
        self.recorded += 1;
        match op {
            VirtualOperation::ResearchContentEciHistory { research_content_id, discipline_id, diff } => {
                self.content_history
                    .entry((research_content_id, discipline_id))
                    .or_default()
                    .push(diff);
            }
            VirtualOperation::ResearchEciHistory { research_id, discipline_id, diff } => {
                self.research_history.entry((research_id, discipline_id)).or_default().push(diff);
            }
            VirtualOperation::ResearchContentReferenceHistory {
                research_content_id,
                research_id,
                reference_research_content_id,
                reference_research_id,
            } => {
                self.references
                    .entry(research_content_id)
                    .or_default()
                    .insert(reference_research_content_id);
                self.cited_by
                    .entry(reference_research_content_id)
                    .or_default()
                    .insert(research_content_id);
                self.content_research.insert(research_content_id, research_id);
                self.content_research.insert(reference_research_content_id, reference_research_id);
            }
            VirtualOperation::AccountEciHistory { account, discipline_id, diff } => {
                self.account_history.entry((account, discipline_id)).or_default().push(diff);
            }
        }
    }
}
