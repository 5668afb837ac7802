//! Research and research content store.

use std::collections::{BTreeMap, BTreeSet};

use expertise_core::constants::{PERCENT_100, ROOT_DISCIPLINE_ID};
use expertise_core::error::EciError;
use expertise_core::history::{ContributionType, VirtualOperation};
use expertise_core::schema::{Research, ResearchContent, ResearchContentType};
use expertise_core::types::{
    AccountName, DisciplineId, ResearchContentId, ResearchGroupId, ResearchId, Timestamp,
};
use tracing::info;

use crate::eci::EciTrigger;
use crate::ledger::Ledger;
use crate::sink::EventSink;

impl Ledger {
    // ── Research ─────────────────────────────────────────────────────────────

    /// Create a research and bind it to each of `disciplines`.
    pub fn create_research(
        &mut self,
        research_group_id: ResearchGroupId,
        disciplines: BTreeSet<DisciplineId>,
        now: Timestamp,
    ) -> Result<ResearchId, EciError> {
        if disciplines.is_empty() {
            return Err(EciError::NoDisciplines);
        }
        for &d in &disciplines {
            if d == DisciplineId(ROOT_DISCIPLINE_ID) {
                return Err(EciError::RootDiscipline);
            }
            self.discipline(d)?;
        }
        let id = self
            .research
            .insert(|id| Research {
                id,
                research_group_id,
                disciplines: disciplines.clone(),
                eci_per_discipline: BTreeMap::new(),
                owned_tokens: PERCENT_100,
                is_finished: false,
                created_at: now,
                number_of_positive_reviews: 0,
                number_of_negative_reviews: 0,
            })
            .map_err(|_| EciError::Storage("research id reused".into()))?;
        for &d in &disciplines {
            self.get_or_create_relation(id, d)?;
        }
        info!(research = %id, group = %research_group_id, disciplines = disciplines.len(), "research created");
        Ok(id)
    }

    pub fn research(&self, id: ResearchId) -> Result<&Research, EciError> {
        self.research.get(id).ok_or(EciError::ResearchNotFound(id))
    }

    // ── Content ──────────────────────────────────────────────────────────────

    /// Publish a content item. References must point at existing contents;
    /// each one is reported to the sink. A final result closes the research.
    pub fn create_research_content(
        &mut self,
        research_id: ResearchId,
        content_type: ResearchContentType,
        authors: BTreeSet<AccountName>,
        references: BTreeSet<ResearchContentId>,
        now: Timestamp,
        sink: &mut dyn EventSink,
    ) -> Result<ResearchContentId, EciError> {
        if self.research(research_id)?.is_finished {
            return Err(EciError::ResearchFinished(research_id));
        }
        if authors.is_empty() {
            return Err(EciError::NoAuthors);
        }
        let mut cited = Vec::with_capacity(references.len());
        for &r in &references {
            cited.push((r, self.research_content(r)?.research_id));
        }

        let window = self.config.content_activity_window_seconds;
        let id = self
            .contents
            .insert(|id| ResearchContent {
                id,
                research_id,
                content_type,
                authors,
                references,
                eci_per_discipline: BTreeMap::new(),
                activity_round: 1,
                activity_window_start: now,
                activity_window_end: now + window,
                created_at: now,
            })
            .map_err(|_| EciError::Storage("research content id reused".into()))?;

        for (reference_research_content_id, reference_research_id) in cited {
            sink.record(VirtualOperation::ResearchContentReferenceHistory {
                research_content_id: id,
                research_id,
                reference_research_content_id,
                reference_research_id,
            });
        }
        if content_type.is_final_result() {
            self.research.modify(research_id, |r| r.is_finished = true);
        }
        info!(content = %id, research = %research_id, ?content_type, "research content created");

        let trigger = EciTrigger {
            contribution_type: ContributionType::Publication,
            contribution_id: id.as_u64(),
            assessment_criteria: BTreeMap::new(),
            timestamp: now,
            account: None,
        };
        self.update_content_and_research_eci(id, &trigger, sink)?;
        Ok(id)
    }

    pub fn research_content(&self, id: ResearchContentId) -> Result<&ResearchContent, EciError> {
        self.contents.get(id).ok_or(EciError::ResearchContentNotFound(id))
    }

    /// Contents of `research_id`, in publication order.
    pub fn research_contents_by_research(&self, research_id: ResearchId) -> Vec<&ResearchContent> {
        let lo = (research_id, ResearchContentId(0));
        let hi = (research_id, ResearchContentId(u64::MAX));
        self.contents.range(lo..=hi).collect()
    }
}
