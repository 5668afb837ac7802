//! ECI evaluator.
//!
//! Content ECI in a discipline is the curve value of the content's
//! accumulated review-vote weight against the discipline's total expertise.
//! Research ECI is the sum of its contents' ECI per discipline. Both are
//! recomputed from `TotalVotes` alone, so re-running an evaluation on
//! unchanged state reproduces the stored values exactly.

use std::collections::BTreeMap;

use expertise_core::curve;
use expertise_core::error::EciError;
use expertise_core::history::{ContributionType, EciDiff, VirtualOperation};
use expertise_core::types::{
    AccountName, DisciplineId, ResearchContentId, ResearchId, Share, Timestamp,
};
use tracing::debug;

use crate::ledger::Ledger;
use crate::sink::EventSink;

/// An entity that carries per-discipline ECI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EciEntity {
    ResearchContent(ResearchContentId),
    Research(ResearchId),
}

/// What caused an evaluation; copied into every emitted diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EciTrigger {
    pub contribution_type: ContributionType,
    pub contribution_id: u64,
    pub assessment_criteria: BTreeMap<u16, u16>,
    pub timestamp: Timestamp,
    /// Reviewer or voter behind the change. Content diffs are repeated into
    /// this account's history.
    pub account: Option<AccountName>,
}

/// A stored ECI value that no longer matches a fresh evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EciMismatch {
    pub entity: EciEntity,
    pub discipline_id: DisciplineId,
    pub stored: Share,
    pub evaluated: Share,
}

impl Ledger {
    // ── Pure evaluation ──────────────────────────────────────────────────────

    pub fn content_eci_evaluation(
        &self,
        content_id: ResearchContentId,
    ) -> Result<BTreeMap<DisciplineId, Share>, EciError> {
        let content = self.research_content(content_id)?;
        let mut out = BTreeMap::new();
        for rel in self.relations_by_research(content.research_id) {
            let d = rel.discipline_id;
            let weight = self
                .total_votes
                .find(&(content_id, d))
                .map(|tv| tv.total_weight)
                .unwrap_or(0);
            let expertise = self.discipline(d)?.total_expertise_amount;
            out.insert(
                d,
                curve::eci(weight, expertise, self.config.eci_scale, self.config.eci_expertise_factor),
            );
        }
        Ok(out)
    }

    pub fn research_eci_evaluation(
        &self,
        research_id: ResearchId,
    ) -> Result<BTreeMap<DisciplineId, Share>, EciError> {
        let mut out: BTreeMap<DisciplineId, Share> = self
            .relations_by_research(research_id)
            .iter()
            .map(|rel| (rel.discipline_id, 0))
            .collect();
        for content in self.research_contents_by_research(research_id) {
            for (d, eci) in self.content_eci_evaluation(content.id)? {
                *out.entry(d).or_insert(0) += eci;
            }
        }
        Ok(out)
    }

    pub fn eci_evaluation(&self, entity: EciEntity) -> Result<BTreeMap<DisciplineId, Share>, EciError> {
        match entity {
            EciEntity::ResearchContent(id) => self.content_eci_evaluation(id),
            EciEntity::Research(id) => self.research_eci_evaluation(id),
        }
    }

    /// Stored per-discipline ECI of `entity`.
    pub fn stored_eci(&self, entity: EciEntity) -> Result<&BTreeMap<DisciplineId, Share>, EciError> {
        match entity {
            EciEntity::ResearchContent(id) => Ok(&self.research_content(id)?.eci_per_discipline),
            EciEntity::Research(id) => Ok(&self.research(id)?.eci_per_discipline),
        }
    }

    // ── Update ───────────────────────────────────────────────────────────────

    /// Recompute `entity`, store the result and emit one diff per discipline.
    pub fn update_eci_evaluation(
        &mut self,
        entity: EciEntity,
        trigger: &EciTrigger,
        sink: &mut dyn EventSink,
    ) -> Result<(), EciError> {
        let evaluated = self.eci_evaluation(entity)?;
        let previous = self.stored_eci(entity)?.clone();

        match entity {
            EciEntity::ResearchContent(id) => {
                self.contents.modify(id, |c| c.eci_per_discipline = evaluated.clone());
            }
            EciEntity::Research(id) => {
                self.research.modify(id, |r| r.eci_per_discipline = evaluated.clone());
                for (&d, &eci) in &evaluated {
                    self.set_relation_eci(id, d, eci)?;
                }
            }
        }

        for (&discipline_id, &new_value) in &evaluated {
            let diff = EciDiff {
                previous_value: previous.get(&discipline_id).copied().unwrap_or(0),
                new_value,
                timestamp: trigger.timestamp,
                contribution_type: trigger.contribution_type,
                contribution_id: trigger.contribution_id,
                assessment_criteria: trigger.assessment_criteria.clone(),
            };
            debug!(
                ?entity,
                discipline = %discipline_id,
                previous = diff.previous_value,
                new = diff.new_value,
                "eci updated"
            );
            match entity {
                EciEntity::ResearchContent(research_content_id) => {
                    let credited = trigger.account.as_ref().map(|account| {
                        VirtualOperation::AccountEciHistory {
                            account: account.clone(),
                            discipline_id,
                            diff: diff.clone(),
                        }
                    });
                    sink.record(VirtualOperation::ResearchContentEciHistory {
                        research_content_id,
                        discipline_id,
                        diff,
                    });
                    if let Some(op) = credited {
                        sink.record(op);
                    }
                }
                EciEntity::Research(research_id) => {
                    sink.record(VirtualOperation::ResearchEciHistory { research_id, discipline_id, diff });
                }
            }
        }
        Ok(())
    }

    /// Re-evaluate a content and then its research.
    pub(crate) fn update_content_and_research_eci(
        &mut self,
        content_id: ResearchContentId,
        trigger: &EciTrigger,
        sink: &mut dyn EventSink,
    ) -> Result<(), EciError> {
        let research_id = self.research_content(content_id)?.research_id;
        self.update_eci_evaluation(EciEntity::ResearchContent(content_id), trigger, sink)?;
        self.update_eci_evaluation(EciEntity::Research(research_id), trigger, sink)
    }

    // ── Audit ────────────────────────────────────────────────────────────────

    /// Every stored value that differs from a fresh evaluation. Values go
    /// stale when a discipline's total expertise grows after the last
    /// evaluation of an entity; anything else is corruption.
    pub fn audit_eci(&self) -> Result<Vec<EciMismatch>, EciError> {
        let mut entities: Vec<EciEntity> =
            self.contents.iter().map(|c| EciEntity::ResearchContent(c.id)).collect();
        entities.extend(self.research.iter().map(|r| EciEntity::Research(r.id)));

        let mut out = Vec::new();
        for entity in entities {
            let stored = self.stored_eci(entity)?;
            for (&discipline_id, &evaluated) in &self.eci_evaluation(entity)? {
                let stored = stored.get(&discipline_id).copied().unwrap_or(0);
                if stored != evaluated {
                    out.push(EciMismatch { entity, discipline_id, stored, evaluated });
                }
            }
        }
        Ok(out)
    }

    /// Sum of review-vote weights on `content_id` in `discipline_id`,
    /// recounted from the votes themselves.
    pub fn recount_vote_weight(&self, content_id: ResearchContentId, discipline_id: DisciplineId) -> Share {
        self.reviews_by_content(content_id)
            .into_iter()
            .flat_map(|review| self.review_votes_by_review(review.id))
            .filter(|v| v.discipline_id == discipline_id)
            .map(|v| v.weight)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertise_core::config::LedgerConfig;
    use expertise_core::constants::ECI_SCALE;
    use expertise_core::schema::{ResearchContentType, TotalVotes};
    use expertise_core::types::{AccountName, ResearchGroupId};
    use std::collections::BTreeSet;

    struct Fixture {
        ledger: Ledger,
        d1: DisciplineId,
        d2: DisciplineId,
        research: ResearchId,
        c1: ResearchContentId,
        c2: ResearchContentId,
    }

    fn fixture() -> Fixture {
        let mut ledger = Ledger::new(LedgerConfig::default()).unwrap();
        let mut sink: Vec<VirtualOperation> = Vec::new();
        let d1 = ledger.create_discipline("Mathematics", DisciplineId(0)).unwrap();
        let d2 = ledger.create_discipline("Physics", DisciplineId(0)).unwrap();
        ledger.create_expert_token(&"john".into(), d1, 1_000, 0).unwrap();
        ledger.create_expert_token(&"john".into(), d2, 3_000, 0).unwrap();
        let research = ledger
            .create_research(ResearchGroupId(1), BTreeSet::from([d1, d2]), 0)
            .unwrap();
        let authors = BTreeSet::from([AccountName::from("mary")]);
        let c1 = ledger
            .create_research_content(
                research,
                ResearchContentType::MilestoneArticle,
                authors.clone(),
                BTreeSet::new(),
                0,
                &mut sink,
            )
            .unwrap();
        let c2 = ledger
            .create_research_content(
                research,
                ResearchContentType::MilestoneCode,
                authors,
                BTreeSet::new(),
                0,
                &mut sink,
            )
            .unwrap();
        Fixture { ledger, d1, d2, research, c1, c2 }
    }

    fn set_total(l: &mut Ledger, f: (ResearchId, ResearchContentId, DisciplineId), w: Share) {
        let (research_id, research_content_id, discipline_id) = f;
        l.total_votes
            .insert(|id| TotalVotes { id, research_id, research_content_id, discipline_id, total_weight: w })
            .unwrap();
    }

    fn trigger() -> EciTrigger {
        EciTrigger {
            contribution_type: ContributionType::ReviewSupport,
            contribution_id: 7,
            assessment_criteria: BTreeMap::new(),
            timestamp: 99,
            account: None,
        }
    }

    #[test]
    fn content_eci_follows_curve() {
        let mut f = fixture();
        set_total(&mut f.ledger, (f.research, f.c1, f.d1), 2_000);
        let eci = f.ledger.content_eci_evaluation(f.c1).unwrap();
        // 1e6 * 2000 / (2000 + 2 * 1000)
        assert_eq!(eci[&f.d1], ECI_SCALE / 2);
        assert_eq!(eci[&f.d2], 0);
    }

    #[test]
    fn research_eci_is_sum_of_contents() {
        let mut f = fixture();
        set_total(&mut f.ledger, (f.research, f.c1, f.d1), 2_000);
        set_total(&mut f.ledger, (f.research, f.c2, f.d1), 6_000);
        let c1 = f.ledger.content_eci_evaluation(f.c1).unwrap()[&f.d1];
        let c2 = f.ledger.content_eci_evaluation(f.c2).unwrap()[&f.d1];
        let r = f.ledger.research_eci_evaluation(f.research).unwrap();
        assert_eq!(r[&f.d1], c1 + c2);
        assert_eq!(r[&f.d2], 0);
    }

    #[test]
    fn update_emits_diffs_and_is_idempotent() {
        let mut f = fixture();
        set_total(&mut f.ledger, (f.research, f.c1, f.d1), 2_000);
        let mut sink: Vec<VirtualOperation> = Vec::new();
        f.ledger.update_content_and_research_eci(f.c1, &trigger(), &mut sink).unwrap();

        // Two content diffs then two research diffs, one per discipline.
        assert_eq!(sink.len(), 4);
        match &sink[0] {
            VirtualOperation::ResearchContentEciHistory { research_content_id, discipline_id, diff } => {
                assert_eq!(*research_content_id, f.c1);
                assert_eq!(*discipline_id, f.d1);
                assert_eq!(diff.previous_value, 0);
                assert_eq!(diff.new_value, ECI_SCALE / 2);
                assert_eq!(diff.contribution_id, 7);
                assert_eq!(diff.timestamp, 99);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.ledger.relation(f.research, f.d1).unwrap().research_eci, ECI_SCALE / 2);

        let before = f.ledger.state_hash().unwrap();
        sink.clear();
        f.ledger.update_content_and_research_eci(f.c1, &trigger(), &mut sink).unwrap();
        assert_eq!(f.ledger.state_hash().unwrap(), before);
        assert!(sink.iter().all(|op| match op {
            VirtualOperation::ResearchContentEciHistory { diff, .. }
            | VirtualOperation::ResearchEciHistory { diff, .. } => diff.diff() == 0,
            VirtualOperation::ResearchContentReferenceHistory { .. }
            | VirtualOperation::AccountEciHistory { .. } => false,
        }));
        assert!(f.ledger.audit_eci().unwrap().is_empty());
    }

    #[test]
    fn audit_reports_values_left_stale_by_new_expertise() {
        let mut f = fixture();
        set_total(&mut f.ledger, (f.research, f.c1, f.d1), 2_000);
        let mut sink: Vec<VirtualOperation> = Vec::new();
        f.ledger.update_content_and_research_eci(f.c1, &trigger(), &mut sink).unwrap();

        f.ledger.grant_expertise(&"mary".into(), f.d1, 1_000, 5).unwrap();
        let stale = f.ledger.audit_eci().unwrap();
        assert!(stale
            .iter()
            .any(|m| m.entity == EciEntity::ResearchContent(f.c1) && m.discipline_id == f.d1));
    }
}
