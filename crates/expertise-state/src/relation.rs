//! Research-discipline relation graph.

use expertise_core::constants::ROOT_DISCIPLINE_ID;
use expertise_core::error::EciError;
use expertise_core::schema::ResearchDisciplineRelation;
use expertise_core::types::{DisciplineId, RelationId, ResearchId, Share};
use tracing::debug;

use crate::ledger::Ledger;

impl Ledger {
    /// Idempotent: returns the existing edge if there is one. A new edge also
    /// adds the discipline to the research's own discipline set.
    pub fn get_or_create_relation(
        &mut self,
        research_id: ResearchId,
        discipline_id: DisciplineId,
    ) -> Result<RelationId, EciError> {
        if let Some(rel) = self.relations.find(&(research_id, discipline_id)) {
            return Ok(rel.id);
        }
        if discipline_id == DisciplineId(ROOT_DISCIPLINE_ID) {
            return Err(EciError::RootDiscipline);
        }
        self.research(research_id)?;
        self.discipline(discipline_id)?;
        let id = self
            .relations
            .insert(|id| ResearchDisciplineRelation {
                id,
                research_id,
                discipline_id,
                research_eci: 0,
                votes_count: 0,
            })
            .map_err(|_| EciError::Storage(format!("relation {research_id}/{discipline_id} raced")))?;
        self.research.modify(research_id, |r| {
            r.disciplines.insert(discipline_id);
        });
        debug!(relation = %id, research = %research_id, discipline = %discipline_id, "relation created");
        Ok(id)
    }

    pub fn relation(
        &self,
        research_id: ResearchId,
        discipline_id: DisciplineId,
    ) -> Result<&ResearchDisciplineRelation, EciError> {
        self.relations
            .find(&(research_id, discipline_id))
            .ok_or(EciError::RelationNotFound { research: research_id, discipline: discipline_id })
    }

    /// Edges of `research_id`, in discipline order.
    pub fn relations_by_research(&self, research_id: ResearchId) -> Vec<&ResearchDisciplineRelation> {
        let lo = (research_id, DisciplineId(0));
        let hi = (research_id, DisciplineId(u64::MAX));
        self.relations.range(lo..=hi).collect()
    }

    pub fn relations_by_discipline(
        &self,
        discipline_id: DisciplineId,
    ) -> Vec<&ResearchDisciplineRelation> {
        self.relations.iter().filter(|r| r.discipline_id == discipline_id).collect()
    }

    /// Add `delta` to the edge's vote counter. Fails without touching state
    /// if the counter would go negative.
    pub fn update_votes_count(
        &mut self,
        research_id: ResearchId,
        discipline_id: DisciplineId,
        delta: Share,
    ) -> Result<Share, EciError> {
        let rel = self.relation(research_id, discipline_id)?;
        let current = rel.votes_count;
        let next = current
            .checked_add(delta)
            .filter(|v| *v >= 0)
            .ok_or(EciError::InvalidDelta { current, delta })?;
        let id = rel.id;
        self.relations.modify(id, |r| r.votes_count = next);
        Ok(next)
    }

    pub(crate) fn set_relation_eci(
        &mut self,
        research_id: ResearchId,
        discipline_id: DisciplineId,
        eci: Share,
    ) -> Result<(), EciError> {
        let id = self.relation(research_id, discipline_id)?.id;
        self.relations.modify(id, |r| r.research_eci = eci);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertise_core::config::LedgerConfig;
    use expertise_core::types::ResearchGroupId;
    use std::collections::BTreeSet;

    fn setup() -> (Ledger, ResearchId, DisciplineId, DisciplineId) {
        let mut l = Ledger::new(LedgerConfig::default()).unwrap();
        let d1 = l.create_discipline("Mathematics", DisciplineId(0)).unwrap();
        let d2 = l.create_discipline("Physics", DisciplineId(0)).unwrap();
        let r = l
            .create_research(ResearchGroupId(1), BTreeSet::from([d1]), 0)
            .unwrap();
        (l, r, d1, d2)
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let (mut l, r, d1, d2) = setup();
        let existing = l.relation(r, d1).unwrap().id;
        assert_eq!(l.get_or_create_relation(r, d1).unwrap(), existing);
        let added = l.get_or_create_relation(r, d2).unwrap();
        assert_eq!(l.get_or_create_relation(r, d2).unwrap(), added);
        assert_eq!(l.relations_by_research(r).len(), 2);
        assert!(matches!(
            l.get_or_create_relation(r, DisciplineId(99)),
            Err(EciError::DisciplineNotFound(_))
        ));
        assert!(matches!(
            l.get_or_create_relation(r, DisciplineId(0)),
            Err(EciError::RootDiscipline)
        ));
    }

    #[test]
    fn new_edge_joins_research_disciplines() {
        let (mut l, r, d1, d2) = setup();
        l.get_or_create_relation(r, d2).unwrap();
        let disciplines = &l.research(r).unwrap().disciplines;
        assert_eq!(disciplines, &BTreeSet::from([d1, d2]));
        let edges: BTreeSet<_> = l.relations_by_research(r).iter().map(|e| e.discipline_id).collect();
        assert_eq!(&edges, disciplines);
    }

    #[test]
    fn relations_listed_by_discipline() {
        let (mut l, r, d1, d2) = setup();
        let other = l.create_research(ResearchGroupId(2), BTreeSet::from([d1, d2]), 0).unwrap();
        let in_d1: Vec<_> = l.relations_by_discipline(d1).iter().map(|e| e.research_id).collect();
        assert_eq!(in_d1, [r, other]);
        let in_d2: Vec<_> = l.relations_by_discipline(d2).iter().map(|e| e.research_id).collect();
        assert_eq!(in_d2, [other]);
    }

    #[test]
    fn votes_count_never_goes_negative() {
        let (mut l, r, d1, _) = setup();
        assert_eq!(l.update_votes_count(r, d1, 3).unwrap(), 3);
        for delta in [-4, -100, Share::MIN] {
            assert!(matches!(
                l.update_votes_count(r, d1, delta),
                Err(EciError::InvalidDelta { current: 3, .. })
            ));
            assert_eq!(l.relation(r, d1).unwrap().votes_count, 3);
        }
        assert_eq!(l.update_votes_count(r, d1, -3).unwrap(), 0);
    }

    #[test]
    fn missing_edge_is_not_found() {
        let (mut l, r, _, d2) = setup();
        assert!(matches!(
            l.update_votes_count(r, d2, 1),
            Err(EciError::RelationNotFound { .. })
        ));
    }
}
