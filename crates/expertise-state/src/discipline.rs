//! Discipline registry.

use expertise_core::constants::ROOT_DISCIPLINE_ID;
use expertise_core::error::EciError;
use expertise_core::schema::Discipline;
use expertise_core::types::DisciplineId;
use tracing::info;

use crate::ledger::{add_share, Ledger};

impl Ledger {
    /// Register a discipline under `parent_id`. Ids are assigned in
    /// creation order; names are unique across the tree.
    pub fn create_discipline(
        &mut self,
        name: &str,
        parent_id: DisciplineId,
    ) -> Result<DisciplineId, EciError> {
        if name.trim().is_empty() {
            return Err(EciError::EmptyDisciplineName);
        }
        if !self.discipline_exists(parent_id) {
            return Err(EciError::DisciplineNotFound(parent_id));
        }
        let id = self
            .disciplines
            .insert(|id| Discipline {
                id,
                name: name.to_string(),
                parent_id: Some(parent_id),
                total_expertise_amount: 0,
                total_active_weight: 0,
            })
            .map_err(|_| EciError::DisciplineExists(name.to_string()))?;
        info!(discipline = %id, name, parent = %parent_id, "discipline created");
        Ok(id)
    }

    pub fn discipline(&self, id: DisciplineId) -> Result<&Discipline, EciError> {
        self.disciplines.get(id).ok_or(EciError::DisciplineNotFound(id))
    }

    pub fn discipline_by_name(&self, name: &str) -> Option<&Discipline> {
        self.disciplines.find(&name.to_string())
    }

    pub fn discipline_exists(&self, id: DisciplineId) -> bool {
        self.disciplines.get(id).is_some()
    }

    /// Direct children of `parent_id`, in id order.
    pub fn child_disciplines(&self, parent_id: DisciplineId) -> Vec<&Discipline> {
        self.disciplines
            .iter()
            .filter(|d| d.parent_id == Some(parent_id))
            .collect()
    }

    /// Ancestors of `id`, nearest first, excluding the root.
    pub(crate) fn discipline_ancestors(&self, id: DisciplineId) -> Result<Vec<DisciplineId>, EciError> {
        let mut out = Vec::new();
        let mut current = self.discipline(id)?.parent_id;
        while let Some(parent) = current {
            if parent == DisciplineId(ROOT_DISCIPLINE_ID) {
                break;
            }
            out.push(parent);
            current = self.discipline(parent)?.parent_id;
        }
        Ok(out)
    }

    pub(crate) fn add_discipline_expertise(
        &mut self,
        id: DisciplineId,
        amount: i64,
    ) -> Result<(), EciError> {
        let total = add_share(self.discipline(id)?.total_expertise_amount, amount)?;
        self.disciplines.modify(id, |d| d.total_expertise_amount = total);
        Ok(())
    }

    pub(crate) fn add_discipline_active_weight(
        &mut self,
        id: DisciplineId,
        weight: i64,
    ) -> Result<(), EciError> {
        let total = add_share(self.discipline(id)?.total_active_weight, weight)?;
        self.disciplines.modify(id, |d| d.total_active_weight = total);
        Ok(())
    }
}
