//! ECI change records and the virtual operations that carry them.
//!
//! Virtual operations are emitted once and consumed by history indexers;
//! nothing in the ledger reads them back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AccountName, DisciplineId, ResearchContentId, ResearchId, Share, Timestamp};

/// What caused an ECI recomputation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Publication,
    Review,
    ReviewSupport,
}

/// One ECI transition of one entity in one discipline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EciDiff {
    pub previous_value: Share,
    pub new_value: Share,
    pub timestamp: Timestamp,
    pub contribution_type: ContributionType,
    /// Id of the review, vote or content that triggered the change.
    pub contribution_id: u64,
    pub assessment_criteria: BTreeMap<u16, u16>,
}

impl EciDiff {
    pub fn diff(&self) -> Share {
        self.new_value - self.previous_value
    }

    pub fn is_increased(&self) -> bool {
        self.new_value > self.previous_value
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VirtualOperation {
    ResearchContentEciHistory {
        research_content_id: ResearchContentId,
        discipline_id: DisciplineId,
        diff: EciDiff,
    },
    ResearchEciHistory {
        research_id: ResearchId,
        discipline_id: DisciplineId,
        diff: EciDiff,
    },
    ResearchContentReferenceHistory {
        research_content_id: ResearchContentId,
        research_id: ResearchId,
        reference_research_content_id: ResearchContentId,
        reference_research_id: ResearchId,
    },
    /// A content ECI change credited to the reviewer or voter behind it.
    AccountEciHistory {
        account: AccountName,
        discipline_id: DisciplineId,
        diff: EciDiff,
    },
}

impl VirtualOperation {
    pub fn name(&self) -> &'static str {
        match self {
            VirtualOperation::ResearchContentEciHistory { .. } => {
                "research_content_eci_history_operation"
            }
            VirtualOperation::ResearchEciHistory { .. } => "research_eci_history_operation",
            VirtualOperation::ResearchContentReferenceHistory { .. } => {
                "research_content_reference_history_operation"
            }
            VirtualOperation::AccountEciHistory { .. } => "account_eci_history_operation",
        }
    }
}
