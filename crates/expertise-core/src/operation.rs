use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::schema::ResearchContentType;
use crate::types::{
    AccountName, DisciplineId, ResearchContentId, ResearchGroupId, ResearchId, ReviewId, Share,
};

/// Every state change the expertise subsystem accepts is one of these.
///
/// Operations arrive already ordered and authorized; `weight` fields are
/// basis points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    // ── Registry ─────────────────────────────────────────────────────────────
    CreateDiscipline {
        name: String,
        parent_id: DisciplineId,
    },

    // ── Expert tokens ────────────────────────────────────────────────────────
    /// Mint a new token; fails if the pair already has one.
    CreateExpertToken {
        account: AccountName,
        discipline_id: DisciplineId,
        amount: Share,
    },

    /// Mint into an existing token, creating it (and ancestors) if needed.
    GrantExpertise {
        account: AccountName,
        discipline_id: DisciplineId,
        amount: Share,
    },

    DelegateExpertise {
        sender: AccountName,
        receiver: AccountName,
        discipline_id: DisciplineId,
    },

    RevokeExpertiseDelegation {
        sender: AccountName,
        discipline_id: DisciplineId,
    },

    // ── Research ─────────────────────────────────────────────────────────────
    CreateResearch {
        research_group_id: ResearchGroupId,
        disciplines: BTreeSet<DisciplineId>,
    },

    CreateResearchContent {
        research_id: ResearchId,
        content_type: ResearchContentType,
        authors: BTreeSet<AccountName>,
        #[serde(default)]
        references: BTreeSet<ResearchContentId>,
    },

    // ── Reviews ──────────────────────────────────────────────────────────────
    CreateReview {
        author: AccountName,
        research_content_id: ResearchContentId,
        is_positive: bool,
        content: String,
        weight: i16,
        /// `(criteria id, score)` pairs; a repeated id keeps the last score.
        #[serde(default)]
        assessment_criteria: Vec<(u16, u16)>,
    },

    VoteForReview {
        voter: AccountName,
        review_id: ReviewId,
        discipline_id: DisciplineId,
        weight: i16,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateDiscipline { .. } => "create_discipline",
            Operation::CreateExpertToken { .. } => "create_expert_token",
            Operation::GrantExpertise { .. } => "grant_expertise",
            Operation::DelegateExpertise { .. } => "delegate_expertise",
            Operation::RevokeExpertiseDelegation { .. } => "revoke_expertise_delegation",
            Operation::CreateResearch { .. } => "create_research",
            Operation::CreateResearchContent { .. } => "create_research_content",
            Operation::CreateReview { .. } => "create_review",
            Operation::VoteForReview { .. } => "vote_for_review",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_parses_from_json() {
        let op: Operation = serde_json::from_str(
            r#"{"type":"vote_for_review","voter":"alice","review_id":3,"discipline_id":1,"weight":-5000}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            Operation::VoteForReview {
                voter: "alice".into(),
                review_id: ReviewId(3),
                discipline_id: DisciplineId(1),
                weight: -5000,
            }
        );
        assert_eq!(op.name(), "vote_for_review");
    }

    #[test]
    fn review_defaults_empty_criteria() {
        let op: Operation = serde_json::from_str(
            r#"{"type":"create_review","author":"john","research_content_id":1,
                "is_positive":true,"content":"solid","weight":10000}"#,
        )
        .unwrap();
        match op {
            Operation::CreateReview { assessment_criteria, .. } => {
                assert!(assessment_criteria.is_empty())
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn review_criteria_parse_as_pairs() {
        let op: Operation = serde_json::from_str(
            r#"{"type":"create_review","author":"john","research_content_id":1,
                "is_positive":false,"content":"weak","weight":500,
                "assessment_criteria":[[1,2],[3,4]]}"#,
        )
        .unwrap();
        match op {
            Operation::CreateReview { assessment_criteria, .. } => {
                assert_eq!(assessment_criteria, vec![(1, 2), (3, 4)])
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
