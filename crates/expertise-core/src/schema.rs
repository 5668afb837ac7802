//! Chain objects owned by the expertise subsystem.
//!
//! Every object carries its own arena id. Composite uniqueness keys
//! (e.g. account + discipline) are enforced by the storage layer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{MAX_PROXY_DEPTH, PERCENT_100};
use crate::types::{
    AccountName, DisciplineId, ExpertTokenId, Percent, RelationId, ResearchContentId,
    ResearchGroupId, ResearchId, ReviewId, ReviewVoteId, Share, Timestamp, TotalVotesId,
};

// ── Discipline ────────────────────────────────────────────────────────────────

/// A node of the static topic tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discipline {
    pub id: DisciplineId,
    pub name: String,
    /// `None` only for the root discipline.
    pub parent_id: Option<DisciplineId>,
    /// Sum of every expert token amount ever minted in this discipline.
    pub total_expertise_amount: Share,
    /// Running sum of review vote weights cast in this discipline.
    pub total_active_weight: Share,
}

// ── ExpertToken ───────────────────────────────────────────────────────────────

/// An account's reputation in one discipline plus its voting-power gauge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertToken {
    pub id: ExpertTokenId,
    pub account: AccountName,
    pub discipline_id: DisciplineId,
    pub amount: Share,
    /// Falls on every charge, regenerates linearly with time. 0..=10000.
    pub voting_power: Percent,
    pub last_vote_time: Timestamp,
    /// Account this token's expertise is delegated to, if any.
    pub proxy: Option<AccountName>,
    /// Expertise delegated to this token, by delegation depth.
    pub proxied_expertise: [Share; MAX_PROXY_DEPTH],
}

impl ExpertToken {
    pub fn new(
        id: ExpertTokenId,
        account: AccountName,
        discipline_id: DisciplineId,
        amount: Share,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            account,
            discipline_id,
            amount,
            voting_power: PERCENT_100,
            last_vote_time: now,
            proxy: None,
            proxied_expertise: [0; MAX_PROXY_DEPTH],
        }
    }

    pub fn is_delegating(&self) -> bool {
        self.proxy.is_some()
    }

    pub fn total_proxied(&self) -> Share {
        self.proxied_expertise.iter().fold(0, |acc: Share, v| acc.saturating_add(*v))
    }

    /// Amount that backs this token's reviews and votes. A delegating token
    /// has handed its weight to the proxy and votes with nothing.
    pub fn effective_amount(&self) -> Share {
        if self.is_delegating() {
            0
        } else {
            self.amount.saturating_add(self.total_proxied())
        }
    }
}

// ── Research ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Research {
    pub id: ResearchId,
    pub research_group_id: ResearchGroupId,
    pub disciplines: BTreeSet<DisciplineId>,
    /// Written only by the ECI evaluator.
    pub eci_per_discipline: BTreeMap<DisciplineId, Share>,
    /// Share of research tokens still held by the owning group.
    pub owned_tokens: Percent,
    pub is_finished: bool,
    pub created_at: Timestamp,
    pub number_of_positive_reviews: u32,
    pub number_of_negative_reviews: u32,
}

// ── ResearchContent ───────────────────────────────────────────────────────────

/// Kind of a published research artefact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchContentType {
    Announcement,
    FinalResult,
    MilestoneArticle,
    MilestoneBook,
    MilestoneCode,
    MilestoneData,
    MilestonePatent,
    MilestonePreprint,
    MilestoneTechnicalReport,
    MilestoneThesis,
}

impl ResearchContentType {
    /// A final result closes its research to further publications.
    pub fn is_final_result(self) -> bool {
        match self {
            ResearchContentType::FinalResult => true,
            ResearchContentType::Announcement
            | ResearchContentType::MilestoneArticle
            | ResearchContentType::MilestoneBook
            | ResearchContentType::MilestoneCode
            | ResearchContentType::MilestoneData
            | ResearchContentType::MilestonePatent
            | ResearchContentType::MilestonePreprint
            | ResearchContentType::MilestoneTechnicalReport
            | ResearchContentType::MilestoneThesis => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchContent {
    pub id: ResearchContentId,
    pub research_id: ResearchId,
    pub content_type: ResearchContentType,
    pub authors: BTreeSet<AccountName>,
    pub references: BTreeSet<ResearchContentId>,
    /// Written only by the ECI evaluator.
    pub eci_per_discipline: BTreeMap<DisciplineId, Share>,
    pub activity_round: u16,
    pub activity_window_start: Timestamp,
    pub activity_window_end: Timestamp,
    pub created_at: Timestamp,
}

impl ResearchContent {
    pub fn is_active(&self, now: Timestamp) -> bool {
        now >= self.activity_window_start && now <= self.activity_window_end
    }
}

// ── Review ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub author: AccountName,
    pub research_content_id: ResearchContentId,
    pub research_id: ResearchId,
    pub is_positive: bool,
    pub content: String,
    pub created_at: Timestamp,
    pub disciplines: BTreeSet<DisciplineId>,
    /// Author's token amount per discipline at review time.
    pub expertise_tokens_amount_by_discipline: BTreeMap<DisciplineId, Share>,
    /// Expertise spent on the review, per discipline.
    pub expertise_amounts_used: BTreeMap<DisciplineId, Share>,
    /// Starts at the expertise used; every vote adds its signed weight.
    pub weights_per_discipline: BTreeMap<DisciplineId, Share>,
    pub weight_modifiers: BTreeMap<DisciplineId, Percent>,
    /// Assessment criteria id → score.
    pub assessment_criteria: BTreeMap<u16, u16>,
}

// ── ReviewVote ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVote {
    pub id: ReviewVoteId,
    pub voter: AccountName,
    pub review_id: ReviewId,
    pub discipline_id: DisciplineId,
    pub research_content_id: ResearchContentId,
    pub research_id: ResearchId,
    /// Signed, time-discounted weight.
    pub weight: Share,
    pub voting_time: Timestamp,
}

// ── TotalVotes ────────────────────────────────────────────────────────────────

/// Per (content, discipline) accumulator of review vote weights.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalVotes {
    pub id: TotalVotesId,
    pub research_id: ResearchId,
    pub research_content_id: ResearchContentId,
    pub discipline_id: DisciplineId,
    pub total_weight: Share,
}

// ── ResearchDisciplineRelation ────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchDisciplineRelation {
    pub id: RelationId,
    pub research_id: ResearchId,
    pub discipline_id: DisciplineId,
    pub research_eci: Share,
    pub votes_count: Share,
}
