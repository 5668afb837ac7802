use thiserror::Error;

use crate::types::{
    AccountName, DisciplineId, Percent, ResearchContentId, ResearchId, ReviewId, Share,
};

/// Coarse failure class reported with a rejected transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InsufficientPower,
    InvalidDelta,
    InvalidArgument,
    Storage,
}

#[derive(Debug, Error)]
pub enum EciError {
    // ── Not found ────────────────────────────────────────────────────────────
    #[error("unknown account: {0}")]
    UnknownAccount(AccountName),

    #[error("discipline not found: {0}")]
    DisciplineNotFound(DisciplineId),

    #[error("research not found: {0}")]
    ResearchNotFound(ResearchId),

    #[error("research content not found: {0}")]
    ResearchContentNotFound(ResearchContentId),

    #[error("review not found: {0}")]
    ReviewNotFound(ReviewId),

    #[error("expert token not found for {account} in {discipline}")]
    ExpertTokenNotFound { account: AccountName, discipline: DisciplineId },

    #[error("research {research} is not bound to {discipline}")]
    RelationNotFound { research: ResearchId, discipline: DisciplineId },

    #[error("no expertise delegation from {account} in {discipline}")]
    DelegationNotFound { account: AccountName, discipline: DisciplineId },

    // ── Uniqueness ───────────────────────────────────────────────────────────
    #[error("discipline already exists: {0}")]
    DisciplineExists(String),

    #[error("expert token already exists for {account} in {discipline}")]
    ExpertTokenExists { account: AccountName, discipline: DisciplineId },

    #[error("expertise of {account} in {discipline} is already delegated")]
    DelegationExists { account: AccountName, discipline: DisciplineId },

    #[error("{author} has already reviewed {content}")]
    AlreadyReviewed { author: AccountName, content: ResearchContentId },

    #[error("{voter} has already voted for {review} in {discipline}")]
    AlreadyVoted { voter: AccountName, review: ReviewId, discipline: DisciplineId },

    // ── Voting power ─────────────────────────────────────────────────────────
    #[error("insufficient voting power: need {need} bp, have {have} bp")]
    InsufficientPower { need: Percent, have: Percent },

    // ── Counters ─────────────────────────────────────────────────────────────
    #[error("counter would become negative: current {current}, delta {delta}")]
    InvalidDelta { current: Share, delta: Share },

    #[error("counter would overflow: current {current}, delta {delta}")]
    CounterOverflow { current: Share, delta: Share },

    // ── Arguments ────────────────────────────────────────────────────────────
    #[error("weight out of range: {0} bp")]
    InvalidWeight(i32),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("review content must not be empty")]
    EmptyReviewContent,

    #[error("review content exceeds maximum of {max} bytes")]
    ReviewContentTooLong { max: usize },

    #[error("assessment criteria {criteria} score {score} out of range")]
    InvalidCriteriaScore { criteria: u16, score: u16 },

    #[error("{0} cannot review content they authored")]
    SelfReview(AccountName),

    #[error("{0} cannot vote for their own review")]
    SelfVote(AccountName),

    #[error("{0} cannot delegate expertise to itself")]
    SelfDelegation(AccountName),

    #[error("{discipline} is not among the disciplines of {review}")]
    DisciplineNotReviewed { review: ReviewId, discipline: DisciplineId },

    #[error("research {0} is finished and accepts no more content")]
    ResearchFinished(ResearchId),

    #[error("research must be bound to at least one discipline")]
    NoDisciplines,

    #[error("research content must have at least one author")]
    NoAuthors,

    #[error("discipline name must not be empty")]
    EmptyDisciplineName,

    #[error("operation not allowed on the root discipline")]
    RootDiscipline,

    #[error("invalid account name: {0}")]
    InvalidAccountName(String),

    #[error("{account} has no undelegated expertise in {discipline}")]
    NoUndelegatedExpertise { account: AccountName, discipline: DisciplineId },

    #[error("invalid ledger configuration: {0}")]
    InvalidConfig(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EciError {
    pub fn kind(&self) -> ErrorKind {
        use EciError::*;
        match self {
            UnknownAccount(_)
            | DisciplineNotFound(_)
            | ResearchNotFound(_)
            | ResearchContentNotFound(_)
            | ReviewNotFound(_)
            | ExpertTokenNotFound { .. }
            | RelationNotFound { .. }
            | DelegationNotFound { .. } => ErrorKind::NotFound,

            DisciplineExists(_)
            | ExpertTokenExists { .. }
            | DelegationExists { .. }
            | AlreadyReviewed { .. }
            | AlreadyVoted { .. } => ErrorKind::AlreadyExists,

            InsufficientPower { .. } => ErrorKind::InsufficientPower,

            InvalidDelta { .. } | CounterOverflow { .. } => ErrorKind::InvalidDelta,

            InvalidWeight(_)
            | ZeroAmount
            | EmptyReviewContent
            | ReviewContentTooLong { .. }
            | InvalidCriteriaScore { .. }
            | SelfReview(_)
            | SelfVote(_)
            | SelfDelegation(_)
            | DisciplineNotReviewed { .. }
            | ResearchFinished(_)
            | NoDisciplines
            | NoAuthors
            | EmptyDisciplineName
            | RootDiscipline
            | InvalidAccountName(_)
            | NoUndelegatedExpertise { .. }
            | InvalidConfig(_) => ErrorKind::InvalidArgument,

            Serialization(_) | Storage(_) => ErrorKind::Storage,
        }
    }

    /// Id of the entity the failure refers to, when there is one.
    pub fn entity(&self) -> Option<String> {
        use EciError::*;
        match self {
            UnknownAccount(a) | SelfReview(a) | SelfVote(a) | SelfDelegation(a) => {
                Some(a.to_string())
            }
            DisciplineNotFound(d) => Some(d.to_string()),
            ResearchNotFound(r) | ResearchFinished(r) => Some(r.to_string()),
            ResearchContentNotFound(c) => Some(c.to_string()),
            ReviewNotFound(r) => Some(r.to_string()),
            ExpertTokenNotFound { account, discipline }
            | ExpertTokenExists { account, discipline }
            | DelegationNotFound { account, discipline }
            | DelegationExists { account, discipline }
            | NoUndelegatedExpertise { account, discipline } => {
                Some(format!("{account}/{discipline}"))
            }
            RelationNotFound { research, discipline } => Some(format!("{research}/{discipline}")),
            AlreadyReviewed { author, content } => Some(format!("{author}/{content}")),
            AlreadyVoted { voter, review, discipline } => {
                Some(format!("{voter}/{review}/{discipline}"))
            }
            DisciplineNotReviewed { review, discipline } => Some(format!("{review}/{discipline}")),
            DisciplineExists(name) => Some(name.clone()),
            InvalidAccountName(name) => Some(name.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let nf = EciError::ExpertTokenNotFound {
            account: "john".into(),
            discipline: DisciplineId(1),
        };
        assert_eq!(nf.kind(), ErrorKind::NotFound);
        assert_eq!(nf.entity().as_deref(), Some("john/discipline:1"));

        let dup = EciError::AlreadyReviewed { author: "john".into(), content: ResearchContentId(4) };
        assert_eq!(dup.kind(), ErrorKind::AlreadyExists);

        assert_eq!(
            EciError::InvalidDelta { current: 1, delta: -2 }.kind(),
            ErrorKind::InvalidDelta
        );
        assert_eq!(
            EciError::CounterOverflow { current: i64::MAX, delta: 1 }.kind(),
            ErrorKind::InvalidDelta
        );
        assert_eq!(EciError::InvalidWeight(0).kind(), ErrorKind::InvalidArgument);
        assert_eq!(EciError::InvalidWeight(0).entity(), None);
    }
}
