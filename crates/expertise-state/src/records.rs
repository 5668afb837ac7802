//! Storage keys of the chain objects.

use expertise_core::schema::{
    Discipline, ExpertToken, Research, ResearchContent, ResearchDisciplineRelation, Review,
    ReviewVote, TotalVotes,
};
use expertise_core::types::{
    AccountName, DisciplineId, ExpertTokenId, RelationId, ResearchContentId, ResearchId,
    ReviewId, ReviewVoteId, TotalVotesId,
};

use crate::store::Record;

impl Record for Discipline {
    type Id = DisciplineId;
    /// Names are unique across the tree.
    type Key = String;

    fn id(&self) -> DisciplineId {
        self.id
    }

    fn key(&self) -> String {
        self.name.clone()
    }
}

impl Record for ExpertToken {
    type Id = ExpertTokenId;
    type Key = (AccountName, DisciplineId);

    fn id(&self) -> ExpertTokenId {
        self.id
    }

    fn key(&self) -> Self::Key {
        (self.account.clone(), self.discipline_id)
    }
}

impl Record for Research {
    type Id = ResearchId;
    type Key = ResearchId;

    fn id(&self) -> ResearchId {
        self.id
    }

    fn key(&self) -> ResearchId {
        self.id
    }
}

impl Record for ResearchContent {
    type Id = ResearchContentId;
    type Key = (ResearchId, ResearchContentId);

    fn id(&self) -> ResearchContentId {
        self.id
    }

    fn key(&self) -> Self::Key {
        (self.research_id, self.id)
    }
}

impl Record for Review {
    type Id = ReviewId;
    /// One review per author and content.
    type Key = (ResearchContentId, AccountName);

    fn id(&self) -> ReviewId {
        self.id
    }

    fn key(&self) -> Self::Key {
        (self.research_content_id, self.author.clone())
    }
}

impl Record for ReviewVote {
    type Id = ReviewVoteId;
    /// One vote per voter, discipline and review.
    type Key = (ReviewId, DisciplineId, AccountName);

    fn id(&self) -> ReviewVoteId {
        self.id
    }

    fn key(&self) -> Self::Key {
        (self.review_id, self.discipline_id, self.voter.clone())
    }
}

impl Record for TotalVotes {
    type Id = TotalVotesId;
    type Key = (ResearchContentId, DisciplineId);

    fn id(&self) -> TotalVotesId {
        self.id
    }

    fn key(&self) -> Self::Key {
        (self.research_content_id, self.discipline_id)
    }
}

impl Record for ResearchDisciplineRelation {
    type Id = RelationId;
    type Key = (ResearchId, DisciplineId);

    fn id(&self) -> RelationId {
        self.id
    }

    fn key(&self) -> Self::Key {
        (self.research_id, self.discipline_id)
    }
}

/// Smallest account name in key order; used as a range lower bound.
pub(crate) fn min_account() -> AccountName {
    AccountName::from("")
}
