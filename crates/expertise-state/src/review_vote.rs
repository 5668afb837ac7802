//! Review votes and the per-content vote totals they feed.

use std::collections::BTreeMap;

use expertise_core::constants::PERCENT_100;
use expertise_core::curve;
use expertise_core::error::EciError;
use expertise_core::history::ContributionType;
use expertise_core::schema::{ReviewVote, TotalVotes};
use expertise_core::types::{
    AccountName, DisciplineId, Percent, ResearchContentId, ReviewId, ReviewVoteId, Share,
    Timestamp,
};
use tracing::info;

use crate::eci::EciTrigger;
use crate::ledger::{add_share, Ledger};
use crate::records::min_account;
use crate::sink::EventSink;

impl Ledger {
    /// Cast a signed vote on a review in one of its disciplines.
    ///
    /// The vote's weight is the expertise put at stake, scaled down
    /// linearly for votes cast inside the reverse-auction window.
    pub fn vote_for_review(
        &mut self,
        voter: &AccountName,
        review_id: ReviewId,
        discipline_id: DisciplineId,
        weight: i16,
        now: Timestamp,
        sink: &mut dyn EventSink,
    ) -> Result<ReviewVoteId, EciError> {
        if weight == 0 || weight.unsigned_abs() > PERCENT_100 {
            return Err(EciError::InvalidWeight(weight as i32));
        }
        let abs_weight: Percent = weight.unsigned_abs();

        let review = self.review(review_id)?;
        if !review.disciplines.contains(&discipline_id) {
            return Err(EciError::DisciplineNotReviewed { review: review_id, discipline: discipline_id });
        }
        if &review.author == voter {
            return Err(EciError::SelfVote(voter.clone()));
        }
        let (research_id, content_id, review_created_at) =
            (review.research_id, review.research_content_id, review.created_at);
        let review_weight = review.weights_per_discipline.get(&discipline_id).copied().unwrap_or(0);
        if self.review_votes.contains_key(&(review_id, discipline_id, voter.clone())) {
            return Err(EciError::AlreadyVoted {
                voter: voter.clone(),
                review: review_id,
                discipline: discipline_id,
            });
        }
        let token = self.expert_token_by_account_and_discipline(voter, discipline_id)?;
        let (token_id, effective) = (token.id, token.effective_amount());
        self.relation(research_id, discipline_id)?;

        let preview = self.preview_charge(token_id, abs_weight, now)?;
        let raw = curve::expertise_used(effective, preview.power_before, abs_weight);
        let discounted = curve::reverse_auction_discount(
            raw,
            now - review_created_at,
            self.config.reverse_auction_window_seconds,
        );
        let signed: Share = if weight < 0 { -discounted } else { discounted };

        self.stats.can_charge(raw)?;
        let existing_total = self
            .total_votes
            .find(&(content_id, discipline_id))
            .map(|tv| (tv.id, tv.total_weight));
        let content_total = add_share(existing_total.map_or(0, |(_, w)| w), signed)?;
        add_share(self.discipline(discipline_id)?.total_active_weight, signed)?;
        let review_weight = add_share(review_weight, signed)?;

        self.charge(token_id, abs_weight, now)?;
        self.stats.on_charge(discipline_id, raw)?;
        let id = self
            .review_votes
            .insert(|id| ReviewVote {
                id,
                voter: voter.clone(),
                review_id,
                discipline_id,
                research_content_id: content_id,
                research_id,
                weight: signed,
                voting_time: now,
            })
            .map_err(|_| EciError::AlreadyVoted {
                voter: voter.clone(),
                review: review_id,
                discipline: discipline_id,
            })?;

        match existing_total {
            Some((tv, _)) => {
                self.total_votes.modify(tv, |tv| tv.total_weight = content_total);
            }
            None => {
                self.total_votes
                    .insert(|id| TotalVotes {
                        id,
                        research_id,
                        research_content_id: content_id,
                        discipline_id,
                        total_weight: content_total,
                    })
                    .map_err(|_| EciError::Storage("total votes id reused".into()))?;
            }
        }
        self.add_discipline_active_weight(discipline_id, signed)?;
        self.reviews.modify(review_id, |r| {
            r.weights_per_discipline.insert(discipline_id, review_weight);
        });
        self.update_votes_count(research_id, discipline_id, 1)?;
        info!(
            vote = %id,
            %voter,
            review = %review_id,
            discipline = %discipline_id,
            raw,
            weight = signed,
            "review vote cast"
        );

        let trigger = EciTrigger {
            contribution_type: ContributionType::ReviewSupport,
            contribution_id: id.as_u64(),
            assessment_criteria: BTreeMap::new(),
            timestamp: now,
            account: Some(voter.clone()),
        };
        self.update_content_and_research_eci(content_id, &trigger, sink)?;
        Ok(id)
    }

    pub fn review_vote(&self, id: ReviewVoteId) -> Option<&ReviewVote> {
        self.review_votes.get(id)
    }

    /// Votes on `review_id`, ordered by discipline then voter.
    pub fn review_votes_by_review(&self, review_id: ReviewId) -> Vec<&ReviewVote> {
        let lo = (review_id, DisciplineId(0), min_account());
        let hi = (ReviewId(review_id.0 + 1), DisciplineId(0), min_account());
        self.review_votes.range(lo..hi).collect()
    }

    pub fn review_votes_by_voter(&self, voter: &AccountName) -> Vec<&ReviewVote> {
        self.review_votes.iter().filter(|v| &v.voter == voter).collect()
    }

    pub fn total_votes(
        &self,
        content_id: ResearchContentId,
        discipline_id: DisciplineId,
    ) -> Option<&TotalVotes> {
        self.total_votes.find(&(content_id, discipline_id))
    }

    pub fn total_votes_by_content(&self, content_id: ResearchContentId) -> Vec<&TotalVotes> {
        let lo = (content_id, DisciplineId(0));
        let hi = (content_id, DisciplineId(u64::MAX));
        self.total_votes.range(lo..=hi).collect()
    }
}
