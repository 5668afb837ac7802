//! Review store.

use std::collections::{BTreeMap, BTreeSet};

use expertise_core::constants::{
    MAX_REVIEW_CONTENT_BYTES, MAX_REVIEW_CRITERIA_SCORE, MIN_REVIEW_CRITERIA_SCORE, PERCENT_100,
};
use expertise_core::curve;
use expertise_core::error::EciError;
use expertise_core::history::ContributionType;
use expertise_core::schema::Review;
use expertise_core::types::{
    AccountName, DisciplineId, ExpertTokenId, Percent, ResearchContentId, ReviewId, Share,
    Timestamp,
};
use tracing::info;

use crate::eci::EciTrigger;
use crate::ledger::{add_share, Ledger};
use crate::records::min_account;
use crate::sink::EventSink;

/// Arguments of `Ledger::create_review`.
#[derive(Clone, Debug)]
pub struct NewReview {
    pub author: AccountName,
    pub research_content_id: ResearchContentId,
    pub is_positive: bool,
    pub content: String,
    /// Basis points, `1..=10000`.
    pub weight: i16,
    pub assessment_criteria: BTreeMap<u16, u16>,
}

impl Ledger {
    /// Publish a review, spending the author's voting power in every
    /// discipline of the reviewed research.
    ///
    /// Every check runs before the first charge, so a failure leaves the
    /// ledger untouched.
    pub fn create_review(
        &mut self,
        new: NewReview,
        now: Timestamp,
        sink: &mut dyn EventSink,
    ) -> Result<ReviewId, EciError> {
        let NewReview { author, research_content_id, is_positive, content, weight, assessment_criteria } = new;

        if weight <= 0 || weight as i32 > PERCENT_100 as i32 {
            return Err(EciError::InvalidWeight(weight as i32));
        }
        let weight = weight as Percent;
        if content.trim().is_empty() {
            return Err(EciError::EmptyReviewContent);
        }
        if content.len() > MAX_REVIEW_CONTENT_BYTES {
            return Err(EciError::ReviewContentTooLong { max: MAX_REVIEW_CONTENT_BYTES });
        }
        for (&criteria, &score) in &assessment_criteria {
            if !(MIN_REVIEW_CRITERIA_SCORE..=MAX_REVIEW_CRITERIA_SCORE).contains(&score) {
                return Err(EciError::InvalidCriteriaScore { criteria, score });
            }
        }

        let reviewed = self.research_content(research_content_id)?;
        let research_id = reviewed.research_id;
        if self.reviews.contains_key(&(research_content_id, author.clone())) {
            return Err(EciError::AlreadyReviewed { author, content: research_content_id });
        }
        if reviewed.authors.contains(&author) {
            return Err(EciError::SelfReview(author));
        }

        let disciplines: BTreeSet<DisciplineId> = self
            .relations_by_research(research_id)
            .iter()
            .map(|rel| rel.discipline_id)
            .collect();
        let mut tokens: Vec<(DisciplineId, ExpertTokenId, Share, Share)> = Vec::new();
        for &d in &disciplines {
            let token = self.expert_token_by_account_and_discipline(&author, d)?;
            tokens.push((d, token.id, token.amount, token.effective_amount()));
        }
        let mut planned = Vec::with_capacity(tokens.len());
        let mut total_spent: Share = 0;
        for (d, id, amount, effective) in tokens {
            let preview = self.preview_charge(id, weight, now)?;
            let spent = curve::expertise_used(effective, preview.power_before, weight);
            total_spent = add_share(total_spent, spent)?;
            planned.push((d, id, amount, spent));
        }
        self.stats.can_charge(total_spent)?;

        let mut amounts = BTreeMap::new();
        let mut used = BTreeMap::new();
        for (d, id, amount, spent) in planned {
            self.charge(id, weight, now)?;
            self.stats.on_charge(d, spent)?;
            amounts.insert(d, amount);
            used.insert(d, spent);
        }

        let id = self
            .reviews
            .insert(|id| Review {
                id,
                author: author.clone(),
                research_content_id,
                research_id,
                is_positive,
                content,
                created_at: now,
                disciplines: disciplines.clone(),
                expertise_tokens_amount_by_discipline: amounts,
                weights_per_discipline: used.clone(),
                expertise_amounts_used: used,
                weight_modifiers: disciplines.iter().map(|&d| (d, PERCENT_100)).collect(),
                assessment_criteria: assessment_criteria.clone(),
            })
            .map_err(|_| EciError::AlreadyReviewed {
                author: author.clone(),
                content: research_content_id,
            })?;

        self.research.modify(research_id, |r| {
            if is_positive {
                r.number_of_positive_reviews += 1;
            } else {
                r.number_of_negative_reviews += 1;
            }
        });
        for &d in &disciplines {
            self.update_votes_count(research_id, d, 1)?;
        }
        info!(review = %id, %author, content = %research_content_id, is_positive, weight, "review created");

        let trigger = EciTrigger {
            contribution_type: ContributionType::Review,
            contribution_id: id.as_u64(),
            assessment_criteria,
            timestamp: now,
            account: Some(author),
        };
        self.update_content_and_research_eci(research_content_id, &trigger, sink)?;
        Ok(id)
    }

    pub fn review(&self, id: ReviewId) -> Result<&Review, EciError> {
        self.reviews.get(id).ok_or(EciError::ReviewNotFound(id))
    }

    /// Reviews of `content_id`, ordered by author.
    pub fn reviews_by_content(&self, content_id: ResearchContentId) -> Vec<&Review> {
        let lo = (content_id, min_account());
        let hi = (ResearchContentId(content_id.0 + 1), min_account());
        self.reviews.range(lo..hi).collect()
    }

    pub fn reviews_by_author(&self, author: &AccountName) -> Vec<&Review> {
        self.reviews.iter().filter(|r| &r.author == author).collect()
    }
}
