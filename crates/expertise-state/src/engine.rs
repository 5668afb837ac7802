//! Transaction engine: applies operation lists atomically.
//!
//! Every `apply` runs inside one ledger undo session. Virtual operations are
//! buffered and reach the sink only if the whole transaction succeeds.

use std::collections::BTreeSet;

use expertise_core::error::EciError;
use expertise_core::history::VirtualOperation;
use expertise_core::operation::Operation;
use expertise_core::types::{AccountName, Timestamp};
use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::review::NewReview;
use crate::sink::EventSink;

// ── Accounts ─────────────────────────────────────────────────────────────────

/// Account existence, owned by the surrounding chain.
pub trait AccountRegistry {
    fn account_exists(&self, name: &AccountName) -> bool;
}

/// In-memory account registry.
#[derive(Clone, Debug, Default)]
pub struct AccountSet {
    names: BTreeSet<AccountName>,
}

impl AccountSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the account was already present.
    pub fn insert(&mut self, name: AccountName) -> Result<bool, EciError> {
        if !name.is_valid() {
            return Err(EciError::InvalidAccountName(name.to_string()));
        }
        Ok(self.names.insert(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountName> {
        self.names.iter()
    }
}

impl AccountRegistry for AccountSet {
    fn account_exists(&self, name: &AccountName) -> bool {
        self.names.contains(name)
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct Engine<A: AccountRegistry, S: EventSink> {
    ledger: Ledger,
    accounts: A,
    sink: S,
    applied: u64,
    rejected: u64,
}

impl<A: AccountRegistry, S: EventSink> Engine<A, S> {
    pub fn new(ledger: Ledger, accounts: A, sink: S) -> Self {
        Self { ledger, accounts, sink, applied: 0, rejected: 0 }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Apply one transaction. Either every operation takes effect and its
    /// events are forwarded, or the ledger is left exactly as it was.
    pub fn apply(&mut self, ops: &[Operation], now: Timestamp) -> Result<usize, EciError> {
        let mut buffer: Vec<VirtualOperation> = Vec::new();
        self.ledger.begin_session();

        for (index, op) in ops.iter().enumerate() {
            if let Err(e) = self.apply_operation(op, now, &mut buffer) {
                self.ledger.rollback_session();
                self.rejected += 1;
                warn!(
                    index,
                    op = op.name(),
                    kind = ?e.kind(),
                    entity = e.entity().as_deref().unwrap_or("-"),
                    error = %e,
                    "transaction rejected"
                );
                return Err(e);
            }
        }

        self.ledger.commit_session();
        self.applied += 1;
        let events = buffer.len();
        for event in buffer {
            self.sink.record(event);
        }
        debug!(ops = ops.len(), events, "transaction applied");
        Ok(events)
    }

    /// Close the current block.
    pub fn finalize_block(&mut self, now: Timestamp) {
        self.ledger.on_block_finalized();
        info!(
            at = now,
            used_last_week = self.ledger.get_expertise_used_last_week(),
            "block finalized"
        );
    }

    fn require_account(&self, name: &AccountName) -> Result<(), EciError> {
        if self.accounts.account_exists(name) {
            Ok(())
        } else {
            Err(EciError::UnknownAccount(name.clone()))
        }
    }

    fn apply_operation(
        &mut self,
        op: &Operation,
        now: Timestamp,
        buffer: &mut Vec<VirtualOperation>,
    ) -> Result<(), EciError> {
        match op {
            Operation::CreateDiscipline { name, parent_id } => {
                self.ledger.create_discipline(name, *parent_id)?;
            }
            Operation::CreateExpertToken { account, discipline_id, amount } => {
                self.require_account(account)?;
                self.ledger.create_expert_token(account, *discipline_id, *amount, now)?;
            }
            Operation::GrantExpertise { account, discipline_id, amount } => {
                self.require_account(account)?;
                self.ledger.grant_expertise(account, *discipline_id, *amount, now)?;
            }
            Operation::DelegateExpertise { sender, receiver, discipline_id } => {
                self.require_account(sender)?;
                self.require_account(receiver)?;
                self.ledger.delegate_expertise(sender, receiver, *discipline_id, now)?;
            }
            Operation::RevokeExpertiseDelegation { sender, discipline_id } => {
                self.require_account(sender)?;
                self.ledger.revoke_expertise_delegation(sender, *discipline_id)?;
            }
            Operation::CreateResearch { research_group_id, disciplines } => {
                self.ledger.create_research(*research_group_id, disciplines.clone(), now)?;
            }
            Operation::CreateResearchContent { research_id, content_type, authors, references } => {
                for author in authors {
                    self.require_account(author)?;
                }
                self.ledger.create_research_content(
                    *research_id,
                    *content_type,
                    authors.clone(),
                    references.clone(),
                    now,
                    buffer,
                )?;
            }
            Operation::CreateReview {
                author,
                research_content_id,
                is_positive,
                content,
                weight,
                assessment_criteria,
            } => {
                self.require_account(author)?;
                let review = NewReview {
                    author: author.clone(),
                    research_content_id: *research_content_id,
                    is_positive: *is_positive,
                    content: content.clone(),
                    weight: *weight,
                    assessment_criteria: assessment_criteria.iter().copied().collect(),
                };
                self.ledger.create_review(review, now, buffer)?;
            }
            Operation::VoteForReview { voter, review_id, discipline_id, weight } => {
                self.require_account(voter)?;
                self.ledger
                    .vote_for_review(voter, *review_id, *discipline_id, *weight, now, buffer)?;
            }
        }
        Ok(())
    }
}
