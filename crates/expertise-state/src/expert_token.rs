//! Expert token ledger: minting, voting-power charges and delegation.
//!
//! Delegation follows a proxy chain. A token that delegates contributes its
//! own amount at depth 0 of its proxy, and everything proxied to it one level
//! deeper, up to `MAX_PROXY_DEPTH`. Only the non-delegating end of a chain
//! votes with the proxied weight.

use std::collections::BTreeSet;

use expertise_core::constants::{MAX_PROXY_DEPTH, PERCENT_100, ROOT_DISCIPLINE_ID};
use expertise_core::curve;
use expertise_core::error::EciError;
use expertise_core::schema::ExpertToken;
use expertise_core::types::{AccountName, DisciplineId, ExpertTokenId, Percent, Share, Timestamp};
use tracing::{debug, info};

use crate::ledger::{add_share, Ledger};

/// Outcome of a voting-power charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Charge {
    /// Regenerated power the charge started from.
    pub power_before: Percent,
    pub cost: Percent,
    pub power_after: Percent,
}

impl Ledger {
    // ── Lookups ──────────────────────────────────────────────────────────────

    pub fn expert_token(&self, id: ExpertTokenId) -> Option<&ExpertToken> {
        self.tokens.get(id)
    }

    pub fn expert_token_by_account_and_discipline(
        &self,
        account: &AccountName,
        discipline_id: DisciplineId,
    ) -> Result<&ExpertToken, EciError> {
        self.tokens
            .find(&(account.clone(), discipline_id))
            .ok_or_else(|| EciError::ExpertTokenNotFound {
                account: account.clone(),
                discipline: discipline_id,
            })
    }

    pub fn expert_tokens_by_account(&self, account: &AccountName) -> Vec<&ExpertToken> {
        let lo = (account.clone(), DisciplineId(0));
        let hi = (account.clone(), DisciplineId(u64::MAX));
        self.tokens.range(lo..=hi).collect()
    }

    pub fn expert_tokens_by_discipline(&self, discipline_id: DisciplineId) -> Vec<&ExpertToken> {
        self.tokens.iter().filter(|t| t.discipline_id == discipline_id).collect()
    }

    /// Voting power `token` would have at `now`, without charging it.
    pub fn regenerated_power(&self, id: ExpertTokenId, now: Timestamp) -> Option<Percent> {
        self.tokens.get(id).map(|t| {
            curve::regenerated_power(
                t.voting_power,
                t.last_vote_time,
                now,
                self.config.regeneration_seconds,
            )
        })
    }

    // ── Minting ──────────────────────────────────────────────────────────────

    pub fn create_expert_token(
        &mut self,
        account: &AccountName,
        discipline_id: DisciplineId,
        amount: Share,
        now: Timestamp,
    ) -> Result<ExpertTokenId, EciError> {
        if amount <= 0 {
            return Err(EciError::ZeroAmount);
        }
        if discipline_id == DisciplineId(ROOT_DISCIPLINE_ID) {
            return Err(EciError::RootDiscipline);
        }
        add_share(self.discipline(discipline_id)?.total_expertise_amount, amount)?;
        let id = self.insert_token(account, discipline_id, amount, now)?;
        self.add_discipline_expertise(discipline_id, amount)?;
        info!(token = %id, %account, discipline = %discipline_id, amount, "expert token created");
        Ok(id)
    }

    /// Mint `amount` into the account's token in `discipline_id` and in each
    /// ancestor below the root, creating tokens that do not exist yet.
    pub fn grant_expertise(
        &mut self,
        account: &AccountName,
        discipline_id: DisciplineId,
        amount: Share,
        now: Timestamp,
    ) -> Result<(), EciError> {
        if amount <= 0 {
            return Err(EciError::ZeroAmount);
        }
        if discipline_id == DisciplineId(ROOT_DISCIPLINE_ID) {
            return Err(EciError::RootDiscipline);
        }
        let mut targets = vec![discipline_id];
        targets.extend(self.discipline_ancestors(discipline_id)?);
        // A discipline total bounds every token amount and proxied sum in it.
        for &d in &targets {
            add_share(self.discipline(d)?.total_expertise_amount, amount)?;
        }

        for d in targets {
            match self.tokens.find(&(account.clone(), d)).map(|t| (t.id, t.amount)) {
                Some((id, current)) => {
                    let total = add_share(current, amount)?;
                    self.tokens.modify(id, |t| t.amount = total);
                    let mut delta = [0; MAX_PROXY_DEPTH];
                    delta[0] = amount;
                    self.adjust_proxied(id, delta)?;
                }
                None => {
                    self.insert_token(account, d, amount, now)?;
                }
            }
            self.add_discipline_expertise(d, amount)?;
            debug!(%account, discipline = %d, amount, "expertise granted");
        }
        Ok(())
    }

    fn insert_token(
        &mut self,
        account: &AccountName,
        discipline_id: DisciplineId,
        amount: Share,
        now: Timestamp,
    ) -> Result<ExpertTokenId, EciError> {
        self.tokens
            .insert(|id| ExpertToken::new(id, account.clone(), discipline_id, amount, now))
            .map_err(|_| EciError::ExpertTokenExists {
                account: account.clone(),
                discipline: discipline_id,
            })
    }

    // ── Voting power ─────────────────────────────────────────────────────────

    /// What `charge` would do, without doing it.
    pub fn preview_charge(
        &self,
        id: ExpertTokenId,
        weight: Percent,
        now: Timestamp,
    ) -> Result<Charge, EciError> {
        if weight == 0 || weight > PERCENT_100 {
            return Err(EciError::InvalidWeight(weight as i32));
        }
        let power_before = self
            .regenerated_power(id, now)
            .ok_or(EciError::Storage(format!("expert token {id} vanished")))?;
        let cost = curve::charge_cost(self.config.required_power_percent, weight);
        if cost > power_before {
            return Err(EciError::InsufficientPower { need: cost, have: power_before });
        }
        Ok(Charge { power_before, cost, power_after: power_before - cost })
    }

    /// Regenerate, then spend `weight` worth of voting power.
    pub fn charge(
        &mut self,
        id: ExpertTokenId,
        weight: Percent,
        now: Timestamp,
    ) -> Result<Charge, EciError> {
        let charge = self.preview_charge(id, weight, now)?;
        self.tokens.modify(id, |t| {
            t.voting_power = charge.power_after;
            t.last_vote_time = now;
        });
        debug!(
            token = %id,
            before = charge.power_before,
            cost = charge.cost,
            after = charge.power_after,
            "voting power charged"
        );
        Ok(charge)
    }

    // ── Delegation ───────────────────────────────────────────────────────────

    pub fn delegate_expertise(
        &mut self,
        sender: &AccountName,
        receiver: &AccountName,
        discipline_id: DisciplineId,
        now: Timestamp,
    ) -> Result<(), EciError> {
        if sender == receiver {
            return Err(EciError::SelfDelegation(sender.clone()));
        }
        let token = self.expert_token_by_account_and_discipline(sender, discipline_id)?;
        if token.is_delegating() {
            return Err(EciError::DelegationExists {
                account: sender.clone(),
                discipline: discipline_id,
            });
        }
        let sender_id = token.id;
        let contribution = proxy_contribution(token);
        if contribution.iter().sum::<Share>() == 0 {
            return Err(EciError::NoUndelegatedExpertise {
                account: sender.clone(),
                discipline: discipline_id,
            });
        }
        if self.proxy_chain_reaches(receiver, discipline_id, sender) {
            return Err(EciError::SelfDelegation(sender.clone()));
        }

        if !self.tokens.contains_key(&(receiver.clone(), discipline_id)) {
            self.insert_token(receiver, discipline_id, 0, now)?;
        }
        self.tokens.modify(sender_id, |t| t.proxy = Some(receiver.clone()));
        self.adjust_proxied(sender_id, contribution)?;
        info!(%sender, %receiver, discipline = %discipline_id, "expertise delegated");
        Ok(())
    }

    pub fn revoke_expertise_delegation(
        &mut self,
        sender: &AccountName,
        discipline_id: DisciplineId,
    ) -> Result<(), EciError> {
        let token = self.expert_token_by_account_and_discipline(sender, discipline_id)?;
        if !token.is_delegating() {
            return Err(EciError::DelegationNotFound {
                account: sender.clone(),
                discipline: discipline_id,
            });
        }
        let sender_id = token.id;
        let removal = proxy_contribution(token).map(|v| -v);
        self.adjust_proxied(sender_id, removal)?;
        self.tokens.modify(sender_id, |t| t.proxy = None);
        info!(%sender, discipline = %discipline_id, "expertise delegation revoked");
        Ok(())
    }

    /// Walk the proxy chain above `from`, adding `delta[i]` at depth
    /// `i + level` of the token `level` steps up. Nothing is written unless
    /// every sum fits.
    fn adjust_proxied(
        &mut self,
        from: ExpertTokenId,
        delta: [Share; MAX_PROXY_DEPTH],
    ) -> Result<(), EciError> {
        let mut updates = Vec::new();
        let mut current = from;
        for level in 0..MAX_PROXY_DEPTH {
            let token = self
                .tokens
                .get(current)
                .ok_or(EciError::Storage(format!("expert token {current} vanished")))?;
            let Some(proxy) = token.proxy.clone() else {
                break;
            };
            let target = self.expert_token_by_account_and_discipline(&proxy, token.discipline_id)?;
            let mut proxied = target.proxied_expertise;
            for (i, d) in delta.iter().take(MAX_PROXY_DEPTH - level).enumerate() {
                proxied[i + level] = add_share(proxied[i + level], *d)?;
            }
            updates.push((target.id, proxied));
            current = target.id;
        }
        for (id, proxied) in updates {
            self.tokens.modify(id, |t| t.proxied_expertise = proxied);
        }
        Ok(())
    }

    fn proxy_chain_reaches(
        &self,
        start: &AccountName,
        discipline_id: DisciplineId,
        target: &AccountName,
    ) -> bool {
        let mut seen = BTreeSet::new();
        let mut account = start.clone();
        loop {
            if &account == target {
                return true;
            }
            if !seen.insert(account.clone()) {
                return false;
            }
            match self.tokens.find(&(account.clone(), discipline_id)).and_then(|t| t.proxy.clone()) {
                Some(next) => account = next,
                None => return false,
            }
        }
    }
}

/// Weight a token hands to its proxy, by depth.
fn proxy_contribution(token: &ExpertToken) -> [Share; MAX_PROXY_DEPTH] {
    let mut out = [0; MAX_PROXY_DEPTH];
    out[0] = token.amount;
    out[1..].copy_from_slice(&token.proxied_expertise[..MAX_PROXY_DEPTH - 1]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertise_core::config::LedgerConfig;
    use expertise_core::constants::{PERCENT_100, REQUIRED_POWER_PERCENT, VOTE_REGENERATION_SECONDS};

    fn setup() -> (Ledger, DisciplineId, DisciplineId) {
        let mut l = Ledger::new(LedgerConfig::default()).unwrap();
        let math = l.create_discipline("Mathematics", DisciplineId(0)).unwrap();
        let algebra = l.create_discipline("Algebra", math).unwrap();
        (l, math, algebra)
    }

    fn acc(s: &str) -> AccountName {
        AccountName::from(s)
    }

    #[test]
    fn create_sets_full_power_and_counts_expertise() {
        let (mut l, math, _) = setup();
        let id = l.create_expert_token(&acc("john"), math, 10_000, 100).unwrap();
        let t = l.expert_token(id).unwrap();
        assert_eq!(t.voting_power, PERCENT_100);
        assert_eq!(t.last_vote_time, 100);
        assert_eq!(l.discipline(math).unwrap().total_expertise_amount, 10_000);

        assert!(matches!(
            l.create_expert_token(&acc("john"), math, 5, 100),
            Err(EciError::ExpertTokenExists { .. })
        ));
        assert!(matches!(
            l.create_expert_token(&acc("john"), DisciplineId(0), 5, 100),
            Err(EciError::RootDiscipline)
        ));
        assert!(matches!(
            l.create_expert_token(&acc("mary"), math, 0, 100),
            Err(EciError::ZeroAmount)
        ));
    }

    #[test]
    fn grant_creates_ancestors_and_accumulates() {
        let (mut l, math, algebra) = setup();
        l.grant_expertise(&acc("john"), algebra, 300, 0).unwrap();
        l.grant_expertise(&acc("john"), algebra, 200, 0).unwrap();

        let a = l.expert_token_by_account_and_discipline(&acc("john"), algebra).unwrap();
        let m = l.expert_token_by_account_and_discipline(&acc("john"), math).unwrap();
        assert_eq!(a.amount, 500);
        assert_eq!(m.amount, 500);
        assert_eq!(l.discipline(algebra).unwrap().total_expertise_amount, 500);
        assert_eq!(l.discipline(math).unwrap().total_expertise_amount, 500);
        assert_eq!(l.expert_tokens_by_account(&acc("john")).len(), 2);
    }

    #[test]
    fn charge_spends_required_power() {
        let (mut l, math, _) = setup();
        let id = l.create_expert_token(&acc("john"), math, 10_000, 0).unwrap();
        let c = l.charge(id, PERCENT_100, 10).unwrap();
        assert_eq!(c.power_before, PERCENT_100);
        assert_eq!(c.cost, REQUIRED_POWER_PERCENT);
        let t = l.expert_token(id).unwrap();
        assert_eq!(t.voting_power, PERCENT_100 - REQUIRED_POWER_PERCENT);
        assert_eq!(t.last_vote_time, 10);
    }

    #[test]
    fn charge_fails_when_power_exhausted() {
        let cfg = LedgerConfig { required_power_percent: PERCENT_100, ..LedgerConfig::default() };
        let mut l = Ledger::new(cfg).unwrap();
        let d = l.create_discipline("Physics", DisciplineId(0)).unwrap();
        let id = l.create_expert_token(&acc("john"), d, 100, 0).unwrap();
        l.charge(id, PERCENT_100, 0).unwrap();
        let err = l.charge(id, 1, 0).unwrap_err();
        assert!(matches!(err, EciError::InsufficientPower { need: 1, have: 0 }));
        assert_eq!(l.expert_token(id).unwrap().voting_power, 0);

        // Half the regeneration window restores half the power.
        let half = VOTE_REGENERATION_SECONDS / 2;
        assert_eq!(l.regenerated_power(id, half), Some(PERCENT_100 / 2));
    }

    #[test]
    fn power_stays_within_bounds_over_many_charges() {
        let (mut l, math, _) = setup();
        let id = l.create_expert_token(&acc("john"), math, 1_000, 0).unwrap();
        let mut now = 0;
        for step in 0..200 {
            let weight = ((step * 37) % PERCENT_100 as i64) as Percent;
            let _ = l.charge(id, weight, now);
            let p = l.expert_token(id).unwrap().voting_power;
            assert!(p <= PERCENT_100);
            now += 600;
        }
    }

    #[test]
    fn delegation_moves_weight_along_the_chain() {
        let (mut l, math, _) = setup();
        l.create_expert_token(&acc("alice"), math, 100, 0).unwrap();
        l.create_expert_token(&acc("bob"), math, 50, 0).unwrap();
        l.create_expert_token(&acc("carol"), math, 10, 0).unwrap();

        l.delegate_expertise(&acc("alice"), &acc("bob"), math, 0).unwrap();
        l.delegate_expertise(&acc("bob"), &acc("carol"), math, 0).unwrap();

        let bob = l.expert_token_by_account_and_discipline(&acc("bob"), math).unwrap();
        assert_eq!(bob.proxied_expertise[0], 100);
        assert_eq!(bob.effective_amount(), 0);
        let carol = l.expert_token_by_account_and_discipline(&acc("carol"), math).unwrap();
        assert_eq!(carol.proxied_expertise[0], 50);
        assert_eq!(carol.proxied_expertise[1], 100);
        assert_eq!(carol.effective_amount(), 160);

        // Alice's later grant flows up two levels.
        l.grant_expertise(&acc("alice"), math, 5, 0).unwrap();
        let carol = l.expert_token_by_account_and_discipline(&acc("carol"), math).unwrap();
        assert_eq!(carol.proxied_expertise[1], 105);

        l.revoke_expertise_delegation(&acc("alice"), math).unwrap();
        let carol = l.expert_token_by_account_and_discipline(&acc("carol"), math).unwrap();
        assert_eq!(carol.effective_amount(), 60);
        let alice = l.expert_token_by_account_and_discipline(&acc("alice"), math).unwrap();
        assert_eq!(alice.effective_amount(), 105);
    }

    #[test]
    fn delegation_errors() {
        let (mut l, math, _) = setup();
        l.create_expert_token(&acc("alice"), math, 100, 0).unwrap();
        l.create_expert_token(&acc("bob"), math, 100, 0).unwrap();

        assert!(matches!(
            l.delegate_expertise(&acc("alice"), &acc("alice"), math, 0),
            Err(EciError::SelfDelegation(_))
        ));
        assert!(matches!(
            l.revoke_expertise_delegation(&acc("alice"), math),
            Err(EciError::DelegationNotFound { .. })
        ));
        l.delegate_expertise(&acc("alice"), &acc("bob"), math, 0).unwrap();
        assert!(matches!(
            l.delegate_expertise(&acc("alice"), &acc("bob"), math, 0),
            Err(EciError::DelegationExists { .. })
        ));
        // bob -> alice would close a loop.
        assert!(matches!(
            l.delegate_expertise(&acc("bob"), &acc("alice"), math, 0),
            Err(EciError::SelfDelegation(_))
        ));
    }

    #[test]
    fn delegating_to_account_without_token_creates_empty_token() {
        let (mut l, math, _) = setup();
        l.create_expert_token(&acc("alice"), math, 100, 0).unwrap();
        l.delegate_expertise(&acc("alice"), &acc("dave"), math, 0).unwrap();
        let dave = l.expert_token_by_account_and_discipline(&acc("dave"), math).unwrap();
        assert_eq!(dave.amount, 0);
        assert_eq!(dave.effective_amount(), 100);
        // Total minted expertise is unchanged by delegation.
        assert_eq!(l.discipline(math).unwrap().total_expertise_amount, 100);
    }

    #[test]
    fn delegation_cycle_beyond_proxy_depth_rejected() {
        let (mut l, math, _) = setup();
        let names = ["aaa", "bbb", "ccc", "ddd", "eee", "fff"];
        for n in names {
            l.create_expert_token(&acc(n), math, 100, 0).unwrap();
        }
        for pair in names.windows(2) {
            l.delegate_expertise(&acc(pair[0]), &acc(pair[1]), math, 0).unwrap();
        }

        assert!(matches!(
            l.delegate_expertise(&acc("fff"), &acc("aaa"), math, 0),
            Err(EciError::SelfDelegation(_))
        ));
        let head = l.expert_token_by_account_and_discipline(&acc("fff"), math).unwrap();
        assert!(!head.is_delegating());
        assert_eq!(head.effective_amount(), 100 * (MAX_PROXY_DEPTH as Share + 1));
    }

    #[test]
    fn charge_rejects_weight_outside_range() {
        let (mut l, math, _) = setup();
        let id = l.create_expert_token(&acc("john"), math, 10_000, 0).unwrap();
        assert!(matches!(l.charge(id, 0, 10), Err(EciError::InvalidWeight(0))));
        assert!(matches!(
            l.charge(id, PERCENT_100 + 1, 20),
            Err(EciError::InvalidWeight(w)) if w == PERCENT_100 as i32 + 1
        ));
        assert!(matches!(l.preview_charge(id, 30_000, 20), Err(EciError::InvalidWeight(30_000))));

        let t = l.expert_token(id).unwrap();
        assert_eq!(t.voting_power, PERCENT_100);
        assert_eq!(t.last_vote_time, 0);
    }

    #[test]
    fn grant_overflow_leaves_ledger_unchanged() {
        let (mut l, math, algebra) = setup();
        l.create_expert_token(&acc("john"), algebra, Share::MAX, 0).unwrap();

        let err = l.grant_expertise(&acc("john"), algebra, 1, 0).unwrap_err();
        assert!(matches!(err, EciError::CounterOverflow { current: Share::MAX, delta: 1 }));
        assert_eq!(
            l.expert_token_by_account_and_discipline(&acc("john"), algebra).unwrap().amount,
            Share::MAX
        );
        assert!(l.expert_token_by_account_and_discipline(&acc("john"), math).is_err());
        assert_eq!(l.discipline(algebra).unwrap().total_expertise_amount, Share::MAX);

        assert!(matches!(
            l.create_expert_token(&acc("mary"), algebra, 1, 0),
            Err(EciError::CounterOverflow { .. })
        ));
        assert!(l.expert_token_by_account_and_discipline(&acc("mary"), algebra).is_err());
    }

    #[test]
    fn tokens_listed_by_discipline() {
        let (mut l, math, algebra) = setup();
        l.grant_expertise(&acc("john"), algebra, 10, 0).unwrap();
        l.create_expert_token(&acc("mary"), math, 20, 0).unwrap();

        let mut in_math: Vec<_> =
            l.expert_tokens_by_discipline(math).iter().map(|t| t.account.to_string()).collect();
        in_math.sort();
        assert_eq!(in_math, ["john", "mary"]);
        let in_algebra = l.expert_tokens_by_discipline(algebra);
        assert_eq!(in_algebra.len(), 1);
        assert_eq!(in_algebra[0].amount, 10);
    }
}
