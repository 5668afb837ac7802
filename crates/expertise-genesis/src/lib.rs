//! expertise-genesis
//!
//! Builds the initial expertise ledger from `GenesisParams`, writing straight
//! into an empty `Ledger` without going through the transaction engine.
//!
//! Order: accounts, discipline tree, expert tokens, research. Genesis emits
//! no virtual operations; research created here starts with no content.

pub mod params;

pub use params::{GenesisDiscipline, GenesisExpertToken, GenesisParams, GenesisResearch};

use std::collections::BTreeSet;

use expertise_core::constants::ROOT_DISCIPLINE_ID;
use expertise_core::error::EciError;
use expertise_core::types::DisciplineId;
use expertise_state::engine::{AccountRegistry, AccountSet};
use expertise_state::ledger::Ledger;
use tracing::info;

/// The state genesis hands to the engine.
pub struct Genesis {
    pub ledger: Ledger,
    pub accounts: AccountSet,
}

/// Build a fresh ledger and account set from `params`.
pub fn apply_genesis(params: &GenesisParams) -> Result<Genesis, EciError> {
    info!("applying expertise genesis state");
    let now = params.genesis_time;
    let mut ledger = Ledger::new(params.config.clone())?;

    // ── 1. Accounts ──────────────────────────────────────────────────────────
    let mut accounts = AccountSet::new();
    for name in &params.accounts {
        accounts.insert(name.clone())?;
    }
    info!(accounts = accounts.len(), "genesis: accounts registered");

    // ── 2. Discipline tree ───────────────────────────────────────────────────
    for d in &params.disciplines {
        let parent = match &d.parent {
            Some(name) => discipline_id(&ledger, name)?,
            None => DisciplineId(ROOT_DISCIPLINE_ID),
        };
        ledger.create_discipline(&d.name, parent)?;
    }
    info!(disciplines = params.disciplines.len(), "genesis: discipline tree built");

    // ── 3. Expert tokens ─────────────────────────────────────────────────────
    for t in &params.expert_tokens {
        if !accounts.account_exists(&t.account) {
            return Err(EciError::UnknownAccount(t.account.clone()));
        }
        let d = discipline_id(&ledger, &t.discipline)?;
        ledger.create_expert_token(&t.account, d, t.amount, now)?;
    }
    info!(tokens = params.expert_tokens.len(), "genesis: expert tokens minted");

    // ── 4. Research ──────────────────────────────────────────────────────────
    for r in &params.research {
        let disciplines = r
            .disciplines
            .iter()
            .map(|name| discipline_id(&ledger, name))
            .collect::<Result<BTreeSet<_>, _>>()?;
        ledger.create_research(r.research_group_id, disciplines, now)?;
    }
    info!(research = params.research.len(), "genesis: research created");

    Ok(Genesis { ledger, accounts })
}

fn discipline_id(ledger: &Ledger, name: &str) -> Result<DisciplineId, EciError> {
    ledger
        .discipline_by_name(name)
        .map(|d| d.id)
        .ok_or_else(|| EciError::InvalidConfig(format!("unknown discipline in genesis: {name}")))
}
