use expertise_core::config::LedgerConfig;
use expertise_core::error::EciError;
use expertise_core::types::{AccountName, ResearchGroupId, Share, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything an expertise ledger starts from.
///
/// Disciplines are referred to by name; parents must appear before their
/// children. A missing parent means the root discipline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenesisParams {
    /// Unix timestamp used for every genesis object.
    #[serde(default)]
    pub genesis_time: Timestamp,
    /// Consensus parameters, fixed for the life of the chain.
    #[serde(default)]
    pub config: LedgerConfig,
    #[serde(default)]
    pub disciplines: Vec<GenesisDiscipline>,
    #[serde(default)]
    pub accounts: Vec<AccountName>,
    #[serde(default)]
    pub expert_tokens: Vec<GenesisExpertToken>,
    #[serde(default)]
    pub research: Vec<GenesisResearch>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisDiscipline {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisExpertToken {
    pub account: AccountName,
    pub discipline: String,
    pub amount: Share,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisResearch {
    pub research_group_id: ResearchGroupId,
    pub disciplines: Vec<String>,
}

impl GenesisParams {
    pub fn from_json(json: &str) -> Result<Self, EciError> {
        serde_json::from_str(json).map_err(|e| EciError::Serialization(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EciError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EciError::Storage(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json(&text)
    }
}
