pub mod db;
pub mod discipline;
pub mod eci;
pub mod engine;
pub mod expert_token;
pub mod ledger;
pub mod records;
pub mod relation;
pub mod research;
pub mod review;
pub mod review_vote;
pub mod sink;
pub mod stats;
pub mod store;

pub use db::SnapshotDb;
pub use eci::{EciEntity, EciMismatch, EciTrigger};
pub use engine::{AccountRegistry, AccountSet, Engine};
pub use expert_token::Charge;
pub use ledger::Ledger;
pub use review::NewReview;
pub use sink::{EventSink, NullSink};
pub use stats::ExpertiseStats;
pub use store::{Record, Table};
