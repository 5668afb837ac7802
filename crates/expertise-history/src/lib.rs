//! expertise-history
//!
//! Indexer for the virtual operations emitted by the ECI evaluator.
//! `EciHistoryIndex` is an `EventSink`: hand it to the engine and it keeps
//! per-entity ECI histories, the ECI changes credited to each reviewer and
//! voter, the content citation graph and per-discipline statistics. Nothing
//! in the ledger reads from it.

pub mod index;
pub mod query;

pub use index::EciHistoryIndex;
pub use query::{DisciplineEciStats, EciHistoryFilter, EciHistoryQuery, EciSummary};
