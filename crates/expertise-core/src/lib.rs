pub mod config;
pub mod constants;
pub mod curve;
pub mod error;
pub mod history;
pub mod operation;
pub mod schema;
pub mod types;

pub use config::LedgerConfig;
pub use constants::*;
pub use error::{EciError, ErrorKind};
pub use history::*;
pub use operation::*;
pub use schema::*;
pub use types::*;
