//! Utility functions for run identifiers and timestamp handling.

mod run_id;
pub mod timestamps;

pub use run_id::RunId;
pub use timestamps::Timestamp;
