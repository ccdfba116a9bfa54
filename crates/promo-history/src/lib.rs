//! History window providers.
//!
//! A quantity gate can scan two different histories: prior *promotions* of
//! the process, or prior *raw builds* of the project. The two disagree as
//! soon as builds and promotions interleave, so both are modeled behind one
//! trait and selected per process in configuration; the evaluator itself
//! never knows the source.

mod provider;
mod store;

pub use provider::{BuildHistory, HistoryProvider, LedgerHistory};
pub use store::ProjectBuildStore;
