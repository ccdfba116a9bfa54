use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use promo_schemas::WindowEntry;

use crate::store::ProjectBuildStore;

/// Source of the history window the quantity gate scans.
///
/// Implementations return entries newest-first with strictly descending
/// build numbers; the evaluator rejects anything else as invalid input.
pub trait HistoryProvider: Send + Sync {
    fn window(&self, limit: usize) -> Result<Vec<WindowEntry>>;
}

/// Prior promotions of one process, read back from its ledger file.
///
/// This is the primary source: the rule asks "did the last N promotion runs
/// of this process succeed".
pub struct LedgerHistory {
    path: PathBuf,
    process: String,
}

impl LedgerHistory {
    pub fn new(path: impl Into<PathBuf>, process: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            process: process.into(),
        }
    }
}

impl HistoryProvider for LedgerHistory {
    fn window(&self, limit: usize) -> Result<Vec<WindowEntry>> {
        let records = promo_ledger::read_newest_first(&self.path, Some(&self.process), limit)?;
        Ok(records
            .iter()
            .map(|r| WindowEntry {
                build_number: r.target_build,
                result: r.result,
            })
            .collect())
    }
}

/// Prior raw builds of the owning project — the divergent revision's source.
pub struct BuildHistory {
    store: Arc<ProjectBuildStore>,
    project: String,
}

impl BuildHistory {
    pub fn new(store: Arc<ProjectBuildStore>, project: impl Into<String>) -> Self {
        Self {
            store,
            project: project.into(),
        }
    }
}

impl HistoryProvider for BuildHistory {
    fn window(&self, limit: usize) -> Result<Vec<WindowEntry>> {
        Ok(self.store.window(&self.project, limit))
    }
}
