use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use promo_schemas::{BuildRecord, WindowEntry};

/// In-memory store of completed builds per project, keyed by build number.
///
/// Feeds the `builds` history source. Keying by number makes re-delivered
/// completion events idempotent and keeps windows strictly descending even
/// when builds finish out of order.
#[derive(Debug, Default)]
pub struct ProjectBuildStore {
    inner: RwLock<BTreeMap<String, BTreeMap<u32, BuildRecord>>>,
}

impl ProjectBuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, project: &str, build: &BuildRecord) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        inner
            .entry(project.to_string())
            .or_default()
            .insert(build.number, build.clone());
    }

    /// The most recent builds of a project, newest-first.
    pub fn window(&self, project: &str, limit: usize) -> Vec<WindowEntry> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match inner.get(project) {
            Some(builds) => builds
                .values()
                .rev()
                .take(limit)
                .map(|b| WindowEntry {
                    build_number: b.number,
                    result: b.result,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self, project: &str) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(project).map(|b| b.len()).unwrap_or(0)
    }
}
