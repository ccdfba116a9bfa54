use promo_condition::GateReason;
use promo_schemas::{Badge, BuildRecord};

/// Inbound "build completed" notification from the host build system.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub project: String,
    pub build: BuildRecord,
}

/// What one completion event did across a project's processes.
#[derive(Debug, Default)]
pub struct DispatchSummary {
    /// Processes that promoted the build, with the badges they attached.
    pub promoted: Vec<(String, Vec<Badge>)>,
    /// Processes whose conditions were not met.
    pub skipped: Vec<(String, GateReason)>,
    /// Processes that errored; the error never stops siblings.
    pub failed: Vec<(String, String)>,
}

impl DispatchSummary {
    pub fn promoted_by(&self, process: &str) -> Option<&[Badge]> {
        self.promoted
            .iter()
            .find(|(name, _)| name == process)
            .map(|(_, badges)| badges.as_slice())
    }

    pub fn skip_reason(&self, process: &str) -> Option<&GateReason> {
        self.skipped
            .iter()
            .find(|(name, _)| name == process)
            .map(|(_, reason)| reason)
    }
}
