use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of a completed build, as reported by the host build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
    NotBuilt,
}

impl BuildResult {
    pub fn is_success(self) -> bool {
        matches!(self, BuildResult::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildResult::Success => "success",
            BuildResult::Unstable => "unstable",
            BuildResult::Failure => "failure",
            BuildResult::Aborted => "aborted",
            BuildResult::NotBuilt => "not_built",
        }
    }
}

/// A completed build of a project. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub number: u32,
    pub result: BuildResult,
    pub completed_at_utc: DateTime<Utc>,
}

/// One entry of a history window: the id and result of a prior record.
///
/// Windows are ordered newest-first; build numbers are strictly descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub build_number: u32,
    pub result: BuildResult,
}

/// Which condition produced a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    BuildQuantity,
    SelfPromotion,
}

/// Marker attached to a promoted build: which condition fired and which
/// historical build numbers it consumed (empty for conditions that do not
/// consume a window).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub condition: ConditionKind,
    pub consumed: Vec<u32>,
}

/// Ledger entry for one fired promotion.
///
/// `result` is the target build's result at promotion time. `hash_prev` /
/// `hash_self` form the ledger's hash chain; `event_id` is derived
/// deterministically from chain state, never from RNG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub event_id: Uuid,
    pub seq: u64,
    pub process: String,
    pub target_build: u32,
    pub result: BuildResult,
    pub badges: Vec<Badge>,
    pub ts_utc: DateTime<Utc>,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}
