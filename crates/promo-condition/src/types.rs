use std::collections::BTreeSet;

use promo_schemas::{BuildRecord, WindowEntry};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Quantity gate configuration: how many consecutive recent window entries
/// must all be successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityConfig {
    /// Must be >= 1. Validated at the configuration boundary; the evaluator
    /// re-checks and fails closed.
    pub threshold: u32,
}

/// Self-promotion gate configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfPromotionConfig {
    /// Also promote when the completing build is unstable.
    pub even_if_unstable: bool,
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a gate decided the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum GateReason {
    Promoted,
    /// Fewer window entries than the threshold requires.
    InsufficientHistory { have: usize, need: u32 },
    /// An inspected entry was not a success; the scan stopped there.
    StreakBroken { build_number: u32 },
    /// The triggering build is unstable; unstable never promotes.
    UnstableVeto,
    /// An inspected entry was already consumed by an earlier promotion.
    AlreadyPromoted { build_number: u32 },
    /// The triggering build's own result does not qualify (self-promotion).
    ResultNotPromotable,
}

/// Outcome of one quantity-gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub promote: bool,
    pub reason: GateReason,
    /// Build numbers consumed by a promote decision (empty otherwise).
    pub consumed: Vec<u32>,
    /// How many window entries the scan actually inspected.
    pub inspected: usize,
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// Build numbers already consumed by an earlier promote decision of the same
/// process.
///
/// The evaluator only reads this. Extending it after a promotion is the
/// caller's job, serialized per process so two concurrent completions cannot
/// consume the same window twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    promoted: BTreeSet<u32>,
}

impl Watermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, build_number: u32) -> bool {
        self.promoted.contains(&build_number)
    }

    pub fn extend(&mut self, build_numbers: &[u32]) {
        self.promoted.extend(build_numbers.iter().copied());
    }

    pub fn len(&self) -> usize {
        self.promoted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a condition may look at for one completed build.
pub struct EvalContext<'a> {
    /// The build whose completion triggered this evaluation.
    pub build: &'a BuildRecord,
    /// Prior history, newest-first. Never contains the triggering build.
    pub window: &'a [WindowEntry],
    /// Already-consumed build numbers, when the caller tracks them.
    pub watermark: Option<&'a Watermark>,
}
