use promo_schemas::{Badge, ConditionKind};

use crate::error::EvalError;
use crate::types::{EvalContext, GateReason};

/// Outcome of asking one condition about one completed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// The condition is satisfied; the badge records what it consumed.
    Met(Badge),
    /// The condition is not satisfied.
    NotMet(GateReason),
}

impl ConditionOutcome {
    pub fn is_met(&self) -> bool {
        matches!(self, ConditionOutcome::Met(_))
    }
}

/// A single promotion condition.
///
/// A process promotes a build only when every one of its conditions is met.
/// Implementations must be pure: no mutation of the context, no I/O.
pub trait PromotionCondition: Send + Sync {
    fn kind(&self) -> ConditionKind;

    fn is_met(&self, cx: &EvalContext<'_>) -> Result<ConditionOutcome, EvalError>;
}
