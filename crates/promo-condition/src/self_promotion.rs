use promo_schemas::{Badge, BuildResult, ConditionKind};

use crate::condition::{ConditionOutcome, PromotionCondition};
use crate::error::EvalError;
use crate::types::{EvalContext, GateReason, SelfPromotionConfig};

/// Does the completing build qualify on its own result?
///
/// Success always qualifies, unstable only when configured, anything else
/// never does.
pub fn self_promotion_met(cfg: &SelfPromotionConfig, result: BuildResult) -> bool {
    match result {
        BuildResult::Success => true,
        BuildResult::Unstable => cfg.even_if_unstable,
        BuildResult::Failure | BuildResult::Aborted | BuildResult::NotBuilt => false,
    }
}

/// Self-promotion gate as a [`PromotionCondition`]. Looks only at the
/// triggering build; consumes no history.
pub struct SelfPromotionCondition {
    cfg: SelfPromotionConfig,
}

impl SelfPromotionCondition {
    pub fn new(cfg: SelfPromotionConfig) -> Self {
        Self { cfg }
    }
}

impl PromotionCondition for SelfPromotionCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::SelfPromotion
    }

    fn is_met(&self, cx: &EvalContext<'_>) -> Result<ConditionOutcome, EvalError> {
        if self_promotion_met(&self.cfg, cx.build.result) {
            Ok(ConditionOutcome::Met(Badge {
                condition: ConditionKind::SelfPromotion,
                consumed: Vec::new(),
            }))
        } else {
            Ok(ConditionOutcome::NotMet(GateReason::ResultNotPromotable))
        }
    }
}
