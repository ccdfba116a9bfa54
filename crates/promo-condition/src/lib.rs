mod condition;
mod error;
mod quantity;
mod self_promotion;
mod types;

pub use condition::{ConditionOutcome, PromotionCondition};
pub use error::EvalError;
pub use quantity::{evaluate_quantity, QuantityCondition};
pub use self_promotion::{self_promotion_met, SelfPromotionCondition};
pub use types::{
    EvalContext, GateDecision, GateReason, QuantityConfig, SelfPromotionConfig, Watermark,
};
