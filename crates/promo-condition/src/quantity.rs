use promo_schemas::{Badge, BuildResult, ConditionKind, WindowEntry};

use crate::condition::{ConditionOutcome, PromotionCondition};
use crate::error::EvalError;
use crate::types::{EvalContext, GateDecision, GateReason, QuantityConfig, Watermark};

/// Evaluate the quantity gate for one completed build.
///
/// `window` is prior history, newest-first. Exactly `cfg.threshold` entries
/// are inspected and the scan stops at the first one that is not a success.
/// An unstable triggering build never promotes, even over a clean window.
///
/// On a promote decision, `consumed` lists the inspected build numbers so the
/// caller can extend its watermark; the watermark itself is never mutated
/// here.
pub fn evaluate_quantity(
    cfg: &QuantityConfig,
    window: &[WindowEntry],
    current: BuildResult,
    watermark: Option<&Watermark>,
) -> Result<GateDecision, EvalError> {
    // 0) Config sanity — validated upstream, re-checked so a zero threshold
    //    can never reach the window scan.
    if cfg.threshold == 0 {
        return Err(EvalError::InvalidConfiguration(
            "quantity threshold must be greater than zero".to_string(),
        ));
    }

    // 1) Structural check: newest-first means strictly descending numbers.
    validate_window(window)?;

    let need = cfg.threshold as usize;

    // 2) Not enough history yet.
    if window.len() < need {
        return Ok(GateDecision {
            promote: false,
            reason: GateReason::InsufficientHistory {
                have: window.len(),
                need: cfg.threshold,
            },
            consumed: Vec::new(),
            inspected: 0,
        });
    }

    // 3) Scan exactly the first `threshold` entries, stopping at the first
    //    non-success.
    let mut inspected = 0usize;
    for entry in &window[..need] {
        inspected += 1;
        if !entry.result.is_success() {
            return Ok(GateDecision {
                promote: false,
                reason: GateReason::StreakBroken {
                    build_number: entry.build_number,
                },
                consumed: Vec::new(),
                inspected,
            });
        }
    }

    // 4) Final veto: an unstable triggering build never promotes.
    if current == BuildResult::Unstable {
        return Ok(GateDecision {
            promote: false,
            reason: GateReason::UnstableVeto,
            consumed: Vec::new(),
            inspected,
        });
    }

    // 5) Don't consume a window an earlier promotion already consumed.
    if let Some(wm) = watermark {
        if let Some(hit) = window[..need].iter().find(|e| wm.contains(e.build_number)) {
            return Ok(GateDecision {
                promote: false,
                reason: GateReason::AlreadyPromoted {
                    build_number: hit.build_number,
                },
                consumed: Vec::new(),
                inspected,
            });
        }
    }

    let consumed: Vec<u32> = window[..need].iter().map(|e| e.build_number).collect();
    Ok(GateDecision {
        promote: true,
        reason: GateReason::Promoted,
        consumed,
        inspected,
    })
}

fn validate_window(window: &[WindowEntry]) -> Result<(), EvalError> {
    for pair in window.windows(2) {
        if pair[1].build_number >= pair[0].build_number {
            return Err(EvalError::InvalidInput(format!(
                "window must be newest-first: build {} follows build {}",
                pair[1].build_number, pair[0].build_number
            )));
        }
    }
    Ok(())
}

/// Quantity gate as a [`PromotionCondition`].
pub struct QuantityCondition {
    cfg: QuantityConfig,
}

impl QuantityCondition {
    pub fn new(cfg: QuantityConfig) -> Self {
        Self { cfg }
    }
}

impl PromotionCondition for QuantityCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::BuildQuantity
    }

    fn is_met(&self, cx: &EvalContext<'_>) -> Result<ConditionOutcome, EvalError> {
        let decision = evaluate_quantity(&self.cfg, cx.window, cx.build.result, cx.watermark)?;
        if decision.promote {
            Ok(ConditionOutcome::Met(Badge {
                condition: ConditionKind::BuildQuantity,
                consumed: decision.consumed,
            }))
        } else {
            Ok(ConditionOutcome::NotMet(decision.reason))
        }
    }
}
