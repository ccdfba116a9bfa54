use promo_condition::{evaluate_quantity, GateReason, QuantityConfig, Watermark};
use promo_schemas::{BuildResult, WindowEntry};

fn win(entries: &[(u32, BuildResult)]) -> Vec<WindowEntry> {
    entries
        .iter()
        .map(|&(build_number, result)| WindowEntry {
            build_number,
            result,
        })
        .collect()
}

/// The same clean window evaluated twice promotes once: after the caller
/// extends the watermark with the consumed numbers, the second evaluation
/// reports the overlap instead of promoting again.
#[test]
fn same_window_promotes_only_once() {
    let cfg = QuantityConfig { threshold: 2 };
    let window = win(&[(7, BuildResult::Success), (6, BuildResult::Success)]);
    let mut wm = Watermark::new();

    let first = evaluate_quantity(&cfg, &window, BuildResult::Success, Some(&wm)).unwrap();
    assert!(first.promote);
    assert_eq!(first.consumed, vec![7, 6]);

    // Caller-side bookkeeping, exactly as the dispatcher does it.
    wm.extend(&first.consumed);

    let second = evaluate_quantity(&cfg, &window, BuildResult::Success, Some(&wm)).unwrap();
    assert!(!second.promote, "overlapping window must not promote twice");
    assert_eq!(second.reason, GateReason::AlreadyPromoted { build_number: 7 });
}

/// A partially overlapping window is also refused: one already-consumed entry
/// inside the inspected slice is enough.
#[test]
fn partial_overlap_is_refused() {
    let cfg = QuantityConfig { threshold: 2 };
    let mut wm = Watermark::new();
    wm.extend(&[6]);

    let window = win(&[(7, BuildResult::Success), (6, BuildResult::Success)]);
    let d = evaluate_quantity(&cfg, &window, BuildResult::Success, Some(&wm)).unwrap();

    assert!(!d.promote);
    assert_eq!(d.reason, GateReason::AlreadyPromoted { build_number: 6 });
}

/// A fresh window past the watermark promotes again.
#[test]
fn disjoint_window_promotes_again() {
    let cfg = QuantityConfig { threshold: 2 };
    let mut wm = Watermark::new();
    wm.extend(&[7, 6]);

    let window = win(&[(9, BuildResult::Success), (8, BuildResult::Success)]);
    let d = evaluate_quantity(&cfg, &window, BuildResult::Success, Some(&wm)).unwrap();

    assert!(d.promote, "disjoint window must promote: {:?}", d.reason);
    assert_eq!(d.consumed, vec![9, 8]);
}

/// The evaluator never mutates the watermark; without caller-side extension
/// the same window keeps promoting (the stateless base rule).
#[test]
fn without_extension_the_rule_stays_stateless() {
    let cfg = QuantityConfig { threshold: 2 };
    let window = win(&[(7, BuildResult::Success), (6, BuildResult::Success)]);
    let wm = Watermark::new();

    for _ in 0..2 {
        let d = evaluate_quantity(&cfg, &window, BuildResult::Success, Some(&wm)).unwrap();
        assert!(d.promote);
    }
    assert!(wm.is_empty(), "evaluator must not mutate the watermark");
}

/// Watermark round-trips through JSON for caller-side persistence.
#[test]
fn watermark_json_round_trip() {
    let mut wm = Watermark::new();
    wm.extend(&[3, 1, 2]);

    let json = serde_json::to_string(&wm).unwrap();
    let back: Watermark = serde_json::from_str(&json).unwrap();

    assert_eq!(back, wm);
    assert_eq!(back.len(), 3);
    assert!(back.contains(2));
}
