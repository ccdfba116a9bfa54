use promo_condition::{evaluate_quantity, GateReason, QuantityConfig};
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

/// A non-success anywhere in the first `threshold` entries refuses promotion,
/// and the scan stops at the first offender.
#[test]
fn failure_in_second_entry_breaks_the_streak() {
    let cfg = QuantityConfig { threshold: 2 };
    let window = win(&[
        (12, BuildResult::Success),
        (11, BuildResult::Failure),
        (10, BuildResult::Success),
    ]);

    let d = evaluate_quantity(&cfg, &window, BuildResult::Success, None).unwrap();

    assert!(!d.promote);
    assert_eq!(d.reason, GateReason::StreakBroken { build_number: 11 });
    assert_eq!(d.inspected, 2, "scan must stop at the failing entry");
}

/// Failing first entry vs. failing last-of-T entry: both refuse, and the
/// inspected counts show the scan did the minimal work each time.
#[test]
fn scan_stops_at_first_non_success() {
    let cfg = QuantityConfig { threshold: 3 };

    let first_fails = win(&[
        (20, BuildResult::Failure),
        (19, BuildResult::Success),
        (18, BuildResult::Success),
    ]);
    let d = evaluate_quantity(&cfg, &first_fails, BuildResult::Success, None).unwrap();
    assert!(!d.promote);
    assert_eq!(d.inspected, 1, "first entry failing needs one look");

    let last_fails = win(&[
        (20, BuildResult::Success),
        (19, BuildResult::Success),
        (18, BuildResult::Unstable),
    ]);
    let d = evaluate_quantity(&cfg, &last_fails, BuildResult::Success, None).unwrap();
    assert!(!d.promote);
    assert_eq!(d.reason, GateReason::StreakBroken { build_number: 18 });
    assert_eq!(d.inspected, 3, "last-of-T failing needs exactly T looks");
}

/// An unstable historical entry breaks the streak like any other non-success.
#[test]
fn unstable_history_entry_is_not_a_success() {
    let cfg = QuantityConfig { threshold: 2 };
    let window = win(&[(6, BuildResult::Unstable), (5, BuildResult::Success)]);

    let d = evaluate_quantity(&cfg, &window, BuildResult::Success, None).unwrap();

    assert!(!d.promote);
    assert_eq!(d.reason, GateReason::StreakBroken { build_number: 6 });
}
