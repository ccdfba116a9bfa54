//! Quantity gate over the process's own promotion history: a clean streak
//! promotes, the watermark then refuses the overlapping window, a broken
//! streak or an unstable trigger never promotes.

use chrono::{TimeZone, Utc};
use promo_condition::GateReason;
use promo_dispatch::{CompletionEvent, Dispatcher};
use promo_ledger::{read_newest_first, PromotionLedger};
use promo_schemas::{BuildRecord, BuildResult};

const CONFIG: &str = r#"
project: app
processes:
  - name: promo-gate
    history: promotions
    conditions:
      - kind: build_quantity
        success_quantity: "2"
"#;

fn dispatcher(ledger_dir: &std::path::Path) -> Dispatcher {
    let project = promo_config::load_layered_yaml_from_strings(&[CONFIG])
        .unwrap()
        .into_project()
        .unwrap();
    Dispatcher::new(project, ledger_dir).unwrap()
}

fn event(number: u32, result: BuildResult) -> CompletionEvent {
    CompletionEvent {
        project: "app".to_string(),
        build: BuildRecord {
            number,
            result,
            completed_at_utc: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        },
    }
}

/// Earlier promotions of this process, as a restarted host would find them.
fn seed_promotions(ledger_dir: &std::path::Path, entries: &[(u32, BuildResult)]) {
    let mut ledger = PromotionLedger::open(ledger_dir.join("promo-gate.jsonl")).unwrap();
    for &(build, result) in entries {
        ledger.append("promo-gate", build, result, vec![]).unwrap();
    }
}

#[test]
fn clean_streak_promotes_then_watermark_blocks_the_overlap() {
    let dir = tempfile::tempdir().unwrap();
    seed_promotions(
        dir.path(),
        &[(3, BuildResult::Success), (4, BuildResult::Success)],
    );
    let d = dispatcher(dir.path());

    let summary = d.on_build_completed(&event(5, BuildResult::Success));
    let badges = summary.promoted_by("promo-gate").expect("clean streak promotes");
    assert_eq!(badges[0].consumed, vec![4, 3], "newest two promotions consumed");

    let records = read_newest_first(dir.path().join("promo-gate.jsonl"), None, 10).unwrap();
    assert_eq!(records.len(), 3, "the promotion was appended to the ledger");
    assert_eq!(records[0].target_build, 5);

    // Next event sees window [5, 4]; build 4 was already consumed.
    let summary = d.on_build_completed(&event(6, BuildResult::Success));
    assert_eq!(
        summary.skip_reason("promo-gate"),
        Some(&GateReason::AlreadyPromoted { build_number: 4 }),
        "overlapping window must not promote again"
    );
}

#[test]
fn no_history_never_promotes() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(dir.path());

    let summary = d.on_build_completed(&event(1, BuildResult::Success));
    assert_eq!(
        summary.skip_reason("promo-gate"),
        Some(&GateReason::InsufficientHistory { have: 0, need: 2 })
    );
}

#[test]
fn broken_promotion_streak_refuses() {
    let dir = tempfile::tempdir().unwrap();
    seed_promotions(
        dir.path(),
        &[(3, BuildResult::Success), (4, BuildResult::Failure)],
    );
    let d = dispatcher(dir.path());

    let summary = d.on_build_completed(&event(5, BuildResult::Success));
    assert_eq!(
        summary.skip_reason("promo-gate"),
        Some(&GateReason::StreakBroken { build_number: 4 })
    );
}

#[test]
fn unstable_trigger_vetoed_despite_clean_history() {
    let dir = tempfile::tempdir().unwrap();
    seed_promotions(
        dir.path(),
        &[(3, BuildResult::Success), (4, BuildResult::Success)],
    );
    let d = dispatcher(dir.path());

    let summary = d.on_build_completed(&event(5, BuildResult::Unstable));
    assert_eq!(
        summary.skip_reason("promo-gate"),
        Some(&GateReason::UnstableVeto)
    );
}

/// Restart with the same ledger directory: the watermark is rebuilt from the
/// consumed build numbers in the ledger, so the overlap stays blocked.
#[test]
fn restart_keeps_the_watermark() {
    let dir = tempfile::tempdir().unwrap();
    seed_promotions(
        dir.path(),
        &[(3, BuildResult::Success), (4, BuildResult::Success)],
    );

    {
        let d = dispatcher(dir.path());
        assert!(d
            .on_build_completed(&event(5, BuildResult::Success))
            .promoted_by("promo-gate")
            .is_some());
    }

    let d = dispatcher(dir.path());
    let summary = d.on_build_completed(&event(6, BuildResult::Success));
    assert_eq!(
        summary.skip_reason("promo-gate"),
        Some(&GateReason::AlreadyPromoted { build_number: 4 }),
        "restart must not forget consumed windows"
    );
}
