use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use promo_condition::{
    ConditionOutcome, EvalContext, PromotionCondition, QuantityCondition, SelfPromotionCondition,
    Watermark,
};
use promo_config::{HistorySource, ValidatedCondition, ValidatedProcess, ValidatedProject};
use promo_history::{BuildHistory, HistoryProvider, LedgerHistory, ProjectBuildStore};
use promo_ledger::PromotionLedger;
use promo_schemas::{Badge, BuildRecord};
use tracing::{info, warn};

use crate::event::{CompletionEvent, DispatchSummary};

// ---------------------------------------------------------------------------
// Per-process runtime
// ---------------------------------------------------------------------------

/// Ledger handle and watermark share one lock: evaluate, append, extend is
/// a single exclusive section per process.
struct ProcessState {
    ledger: PromotionLedger,
    watermark: Watermark,
}

struct ProcessRuntime {
    name: String,
    window_limit: usize,
    provider: Box<dyn HistoryProvider>,
    conditions: Vec<Box<dyn PromotionCondition>>,
    state: Mutex<ProcessState>,
}

enum Consideration {
    Promoted(Vec<Badge>),
    Skipped(promo_condition::GateReason),
}

impl ProcessRuntime {
    fn new(
        def: &ValidatedProcess,
        project: &str,
        ledger_dir: &Path,
        builds: Arc<ProjectBuildStore>,
    ) -> Result<Self> {
        let ledger_path = ledger_dir.join(format!("{}.jsonl", def.name));
        let ledger = PromotionLedger::open(&ledger_path)?;

        // Rebuild the watermark from what earlier promotions consumed, so a
        // restart cannot hand the same window out twice.
        let mut watermark = Watermark::new();
        for record in promo_ledger::read_newest_first(&ledger_path, Some(&def.name), usize::MAX)? {
            for badge in &record.badges {
                watermark.extend(&badge.consumed);
            }
        }

        let provider: Box<dyn HistoryProvider> = match def.history {
            HistorySource::Promotions => {
                Box::new(LedgerHistory::new(ledger_path.clone(), def.name.clone()))
            }
            HistorySource::Builds => Box::new(BuildHistory::new(builds, project.to_string())),
        };

        let conditions: Vec<Box<dyn PromotionCondition>> = def
            .conditions
            .iter()
            .map(|c| match c {
                ValidatedCondition::BuildQuantity(cfg) => {
                    Box::new(QuantityCondition::new(*cfg)) as Box<dyn PromotionCondition>
                }
                ValidatedCondition::SelfPromotion(cfg) => Box::new(SelfPromotionCondition::new(*cfg)),
            })
            .collect();

        Ok(Self {
            name: def.name.clone(),
            window_limit: def.window_limit(),
            provider,
            conditions,
            state: Mutex::new(ProcessState { ledger, watermark }),
        })
    }

    fn consider(&self, build: &BuildRecord) -> Result<Consideration> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("process {:?} state lock poisoned", self.name))?;

        let window = self.provider.window(self.window_limit)?;
        let cx = EvalContext {
            build,
            window: &window,
            watermark: Some(&state.watermark),
        };

        // All conditions must badge; the first refusal decides the skip
        // reason, like the first failing entry decides a streak break.
        let mut badges = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            match condition.is_met(&cx)? {
                ConditionOutcome::Met(badge) => badges.push(badge),
                ConditionOutcome::NotMet(reason) => return Ok(Consideration::Skipped(reason)),
            }
        }

        let record = state
            .ledger
            .append(&self.name, build.number, build.result, badges)?;
        for badge in &record.badges {
            state.watermark.extend(&badge.consumed);
        }

        Ok(Consideration::Promoted(record.badges))
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Runs one project's promotion processes against completed builds.
pub struct Dispatcher {
    project: String,
    processes: Vec<ProcessRuntime>,
    builds: Arc<ProjectBuildStore>,
}

impl Dispatcher {
    /// Ledger files live under `ledger_dir`, one per process. Existing
    /// ledgers are resumed, chain and watermark included.
    pub fn new(project: ValidatedProject, ledger_dir: impl AsRef<Path>) -> Result<Self> {
        let builds = Arc::new(ProjectBuildStore::new());
        let mut processes = Vec::with_capacity(project.processes.len());
        for def in &project.processes {
            processes.push(ProcessRuntime::new(
                def,
                &project.project,
                ledger_dir.as_ref(),
                Arc::clone(&builds),
            )?);
        }
        Ok(Self {
            project: project.project,
            processes,
            builds,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Seed a prior build into the raw-build history without evaluating it.
    /// Hosts use this to backfill project history at boot.
    pub fn backfill_build(&self, build: &BuildRecord) {
        self.builds.record(&self.project, build);
    }

    /// Consider every process for one completed build.
    ///
    /// Per-process errors are logged and collected; they never stop the
    /// remaining processes and never escape to the caller.
    pub fn on_build_completed(&self, event: &CompletionEvent) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        if event.project != self.project {
            return summary;
        }

        for process in &self.processes {
            match process.consider(&event.build) {
                Ok(Consideration::Promoted(badges)) => {
                    info!(
                        process = %process.name,
                        build = event.build.number,
                        "build promoted"
                    );
                    summary.promoted.push((process.name.clone(), badges));
                }
                Ok(Consideration::Skipped(reason)) => {
                    summary.skipped.push((process.name.clone(), reason));
                }
                Err(err) => {
                    warn!(
                        process = %process.name,
                        build = event.build.number,
                        error = %format!("{err:#}"),
                        "promotion consideration failed"
                    );
                    summary.failed.push((process.name.clone(), format!("{err:#}")));
                }
            }
        }

        // The completing build becomes prior history for later events only.
        self.builds.record(&event.project, &event.build);

        summary
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Routes completion events to the dispatcher of the owning project.
/// The host-facing `on_build_completed` entry point for multi-project setups.
#[derive(Default)]
pub struct Registry {
    dispatchers: HashMap<String, Dispatcher>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dispatcher: Dispatcher) {
        self.dispatchers
            .insert(dispatcher.project().to_string(), dispatcher);
    }

    /// None when the project has no promotion processes configured.
    pub fn on_build_completed(&self, event: &CompletionEvent) -> Option<DispatchSummary> {
        self.dispatchers
            .get(&event.project)
            .map(|d| d.on_build_completed(event))
    }
}
