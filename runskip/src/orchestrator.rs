//! Decision orchestrator.
//!
//! [`Decider`] sequences the components for one invocation:
//!
//! 1. compile the configuration (fatal on error, before any remote call)
//! 2. fetch the current run and load the memo ledger
//! 3. build the run registry
//! 4. cancel outdated runs, if enabled
//! 5. do-not-skip trigger events
//! 6. duplicate detection, if enabled
//! 7. concurrency resolution, unless the policy is `never`
//! 8. path backtracking, if any filter is configured
//! 9. otherwise "don't skip" with `no_transferable_run`
//!
//! The first conclusive step wins. The decision is recorded in the ledger,
//! which is pruned and persisted before returning, also when evaluation
//! ends with a known-failure error.

use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::backtrack::{backtrack, compile_filters, BacktrackResult, CompiledFilter};
use crate::config::{ConcurrencyPolicy, SkipConfig, GLOBAL_FILTER};
use crate::context::RunContext;
use crate::core::{FilterVerdict, SkipReason, Step, Verdict};
use crate::errors::{IdentityField, SkipError};
use crate::events::{EventKind, EventSink, NoOpEventSink};
use crate::ledger::{ledger_prefix, LedgerStore, MemoLedger, RecordedDecision};
use crate::observability::SpanTimer;
use crate::output::DecisionReport;
use crate::platform::{ArtifactStore, CiPlatform, RawRun};
use crate::policies::{cancel_outdated, check_do_not_skip, detect_duplicates, resolve_concurrency};
use crate::registry::RunRegistry;

static NOOP_SINK: NoOpEventSink = NoOpEventSink;

/// Decides whether one run should be skipped.
pub struct Decider<'a> {
    config: &'a SkipConfig,
    platform: &'a dyn CiPlatform,
    artifacts: &'a dyn ArtifactStore,
    sink: &'a dyn EventSink,
}

impl std::fmt::Debug for Decider<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Mutable state of one evaluation.
#[derive(Default)]
struct Evaluation {
    trace: Vec<String>,
    paths: Option<BacktrackResult>,
    cancelled: Vec<u64>,
}

impl Evaluation {
    fn note(&mut self, line: impl Into<String>) {
        self.trace.push(line.into());
    }
}

impl<'a> Decider<'a> {
    /// Creates a decider that emits no audit events.
    #[must_use]
    pub fn new(
        config: &'a SkipConfig,
        platform: &'a dyn CiPlatform,
        artifacts: &'a dyn ArtifactStore,
    ) -> Self {
        Self {
            config,
            platform,
            artifacts,
            sink: &NOOP_SINK,
        }
    }

    /// Sets the audit event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: &'a dyn EventSink) -> Self {
        self.sink = sink;
        self
    }

    /// Evaluates the run identified by `ctx`.
    ///
    /// Returns an error only for fatal conditions: invalid configuration,
    /// a current run without identity, or an identical run that already
    /// failed. Remote failures degrade to a "don't skip" report.
    pub async fn decide(&self, ctx: &RunContext) -> Result<DecisionReport, SkipError> {
        self.config.validate()?;
        let filters = compile_filters(self.config)?;
        let mut eval = Evaluation::default();

        let raw_current = match self.platform.get_run(ctx.run_id).await {
            Ok(run) => run,
            Err(err) => {
                warn!(run_id = ctx.run_id, error = %err, "Could not fetch current run");
                eval.note(format!("could not fetch current run: {err}"));
                let verdict = self.degraded_verdict(ctx, &mut eval).await;
                return Ok(self.finish_report(verdict, eval).await);
            }
        };
        let workflow_id = raw_current
            .workflow_id
            .ok_or_else(|| SkipError::missing_identity(ctx.run_id, IdentityField::WorkflowId))?;

        let ledger_store = LedgerStore::new(
            self.artifacts,
            ledger_prefix(workflow_id, ctx.job_or_default()),
        );
        let timer = SpanTimer::start("ledger_load");
        let (mut ledger, ledger_loaded) = match ledger_store.load().await {
            Ok(ledger) => (ledger, true),
            Err(err) => {
                warn!(error = %err, "Could not load memo ledger, continuing without it");
                eval.note(format!("memo ledger unavailable: {err}"));
                (MemoLedger::new(), false)
            }
        };
        timer.finish();
        self.sink
            .emit(
                EventKind::LedgerLoaded,
                json!({
                    "prefix": ledger_store.prefix(),
                    "entries": ledger.len(),
                    "available": ledger_loaded,
                }),
            )
            .await;

        let outcome = self
            .evaluate(ctx, &raw_current, &filters, &mut ledger, &mut eval)
            .await;

        let decision = match &outcome {
            Ok(verdict) => RecordedDecision {
                should_skip: verdict.should_skip,
                reason: Some(verdict.reason),
                skipped_by: verdict.cause.as_ref().map(|r| r.id),
                filters: filter_verdicts(eval.paths.as_ref()),
                error: None,
            },
            Err(err) => RecordedDecision {
                should_skip: false,
                reason: None,
                skipped_by: None,
                filters: filter_verdicts(eval.paths.as_ref()),
                error: Some(err.to_string()),
            },
        };
        if ledger_loaded {
            self.persist(&ledger_store, &mut ledger, ctx.run_id, decision).await;
        } else {
            warn!("Not persisting the memo ledger; the previous one could not be read");
        }

        match outcome {
            Ok(verdict) => Ok(self.finish_report(verdict, eval).await),
            Err(err) => {
                self.sink
                    .emit(EventKind::Final, json!({"should_skip": false, "error": err.to_dict()}))
                    .await;
                Err(err)
            }
        }
    }

    async fn evaluate(
        &self,
        ctx: &RunContext,
        raw_current: &RawRun,
        filters: &[CompiledFilter],
        ledger: &mut MemoLedger,
        eval: &mut Evaluation,
    ) -> Result<Verdict, SkipError> {
        let timer = SpanTimer::start("registry");
        let registry = match RunRegistry::resolve(ctx, raw_current, self.platform, ledger).await {
            Ok(registry) => registry,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(run_id = ctx.run_id, error = %err, "Could not load sibling runs");
                eval.note(format!("could not load sibling runs: {err}"));
                return Ok(self.degraded_verdict(ctx, eval).await);
            }
        };
        timer.finish();
        let current = registry.current();
        eval.note(format!(
            "current run {} tested tree {}",
            current.label(),
            current.tree_hash
        ));

        if self.config.cancel_others {
            let outcome = cancel_outdated(&registry, self.platform).await;
            if !outcome.is_empty() {
                eval.note(format!(
                    "cancel_others: cancelled {:?}, failed {:?}",
                    outcome.cancelled,
                    outcome.failed.iter().map(|(id, _)| id).collect::<Vec<_>>()
                ));
                self.sink
                    .emit(EventKind::Cancel, serde_json::to_value(&outcome)?)
                    .await;
            }
            eval.cancelled = outcome.cancelled;
        }

        if let Step::Conclude(verdict) = check_do_not_skip(&ctx.event, &self.config.do_not_skip) {
            eval.note(format!("do_not_skip: trigger event '{}' is exempt", ctx.event));
            self.sink
                .emit(EventKind::DoNotSkip, json!({"event": ctx.event}))
                .await;
            return Ok(verdict);
        }

        if self.config.skip_after_successful_duplicate {
            match detect_duplicates(&registry) {
                Ok(Step::Conclude(verdict)) => {
                    let cause = verdict.cause.as_ref().map(|r| r.id);
                    eval.note(format!(
                        "skip_after_successful_duplicate: run {} succeeded on tree {}",
                        cause.unwrap_or_default(),
                        current.tree_hash
                    ));
                    self.sink
                        .emit(EventKind::Duplicate, json!({"cause_run_id": cause}))
                        .await;
                    return Ok(verdict);
                }
                Ok(Step::Continue) => eval.note("skip_after_successful_duplicate: no successful duplicate"),
                Err(err) => {
                    eval.note(format!("skip_after_successful_duplicate: {err}"));
                    self.sink
                        .emit(EventKind::Duplicate, json!({"error": err.to_dict()}))
                        .await;
                    return Err(err);
                }
            }
        }

        if self.config.concurrent_skipping != ConcurrencyPolicy::Never {
            let policy = self.config.concurrent_skipping;
            if let Step::Conclude(verdict) = resolve_concurrency(&registry, policy) {
                let cause = verdict.cause.as_ref().map(|r| r.id);
                eval.note(format!(
                    "concurrent_skipping ({policy}): run {} is in flight",
                    cause.unwrap_or_default()
                ));
                self.sink
                    .emit(
                        EventKind::Concurrency,
                        json!({"policy": policy, "cause_run_id": cause}),
                    )
                    .await;
                return Ok(verdict);
            }
            eval.note(format!("concurrent_skipping ({policy}): no qualifying run"));
        }

        if !filters.is_empty() {
            let timer = SpanTimer::start("backtrack");
            let result = backtrack(filters, &ctx.commit_sha, &registry, self.platform).await;
            timer.finish();

            for (name, state) in result.iter() {
                eval.note(format!(
                    "paths: filter '{name}' resolved {} after {} commit(s)",
                    state.verdict, state.distance
                ));
            }
            self.sink
                .emit(
                    EventKind::Paths,
                    json!({
                        "steps": result.steps(),
                        "end": result.end,
                        "filters": filter_verdicts(Some(&result)),
                    }),
                )
                .await;

            let global_skip = self
                .config
                .has_global_filter()
                .then(|| result.get(GLOBAL_FILTER))
                .flatten()
                .filter(|s| s.verdict == FilterVerdict::Skip)
                .and_then(|s| s.cause.clone());
            eval.paths = Some(result);
            if let Some(cause) = global_skip {
                return Ok(Verdict::skip(SkipReason::Paths, cause));
            }
        }

        eval.note("no_transferable_run: nothing justified a skip");
        Ok(Verdict::run(SkipReason::NoTransferableRun))
    }

    /// Verdict when sibling runs are unavailable.
    async fn degraded_verdict(&self, ctx: &RunContext, eval: &mut Evaluation) -> Verdict {
        match check_do_not_skip(&ctx.event, &self.config.do_not_skip) {
            Step::Conclude(verdict) => {
                eval.note(format!("do_not_skip: trigger event '{}' is exempt", ctx.event));
                self.sink
                    .emit(EventKind::DoNotSkip, json!({"event": ctx.event}))
                    .await;
                verdict
            }
            Step::Continue => Verdict::run(SkipReason::NoTransferableRun),
        }
    }

    async fn persist(
        &self,
        store: &LedgerStore<'_>,
        ledger: &mut MemoLedger,
        run_id: u64,
        decision: RecordedDecision,
    ) {
        ledger.record_decision(run_id, decision);
        let pruned = ledger.prune(self.config.ledger_retention);

        let timer = SpanTimer::start("ledger_persist");
        match store
            .persist(ledger, run_id, self.config.ledger_blob_retention)
            .await
        {
            Ok(blob) => {
                self.sink
                    .emit(
                        EventKind::LedgerPersisted,
                        json!({"blob": blob, "entries": ledger.len(), "pruned": pruned}),
                    )
                    .await;
            }
            Err(err) => warn!(error = %err, "Could not persist memo ledger"),
        }
        timer.finish();
    }

    async fn finish_report(&self, verdict: Verdict, eval: Evaluation) -> DecisionReport {
        let mut report = DecisionReport::new(verdict);
        if let Some(paths) = &eval.paths {
            report = report.with_paths(paths);
        }
        let report = report
            .with_cancelled(eval.cancelled)
            .with_trace(eval.trace);

        info!(
            should_skip = report.should_skip,
            reason = %report.reason,
            cause_run_id = report.skipped_by.as_ref().map(|r| r.id),
            "Decision"
        );
        self.sink
            .emit(
                EventKind::Final,
                json!({
                    "should_skip": report.should_skip,
                    "reason": report.reason,
                    "cause_run_id": report.skipped_by.as_ref().map(|r| r.id),
                }),
            )
            .await;
        report
    }
}

fn filter_verdicts(result: Option<&BacktrackResult>) -> BTreeMap<String, FilterVerdict> {
    result
        .map(|r| {
            r.iter()
                .map(|(name, state)| (name.to_string(), state.verdict))
                .collect()
        })
        .unwrap_or_default()
}

/// Evaluates `ctx` with `config` and no audit sink.
pub async fn decide(
    ctx: &RunContext,
    config: &SkipConfig,
    platform: &dyn CiPlatform,
    artifacts: &dyn ArtifactStore,
) -> Result<DecisionReport, SkipError> {
    Decider::new(config, platform, artifacts).decide(ctx).await
}
