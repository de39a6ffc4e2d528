//! Declarative workflows and the step sequencer.
//!
//! A workflow is an ordered list of steps; each step names what to look
//! for, what to do with it, and what a miss means. Site revisions differ
//! only in the step tables, never in sequencer code.

use crate::actions::Actions;
use crate::config::Timeouts;
use crate::errors::FlowError;
use crate::locator::{Locator, Query};
use crate::selector::MatchSpec;
use crate::tree::VisualTree;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// What to do with a located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    #[default]
    Activate,
    ToggleIfUnchecked,
    Hover,
}

/// One tier of a step's match policy: a spec to wait for, the action to
/// perform on it, and optionally a control to hover first so a hidden
/// target renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTarget {
    pub spec: MatchSpec,
    #[serde(default)]
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal: Option<MatchSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl StepTarget {
    pub fn activate(spec: MatchSpec) -> Self {
        Self {
            spec,
            action: StepAction::Activate,
            reveal: None,
            timeout_ms: None,
        }
    }

    pub fn toggle(spec: MatchSpec) -> Self {
        Self {
            action: StepAction::ToggleIfUnchecked,
            ..Self::activate(spec)
        }
    }

    pub fn revealed_by(mut self, reveal: MatchSpec) -> Self {
        self.reveal = Some(reveal);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// One step of a workflow.
///
/// The fallback is a second locate attempt with a different spec (and
/// possibly a different action), not a retry loop: it runs once, only
/// after the primary target misses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub description: String,
    pub primary: StepTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<StepTarget>,
    /// Whether a miss aborts the remaining workflow instead of logging a
    /// warning.
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl WorkflowStep {
    pub fn new(description: impl Into<String>, primary: StepTarget) -> Self {
        Self {
            description: description.into(),
            primary,
            fallback: None,
            required: false,
            timeout_ms: None,
        }
    }

    pub fn with_fallback(mut self, fallback: StepTarget) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

/// Terminal result of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// An action failed on `last_step` (zero-based) after every earlier
    /// step completed.
    PartiallyCompleted { last_step: usize, reason: String },
    /// A required step missed; `reason` is that step's description.
    Aborted { reason: String },
}

/// What a run produced: the outcome plus the warnings emitted for
/// optional steps that missed.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub workflow: String,
    pub outcome: Outcome,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

enum StepError {
    /// No element satisfied the step's match policy within its budget.
    Missed(String),
    /// An element was found but acting on it failed.
    Action(FlowError),
}

fn missed(err: FlowError) -> StepError {
    match err {
        FlowError::Timeout(msg) | FlowError::ElementNotFound(msg) => StepError::Missed(msg),
        other => StepError::Action(other),
    }
}

/// Runs workflows strictly in step order, short-circuiting on fatal
/// failures and logging non-fatal ones. Never retries a failed action;
/// the caller decides whether to resume or stop.
pub struct Sequencer {
    tree: Arc<dyn VisualTree>,
    actions: Actions,
    timeouts: Timeouts,
}

impl Sequencer {
    pub fn new(tree: Arc<dyn VisualTree>, actions: Actions, timeouts: Timeouts) -> Self {
        Self {
            tree,
            actions,
            timeouts,
        }
    }

    #[instrument(level = "info", skip(self, workflow), fields(workflow = %workflow.name))]
    pub async fn run(&self, workflow: &Workflow) -> RunReport {
        info!(steps = workflow.steps.len(), "running workflow");
        let mut warnings = Vec::new();
        for (index, step) in workflow.steps.iter().enumerate() {
            debug!(step = index + 1, description = %step.description, "starting step");
            match self.run_step(step).await {
                Ok(()) => {}
                Err(StepError::Missed(detail)) if step.required => {
                    error!(
                        step = index + 1,
                        description = %step.description,
                        detail = %detail,
                        "required step failed, aborting workflow"
                    );
                    return RunReport {
                        workflow: workflow.name.clone(),
                        outcome: Outcome::Aborted {
                            reason: step.description.clone(),
                        },
                        warnings,
                    };
                }
                Err(StepError::Missed(detail)) => {
                    let message = format!("{}: {detail}", step.description);
                    warn!(step = index + 1, "skipping optional step: {message}");
                    warnings.push(message);
                }
                Err(StepError::Action(err)) => {
                    error!(
                        step = index + 1,
                        description = %step.description,
                        error = %err,
                        "action failed, stopping workflow"
                    );
                    return RunReport {
                        workflow: workflow.name.clone(),
                        outcome: Outcome::PartiallyCompleted {
                            last_step: index,
                            reason: err.to_string(),
                        },
                        warnings,
                    };
                }
            }
        }
        info!("workflow completed");
        RunReport {
            workflow: workflow.name.clone(),
            outcome: Outcome::Completed,
            warnings,
        }
    }

    async fn run_step(&self, step: &WorkflowStep) -> Result<(), StepError> {
        let step_timeout = step
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.timeouts.step());
        let primary_timeout = step
            .primary
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(step_timeout);

        match self.attempt(&step.primary, primary_timeout).await {
            Ok(()) => Ok(()),
            Err(StepError::Missed(primary_miss)) => {
                let Some(fallback) = &step.fallback else {
                    return Err(StepError::Missed(primary_miss));
                };
                debug!(description = %step.description, "primary target missed, attempting fallback");
                let fallback_timeout = fallback
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.timeouts.fallback());
                self.attempt(fallback, fallback_timeout)
                    .await
                    .map_err(|e| match e {
                        StepError::Missed(fallback_miss) => StepError::Missed(format!(
                            "{primary_miss}; fallback: {fallback_miss}"
                        )),
                        other => other,
                    })
            }
            Err(other) => Err(other),
        }
    }

    async fn attempt(&self, target: &StepTarget, timeout: Duration) -> Result<(), StepError> {
        if let Some(reveal) = &target.reveal {
            let revealer = self
                .locator(reveal.clone())
                .wait(Some(timeout))
                .await
                .map_err(missed)?;
            self.actions
                .hover_reveal(&revealer, &reveal.to_string())
                .await
                .map_err(StepError::Action)?;
        }
        let desc = target.spec.to_string();
        let element = self
            .locator(target.spec.clone())
            .wait(Some(timeout))
            .await
            .map_err(missed)?;
        match target.action {
            StepAction::Activate => self.actions.activate(&element, &desc).await,
            StepAction::ToggleIfUnchecked => self
                .actions
                .toggle_if_unchecked(&element, &desc)
                .await
                .map(|_| ()),
            StepAction::Hover => self.actions.hover_reveal(&element, &desc).await,
        }
        .map_err(StepError::Action)
    }

    fn locator(&self, spec: MatchSpec) -> Locator {
        Locator::new(self.tree.clone(), Query::Spec(spec))
    }
}
