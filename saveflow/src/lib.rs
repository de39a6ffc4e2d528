//! Workflow automation for cloud-drive share pages
//!
//! This crate drives multi-step save and login workflows against a
//! mutating visual tree, inspired by Playwright's web automation model.
//! The hosting environment supplies the tree, navigation and durable
//! storage through traits; the engine only observes elements and acts on
//! them through two primitives, activate and hover.

use std::sync::Arc;
use tracing::instrument;

pub mod actions;
pub mod config;
pub mod dispatcher;
pub mod element;
pub mod errors;
pub mod flows;
pub mod locator;
pub mod nav;
pub mod selector;
pub mod state;
#[cfg(test)]
mod tests;
pub mod tree;
pub mod workflow;

pub use actions::Actions;
pub use config::EngineConfig;
pub use dispatcher::{classify, DispatchOutcome, Dispatcher, PageClassification};
pub use element::{Element, ElementAttributes, ElementImpl};
pub use errors::FlowError;
pub use flows::{save_flow, LoginFlow, LoginPhase};
pub use locator::{poll_until, Locator, Query};
pub use nav::Navigator;
pub use selector::{MatchSpec, TextMatch};
pub use state::{RedirectSlot, StateStore};
pub use tree::{TreeMutation, VisualTree};
pub use workflow::{Outcome, RunReport, Sequencer, Workflow, WorkflowStep};

/// The main entry point: one page load's worth of automation.
///
/// A session borrows its collaborators at construction and exposes the
/// engine layers from low (locators, actions) to high (dispatch).
pub struct Session {
    tree: Arc<dyn VisualTree>,
    nav: Arc<dyn Navigator>,
    store: Arc<dyn StateStore>,
    config: Arc<EngineConfig>,
}

impl Session {
    pub fn new(
        tree: Arc<dyn VisualTree>,
        nav: Arc<dyn Navigator>,
        store: Arc<dyn StateStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tree,
            nav,
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a locator for `query`, defaulting waits to the configured
    /// step timeout.
    #[instrument(skip(self, query))]
    pub fn locator(&self, query: impl Into<Query>) -> Locator {
        Locator::new(self.tree.clone(), query.into())
            .set_default_timeout(self.config.timeouts.step())
    }

    pub fn actions(&self) -> Actions {
        Actions::new(self.config.timeouts.settle())
    }

    pub fn redirect_slot(&self) -> RedirectSlot {
        RedirectSlot::new(self.store.clone(), self.config.redirect_key.clone())
    }

    /// Run an arbitrary workflow through the step sequencer.
    #[instrument(skip(self, workflow), fields(workflow = %workflow.name))]
    pub async fn run_workflow(&self, workflow: &Workflow) -> RunReport {
        let sequencer = Sequencer::new(
            self.tree.clone(),
            self.actions(),
            self.config.timeouts.clone(),
        );
        sequencer.run(workflow).await
    }

    /// Run the save-to-drive workflow.
    pub async fn save(&self) -> RunReport {
        self.run_workflow(&save_flow(&self.config)).await
    }

    /// Run the login/SMS workflow.
    pub async fn login(&self) -> Result<LoginPhase, FlowError> {
        LoginFlow::new(
            self.tree.clone(),
            self.nav.clone(),
            self.redirect_slot(),
            self.actions(),
            self.config.clone(),
        )
        .run()
        .await
    }

    /// Classify the current page and run whichever workflow applies.
    pub async fn dispatch(&self) -> Result<DispatchOutcome, FlowError> {
        Dispatcher::new(
            self.tree.clone(),
            self.nav.clone(),
            self.redirect_slot(),
            self.config.clone(),
        )
        .dispatch()
        .await
    }

    /// Wait for the hosting page to finish its initial load, then
    /// dispatch once. Resolves immediately when the page was already
    /// loaded by the time the engine attached.
    #[instrument(skip(self))]
    pub async fn attach(&self) -> Result<DispatchOutcome, FlowError> {
        self.tree.wait_ready().await;
        self.dispatch().await
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            nav: self.nav.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}
