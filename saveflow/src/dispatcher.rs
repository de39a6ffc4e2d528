use crate::actions::Actions;
use crate::config::EngineConfig;
use crate::errors::FlowError;
use crate::flows::{save_flow, LoginFlow, LoginPhase};
use crate::nav::Navigator;
use crate::state::RedirectSlot;
use crate::tree::VisualTree;
use crate::workflow::{RunReport, Sequencer};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// What kind of page the engine woke up on, derived purely from the
/// current URL and the presence of known form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClassification {
    SavePage,
    LoginPage,
    LandingPage,
    Other,
}

/// Classify the current page.
///
/// Login wins over the path heuristics: a login form can be served under
/// any path, so the redirect parameter and credential fields are checked
/// first.
pub fn classify(
    location: &Url,
    tree: &dyn VisualTree,
    config: &EngineConfig,
) -> PageClassification {
    let path = location.path();
    let has_goto = location
        .query_pairs()
        .any(|(key, _)| key.as_ref() == config.login.goto_param.as_str());
    let has_credential_field = tree.scan(&config.roles.inputs, None).iter().any(|el| {
        el.name()
            .is_some_and(|n| config.login.credential_fields.contains(&n))
    });

    if path.starts_with(&config.pages.login_path_prefix) || has_goto || has_credential_field {
        PageClassification::LoginPage
    } else if path.starts_with(&config.pages.save_path_prefix) {
        PageClassification::SavePage
    } else if config.pages.landing_paths.iter().any(|p| p == path) {
        PageClassification::LandingPage
    } else {
        PageClassification::Other
    }
}

/// What one dispatch did.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A pending redirect was forced; the page is being torn down.
    Redirected(Url),
    Save(RunReport),
    Login(LoginPhase),
    /// No applicable workflow; the page was left untouched.
    Untouched,
}

/// Classifies the page on each load and invokes the matching workflow, or
/// performs a pending redirect.
pub struct Dispatcher {
    tree: Arc<dyn VisualTree>,
    nav: Arc<dyn Navigator>,
    redirect: RedirectSlot,
    config: Arc<EngineConfig>,
}

impl Dispatcher {
    pub fn new(
        tree: Arc<dyn VisualTree>,
        nav: Arc<dyn Navigator>,
        redirect: RedirectSlot,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            tree,
            nav,
            redirect,
            config,
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn dispatch(&self) -> Result<DispatchOutcome, FlowError> {
        let location = self.nav.current_location();
        let class = classify(&location, self.tree.as_ref(), &self.config);
        debug!(location = %location, ?class, "dispatching");

        // Recovery path for sites that fail to auto-redirect after
        // authentication. The login page itself never consumes the slot
        // here; the login flow does that once it finishes.
        if class != PageClassification::LoginPage {
            if let Some(target) = self.redirect.take()? {
                if location == target {
                    info!(target = %target, "arrived at pending redirect target");
                } else if class == PageClassification::LandingPage {
                    info!(target = %target, "forcing pending redirect");
                    self.nav.navigate(&target)?;
                    return Ok(DispatchOutcome::Redirected(target));
                } else {
                    // Neither the landing page nor the target; the slot
                    // must outlive this page load.
                    self.redirect.arm(&target)?;
                }
            }
        }

        match class {
            PageClassification::SavePage => {
                let workflow = save_flow(&self.config);
                let actions = Actions::new(self.config.timeouts.settle());
                let sequencer =
                    Sequencer::new(self.tree.clone(), actions, self.config.timeouts.clone());
                Ok(DispatchOutcome::Save(sequencer.run(&workflow).await))
            }
            PageClassification::LoginPage => {
                let actions = Actions::new(self.config.timeouts.settle());
                let flow = LoginFlow::new(
                    self.tree.clone(),
                    self.nav.clone(),
                    self.redirect.clone(),
                    actions,
                    self.config.clone(),
                );
                let phase = flow.run().await?;
                if let Some(report) = phase.manual_intervention() {
                    warn!(%report, "login flow halted");
                }
                Ok(DispatchOutcome::Login(phase))
            }
            PageClassification::LandingPage | PageClassification::Other => {
                debug!("no applicable workflow, leaving page untouched");
                Ok(DispatchOutcome::Untouched)
            }
        }
    }
}
