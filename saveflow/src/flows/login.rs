use crate::actions::Actions;
use crate::config::EngineConfig;
use crate::element::Element;
use crate::errors::FlowError;
use crate::locator::{poll_until, Locator, Query};
use crate::nav::Navigator;
use crate::selector::MatchSpec;
use crate::state::RedirectSlot;
use crate::tree::VisualTree;
use std::fmt;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Phases of the login/SMS sub-flow. `AwaitingCredentials` and `TimedOut`
/// are the two halts that wait on a human; everything else progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    Init,
    AwaitingCredentials,
    AwaitingOtpDispatch,
    AwaitingOtpEntry,
    Submitted,
    Done,
    TimedOut,
}

impl fmt::Display for LoginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::AwaitingCredentials => "awaiting-credentials",
            Self::AwaitingOtpDispatch => "awaiting-otp-dispatch",
            Self::AwaitingOtpEntry => "awaiting-otp-entry",
            Self::Submitted => "submitted",
            Self::Done => "done",
            Self::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

impl LoginPhase {
    /// The report owed when the flow halted waiting on a human. These are
    /// expected outcomes, surfaced at warn level, never hard errors.
    pub fn manual_intervention(&self) -> Option<FlowError> {
        match self {
            Self::AwaitingCredentials => Some(FlowError::ManualInterventionRequired(
                "credential fields were not populated by the external agent".to_string(),
            )),
            Self::TimedOut => Some(FlowError::ManualInterventionRequired(
                "one-time code entry did not complete within its budget".to_string(),
            )),
            _ => None,
        }
    }
}

/// Drives the login form, including the SMS one-time-code step, and
/// resumes the interrupted workflow through the pending-redirect slot.
pub struct LoginFlow {
    tree: Arc<dyn VisualTree>,
    nav: Arc<dyn Navigator>,
    redirect: RedirectSlot,
    actions: Actions,
    config: Arc<EngineConfig>,
}

impl LoginFlow {
    pub fn new(
        tree: Arc<dyn VisualTree>,
        nav: Arc<dyn Navigator>,
        redirect: RedirectSlot,
        actions: Actions,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            tree,
            nav,
            redirect,
            actions,
            config,
        }
    }

    /// Run the state machine to a terminal phase. `Ok` phases other than
    /// `Done` mean the flow halted on a step only a human can finish.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self) -> Result<LoginPhase, FlowError> {
        let timeouts = &self.config.timeouts;

        debug!(phase = %LoginPhase::Init, "login flow starting");
        let location = self.nav.current_location();
        if let Some(target) = self.redirect_target(&location) {
            self.redirect.arm(&target)?;
        }
        if let Some(switch) = self
            .control_locator(&self.config.texts.login_mode_switch)
            .locate_now()
        {
            self.actions.activate(&switch, "login mode switch").await?;
        }

        // Autofill timing is unobservable from the tree, so this wait is a
        // fixed delay rather than event-driven.
        debug!(phase = %LoginPhase::AwaitingCredentials, "granting the external agent time to fill credentials");
        sleep(timeouts.credential_wait()).await;
        if !self.credentials_filled() {
            warn!("credential fields still empty after the autofill delay");
            return Ok(LoginPhase::AwaitingCredentials);
        }

        let submit = self
            .control_locator(&self.config.texts.login_submit)
            .wait(Some(timeouts.fallback()))
            .await
            .map_err(|_| {
                FlowError::UnexpectedPageState(
                    "login page has no credential submit control".to_string(),
                )
            })?;
        self.actions.activate(&submit, "credential submit").await?;

        // Absence of the code dialog inside the bounded wait means the
        // account signed in directly.
        match self
            .otp_input_locator(0)
            .wait(Some(timeouts.otp_dialog()))
            .await
        {
            Err(FlowError::Timeout(_)) => {
                debug!("no code dialog appeared, assuming direct sign-in");
            }
            Err(other) => return Err(other),
            Ok(_) => {
                debug!(phase = %LoginPhase::AwaitingOtpDispatch, "code dialog detected");
                match self
                    .control_locator(&self.config.texts.send_code)
                    .locate_now()
                {
                    Some(button) => self.actions.activate(&button, "send code").await?,
                    None => debug!("no send-code control, code may already be on its way"),
                }

                info!(phase = %LoginPhase::AwaitingOtpEntry, "polling for code entry");
                let min_len = self.config.login.min_otp_len;
                let code_input = self.otp_input_locator(min_len);
                let entered = poll_until(timeouts.otp_poll(), timeouts.otp_ceiling(), || {
                    code_input.locate_now()
                })
                .await;
                if entered.is_none() {
                    return Ok(LoginPhase::TimedOut);
                }

                let accept = self
                    .control_locator(&self.config.texts.otp_submit)
                    .wait(Some(timeouts.fallback()))
                    .await
                    .map_err(|_| {
                        FlowError::UnexpectedPageState(
                            "code dialog has no submit control".to_string(),
                        )
                    })?;
                self.actions.activate(&accept, "code submit").await?;
            }
        }

        debug!(phase = %LoginPhase::Submitted, "waiting for the session to settle");
        sleep(timeouts.settle()).await;
        if let Some(target) = self.redirect.take()? {
            if self.nav.current_location() != target {
                info!(target = %target, "login finished, redirecting to pending target");
                self.nav.navigate(&target)?;
            }
        }
        Ok(LoginPhase::Done)
    }

    /// Extract the redirect target carried by the login URL. A relative
    /// value is resolved against the login page itself.
    fn redirect_target(&self, location: &Url) -> Option<Url> {
        let raw = location
            .query_pairs()
            .find(|(key, _)| key.as_ref() == self.config.login.goto_param.as_str())
            .map(|(_, value)| value.into_owned())?;
        Url::parse(&raw).or_else(|_| location.join(&raw)).ok()
    }

    /// Whether the external agent has populated every credential field
    /// present on the page. No fields at all counts as unfilled.
    fn credentials_filled(&self) -> bool {
        let fields: Vec<Element> = self
            .tree
            .scan(&self.config.roles.inputs, None)
            .into_iter()
            .filter(|el| {
                el.name()
                    .is_some_and(|n| self.config.login.credential_fields.contains(&n))
            })
            .collect();
        !fields.is_empty() && fields.iter().all(|f| !f.value().trim().is_empty())
    }

    fn control_locator(&self, texts: &[String]) -> Locator {
        let spec = MatchSpec::contains(self.config.roles.controls.clone(), texts.to_vec());
        Locator::new(self.tree.clone(), Query::Spec(spec))
    }

    /// A visible text input that is not one of the credential fields and
    /// holds at least `min_len` entered characters.
    ///
    /// Any visible non-credential input can satisfy this; a page carrying
    /// a second unrelated input would be picked up first.
    fn otp_input_locator(&self, min_len: usize) -> Locator {
        let credential_fields = self.config.login.credential_fields.clone();
        let query = Query::custom(
            format!("sms code input (len >= {min_len})"),
            self.config.roles.inputs.clone(),
            move |el: &Element| {
                el.is_visible()
                    && !el.name().is_some_and(|n| credential_fields.contains(&n))
                    && el.value().trim().chars().count() >= min_len
            },
        );
        Locator::new(self.tree.clone(), query)
    }
}
