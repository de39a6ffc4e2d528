use crate::element::Element;
use crate::errors::FlowError;
use crate::selector::MatchSpec;
use crate::tree::VisualTree;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(30);

type Predicate = dyn Fn(&Element) -> bool + Send + Sync;

/// What a locator looks for: a declarative [`MatchSpec`] or an explicit
/// predicate over candidate roles.
#[derive(Clone)]
pub enum Query {
    Spec(MatchSpec),
    Custom {
        label: String,
        roles: Vec<String>,
        accept: Arc<Predicate>,
    },
}

impl Query {
    pub fn custom(
        label: impl Into<String>,
        roles: Vec<String>,
        accept: impl Fn(&Element) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Custom {
            label: label.into(),
            roles,
            accept: Arc::new(accept),
        }
    }
}

impl From<MatchSpec> for Query {
    fn from(spec: MatchSpec) -> Self {
        Self::Spec(spec)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spec(spec) => write!(f, "{spec}"),
            Self::Custom { label, .. } => write!(f, "<{label}>"),
        }
    }
}

/// Finds elements in the visual tree, either immediately against the
/// current snapshot or by waiting for the tree to mutate into a matching
/// state under a bounded timeout.
#[derive(Clone)]
pub struct Locator {
    tree: Arc<dyn VisualTree>,
    query: Query,
    timeout: Duration, // Default timeout for this locator instance
}

impl Locator {
    pub(crate) fn new(tree: Arc<dyn VisualTree>, query: Query) -> Self {
        Self {
            tree,
            query,
            timeout: DEFAULT_LOCATOR_TIMEOUT,
        }
    }

    /// Set a default timeout for waiting operations on this locator
    /// instance, used when no specific timeout is passed to `wait`.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scan the current tree snapshot and return the first match in
    /// document order, without waiting.
    pub fn locate_now(&self) -> Option<Element> {
        match &self.query {
            Query::Spec(spec) => self.locate_spec(spec),
            Query::Custom { roles, accept, .. } => self
                .tree
                .scan(roles, None)
                .into_iter()
                .find(|el| accept(el)),
        }
    }

    fn locate_spec(&self, spec: &MatchSpec) -> Option<Element> {
        let container = match &spec.within {
            Some(inner) => Some(self.locate_spec(inner)?),
            None => None,
        };
        self.tree
            .scan(&spec.roles, container.as_ref())
            .into_iter()
            .find(|el| spec.matches(el))
    }

    /// Wait for a matching element to appear, up to `timeout` (or this
    /// locator's default).
    ///
    /// The subscription is taken before the first check so a mutation
    /// landing between check and subscribe cannot be missed; the predicate
    /// re-runs on every structural notification until the deadline.
    #[instrument(level = "debug", skip(self, timeout), fields(query = ?self.query))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<Element, FlowError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + effective_timeout;
        let mut mutations = self.tree.subscribe();

        if let Some(element) = self.locate_now() {
            trace!("element present on first check");
            return Ok(element);
        }
        debug!("element absent, waiting on tree mutations");

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(self.timeout_error(effective_timeout));
                }
                received = mutations.recv() => match received {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if let Some(element) = self.locate_now() {
                            return Ok(element);
                        }
                    }
                    Err(RecvError::Closed) => {
                        // No further mutations can arrive; the predicate
                        // cannot start succeeding, so wait out the budget.
                        tokio::time::sleep_until(deadline).await;
                        return Err(self.timeout_error(effective_timeout));
                    }
                }
            }
        }
    }

    fn timeout_error(&self, timeout: Duration) -> FlowError {
        FlowError::Timeout(format!(
            "timed out after {timeout:?} waiting for element {:?}",
            self.query
        ))
    }
}

/// Re-run `check` every `interval` until it yields a value or `ceiling`
/// elapses.
///
/// A bounded periodic poll rather than an event-driven wait: it watches
/// for changes made by an external (human) agent, which the host
/// environment does not guarantee notifications for. Cancellable by
/// dropping the returned future.
pub async fn poll_until<T, F>(interval: Duration, ceiling: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + ceiling;
    loop {
        if let Some(found) = check() {
            return Some(found);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        let remaining = deadline.saturating_duration_since(now);
        tokio::time::sleep(interval.min(remaining)).await;
    }
}
