use crate::errors::FlowError;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Durable key-value collaborator. Values survive full page reloads and
/// process teardown; the engine uses it for exactly one slot.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, FlowError>;
    fn set(&self, key: &str, value: &str) -> Result<(), FlowError>;
    fn delete(&self, key: &str) -> Result<(), FlowError>;
}

/// The pending-redirect slot.
///
/// At most one pending redirect exists at a time: `arm` overwrites any
/// prior value, and `take` is read-and-clear, so a value is consumed
/// exactly once.
#[derive(Clone)]
pub struct RedirectSlot {
    store: Arc<dyn StateStore>,
    key: String,
}

impl RedirectSlot {
    pub fn new(store: Arc<dyn StateStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Record `target` as the pending redirect, replacing any prior value.
    pub fn arm(&self, target: &Url) -> Result<(), FlowError> {
        info!(target = %target, "arming pending redirect");
        self.store.set(&self.key, target.as_str())
    }

    /// Read and clear the slot. A stored value that no longer parses as a
    /// URL is discarded rather than wedging every later dispatch.
    pub fn take(&self) -> Result<Option<Url>, FlowError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        self.store.delete(&self.key)?;
        match Url::parse(&raw) {
            Ok(url) => {
                debug!(target = %url, "consumed pending redirect");
                Ok(Some(url))
            }
            Err(e) => {
                warn!(raw = %raw, error = %e, "dropping unparseable pending redirect");
                Ok(None)
            }
        }
    }
}
