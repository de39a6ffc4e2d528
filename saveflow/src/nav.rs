use crate::errors::FlowError;
use url::Url;

/// Navigation collaborator: where the page currently is and how to leave it.
///
/// `navigate` tears down the current page context; nothing observed from
/// the tree before the call is valid afterwards.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> Url;
    fn navigate(&self, url: &Url) -> Result<(), FlowError>;
}
