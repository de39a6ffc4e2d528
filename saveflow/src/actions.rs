use crate::element::Element;
use crate::errors::FlowError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// The two mutation primitives the engine has against the visual tree,
/// plus the toggle convenience built on top of them. Every action is
/// followed by a fixed settle delay so the resulting UI mutation can begin
/// before the next step observes the tree.
#[derive(Clone, Copy, Debug)]
pub struct Actions {
    settle: Duration,
}

impl Actions {
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    /// Simulate a user click on `element`. A hidden element is first
    /// forced visible; some overlay implementations keep functional
    /// controls unrendered until hover, and a click must still land.
    pub async fn activate(&self, element: &Element, desc: &str) -> Result<(), FlowError> {
        if !element.is_visible() {
            debug!(desc, "forcing hidden control visible before click");
            element.force_visible()?;
        }
        element.click()?;
        info!(desc, "activated");
        sleep(self.settle).await;
        Ok(())
    }

    /// Activate a binary control only when it is unchecked. Idempotent:
    /// returns `false` without a click when already checked.
    pub async fn toggle_if_unchecked(
        &self,
        element: &Element,
        desc: &str,
    ) -> Result<bool, FlowError> {
        if element.is_checked()? {
            debug!(desc, "already checked, leaving untouched");
            return Ok(false);
        }
        self.activate(element, desc).await?;
        Ok(true)
    }

    /// Synthesize a pointer-hover sequence over `element`, then settle so
    /// hover-revealed controls have a chance to render before the caller
    /// re-locates them.
    pub async fn hover_reveal(&self, element: &Element, desc: &str) -> Result<(), FlowError> {
        element.hover()?;
        info!(desc, "hovered");
        sleep(self.settle).await;
        Ok(())
    }
}
