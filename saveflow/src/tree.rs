use crate::element::Element;
use tokio::sync::broadcast;

/// Notification that the tree's structure changed in some way.
///
/// Carries no payload: a waiter re-runs its predicate against the current
/// tree rather than interpreting the mutation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMutation;

/// The mutable hierarchical structure of on-screen elements the engine
/// observes and acts upon.
///
/// The engine never parses markup or styles; it sees the tree only through
/// this trait and the per-node [`ElementImpl`](crate::element::ElementImpl)
/// operations.
#[async_trait::async_trait]
pub trait VisualTree: Send + Sync {
    /// All nodes whose role is in `roles`, in document order. An empty
    /// role list scans every node. A `root` element restricts the scan to
    /// that element's subtree.
    fn scan(&self, roles: &[String], root: Option<&Element>) -> Vec<Element>;

    /// Subscribe to structural-mutation notifications. Each call returns
    /// an independent receiver; subscriptions are dropped by dropping it.
    fn subscribe(&self) -> broadcast::Receiver<TreeMutation>;

    /// Resolves once the hosting page has finished its initial load.
    /// Resolves immediately when load already completed by the time the
    /// engine attaches.
    async fn wait_ready(&self);
}
