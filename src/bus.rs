use std::sync::Arc;
use tokio::sync::broadcast;

use gridwalk_navigation::WorldPoint;

/// Broadcast topic with bounded capacity.
/// Slow subscribers miss old messages instead of blocking publishers.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, msg: T) {
        let _ = self.tx.send(Arc::new(msg));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

/// An agent moved.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub agent: Arc<str>,
    pub position: WorldPoint,
}
