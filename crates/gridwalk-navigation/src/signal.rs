//! Cooperative stop signal for a running plan.
//!
//! The driver checks the signal before each plan step and during settle
//! pauses; the mover checks it between advance steps. A stopped agent keeps
//! its current continuous position.

use tokio::sync::watch;

/// Owner side of a stop signal.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

/// Observer side of a stop signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected stop handle and signal.
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

impl StopHandle {
    /// Requests every connected signal to stop.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Creates another signal connected to this handle.
    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        StopSignal { rx }
    }

    /// True once a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop is requested. Pends forever if the handle is
    /// dropped without stopping.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        StopSignal::never()
    }
}
