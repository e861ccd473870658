use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

/// A call held open by the mock. The call returns once this handle is released or dropped.
#[derive(Debug)]
pub struct HeldCall {
    release: oneshot::Sender<()>,
}

impl HeldCall {
    /// Lets the held call return.
    pub fn release(self) {
        // The call may already be gone if the caller stopped polling it.
        let _ = self.release.send(());
    }
}

/// FIFO of gates: every call that passes through takes the oldest pending gate, if any.
#[derive(Debug, Clone, Default)]
pub(crate) struct Gates {
    pending: Arc<Mutex<VecDeque<oneshot::Receiver<()>>>>,
}

impl Gates {
    pub(crate) fn hold_next(&self) -> HeldCall {
        let (release, gate) = oneshot::channel();
        self.pending.lock().unwrap().push_back(gate);
        HeldCall { release }
    }

    pub(crate) async fn pass(&self) {
        let gate = { self.pending.lock().unwrap().pop_front() };
        if let Some(gate) = gate {
            // A dropped handle counts as a release.
            let _ = gate.await;
        }
    }
}
