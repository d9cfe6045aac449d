use std::sync::Mutex;

use depot_protocol::{TransferEvent, TransferListener};

/// Keeps every event it receives, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingTransferListener {
    events: Mutex<Vec<TransferEvent>>,
}

impl RecordingTransferListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<TransferEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Removes and returns the events recorded so far.
    pub fn take(&self) -> Vec<TransferEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl TransferListener for RecordingTransferListener {
    fn transfer_event(&self, event: &TransferEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
