use std::sync::Arc;

use depot_protocol::{
    DataWindow, Direction, TransferError, TransferEvent, TransferEventType, TransferListener,
    TransferResource,
};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    New,
    Initiated,
    Started,
    Finished,
}

/// Emits the event sequence of one transfer.
///
/// The monitor owns the transfer's byte count and phase, so the listener
/// always observes `INITIATED -> STARTED -> PROGRESSED* -> terminal`:
/// - calls that would break the order are dropped and logged;
/// - a terminal call before `initiated` emits INITIATED first;
/// - empty chunks produce no PROGRESSED event;
/// - a monitor dropped before a terminal event emits FAILED (cancelled).
pub struct TransferMonitor {
    listener: Arc<dyn TransferListener>,
    resource: Arc<TransferResource>,
    direction: Direction,
    transferred: u64,
    phase: Phase,
}

impl TransferMonitor {
    pub fn new(
        listener: Arc<dyn TransferListener>,
        resource: Arc<TransferResource>,
        direction: Direction,
    ) -> Self {
        Self {
            listener,
            resource,
            direction,
            transferred: 0,
            phase: Phase::New,
        }
    }

    pub fn resource(&self) -> &Arc<TransferResource> {
        &self.resource
    }

    pub fn initiated(&mut self) {
        if self.expect(Phase::New, TransferEventType::Initiated) {
            self.phase = Phase::Initiated;
            self.emit(self.event(TransferEventType::Initiated));
        }
    }

    pub fn started(&mut self) {
        if self.expect(Phase::Initiated, TransferEventType::Started) {
            self.phase = Phase::Started;
            self.emit(self.event(TransferEventType::Started));
        }
    }

    /// Reports a chunk that was just moved.
    pub fn progressed(&mut self, chunk: Arc<[u8]>) {
        if chunk.is_empty() || !self.expect(Phase::Started, TransferEventType::Progressed) {
            return;
        }
        self.transferred += chunk.len() as u64;
        let event = self
            .event(TransferEventType::Progressed)
            .with_data(DataWindow::from_chunk(chunk));
        self.emit(event);
    }

    pub fn succeeded(&mut self) {
        if self.expect(Phase::Started, TransferEventType::Succeeded) {
            self.finish(TransferEventType::Succeeded, None);
        }
    }

    /// Ends the transfer with FAILED, or CORRUPTED if `error` is an
    /// integrity violation.
    pub fn failed(&mut self, error: TransferError) {
        let event_type = if error.is_corruption() {
            TransferEventType::Corrupted
        } else {
            TransferEventType::Failed
        };
        match self.phase {
            Phase::Finished => {
                warn!(
                    resource = %self.resource,
                    error = %error,
                    "failure reported after transfer finished"
                );
            }
            Phase::New => {
                self.initiated();
                self.finish(event_type, Some(error));
            }
            Phase::Initiated | Phase::Started => self.finish(event_type, Some(error)),
        }
    }

    fn finish(&mut self, event_type: TransferEventType, error: Option<TransferError>) {
        self.phase = Phase::Finished;
        let mut event = self.event(event_type);
        if let Some(error) = error {
            event = event.with_error(Arc::new(error));
        }
        self.emit(event);
    }

    fn expect(&self, phase: Phase, next: TransferEventType) -> bool {
        if self.phase == phase {
            return true;
        }
        warn!(
            resource = %self.resource,
            phase = ?self.phase,
            event = %next,
            "out-of-order transfer event dropped"
        );
        false
    }

    fn event(&self, event_type: TransferEventType) -> TransferEvent {
        TransferEvent::new(event_type, Arc::clone(&self.resource), self.direction)
            .with_transferred_bytes(self.transferred)
    }

    fn emit(&self, event: TransferEvent) {
        trace!(event = %event, "transfer event");
        self.listener.transfer_event(&event);
    }
}

impl Drop for TransferMonitor {
    fn drop(&mut self) {
        if matches!(self.phase, Phase::Initiated | Phase::Started) {
            self.finish(TransferEventType::Failed, Some(TransferError::Cancelled));
        }
    }
}
