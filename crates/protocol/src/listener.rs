use crate::event::TransferEvent;

/// Observer of transfer events.
///
/// Called synchronously, once per event, in emission order for each
/// transfer. Events of different transfers may interleave. Connectors in
/// this workspace invoke the listener only from the task driving the batch
/// call, so invocations for one batch never overlap; the `Send + Sync`
/// bound still lets a listener be shared across connectors and threads.
pub trait TransferListener: Send + Sync {
    fn transfer_event(&self, event: &TransferEvent);
}

impl<F> TransferListener for F
where
    F: Fn(&TransferEvent) + Send + Sync,
{
    fn transfer_event(&self, event: &TransferEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransferListener;

impl TransferListener for NoopTransferListener {
    fn transfer_event(&self, _event: &TransferEvent) {}
}
