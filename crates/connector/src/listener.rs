use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use depot_protocol::{TransferEvent, TransferEventType, TransferListener};
use tracing::{debug, info, trace, warn};

/// Logs transfer events through `tracing`, with throughput on success.
#[derive(Debug, Default)]
pub struct LoggingTransferListener {
    started: Mutex<HashMap<usize, Instant>>,
}

impl LoggingTransferListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferListener for LoggingTransferListener {
    fn transfer_event(&self, event: &TransferEvent) {
        let resource = event.resource();
        // Identity of the transfer: one shared resource per request.
        let key = std::sync::Arc::as_ptr(resource) as usize;
        let direction = event.request_type();

        match event.event_type() {
            TransferEventType::Initiated => {
                self.started.lock().unwrap().insert(key, Instant::now());
                debug!(resource = %resource, %direction, "transfer initiated");
            }
            TransferEventType::Started => {
                debug!(
                    resource = %resource,
                    %direction,
                    content_length = resource.content_length(),
                    "transfer started"
                );
            }
            TransferEventType::Progressed => {
                trace!(
                    resource = %resource,
                    transferred = event.transferred_bytes(),
                    chunk = event.data_length(),
                    "transfer progressed"
                );
            }
            TransferEventType::Succeeded => {
                let started = self.started.lock().unwrap().remove(&key);
                let bytes = event.transferred_bytes();
                let secs = started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0);
                let kib_per_sec = if secs > 0.0 {
                    bytes as f64 / 1024.0 / secs
                } else {
                    0.0
                };
                info!(
                    resource = %resource,
                    %direction,
                    bytes,
                    elapsed_ms = (secs * 1000.0) as u64,
                    kib_per_sec,
                    "transfer succeeded"
                );
            }
            TransferEventType::Failed | TransferEventType::Corrupted => {
                self.started.lock().unwrap().remove(&key);
                warn!(
                    resource = %resource,
                    %direction,
                    event = %event.event_type(),
                    transferred = event.transferred_bytes(),
                    error = %event.error().map(|e| e.to_string()).unwrap_or_default(),
                    "transfer did not complete"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use depot_protocol::{Artifact, Direction, TransferError, TransferResource};

    fn resource() -> Arc<TransferResource> {
        Arc::new(TransferResource::new(
            "file:///repo/",
            "g/a/1/a-1.jar",
            "/tmp/a-1.jar",
            Artifact::new("g", "a", "", "jar", "1").into(),
        ))
    }

    #[test]
    fn tracks_transfers_until_terminal() {
        let listener = LoggingTransferListener::new();
        let ok = resource();
        let failed = resource();

        for r in [&ok, &failed] {
            listener.transfer_event(&TransferEvent::new(
                TransferEventType::Initiated,
                Arc::clone(r),
                Direction::Download,
            ));
        }
        assert_eq!(listener.started.lock().unwrap().len(), 2);

        listener.transfer_event(
            &TransferEvent::new(TransferEventType::Succeeded, ok, Direction::Download)
                .with_transferred_bytes(10),
        );
        listener.transfer_event(
            &TransferEvent::new(TransferEventType::Failed, failed, Direction::Download)
                .with_error(Arc::new(TransferError::Cancelled)),
        );
        assert!(listener.started.lock().unwrap().is_empty());
    }
}
