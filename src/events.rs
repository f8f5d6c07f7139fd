//! Structured batch events and the observers that receive them.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::codec::ContainerFormat;

/// Something that happened while processing a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// Inputs beyond the batch limit were dropped.
    Truncated { supplied: usize, limit: usize },
    /// A path was classified and decoded (`decode_failed` tells whether reading worked).
    Decoded {
        index: usize,
        total: usize,
        path: PathBuf,
        format: ContainerFormat,
        decode_failed: bool,
    },
    /// An edited copy was written.
    Written { source: PathBuf, dest: PathBuf },
    /// An edited copy could not be written.
    WriteFailed { source: PathBuf, reason: String },
}

/// Receives batch events. Implementations must not panic.
pub trait BatchObserver {
    fn on_event(&self, event: &BatchEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn on_event(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Truncated { supplied, limit } => {
                log::warn!("{supplied} inputs supplied, only the first {limit} are processed");
            }
            BatchEvent::Decoded {
                index,
                total,
                path,
                format,
                decode_failed,
            } => {
                if *decode_failed {
                    log::warn!("[{}/{}] Could not read metadata: {}", index + 1, total, path.display());
                } else if *format == ContainerFormat::Unsupported {
                    log::warn!("[{}/{}] Unsupported format: {}", index + 1, total, path.display());
                } else {
                    log::info!("[{}/{}] Read {}", index + 1, total, path.display());
                }
            }
            BatchEvent::Written { source, dest } => {
                log::info!("Wrote {} -> {}", source.display(), dest.display());
            }
            BatchEvent::WriteFailed { source, reason } => {
                log::error!("Failed to write {}: {reason}", source.display());
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<BatchEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl BatchObserver for RecordingObserver {
    fn on_event(&self, event: &BatchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
