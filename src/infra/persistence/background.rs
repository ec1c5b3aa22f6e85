//! Sink wrapper that moves persistence work off the scheduling path.
//!
//! Calls are turned into [`PersistenceEvent`]s and pushed onto an unbounded
//! channel; a dedicated writer thread applies them to the wrapped sink in
//! order. A slow or failing backend therefore never blocks the dispatcher or
//! a worker.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::core::persistence::{apply_event, PersistenceEvent};
use crate::core::{ExecutionRecord, PersistenceSink, SchedulerError, TaskDescriptor};
use crate::util::serde::TaskStatus;

/// Fire-and-forget front for another [`PersistenceSink`].
pub struct BackgroundPersistence {
    tx: Mutex<Option<Sender<PersistenceEvent>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundPersistence {
    /// Start the writer thread for `sink`.
    ///
    /// # Errors
    ///
    /// `Persistence` if the writer thread cannot be spawned.
    pub fn spawn<S>(sink: S) -> Result<Self, SchedulerError>
    where
        S: PersistenceSink + 'static,
    {
        let (tx, rx) = unbounded::<PersistenceEvent>();
        let writer = thread::Builder::new()
            .name("persistence-writer".into())
            .spawn(move || {
                for event in rx {
                    if let Err(e) = apply_event(&sink, &event) {
                        warn!(error = %e, "background persistence write failed");
                    }
                }
                debug!("persistence writer drained, exiting");
            })
            .map_err(|e| SchedulerError::Persistence(format!("spawn writer: {e}")))?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Stop accepting events, flush everything queued, and join the writer.
    pub fn close(&self) {
        self.tx.lock().take();
        if let Some(writer) = self.writer.lock().take() {
            if writer.join().is_err() {
                warn!("persistence writer panicked");
            }
        }
    }

    fn send(&self, event: PersistenceEvent) -> Result<(), SchedulerError> {
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return Err(SchedulerError::Persistence("background sink closed".into()));
        };
        tx.send(event)
            .map_err(|_| SchedulerError::Persistence("persistence writer stopped".into()))
    }
}

impl Drop for BackgroundPersistence {
    fn drop(&mut self) {
        // Dropping the sender lets the writer drain and exit on its own.
        self.tx.lock().take();
    }
}

impl PersistenceSink for BackgroundPersistence {
    fn save_task(&self, task: &TaskDescriptor, status: TaskStatus) -> Result<(), SchedulerError> {
        self.send(PersistenceEvent::TaskSaved {
            task: task.clone(),
            status,
        })
    }

    fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<(), SchedulerError> {
        self.send(PersistenceEvent::StatusUpdated {
            task_id: task_id.to_owned(),
            status,
        })
    }

    fn save_execution_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        self.send(PersistenceEvent::RecordSaved(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::InMemoryPersistence;

    #[test]
    fn test_events_reach_inner_sink_in_order() {
        let inner = Arc::new(InMemoryPersistence::default());
        let bg = BackgroundPersistence::spawn(Arc::clone(&inner)).unwrap();

        bg.update_status("a", TaskStatus::Running).unwrap();
        bg.update_status("b", TaskStatus::Running).unwrap();
        bg.save_execution_record(&ExecutionRecord::completed("a", "alpha", 0, 1))
            .unwrap();
        bg.close();

        assert_eq!(inner.dispatch_order(), ["a", "b"]);
        assert_eq!(inner.events().len(), 3);
    }

    #[test]
    fn test_send_after_close_fails() {
        let bg = BackgroundPersistence::spawn(InMemoryPersistence::default()).unwrap();
        bg.close();
        assert!(matches!(
            bg.update_status("a", TaskStatus::Running),
            Err(SchedulerError::Persistence(_))
        ));
    }
}
