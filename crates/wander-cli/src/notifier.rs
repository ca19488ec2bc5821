//! Terminal notifications.
//!
//! Each scheduled request becomes a tokio task that sleeps for its trigger
//! delay and then writes the alert to stderr, ringing the terminal bell.
//! Repeating requests keep firing at the same period until cleared.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;
use wander_core::{NotificationError, NotificationRequest, Notifier};

pub struct TerminalNotifier {
    handle: Handle,
    pending: Mutex<HashMap<Uuid, Vec<JoinHandle<()>>>>,
    delivered: Arc<AtomicUsize>,
}

impl TerminalNotifier {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            pending: Mutex::new(HashMap::new()),
            delivered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of alerts written so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

fn deliver(request: &NotificationRequest) {
    let mut line = format!("\x07*** {}", request.title);
    if let Some(body) = &request.body {
        line.push(' ');
        line.push_str(body);
    }
    if let Some(sound) = &request.sound {
        line.push_str(&format!(" [{sound}]"));
    }
    let mut stderr = std::io::stderr().lock();
    // A closed stderr leaves nothing to report to.
    let _ = writeln!(stderr, "{line}");
}

impl Notifier for TerminalNotifier {
    fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        if request.repeating && request.trigger_delay.is_zero() {
            return Err(NotificationError::Rejected {
                id: request.id,
                message: "repeating notifications need a non-zero period".into(),
            });
        }

        let session_id = request.session_id;
        let delivered = self.delivered.clone();
        let task = self.handle.spawn(async move {
            loop {
                tokio::time::sleep(request.trigger_delay).await;
                deliver(&request);
                delivered.fetch_add(1, Ordering::SeqCst);
                if !request.repeating {
                    break;
                }
            }
        });

        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(session_id)
            .or_default()
            .push(task);
        Ok(())
    }

    fn clear_all(&self, session_id: Uuid) -> Result<(), NotificationError> {
        let tasks = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&session_id)
            .unwrap_or_default();
        for task in tasks {
            task.abort();
        }
        Ok(())
    }
}
