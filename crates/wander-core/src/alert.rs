//! Alert dispatch.
//!
//! Turns the machine's one-shot `AlertRequested` event into notification
//! requests: one delivered almost immediately, one repeating reminder. Every
//! failure is logged and swallowed; alerts never feed back into the machine.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::NotificationError;
use crate::journey::Phase;
use crate::storage::config::NotificationsConfig;

pub const ALERT_TITLE: &str = "Time to head back!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: String,
    pub session_id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub sound: Option<String>,
    pub trigger_delay: Duration,
    pub repeating: bool,
}

/// Notification collaborator.
pub trait Notifier: Send + Sync {
    fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError>;

    /// Remove every pending and delivered notification of the session.
    fn clear_all(&self, session_id: Uuid) -> Result<(), NotificationError>;
}

/// What a dispatch actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub scheduled: Vec<String>,
    pub failed: Vec<String>,
}

pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    session_id: Uuid,
    config: NotificationsConfig,
    dispatched: bool,
    cleared: bool,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, session_id: Uuid, config: NotificationsConfig) -> Self {
        Self {
            notifier,
            session_id,
            config,
            dispatched: false,
            cleared: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Whether an alert has been handed to the notifier for this session.
    pub fn dispatched(&self) -> bool {
        self.dispatched
    }

    /// Schedule the immediate notification and the repeating reminder.
    ///
    /// A second call for the same session is ignored, as is any call after
    /// [`clear`](Self::clear).
    pub fn dispatch(&mut self, phase: Phase, remaining_text: &str) -> DispatchReport {
        let mut report = DispatchReport::default();
        if self.dispatched || self.cleared {
            tracing::debug!(session = %self.session_id, "alert already dispatched, ignoring");
            return report;
        }
        self.dispatched = true;

        if !self.config.enabled {
            tracing::info!(session = %self.session_id, %phase, "notifications disabled, alert not scheduled");
            return report;
        }

        for request in self.requests(remaining_text) {
            let id = request.id.clone();
            match self.notifier.schedule(request) {
                Ok(()) => report.scheduled.push(id),
                Err(e) => {
                    tracing::warn!(session = %self.session_id, notification = %id, error = %e, "failed to schedule notification");
                    report.failed.push(id);
                }
            }
        }
        tracing::info!(
            session = %self.session_id,
            %phase,
            scheduled = report.scheduled.len(),
            failed = report.failed.len(),
            "alert dispatched"
        );
        report
    }

    /// Clear every notification of the session. Safe to call more than once.
    pub fn clear(&mut self) {
        if self.cleared {
            return;
        }
        self.cleared = true;
        if let Err(e) = self.notifier.clear_all(self.session_id) {
            tracing::warn!(session = %self.session_id, error = %e, "failed to clear notifications");
        }
    }

    fn requests(&self, remaining_text: &str) -> [NotificationRequest; 2] {
        let sound = self.config.sound.clone().filter(|s| !s.is_empty());
        [
            NotificationRequest {
                id: format!("{}:immediate", self.session_id),
                session_id: self.session_id,
                title: ALERT_TITLE.to_string(),
                body: Some(format!("You have {remaining_text}")),
                sound: sound.clone(),
                trigger_delay: Duration::from_secs(self.config.immediate_delay_secs),
                repeating: false,
            },
            NotificationRequest {
                id: format!("{}:reminder", self.session_id),
                session_id: self.session_id,
                title: ALERT_TITLE.to_string(),
                body: None,
                sound,
                trigger_delay: Duration::from_secs(self.config.reminder_period_secs),
                repeating: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        scheduled: Mutex<Vec<NotificationRequest>>,
        cleared: Mutex<Vec<Uuid>>,
        fail_repeating: bool,
    }

    impl Notifier for RecordingNotifier {
        fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError> {
            if self.fail_repeating && request.repeating {
                return Err(NotificationError::PermissionDenied);
            }
            self.scheduled.lock().unwrap().push(request);
            Ok(())
        }

        fn clear_all(&self, session_id: Uuid) -> Result<(), NotificationError> {
            self.cleared.lock().unwrap().push(session_id);
            Ok(())
        }
    }

    fn dispatcher(notifier: Arc<RecordingNotifier>, config: NotificationsConfig) -> AlertDispatcher {
        AlertDispatcher::new(notifier, Uuid::new_v4(), config)
    }

    #[test]
    fn schedules_immediate_and_repeating() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut d = dispatcher(notifier.clone(), NotificationsConfig::default());
        let report = d.dispatch(Phase::Returning, "4 minutes");
        assert_eq!(report.scheduled.len(), 2);

        let scheduled = notifier.scheduled.lock().unwrap();
        assert_eq!(scheduled[0].body.as_deref(), Some("You have 4 minutes"));
        assert_eq!(scheduled[0].trigger_delay, Duration::from_secs(1));
        assert!(!scheduled[0].repeating);
        assert_eq!(scheduled[1].body, None);
        assert_eq!(scheduled[1].trigger_delay, Duration::from_secs(60));
        assert!(scheduled[1].repeating);
        assert_eq!(scheduled[1].title, ALERT_TITLE);
        assert_eq!(scheduled[1].sound.as_deref(), Some("DogBark.wav"));
    }

    #[test]
    fn second_dispatch_is_ignored() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut d = dispatcher(notifier.clone(), NotificationsConfig::default());
        d.dispatch(Phase::Returning, "4 minutes");
        let report = d.dispatch(Phase::Late, "1 minute");
        assert!(report.scheduled.is_empty());
        assert_eq!(notifier.scheduled.lock().unwrap().len(), 2);
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let notifier = Arc::new(RecordingNotifier {
            fail_repeating: true,
            ..Default::default()
        });
        let mut d = dispatcher(notifier.clone(), NotificationsConfig::default());
        let report = d.dispatch(Phase::Late, "2 minutes");
        assert_eq!(report.scheduled.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(d.dispatched());
    }

    #[test]
    fn disabled_notifications_schedule_nothing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let config = NotificationsConfig {
            enabled: false,
            ..Default::default()
        };
        let mut d = dispatcher(notifier.clone(), config);
        d.dispatch(Phase::Returning, "4 minutes");
        assert!(notifier.scheduled.lock().unwrap().is_empty());
    }

    #[test]
    fn clear_is_idempotent_and_blocks_later_dispatch() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut d = dispatcher(notifier.clone(), NotificationsConfig::default());
        d.clear();
        d.clear();
        assert_eq!(notifier.cleared.lock().unwrap().as_slice(), &[d.session_id()]);
        d.dispatch(Phase::Returning, "4 minutes");
        assert!(notifier.scheduled.lock().unwrap().is_empty());
    }
}
