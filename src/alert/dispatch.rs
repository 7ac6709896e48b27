//! Notification dispatch.
//!
//! Gatekeeper between change decisions and whatever actually shows a
//! notification. A decision is delivered only if the user opted in (the
//! persisted `notificationsEnabled` flag) and notification permission was
//! granted. Permission is asked for once; a denial switches the feature off
//! for the rest of the session without asking again.

use crate::alert::change::NotificationDecision;
use crate::logging::{self, DataSource};
use std::fmt;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notification delivery failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Platform notification facility.
pub trait Notifier {
    /// Asks for permission to post notifications. Safe to call repeatedly.
    fn request_permission(&mut self) -> impl Future<Output = bool>;

    /// Posts a notification immediately.
    fn schedule_now(
        &mut self,
        title: &str,
        body: &str,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<(), NotifyError>>;
}

/// Writes notifications to the console and the log.
#[derive(Debug, Clone)]
pub struct ConsoleNotifier {
    permission_granted: bool,
}

impl ConsoleNotifier {
    pub fn new(permission_granted: bool) -> Self {
        ConsoleNotifier { permission_granted }
    }
}

impl Notifier for ConsoleNotifier {
    async fn request_permission(&mut self) -> bool {
        self.permission_granted
    }

    async fn schedule_now(
        &mut self,
        title: &str,
        body: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        println!("🔔 {}: {}", title, body);
        logging::debug(DataSource::Notification, None, &format!("payload {}", payload));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    NotAsked,
    Granted,
    Denied,
}

pub struct NotificationDispatcher<N> {
    notifier: N,
    opted_in: bool,
    permission: Permission,
}

impl<N: Notifier> NotificationDispatcher<N> {
    /// `opted_in` is the persisted notifications flag.
    pub fn new(notifier: N, opted_in: bool) -> Self {
        NotificationDispatcher {
            notifier,
            opted_in,
            permission: Permission::NotAsked,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// False once the user opted out or permission was denied.
    pub fn is_active(&self) -> bool {
        self.opted_in && self.permission != Permission::Denied
    }

    /// Delivers a decision if allowed. Returns whether a notification was
    /// posted.
    pub async fn dispatch(&mut self, decision: &NotificationDecision) -> bool {
        let (Some(title), Some(body)) = (decision.title(), decision.message()) else {
            return false;
        };
        if !self.is_active() {
            return false;
        }

        if self.permission == Permission::NotAsked {
            self.permission = if self.notifier.request_permission().await {
                Permission::Granted
            } else {
                logging::info(
                    DataSource::Notification,
                    None,
                    "Notification permission denied; notifications disabled",
                );
                Permission::Denied
            };
        }
        if self.permission != Permission::Granted {
            return false;
        }

        match self.notifier.schedule_now(&title, body, decision.payload()).await {
            Ok(()) => true,
            Err(e) => {
                logging::warn(DataSource::Notification, None, &e.to_string());
                false
            }
        }
    }
}
