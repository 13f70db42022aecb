//! User-visible notifications raised by stage controllers.

use crate::nav::Stage;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Oldest notifications are dropped past this many.
const MAX_NOTIFICATIONS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Retry,
    GoBack(Stage),
    Dismiss,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub action: Option<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            action: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Errors block until the user acknowledges them.
    pub fn is_blocking(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// Shared notification queue for one workflow session.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    queue: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        if queue.len() == MAX_NOTIFICATIONS {
            queue.pop_front();
        }
        queue.push_back(notification);
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.push(Notification::new(level, message));
    }

    /// Remove and return everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    pub fn latest(&self) -> Option<Notification> {
        match self.queue.lock() {
            Ok(queue) => queue.back().cloned(),
            Err(poisoned) => poisoned.into_inner().back().cloned(),
        }
    }

    pub fn len(&self) -> usize {
        match self.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
