//! Notification store — per-recipient advisory inboxes.
//!
//! Notifications are fire-and-forget messages between roles. They never
//! drive workflow logic and never hard-reference jobs; deleting a job
//! leaves its notifications in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::notification_repo::{self, NotificationRow};
use crate::db::Database;
use crate::workflow::WorkflowError;

use super::{format_timestamp, parse_timestamp};

// ─── Notification ───────────────────────────────────────────────────────────

/// Severity tag of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }

    fn parse(s: &str, id: &str) -> Self {
        match s {
            "info" => NotificationKind::Info,
            "success" => NotificationKind::Success,
            "warning" => NotificationKind::Warning,
            "error" => NotificationKind::Error,
            other => {
                log::warn!(
                    "Unknown notification kind '{}' for {}, defaulting to info",
                    other,
                    id
                );
                NotificationKind::Info
            }
        }
    }
}

/// Priority tag of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

impl NotificationPriority {
    fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }

    fn parse(s: &str, id: &str) -> Self {
        match s {
            "low" => NotificationPriority::Low,
            "normal" => NotificationPriority::Normal,
            "high" => NotificationPriority::High,
            other => {
                log::warn!(
                    "Unknown notification priority '{}' for {}, defaulting to normal",
                    other,
                    id
                );
                NotificationPriority::Normal
            }
        }
    }
}

/// An advisory message filed under a recipient's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Target role label or user id.
    pub recipient: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub(crate) fn from_row(row: &NotificationRow) -> Self {
        Self {
            id: row.id.clone(),
            recipient: row.recipient.clone(),
            title: row.title.clone(),
            message: row.message.clone(),
            kind: NotificationKind::parse(&row.kind, &row.id),
            priority: NotificationPriority::parse(&row.priority, &row.id),
            read: row.is_read,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

/// Fields of a notification to be sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub recipient: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NotificationKind,
    #[serde(default = "default_priority")]
    pub priority: NotificationPriority,
}

fn default_kind() -> NotificationKind {
    NotificationKind::Info
}

fn default_priority() -> NotificationPriority {
    NotificationPriority::Normal
}

// ─── NotificationStore ──────────────────────────────────────────────────────

/// Per-recipient notification inbox backed by rusqlite.
#[derive(Clone)]
pub struct NotificationStore {
    db: Database,
}

impl NotificationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends a new unread notification to the recipient's inbox.
    pub fn send(&self, new: &NewNotification) -> Result<Notification, WorkflowError> {
        if new.recipient.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "Notification recipient is required".to_string(),
            ));
        }

        let row = NotificationRow {
            id: Uuid::new_v4().to_string(),
            recipient: new.recipient.clone(),
            title: new.title.clone(),
            message: new.message.clone(),
            kind: new.kind.as_str().to_string(),
            priority: new.priority.as_str().to_string(),
            is_read: false,
            created_at: format_timestamp(Utc::now()),
        };
        notification_repo::insert(&self.db, &row)?;
        Ok(Notification::from_row(&row))
    }

    /// Returns the recipient's inbox, newest first.
    pub fn list(&self, recipient: &str) -> Result<Vec<Notification>, WorkflowError> {
        let rows = notification_repo::list_for_recipient(&self.db, recipient)?;
        Ok(rows.iter().map(Notification::from_row).collect())
    }

    /// Marks a notification read and returns it. Cross-recipient ids are
    /// treated as unknown.
    pub fn mark_read(&self, recipient: &str, id: &str) -> Result<Notification, WorkflowError> {
        let affected = notification_repo::mark_read(&self.db, recipient, id)?;
        if affected == 0 {
            return Err(WorkflowError::NotFound(format!("Notification {}", id)));
        }
        let row = notification_repo::find_for_recipient(&self.db, recipient, id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("Notification {}", id)))?;
        Ok(Notification::from_row(&row))
    }

    /// Deletes a notification from the recipient's inbox.
    pub fn delete(&self, recipient: &str, id: &str) -> Result<(), WorkflowError> {
        let affected = notification_repo::delete(&self.db, recipient, id)?;
        if affected == 0 {
            return Err(WorkflowError::NotFound(format!("Notification {}", id)));
        }
        Ok(())
    }

    /// Counts unread notifications in the recipient's inbox.
    pub fn unread_count(&self, recipient: &str) -> Result<u64, WorkflowError> {
        Ok(notification_repo::unread_count(&self.db, recipient)?)
    }
}
