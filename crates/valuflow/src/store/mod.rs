//! Service objects owning the persisted stores.
//!
//! `JobStore` and `NotificationStore` are the only writers of their
//! respective tables. Both are cheap to clone and are injected into
//! request handlers rather than held as globals.

use chrono::{DateTime, Duration, Utc};

pub mod job_store;
pub mod notification_store;

pub use job_store::{
    FieldReport, Job, JobDraft, JobListResponse, JobPatch, JobQueryParams, JobStore, QaChecklist,
    StatusCount,
};
pub use notification_store::{
    NewNotification, Notification, NotificationKind, NotificationPriority, NotificationStore,
};

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Returns a stamp strictly greater than `prev`. Falls forward by one
/// millisecond when the wall clock has not moved past the previous stamp.
pub(crate) fn next_stamp(prev: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > prev {
        now
    } else {
        prev + Duration::milliseconds(1)
    }
}
