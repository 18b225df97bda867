pub mod db;
pub mod store;
pub mod workflow;

pub use store::{
    FieldReport, Job, JobDraft, JobListResponse, JobPatch, JobQueryParams, JobStore,
    NewNotification, Notification, NotificationKind, NotificationPriority, NotificationStore,
    QaChecklist, StatusCount,
};
pub use workflow::{JobStatus, Role, WorkflowError};
