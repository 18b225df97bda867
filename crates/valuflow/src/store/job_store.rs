//! Job store — the single owner of persisted valuation jobs.
//!
//! All status changes go through [`JobStore::transition`], which enforces
//! the workflow graph of [`crate::workflow`]. The generic patch path
//! statically cannot touch lifecycle fields.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::job_repo::{self, JobFilter, JobRow};
use crate::db::Database;
use crate::workflow::{self, JobStatus, NoteSink, Role, TransitionRule, WorkflowError};

use super::notification_store::{
    NewNotification, NotificationKind, NotificationPriority, NotificationStore,
};
use super::{format_timestamp, next_stamp, parse_timestamp};

// ─── Nested records ─────────────────────────────────────────────────────────

/// QA review-completion record attached to a job. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaChecklist {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Field-collected inspection record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<String>,
    /// Document type → uploaded-file reference.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub documents: HashMap<String, String>,
}

// ─── Job ────────────────────────────────────────────────────────────────────

/// One valuation engagement, from onboarding to payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job identifier (UUID). Immutable.
    pub id: String,
    pub client_name: String,
    /// "individual" or "company".
    pub client_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub asset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_use: Option<String>,
    /// Prior work on this asset, display only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_work: Vec<String>,
    /// Neighboring-area job references, display only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighborhood_refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_contact_number: Option<String>,
    /// Current pipeline stage. Mutated only by `transition`.
    pub status: JobStatus,
    pub qa_checklist: QaChecklist,
    pub admin_reviewed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_review_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qa_notes: Option<String>,
    /// Derived from status: true once the job has passed MD approval.
    pub md_approved: bool,
    /// Derived from status: true only at `complete`.
    pub payment_received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_report: Option<FieldReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter, incremented by every mutation.
    pub version: i64,
}

fn parse_status(s: &str, job_id: &str) -> JobStatus {
    s.parse().unwrap_or_else(|e| {
        log::warn!(
            "Job {} has invalid status ({}), defaulting to pending fieldwork",
            job_id,
            e
        );
        JobStatus::PendingFieldwork
    })
}

fn parse_json_field<T: Default + serde::de::DeserializeOwned>(
    raw: Option<&String>,
    field: &str,
    job_id: &str,
) -> T {
    match raw {
        Some(s) => serde_json::from_str(s).unwrap_or_else(|e| {
            log::warn!("Job {} has malformed {} JSON: {}", job_id, field, e);
            T::default()
        }),
        None => T::default(),
    }
}

impl Job {
    /// Creates a Job from a database row.
    pub(crate) fn from_row(row: &JobRow) -> Self {
        let previous_work: Vec<String> =
            parse_json_field(row.previous_work.as_ref(), "previous_work", &row.id);
        let neighborhood_refs: Vec<String> =
            parse_json_field(row.neighborhood_refs.as_ref(), "neighborhood_refs", &row.id);
        let qa_checklist: QaChecklist =
            parse_json_field(row.qa_checklist.as_ref(), "qa_checklist", &row.id);
        let field_report: Option<FieldReport> = row
            .field_report
            .as_ref()
            .and_then(|s| match serde_json::from_str(s) {
                Ok(report) => Some(report),
                Err(e) => {
                    log::warn!("Job {} has malformed field_report JSON: {}", row.id, e);
                    None
                }
            });

        Self {
            id: row.id.clone(),
            client_name: row.client_name.clone(),
            client_type: row.client_type.clone(),
            contact_details: row.contact_details.clone(),
            address: row.address.clone(),
            asset_type: row.asset_type.clone(),
            asset_location: row.asset_location.clone(),
            asset_size: row.asset_size.clone(),
            declared_use: row.declared_use.clone(),
            previous_work,
            neighborhood_refs,
            valuation_purpose: row.valuation_purpose.clone(),
            estimated_value: row.estimated_value,
            currency: row.currency.clone(),
            deadline: row.deadline.clone(),
            bank_name: row.bank_name.clone(),
            bank_branch: row.bank_branch.clone(),
            bank_contact_person: row.bank_contact_person.clone(),
            bank_contact_number: row.bank_contact_number.clone(),
            status: parse_status(&row.status, &row.id),
            qa_checklist,
            admin_reviewed: row.admin_reviewed,
            admin_review_notes: row.admin_review_notes.clone(),
            qa_notes: row.qa_notes.clone(),
            md_approved: row.md_approved,
            payment_received: row.payment_received,
            revocation_reason: row.revocation_reason.clone(),
            field_report,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
            version: row.version,
        }
    }

    fn to_row(&self) -> JobRow {
        JobRow {
            id: self.id.clone(),
            client_name: self.client_name.clone(),
            client_type: self.client_type.clone(),
            contact_details: self.contact_details.clone(),
            address: self.address.clone(),
            asset_type: self.asset_type.clone(),
            asset_location: self.asset_location.clone(),
            asset_size: self.asset_size.clone(),
            declared_use: self.declared_use.clone(),
            previous_work: if self.previous_work.is_empty() {
                None
            } else {
                serde_json::to_string(&self.previous_work).ok()
            },
            neighborhood_refs: if self.neighborhood_refs.is_empty() {
                None
            } else {
                serde_json::to_string(&self.neighborhood_refs).ok()
            },
            valuation_purpose: self.valuation_purpose.clone(),
            estimated_value: self.estimated_value,
            currency: self.currency.clone(),
            deadline: self.deadline.clone(),
            bank_name: self.bank_name.clone(),
            bank_branch: self.bank_branch.clone(),
            bank_contact_person: self.bank_contact_person.clone(),
            bank_contact_number: self.bank_contact_number.clone(),
            status: self.status.as_str().to_string(),
            qa_checklist: serde_json::to_string(&self.qa_checklist).ok(),
            admin_reviewed: self.admin_reviewed,
            admin_review_notes: self.admin_review_notes.clone(),
            qa_notes: self.qa_notes.clone(),
            md_approved: self.md_approved,
            payment_received: self.payment_received,
            revocation_reason: self.revocation_reason.clone(),
            field_report: self
                .field_report
                .as_ref()
                .and_then(|r| serde_json::to_string(r).ok()),
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
            version: self.version,
        }
    }
}

// ─── Drafts and patches ─────────────────────────────────────────────────────

/// Fields accepted at job creation. Client name and asset type are required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_type: Option<String>,
    pub contact_details: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub asset_type: String,
    pub asset_location: Option<String>,
    pub asset_size: Option<String>,
    pub declared_use: Option<String>,
    #[serde(default)]
    pub previous_work: Vec<String>,
    #[serde(default)]
    pub neighborhood_refs: Vec<String>,
    pub valuation_purpose: Option<String>,
    pub estimated_value: Option<f64>,
    pub currency: Option<String>,
    pub deadline: Option<String>,
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub bank_contact_person: Option<String>,
    pub bank_contact_number: Option<String>,
}

/// Partial update of non-lifecycle fields. Deliberately has no `status`,
/// `mdApproved`, `paymentReceived`, or `revocationReason` members, so the
/// transition guard cannot be bypassed through a generic update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub client_name: Option<String>,
    pub client_type: Option<String>,
    pub contact_details: Option<String>,
    pub address: Option<String>,
    pub asset_type: Option<String>,
    pub asset_location: Option<String>,
    pub asset_size: Option<String>,
    pub declared_use: Option<String>,
    pub previous_work: Option<Vec<String>>,
    pub neighborhood_refs: Option<Vec<String>>,
    pub valuation_purpose: Option<String>,
    pub estimated_value: Option<f64>,
    pub currency: Option<String>,
    pub deadline: Option<String>,
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub bank_contact_person: Option<String>,
    pub bank_contact_number: Option<String>,
    pub qa_checklist: Option<QaChecklist>,
    pub admin_reviewed: Option<bool>,
    pub admin_review_notes: Option<String>,
    pub qa_notes: Option<String>,
    pub field_report: Option<FieldReport>,
}

impl JobPatch {
    fn is_empty(&self) -> bool {
        self.client_name.is_none()
            && self.client_type.is_none()
            && self.contact_details.is_none()
            && self.address.is_none()
            && self.asset_type.is_none()
            && self.asset_location.is_none()
            && self.asset_size.is_none()
            && self.declared_use.is_none()
            && self.previous_work.is_none()
            && self.neighborhood_refs.is_none()
            && self.valuation_purpose.is_none()
            && self.estimated_value.is_none()
            && self.currency.is_none()
            && self.deadline.is_none()
            && self.bank_name.is_none()
            && self.bank_branch.is_none()
            && self.bank_contact_person.is_none()
            && self.bank_contact_number.is_none()
            && self.qa_checklist.is_none()
            && self.admin_reviewed.is_none()
            && self.admin_review_notes.is_none()
            && self.qa_notes.is_none()
            && self.field_report.is_none()
    }
}

// ─── Query types ────────────────────────────────────────────────────────────

/// Query parameters for job listing.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQueryParams {
    pub status: Option<JobStatus>,
    /// Substring match on the referring bank.
    pub bank: Option<String>,
    /// Substring match on the client name.
    pub client: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Response for job listing with pagination.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// Per-status job count for dashboard summaries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: u64,
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Persistent job store backed by rusqlite.
///
/// Cloning is cheap (inner `Arc` on the database handle). Each operation
/// touches exactly one row and is atomic at the row level.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
    notifications: NotificationStore,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        let notifications = NotificationStore::new(db.clone());
        Self { db, notifications }
    }

    /// Creates a job from a draft. Status starts at `pending fieldwork`.
    pub fn create(&self, draft: &JobDraft) -> Result<Job, WorkflowError> {
        if draft.client_name.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "Client name is required".to_string(),
            ));
        }
        if draft.asset_type.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "Asset type is required".to_string(),
            ));
        }

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4().to_string(),
            client_name: draft.client_name.clone(),
            client_type: draft
                .client_type
                .clone()
                .unwrap_or_else(|| "individual".to_string()),
            contact_details: draft.contact_details.clone(),
            address: draft.address.clone(),
            asset_type: draft.asset_type.clone(),
            asset_location: draft.asset_location.clone(),
            asset_size: draft.asset_size.clone(),
            declared_use: draft.declared_use.clone(),
            previous_work: draft.previous_work.clone(),
            neighborhood_refs: draft.neighborhood_refs.clone(),
            valuation_purpose: draft.valuation_purpose.clone(),
            estimated_value: draft.estimated_value,
            currency: draft.currency.clone(),
            deadline: draft.deadline.clone(),
            bank_name: draft.bank_name.clone(),
            bank_branch: draft.bank_branch.clone(),
            bank_contact_person: draft.bank_contact_person.clone(),
            bank_contact_number: draft.bank_contact_number.clone(),
            status: JobStatus::PendingFieldwork,
            qa_checklist: QaChecklist::default(),
            admin_reviewed: false,
            admin_review_notes: None,
            qa_notes: None,
            md_approved: false,
            payment_received: false,
            revocation_reason: None,
            field_report: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        job_repo::insert(&self.db, &job.to_row())?;
        log::info!("Created job {} for client '{}'", job.id, job.client_name);
        Ok(job)
    }

    /// Queries jobs with filters and pagination, newest first.
    pub fn query(&self, params: &JobQueryParams) -> Result<JobListResponse, WorkflowError> {
        let filter = JobFilter {
            status: params.status.map(|s| s.as_str().to_string()),
            bank: params.bank.clone(),
            client: params.client.clone(),
            limit: params.limit,
            offset: params.offset,
        };
        let (rows, total) = job_repo::query(&self.db, &filter)?;
        Ok(JobListResponse {
            jobs: rows.iter().map(Job::from_row).collect(),
            total,
            limit: params.limit,
            offset: params.offset,
        })
    }

    /// Returns a job by ID.
    pub fn get(&self, id: &str) -> Result<Job, WorkflowError> {
        let row = job_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("Job {}", id)))?;
        Ok(Job::from_row(&row))
    }

    /// Merges non-lifecycle fields into an existing job.
    ///
    /// When `expected_version` is given, a stale value fails with
    /// `Conflict` and leaves the row unchanged.
    pub fn update(
        &self,
        id: &str,
        patch: &JobPatch,
        expected_version: Option<i64>,
    ) -> Result<Job, WorkflowError> {
        let row = job_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("Job {}", id)))?;
        let mut job = Job::from_row(&row);

        if let Some(expected) = expected_version {
            if expected != job.version {
                return Err(WorkflowError::Conflict {
                    expected,
                    actual: job.version,
                });
            }
        }

        if patch.is_empty() {
            return Ok(job);
        }

        apply_patch(&mut job, patch)?;

        job.updated_at = next_stamp(job.updated_at);
        self.persist_versioned(job, row.version)
    }

    /// Advances (or returns) a job along the workflow graph.
    ///
    /// On success the updated job is returned and exactly one notification
    /// is sent to the role owning the new state; notification failures are
    /// logged, never propagated. On any failure the row is untouched.
    pub fn transition(
        &self,
        id: &str,
        actor: Role,
        target: JobStatus,
        notes: Option<&str>,
        expected_version: Option<i64>,
    ) -> Result<Job, WorkflowError> {
        self.transition_with_patch(id, actor, target, notes, &JobPatch::default(), expected_version)
    }

    /// Advances a job along the workflow graph, merging non-lifecycle
    /// fields in the same versioned write.
    ///
    /// The whole request is validated before anything is persisted; a
    /// rejected patch leaves the status untouched and vice versa.
    pub fn transition_with_patch(
        &self,
        id: &str,
        actor: Role,
        target: JobStatus,
        notes: Option<&str>,
        patch: &JobPatch,
        expected_version: Option<i64>,
    ) -> Result<Job, WorkflowError> {
        let row = job_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("Job {}", id)))?;
        let mut job = Job::from_row(&row);

        let rule = workflow::check_transition(job.status, target, actor, notes)?;
        apply_patch(&mut job, patch)?;

        if let Some(expected) = expected_version {
            if expected != job.version {
                return Err(WorkflowError::Conflict {
                    expected,
                    actual: job.version,
                });
            }
        }

        job.status = target;
        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            append_notes(&mut job, rule.note_sink, notes);
        }

        // Approval booleans are derived from the stage, never set directly.
        job.md_approved = matches!(
            job.status,
            JobStatus::PendingPayment | JobStatus::Complete
        );
        job.payment_received = job.status == JobStatus::Complete;

        job.updated_at = next_stamp(job.updated_at);
        let job = self.persist_versioned(job, row.version)?;

        log::info!(
            "Job {} moved '{}' -> '{}' by {}",
            job.id,
            rule.from,
            rule.to,
            actor
        );
        self.notify_transition(&job, actor, &rule);
        Ok(job)
    }

    /// Removes a job permanently. Notifications that mention it remain.
    pub fn delete(&self, id: &str) -> Result<(), WorkflowError> {
        let affected = job_repo::delete(&self.db, id)?;
        if affected == 0 {
            return Err(WorkflowError::NotFound(format!("Job {}", id)));
        }
        log::info!("Deleted job {}", id);
        Ok(())
    }

    /// Returns job counts per status for dashboard summaries.
    pub fn status_counts(&self) -> Result<Vec<StatusCount>, WorkflowError> {
        let mut counts = Vec::with_capacity(JobStatus::ALL.len());
        for status in JobStatus::ALL {
            counts.push(StatusCount {
                status,
                count: job_repo::count_by_status(&self.db, status.as_str())?,
            });
        }
        Ok(counts)
    }

    /// Writes the job back, guarded by the version the row was read at.
    /// A lost race surfaces as `Conflict`.
    fn persist_versioned(&self, mut job: Job, read_version: i64) -> Result<Job, WorkflowError> {
        let affected = job_repo::update_versioned(&self.db, &job.to_row(), read_version)?;
        if affected == 0 {
            let actual = job_repo::find_by_id(&self.db, &job.id)?
                .map(|r| r.version)
                .unwrap_or(read_version);
            return Err(WorkflowError::Conflict {
                expected: read_version,
                actual,
            });
        }
        job.version = read_version + 1;
        Ok(job)
    }

    /// Best-effort notification to the role owning the job's new state.
    fn notify_transition(&self, job: &Job, actor: Role, rule: &TransitionRule) {
        let recipient = job.status.owning_role();
        let (kind, priority) = match job.status {
            JobStatus::Complete => (NotificationKind::Success, NotificationPriority::Normal),
            JobStatus::Revoked => (NotificationKind::Error, NotificationPriority::High),
            // Backward edges are corrections.
            _ if rule.notes_required => {
                (NotificationKind::Warning, NotificationPriority::High)
            }
            _ => (NotificationKind::Info, NotificationPriority::Normal),
        };

        let new = NewNotification {
            recipient: recipient.as_str().to_string(),
            title: format!("Job now {}", job.status),
            message: format!(
                "Valuation job for '{}' ({}) moved from '{}' to '{}' by {}",
                job.client_name, job.asset_type, rule.from, rule.to, actor
            ),
            kind,
            priority,
        };

        if let Err(e) = self.notifications.send(&new) {
            log::warn!(
                "Failed to notify {} about job {}: {}",
                recipient,
                job.id,
                e
            );
        }
    }
}

/// Merges patch fields into the job in place. Mutates nothing persisted:
/// callers persist (or drop) the job afterwards.
fn apply_patch(job: &mut Job, patch: &JobPatch) -> Result<(), WorkflowError> {
    if let Some(ref name) = patch.client_name {
        if name.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "Client name cannot be blank".to_string(),
            ));
        }
        job.client_name = name.clone();
    }
    if let Some(ref asset_type) = patch.asset_type {
        if asset_type.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "Asset type cannot be blank".to_string(),
            ));
        }
        job.asset_type = asset_type.clone();
    }
    if let Some(ref v) = patch.client_type {
        job.client_type = v.clone();
    }
    if let Some(ref v) = patch.contact_details {
        job.contact_details = Some(v.clone());
    }
    if let Some(ref v) = patch.address {
        job.address = Some(v.clone());
    }
    if let Some(ref v) = patch.asset_location {
        job.asset_location = Some(v.clone());
    }
    if let Some(ref v) = patch.asset_size {
        job.asset_size = Some(v.clone());
    }
    if let Some(ref v) = patch.declared_use {
        job.declared_use = Some(v.clone());
    }
    if let Some(ref v) = patch.previous_work {
        job.previous_work = v.clone();
    }
    if let Some(ref v) = patch.neighborhood_refs {
        job.neighborhood_refs = v.clone();
    }
    if let Some(ref v) = patch.valuation_purpose {
        job.valuation_purpose = Some(v.clone());
    }
    if let Some(v) = patch.estimated_value {
        job.estimated_value = Some(v);
    }
    if let Some(ref v) = patch.currency {
        job.currency = Some(v.clone());
    }
    if let Some(ref v) = patch.deadline {
        job.deadline = Some(v.clone());
    }
    if let Some(ref v) = patch.bank_name {
        job.bank_name = Some(v.clone());
    }
    if let Some(ref v) = patch.bank_branch {
        job.bank_branch = Some(v.clone());
    }
    if let Some(ref v) = patch.bank_contact_person {
        job.bank_contact_person = Some(v.clone());
    }
    if let Some(ref v) = patch.bank_contact_number {
        job.bank_contact_number = Some(v.clone());
    }
    if let Some(ref v) = patch.qa_checklist {
        job.qa_checklist = v.clone();
    }
    if let Some(v) = patch.admin_reviewed {
        job.admin_reviewed = v;
    }
    if let Some(ref v) = patch.admin_review_notes {
        job.admin_review_notes = Some(v.clone());
    }
    if let Some(ref v) = patch.qa_notes {
        job.qa_notes = Some(v.clone());
    }
    if let Some(ref v) = patch.field_report {
        job.field_report = Some(v.clone());
    }
    Ok(())
}

fn append_notes(job: &mut Job, sink: NoteSink, notes: &str) {
    let field = match sink {
        NoteSink::AdminReviewNotes => &mut job.admin_review_notes,
        NoteSink::QaNotes => &mut job.qa_notes,
        NoteSink::RevocationReason => &mut job.revocation_reason,
    };
    *field = match field.take() {
        Some(existing) => Some(format!("{}\n{}", existing, notes)),
        None => Some(notes.to_string()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (JobStore, NotificationStore) {
        let db = Database::open_in_memory().expect("open in-memory DB");
        (JobStore::new(db.clone()), NotificationStore::new(db))
    }

    fn sample_draft() -> JobDraft {
        JobDraft {
            client_name: "ABC Bank".to_string(),
            client_type: Some("company".to_string()),
            asset_type: "Commercial Property".to_string(),
            asset_location: Some("Kampala".to_string()),
            estimated_value: Some(450_000.0),
            currency: Some("USD".to_string()),
            bank_name: Some("ABC Bank".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_defaults() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        assert_eq!(job.status, JobStatus::PendingFieldwork);
        assert_eq!(job.version, 1);
        assert_eq!(job.qa_checklist, QaChecklist::default());
        assert!(!job.md_approved);
        assert!(!job.payment_received);
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_create_requires_client_and_asset() {
        let (store, _) = test_store();

        let mut draft = sample_draft();
        draft.client_name = "  ".to_string();
        assert!(matches!(
            store.create(&draft).unwrap_err(),
            WorkflowError::ValidationFailed(_)
        ));

        let mut draft = sample_draft();
        draft.asset_type = String::new();
        assert!(matches!(
            store.create(&draft).unwrap_err(),
            WorkflowError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_create_then_get_round_trip() {
        let (store, _) = test_store();
        let created = store.create(&sample_draft()).unwrap();
        let fetched = store.get(&created.id).unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.client_name, created.client_name);
        assert_eq!(fetched.asset_type, created.asset_type);
        assert_eq!(fetched.estimated_value, created.estimated_value);
        assert_eq!(fetched.status, created.status);
        assert_eq!(fetched.version, created.version);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let (store, _) = test_store();
        assert!(matches!(
            store.get("missing").unwrap_err(),
            WorkflowError::NotFound(_)
        ));
    }

    #[test]
    fn test_full_pipeline_scenario() {
        let (store, inbox) = test_store();
        let job = store.create(&sample_draft()).unwrap();
        assert_eq!(job.status, JobStatus::PendingFieldwork);

        // field_team submits fieldwork
        let job = store
            .transition(
                &job.id,
                Role::FieldTeam,
                JobStatus::PendingQa,
                Some("Inspection done"),
                None,
            )
            .unwrap();
        assert_eq!(job.status, JobStatus::PendingQa);
        assert_eq!(job.admin_review_notes.as_deref(), Some("Inspection done"));
        assert_eq!(inbox.list("qa_officer").unwrap().len(), 1);

        // qa_officer approves
        let job = store
            .transition(&job.id, Role::QaOfficer, JobStatus::PendingMdApproval, None, None)
            .unwrap();
        assert_eq!(inbox.list("md").unwrap().len(), 1);

        // md approves
        let job = store
            .transition(&job.id, Role::Md, JobStatus::PendingPayment, None, None)
            .unwrap();
        assert!(job.md_approved);
        assert!(!job.payment_received);
        assert_eq!(inbox.list("accounts").unwrap().len(), 1);

        // accounts records payment
        let job = store
            .transition(&job.id, Role::Accounts, JobStatus::Complete, None, None)
            .unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.payment_received);
        assert_eq!(job.version, 5);

        // Terminal: nothing moves anymore.
        let err = store
            .transition(&job.id, Role::Admin, JobStatus::PendingQa, None, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
    }

    #[test]
    fn test_revocation_scenario() {
        let (store, inbox) = test_store();
        let job = store.create(&sample_draft()).unwrap();
        let job = store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        let job = store
            .transition(
                &job.id,
                Role::QaOfficer,
                JobStatus::Revoked,
                Some("Fraudulent documents"),
                None,
            )
            .unwrap();
        assert_eq!(job.status, JobStatus::Revoked);
        assert_eq!(job.revocation_reason.as_deref(), Some("Fraudulent documents"));

        // Terminal now.
        let err = store
            .transition(&job.id, Role::QaOfficer, JobStatus::PendingQa, None, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::IllegalTransition { .. }));

        // Terminal states notify admin.
        let admin_inbox = inbox.list("admin").unwrap();
        assert_eq!(admin_inbox.len(), 1);
        assert_eq!(admin_inbox[0].kind, NotificationKind::Error);
        assert_eq!(admin_inbox[0].priority, NotificationPriority::High);
    }

    #[test]
    fn test_rejection_without_notes_leaves_job_unchanged() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();
        let job = store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        let err = store
            .transition(
                &job.id,
                Role::QaOfficer,
                JobStatus::PendingFieldwork,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        // Read-back confirms nothing moved.
        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::PendingQa);
        assert_eq!(fetched.version, job.version);
        assert_eq!(fetched.updated_at, job.updated_at);
    }

    #[test]
    fn test_wrong_role_is_forbidden() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();
        let job = store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        let err = store
            .transition(
                &job.id,
                Role::FieldTeam,
                JobStatus::PendingMdApproval,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden { .. }));
    }

    #[test]
    fn test_transition_unknown_job() {
        let (store, _) = test_store();
        let err = store
            .transition("missing", Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn test_transition_stamps_and_preserves_identity() {
        let (store, _) = test_store();
        let created = store.create(&sample_draft()).unwrap();

        let moved = store
            .transition(&created.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();
        assert_eq!(moved.id, created.id);
        assert_eq!(moved.created_at, created.created_at);
        assert!(moved.updated_at > created.updated_at);
        assert_eq!(moved.version, created.version + 1);
    }

    #[test]
    fn test_md_rejection_returns_to_qa() {
        let (store, inbox) = test_store();
        let job = store.create(&sample_draft()).unwrap();
        let job = store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();
        let job = store
            .transition(&job.id, Role::QaOfficer, JobStatus::PendingMdApproval, None, None)
            .unwrap();

        let job = store
            .transition(
                &job.id,
                Role::Md,
                JobStatus::PendingQa,
                Some("Valuation figure unsupported"),
                None,
            )
            .unwrap();
        assert_eq!(job.status, JobStatus::PendingQa);
        assert!(!job.md_approved);
        assert_eq!(
            job.admin_review_notes.as_deref(),
            Some("Valuation figure unsupported")
        );

        // QA got both the submission and the bounce-back.
        assert_eq!(inbox.list("qa_officer").unwrap().len(), 2);
    }

    #[test]
    fn test_stale_version_conflicts() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        // Someone else moved it first.
        store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        let err = store
            .transition(
                &job.id,
                Role::QaOfficer,
                JobStatus::PendingMdApproval,
                None,
                Some(1),
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { expected: 1, actual: 2 }));

        // Row unchanged by the failed attempt.
        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::PendingQa);
        assert_eq!(fetched.version, 2);
    }

    #[test]
    fn test_transition_with_patch_is_one_write() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        let patch = JobPatch {
            asset_size: Some("2 acres".to_string()),
            ..Default::default()
        };
        let moved = store
            .transition_with_patch(
                &job.id,
                Role::FieldTeam,
                JobStatus::PendingQa,
                None,
                &patch,
                None,
            )
            .unwrap();
        assert_eq!(moved.status, JobStatus::PendingQa);
        assert_eq!(moved.asset_size.as_deref(), Some("2 acres"));
        // Status and patch land together in a single version bump.
        assert_eq!(moved.version, 2);
    }

    #[test]
    fn test_transition_with_invalid_patch_changes_nothing() {
        let (store, inbox) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        let patch = JobPatch {
            client_name: Some("  ".to_string()),
            ..Default::default()
        };
        let err = store
            .transition_with_patch(
                &job.id,
                Role::FieldTeam,
                JobStatus::PendingQa,
                None,
                &patch,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        // The status move was not applied either, and nobody was notified.
        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::PendingFieldwork);
        assert_eq!(fetched.version, 1);
        assert!(inbox.list("qa_officer").unwrap().is_empty());
    }

    #[test]
    fn test_update_patches_fields() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        let patch = JobPatch {
            estimated_value: Some(500_000.0),
            qa_notes: Some("Checked comparables".to_string()),
            qa_checklist: Some(QaChecklist {
                completed: true,
                notes: "All documents verified".to_string(),
                items: vec!["Title deed".to_string(), "Survey plan".to_string()],
            }),
            ..Default::default()
        };
        let updated = store.update(&job.id, &patch, Some(1)).unwrap();

        assert_eq!(updated.estimated_value, Some(500_000.0));
        assert_eq!(updated.qa_notes.as_deref(), Some("Checked comparables"));
        assert!(updated.qa_checklist.completed);
        assert_eq!(updated.version, 2);
        assert!(updated.updated_at > job.updated_at);
        // Lifecycle fields untouched.
        assert_eq!(updated.status, JobStatus::PendingFieldwork);
        assert!(!updated.payment_received);
    }

    #[test]
    fn test_update_stale_version_conflicts() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        let patch = JobPatch {
            address: Some("New address".to_string()),
            ..Default::default()
        };
        let err = store.update(&job.id, &patch, Some(7)).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }));
    }

    #[test]
    fn test_update_unknown_job() {
        let (store, _) = test_store();
        let err = store
            .update("missing", &JobPatch::default(), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn test_delete() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        store.delete(&job.id).unwrap();
        assert!(matches!(
            store.get(&job.id).unwrap_err(),
            WorkflowError::NotFound(_)
        ));
        assert!(matches!(
            store.delete(&job.id).unwrap_err(),
            WorkflowError::NotFound(_)
        ));
    }

    #[test]
    fn test_delete_leaves_notifications_dangling() {
        let (store, inbox) = test_store();
        let job = store.create(&sample_draft()).unwrap();
        store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        store.delete(&job.id).unwrap();
        // Advisory messages survive the job.
        assert_eq!(inbox.list("qa_officer").unwrap().len(), 1);
    }

    #[test]
    fn test_query_filters() {
        let (store, _) = test_store();
        store.create(&sample_draft()).unwrap();

        let mut private = sample_draft();
        private.client_name = "Jane Doe".to_string();
        private.bank_name = None;
        let private_job = store.create(&private).unwrap();
        store
            .transition(&private_job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        let all = store.query(&JobQueryParams::default()).unwrap();
        assert_eq!(all.total, 2);

        let pending_qa = store
            .query(&JobQueryParams {
                status: Some(JobStatus::PendingQa),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending_qa.total, 1);
        assert_eq!(pending_qa.jobs[0].client_name, "Jane Doe");

        let by_bank = store
            .query(&JobQueryParams {
                bank: Some("ABC".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_bank.total, 1);

        let by_client = store
            .query(&JobQueryParams {
                client: Some("Doe".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_client.total, 1);
    }

    #[test]
    fn test_status_counts() {
        let (store, _) = test_store();
        store.create(&sample_draft()).unwrap();
        let job = store.create(&sample_draft()).unwrap();
        store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        let counts = store.status_counts().unwrap();
        let get = |s: JobStatus| {
            counts
                .iter()
                .find(|c| c.status == s)
                .map(|c| c.count)
                .unwrap()
        };
        assert_eq!(get(JobStatus::PendingFieldwork), 1);
        assert_eq!(get(JobStatus::PendingQa), 1);
        assert_eq!(get(JobStatus::Complete), 0);
    }

    #[test]
    fn test_notes_accumulate() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();
        let job = store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();

        // QA bounces it back, field team resubmits, QA bounces again.
        let job = store
            .transition(
                &job.id,
                Role::QaOfficer,
                JobStatus::PendingFieldwork,
                Some("Missing photos"),
                None,
            )
            .unwrap();
        let job = store
            .transition(&job.id, Role::FieldTeam, JobStatus::PendingQa, None, None)
            .unwrap();
        let job = store
            .transition(
                &job.id,
                Role::QaOfficer,
                JobStatus::PendingFieldwork,
                Some("Wrong plot number"),
                None,
            )
            .unwrap();

        assert_eq!(
            job.qa_notes.as_deref(),
            Some("Missing photos\nWrong plot number")
        );
    }

    #[test]
    fn test_job_serializes_camel_case_wire_format() {
        let (store, _) = test_store();
        let job = store.create(&sample_draft()).unwrap();

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["clientName"], "ABC Bank");
        assert_eq!(value["status"], "pending fieldwork");
        assert_eq!(value["paymentReceived"], false);
        assert!(value["qaChecklist"]["items"].as_array().unwrap().is_empty());
    }
}
