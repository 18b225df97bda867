//! Job lifecycle workflow — the fixed status vocabulary, the role
//! vocabulary, and the legal-transition table.
//!
//! A job moves `pending fieldwork` → `pending QA` → `pending MD approval`
//! → `pending payment` → `complete`, with backward edges for corrections
//! (QA returns to fieldwork, MD rejects to QA) and a `revoked` side branch
//! reachable from any non-terminal state by a QA officer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod error;

pub use error::WorkflowError;

// ─── Status ─────────────────────────────────────────────────────────────────

/// Pipeline stage of a job. The wire strings are fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "pending fieldwork")]
    PendingFieldwork,
    #[serde(rename = "pending QA")]
    PendingQa,
    #[serde(rename = "pending MD approval")]
    PendingMdApproval,
    #[serde(rename = "pending payment")]
    PendingPayment,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "revoked")]
    Revoked,
}

impl JobStatus {
    /// All statuses, pipeline order first, terminals last.
    pub const ALL: [JobStatus; 6] = [
        JobStatus::PendingFieldwork,
        JobStatus::PendingQa,
        JobStatus::PendingMdApproval,
        JobStatus::PendingPayment,
        JobStatus::Complete,
        JobStatus::Revoked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::PendingFieldwork => "pending fieldwork",
            JobStatus::PendingQa => "pending QA",
            JobStatus::PendingMdApproval => "pending MD approval",
            JobStatus::PendingPayment => "pending payment",
            JobStatus::Complete => "complete",
            JobStatus::Revoked => "revoked",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Revoked)
    }

    /// The role that acts on a job while it sits in this state, and that
    /// gets notified when a job arrives here. Terminal states are owned
    /// by admin.
    pub fn owning_role(&self) -> Role {
        match self {
            JobStatus::PendingFieldwork => Role::FieldTeam,
            JobStatus::PendingQa => Role::QaOfficer,
            JobStatus::PendingMdApproval => Role::Md,
            JobStatus::PendingPayment => Role::Accounts,
            JobStatus::Complete | JobStatus::Revoked => Role::Admin,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending fieldwork" => Ok(JobStatus::PendingFieldwork),
            "pending QA" => Ok(JobStatus::PendingQa),
            "pending MD approval" => Ok(JobStatus::PendingMdApproval),
            "pending payment" => Ok(JobStatus::PendingPayment),
            "complete" => Ok(JobStatus::Complete),
            "revoked" => Ok(JobStatus::Revoked),
            other => Err(format!("Unknown job status: '{}'", other)),
        }
    }
}

// ─── Role ───────────────────────────────────────────────────────────────────

/// Actor roles. Asserted per request; the workflow trusts the claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    FieldTeam,
    QaOfficer,
    Md,
    Accounts,
    SystemManager,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::FieldTeam => "field_team",
            Role::QaOfficer => "qa_officer",
            Role::Md => "md",
            Role::Accounts => "accounts",
            Role::SystemManager => "system_manager",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "field_team" => Ok(Role::FieldTeam),
            "qa_officer" => Ok(Role::QaOfficer),
            "md" => Ok(Role::Md),
            "accounts" => Ok(Role::Accounts),
            "system_manager" => Ok(Role::SystemManager),
            "client" => Ok(Role::Client),
            other => Err(format!("Unknown role: '{}'", other)),
        }
    }
}

// ─── Transition table ───────────────────────────────────────────────────────

/// Which job field a transition's notes are appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSink {
    AdminReviewNotes,
    QaNotes,
    RevocationReason,
}

/// A legal edge of the workflow graph.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: JobStatus,
    pub to: JobStatus,
    /// The only role allowed to perform this transition.
    pub actor: Role,
    /// Rejections and revocations must carry an explanation.
    pub notes_required: bool,
    pub note_sink: NoteSink,
}

/// The forward/backward edges of the pipeline. Revocation edges are
/// handled separately since they exist from every non-terminal state.
const RULES: &[TransitionRule] = &[
    TransitionRule {
        from: JobStatus::PendingFieldwork,
        to: JobStatus::PendingQa,
        actor: Role::FieldTeam,
        notes_required: false,
        note_sink: NoteSink::AdminReviewNotes,
    },
    TransitionRule {
        from: JobStatus::PendingQa,
        to: JobStatus::PendingMdApproval,
        actor: Role::QaOfficer,
        notes_required: false,
        note_sink: NoteSink::QaNotes,
    },
    TransitionRule {
        from: JobStatus::PendingQa,
        to: JobStatus::PendingFieldwork,
        actor: Role::QaOfficer,
        notes_required: true,
        note_sink: NoteSink::QaNotes,
    },
    TransitionRule {
        from: JobStatus::PendingMdApproval,
        to: JobStatus::PendingPayment,
        actor: Role::Md,
        notes_required: false,
        note_sink: NoteSink::AdminReviewNotes,
    },
    TransitionRule {
        from: JobStatus::PendingMdApproval,
        to: JobStatus::PendingQa,
        actor: Role::Md,
        notes_required: true,
        note_sink: NoteSink::AdminReviewNotes,
    },
    TransitionRule {
        from: JobStatus::PendingPayment,
        to: JobStatus::Complete,
        actor: Role::Accounts,
        notes_required: false,
        note_sink: NoteSink::AdminReviewNotes,
    },
];

/// Looks up the rule for a `(from, to)` edge, if the edge is legal at all.
pub fn rule_for(from: JobStatus, to: JobStatus) -> Option<TransitionRule> {
    if to == JobStatus::Revoked && !from.is_terminal() {
        return Some(TransitionRule {
            from,
            to: JobStatus::Revoked,
            actor: Role::QaOfficer,
            notes_required: true,
            note_sink: NoteSink::RevocationReason,
        });
    }
    RULES.iter().find(|r| r.from == from && r.to == to).copied()
}

/// Validates a requested transition against the workflow graph.
///
/// Checks, in order: terminal state, actor authorization for the current
/// state, edge legality, required notes. Returns the matched rule so the
/// caller knows where to file the notes.
pub fn check_transition(
    current: JobStatus,
    target: JobStatus,
    actor: Role,
    notes: Option<&str>,
) -> Result<TransitionRule, WorkflowError> {
    if current.is_terminal() {
        return Err(WorkflowError::IllegalTransition {
            from: current,
            to: target,
        });
    }

    // Authorization is against the current state: its stage owner may act,
    // and the QA officer may additionally revoke from anywhere.
    let authorized = actor == current.owning_role()
        || (actor == Role::QaOfficer && target == JobStatus::Revoked);
    if !authorized {
        return Err(WorkflowError::Forbidden {
            role: actor,
            status: current,
        });
    }

    let rule = rule_for(current, target).ok_or(WorkflowError::IllegalTransition {
        from: current,
        to: target,
    })?;

    if actor != rule.actor {
        return Err(WorkflowError::Forbidden {
            role: actor,
            status: current,
        });
    }

    if rule.notes_required && notes.map_or(true, |n| n.trim().is_empty()) {
        return Err(WorkflowError::ValidationFailed(format!(
            "Notes are required when moving a job from '{}' to '{}'",
            current, target
        )));
    }

    Ok(rule)
}
