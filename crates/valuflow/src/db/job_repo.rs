//! Job repository — CRUD operations for the `jobs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub client_name: String,
    pub client_type: String,
    pub contact_details: Option<String>,
    pub address: Option<String>,
    pub asset_type: String,
    pub asset_location: Option<String>,
    pub asset_size: Option<String>,
    pub declared_use: Option<String>,
    pub previous_work: Option<String>,
    pub neighborhood_refs: Option<String>,
    pub valuation_purpose: Option<String>,
    pub estimated_value: Option<f64>,
    pub currency: Option<String>,
    pub deadline: Option<String>,
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub bank_contact_person: Option<String>,
    pub bank_contact_number: Option<String>,
    pub status: String,
    pub qa_checklist: Option<String>,
    pub admin_reviewed: bool,
    pub admin_review_notes: Option<String>,
    pub qa_notes: Option<String>,
    pub md_approved: bool,
    pub payment_received: bool,
    pub revocation_reason: Option<String>,
    pub field_report: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            client_name: row.get("client_name")?,
            client_type: row.get("client_type")?,
            contact_details: row.get("contact_details")?,
            address: row.get("address")?,
            asset_type: row.get("asset_type")?,
            asset_location: row.get("asset_location")?,
            asset_size: row.get("asset_size")?,
            declared_use: row.get("declared_use")?,
            previous_work: row.get("previous_work")?,
            neighborhood_refs: row.get("neighborhood_refs")?,
            valuation_purpose: row.get("valuation_purpose")?,
            estimated_value: row.get("estimated_value")?,
            currency: row.get("currency")?,
            deadline: row.get("deadline")?,
            bank_name: row.get("bank_name")?,
            bank_branch: row.get("bank_branch")?,
            bank_contact_person: row.get("bank_contact_person")?,
            bank_contact_number: row.get("bank_contact_number")?,
            status: row.get("status")?,
            qa_checklist: row.get("qa_checklist")?,
            admin_reviewed: row.get("admin_reviewed")?,
            admin_review_notes: row.get("admin_review_notes")?,
            qa_notes: row.get("qa_notes")?,
            md_approved: row.get("md_approved")?,
            payment_received: row.get("payment_received")?,
            revocation_reason: row.get("revocation_reason")?,
            field_report: row.get("field_report")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            version: row.get("version")?,
        })
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    /// Exact status match.
    pub status: Option<String>,
    /// Substring match on the referring bank name.
    pub bank: Option<String>,
    /// Substring match on the client name.
    pub client: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, client_name, client_type, contact_details, address,
             asset_type, asset_location, asset_size, declared_use, previous_work,
             neighborhood_refs, valuation_purpose, estimated_value, currency, deadline,
             bank_name, bank_branch, bank_contact_person, bank_contact_number, status,
             qa_checklist, admin_reviewed, admin_review_notes, qa_notes, md_approved,
             payment_received, revocation_reason, field_report, created_at, updated_at, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31)",
            params![
                job.id,
                job.client_name,
                job.client_type,
                job.contact_details,
                job.address,
                job.asset_type,
                job.asset_location,
                job.asset_size,
                job.declared_use,
                job.previous_work,
                job.neighborhood_refs,
                job.valuation_purpose,
                job.estimated_value,
                job.currency,
                job.deadline,
                job.bank_name,
                job.bank_branch,
                job.bank_contact_person,
                job.bank_contact_number,
                job.status,
                job.qa_checklist,
                job.admin_reviewed,
                job.admin_review_notes,
                job.qa_notes,
                job.md_approved,
                job.payment_received,
                job.revocation_reason,
                job.field_report,
                job.created_at,
                job.updated_at,
                job.version,
            ],
        )?;
        Ok(())
    })
}

/// Updates an existing job row, guarded by the version counter.
///
/// All fields except `id` and `created_at` are overwritten and `version`
/// is incremented. Returns the number of rows affected — zero means the
/// row was missing or the expected version was stale.
pub fn update_versioned(
    db: &Database,
    job: &JobRow,
    expected_version: i64,
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE jobs SET client_name=?2, client_type=?3, contact_details=?4, address=?5,
             asset_type=?6, asset_location=?7, asset_size=?8, declared_use=?9,
             previous_work=?10, neighborhood_refs=?11, valuation_purpose=?12,
             estimated_value=?13, currency=?14, deadline=?15, bank_name=?16, bank_branch=?17,
             bank_contact_person=?18, bank_contact_number=?19, status=?20, qa_checklist=?21,
             admin_reviewed=?22, admin_review_notes=?23, qa_notes=?24, md_approved=?25,
             payment_received=?26, revocation_reason=?27, field_report=?28, updated_at=?29,
             version=?30 + 1
             WHERE id=?1 AND version=?30",
            params![
                job.id,
                job.client_name,
                job.client_type,
                job.contact_details,
                job.address,
                job.asset_type,
                job.asset_location,
                job.asset_size,
                job.declared_use,
                job.previous_work,
                job.neighborhood_refs,
                job.valuation_purpose,
                job.estimated_value,
                job.currency,
                job.deadline,
                job.bank_name,
                job.bank_branch,
                job.bank_contact_person,
                job.bank_contact_number,
                job.status,
                job.qa_checklist,
                job.admin_reviewed,
                job.admin_review_notes,
                job.qa_notes,
                job.md_approved,
                job.payment_received,
                job.revocation_reason,
                job.field_report,
                job.updated_at,
                expected_version,
            ],
        )?;
        Ok(affected)
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Queries jobs with filters, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<JobRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }
        if let Some(ref bank) = filter.bank {
            conditions.push(format!("bank_name LIKE ?{}", param_values.len() + 1));
            param_values.push(Box::new(format!("%{}%", bank)));
        }
        if let Some(ref client) = filter.client {
            conditions.push(format!("client_name LIKE ?{}", param_values.len() + 1));
            param_values.push(Box::new(format!("%{}%", client)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // Fetch paginated results.
        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM jobs {} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Deletes a job row. Returns the number of rows removed.
pub fn delete(db: &Database, id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(affected)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
