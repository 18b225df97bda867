//! Notification repository — per-recipient rows in the `notifications` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw notification row from the database.
#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub recipient: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub priority: String,
    pub is_read: bool,
    pub created_at: String,
}

impl NotificationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            recipient: row.get("recipient")?,
            title: row.get("title")?,
            message: row.get("message")?,
            kind: row.get("kind")?,
            priority: row.get("priority")?,
            is_read: row.get("is_read")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new notification row.
pub fn insert(db: &Database, row: &NotificationRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO notifications (id, recipient, title, message, kind, priority,
             is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.id,
                row.recipient,
                row.title,
                row.message,
                row.kind,
                row.priority,
                row.is_read,
                row.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Returns all notifications for a recipient, newest first.
pub fn list_for_recipient(
    db: &Database,
    recipient: &str,
) -> Result<Vec<NotificationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM notifications WHERE recipient = ?1 ORDER BY created_at DESC",
        )?;
        let rows: Vec<NotificationRow> = stmt
            .query_map(params![recipient], NotificationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds a notification by id, scoped to its recipient.
pub fn find_for_recipient(
    db: &Database,
    recipient: &str,
    id: &str,
) -> Result<Option<NotificationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM notifications WHERE id = ?1 AND recipient = ?2")?;
        let mut rows = stmt.query_map(params![id, recipient], NotificationRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Marks a notification as read. Returns the number of rows affected.
pub fn mark_read(db: &Database, recipient: &str, id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient = ?2",
            params![id, recipient],
        )?;
        Ok(affected)
    })
}

/// Deletes a notification. Returns the number of rows removed.
pub fn delete(db: &Database, recipient: &str, id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND recipient = ?2",
            params![id, recipient],
        )?;
        Ok(affected)
    })
}

/// Counts unread notifications for a recipient.
pub fn unread_count(db: &Database, recipient: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient = ?1 AND is_read = 0",
            params![recipient],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_notification(id: &str, recipient: &str) -> NotificationRow {
        NotificationRow {
            id: id.to_string(),
            recipient: recipient.to_string(),
            title: "Job ready for QA".to_string(),
            message: "Job abc is awaiting QA review".to_string(),
            kind: "info".to_string(),
            priority: "normal".to_string(),
            is_read: false,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_insert_and_list() {
        let db = test_db();
        insert(&db, &sample_notification("n1", "qa_officer")).unwrap();
        insert(&db, &sample_notification("n2", "qa_officer")).unwrap();
        insert(&db, &sample_notification("n3", "md")).unwrap();

        let rows = list_for_recipient(&db, "qa_officer").unwrap();
        assert_eq!(rows.len(), 2);

        let rows = list_for_recipient(&db, "md").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "n3");
    }

    #[test]
    fn test_recipient_isolation() {
        let db = test_db();
        insert(&db, &sample_notification("n1", "qa_officer")).unwrap();

        // Another recipient cannot see, read, or delete the row.
        assert!(find_for_recipient(&db, "md", "n1").unwrap().is_none());
        assert_eq!(mark_read(&db, "md", "n1").unwrap(), 0);
        assert_eq!(delete(&db, "md", "n1").unwrap(), 0);

        assert!(find_for_recipient(&db, "qa_officer", "n1").unwrap().is_some());
    }

    #[test]
    fn test_mark_read() {
        let db = test_db();
        insert(&db, &sample_notification("n1", "accounts")).unwrap();

        assert_eq!(unread_count(&db, "accounts").unwrap(), 1);
        assert_eq!(mark_read(&db, "accounts", "n1").unwrap(), 1);
        assert_eq!(unread_count(&db, "accounts").unwrap(), 0);

        let row = find_for_recipient(&db, "accounts", "n1").unwrap().unwrap();
        assert!(row.is_read);
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        insert(&db, &sample_notification("n1", "md")).unwrap();

        assert_eq!(delete(&db, "md", "n1").unwrap(), 1);
        assert!(list_for_recipient(&db, "md").unwrap().is_empty());
    }
}
