//! Job repository: rows of the `jobs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone, Default)]
pub struct JobRow {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub total: i64,
    pub processed: i64,
    pub imported: i64,
    pub duplicates: i64,
    pub errors: i64,
    pub matched: i64,
    pub vehicles_linked: i64,
    pub drivers_linked: i64,
    pub invoices_linked: i64,
    pub message: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            kind: row.get("kind")?,
            status: row.get("status")?,
            total: row.get("total")?,
            processed: row.get("processed")?,
            imported: row.get("imported")?,
            duplicates: row.get("duplicates")?,
            errors: row.get("errors")?,
            matched: row.get("matched")?,
            vehicles_linked: row.get("vehicles_linked")?,
            drivers_linked: row.get("drivers_linked")?,
            invoices_linked: row.get("invoices_linked")?,
            message: row.get("message")?,
            error: row.get("error")?,
            created_at: row.get("created_at")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, kind, status, total, processed, imported, duplicates, errors,
             matched, vehicles_linked, drivers_linked, invoices_linked, message, error,
             created_at, started_at, completed_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                job.id,
                job.kind,
                job.status,
                job.total,
                job.processed,
                job.imported,
                job.duplicates,
                job.errors,
                job.matched,
                job.vehicles_linked,
                job.drivers_linked,
                job.invoices_linked,
                job.message,
                job.error,
                job.created_at,
                job.started_at,
                job.completed_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Updates an existing job row. All fields except `id`, `kind` and
/// `created_at` are overwritten. Returns `false` if the job does not exist.
pub fn update(db: &Database, job: &JobRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status=?2, total=?3, processed=?4, imported=?5, duplicates=?6,
             errors=?7, matched=?8, vehicles_linked=?9, drivers_linked=?10, invoices_linked=?11,
             message=?12, error=?13, started_at=?14, completed_at=?15, updated_at=?16
             WHERE id=?1",
            params![
                job.id,
                job.status,
                job.total,
                job.processed,
                job.imported,
                job.duplicates,
                job.errors,
                job.matched,
                job.vehicles_linked,
                job.drivers_linked,
                job.invoices_linked,
                job.message,
                job.error,
                job.started_at,
                job.completed_at,
                job.updated_at,
            ],
        )?;
        Ok(changed > 0)
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

/// Most recent jobs first, optionally filtered by status.
pub fn list(db: &Database, status: Option<&str>, limit: u32) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM jobs WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![status, limit], JobRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?1")?;
                let rows = stmt
                    .query_map(params![limit], JobRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(id: &str, status: &str, created_at: &str) -> JobRow {
        JobRow {
            id: id.to_string(),
            kind: "import".to_string(),
            status: status.to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &make_row("j1", "created", "2024-03-10T10:00:00+00:00")).unwrap();

        let found = find_by_id(&db, "j1").unwrap().unwrap();
        assert_eq!(found.kind, "import");
        assert_eq!(found.status, "created");
        assert_eq!(found.total, 0);
        assert!(find_by_id(&db, "nope").unwrap().is_none());
    }

    #[test]
    fn test_update_counters() {
        let db = Database::open_in_memory().unwrap();
        let mut row = make_row("j1", "created", "2024-03-10T10:00:00+00:00");
        insert(&db, &row).unwrap();

        row.status = "completed".to_string();
        row.total = 5;
        row.processed = 5;
        row.imported = 3;
        row.duplicates = 1;
        row.errors = 1;
        row.completed_at = Some("2024-03-10T10:01:00+00:00".to_string());
        assert!(update(&db, &row).unwrap());

        let found = find_by_id(&db, "j1").unwrap().unwrap();
        assert_eq!(found.status, "completed");
        assert_eq!((found.imported, found.duplicates, found.errors), (3, 1, 1));
        assert!(found.completed_at.is_some());

        assert!(!update(&db, &make_row("ghost", "queued", "2024-01-01")).unwrap());
    }

    #[test]
    fn test_list_filters_and_orders() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &make_row("old", "completed", "2024-01-01T00:00:00+00:00")).unwrap();
        insert(&db, &make_row("new", "completed", "2024-02-01T00:00:00+00:00")).unwrap();
        insert(&db, &make_row("run", "processing", "2024-03-01T00:00:00+00:00")).unwrap();

        let ids: Vec<String> = list(&db, Some("completed"), 10)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(list(&db, None, 2).unwrap().len(), 2);
    }
}
