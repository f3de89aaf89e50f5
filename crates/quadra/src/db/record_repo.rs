//! Record repository: rows of the `records` table.
//!
//! The full record lives in `body` as JSON; `kind`, `state`, `dedup_key` and
//! `job_id` are copied out so they can be indexed and filtered.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: String,
    pub kind: String,
    pub state: String,
    pub dedup_key: String,
    pub job_id: Option<String>,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            kind: row.get("kind")?,
            state: row.get("state")?,
            dedup_key: row.get("dedup_key")?,
            job_id: row.get("job_id")?,
            body: row.get("body")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub fn insert(db: &Database, record: &RecordRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO records (id, kind, state, dedup_key, job_id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.kind,
                record.state,
                record.dedup_key,
                record.job_id,
                record.body,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites state, body and `updated_at`. Returns `false` if no row has
/// the given id.
pub fn update(db: &Database, record: &RecordRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| update_in(conn, record))
}

/// [`update`] on a connection the caller already holds, e.g. inside
/// [`Database::with_transaction`].
pub fn update_in(conn: &Connection, record: &RecordRow) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE records SET state = ?2, body = ?3, updated_at = ?4 WHERE id = ?1",
        params![record.id, record.state, record.body, record.updated_at],
    )?;
    Ok(changed > 0)
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM records WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], RecordRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Records of one kind in insertion order.
pub fn list_by_kind(db: &Database, kind: &str) -> Result<Vec<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM records WHERE kind = ?1 ORDER BY created_at, rowid")?;
        let rows = stmt
            .query_map(params![kind], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn list_by_job(db: &Database, job_id: &str) -> Result<Vec<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM records WHERE job_id = ?1 ORDER BY created_at, rowid")?;
        let rows = stmt
            .query_map(params![job_id], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn list_all(db: &Database) -> Result<Vec<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM records ORDER BY created_at, rowid")?;
        let rows = stmt
            .query_map([], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Every persisted `(kind, dedup_key)` pair, in one read.
pub fn all_dedup_keys(db: &Database) -> Result<Vec<(String, String)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT DISTINCT kind, dedup_key FROM records")?;
        let keys = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    })
}

/// Deletes a record together with any match rows that still reference it.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_transaction(|conn| {
        conn.execute(
            "DELETE FROM matches WHERE source_id = ?1 OR candidate_id = ?1",
            params![id],
        )?;
        let changed = conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}

pub fn count(db: &Database) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, kind: &str, key: &str, job: Option<&str>) -> RecordRow {
        RecordRow {
            id: id.to_string(),
            kind: kind.to_string(),
            state: "ingested".to_string(),
            dedup_key: key.to_string(),
            job_id: job.map(str::to_string),
            body: "{}".to_string(),
            created_at: "2024-03-10T10:00:00+00:00".to_string(),
            updated_at: "2024-03-10T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &row("r1", "transfer", "k1", Some("j1"))).unwrap();

        let found = find_by_id(&db, "r1").unwrap().unwrap();
        assert_eq!(found.kind, "transfer");
        assert_eq!(found.job_id.as_deref(), Some("j1"));
        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let mut r = row("r1", "transfer", "k1", None);
        insert(&db, &r).unwrap();

        r.state = "matched".to_string();
        assert!(update(&db, &r).unwrap());
        assert_eq!(find_by_id(&db, "r1").unwrap().unwrap().state, "matched");

        assert!(delete(&db, "r1").unwrap());
        assert!(!delete(&db, "r1").unwrap());
        assert!(!update(&db, &r).unwrap());
    }

    #[test]
    fn test_delete_drops_dangling_matches() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &row("r1", "transfer", "k1", None)).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO matches (id, plan, source_id, candidate_id, delta_cents, date_offset_days, created_at)
                 VALUES ('m1', 'invoices', 'r1', 'inv-9', 0, 0, '2024-03-10T10:00:00+00:00')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert!(delete(&db, "r1").unwrap());
        let left: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn test_listing_and_keys() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, &row("r1", "transfer", "k1", Some("j1"))).unwrap();
        insert(&db, &row("r2", "statement_line", "k2", Some("j1"))).unwrap();
        insert(&db, &row("r3", "transfer", "k1", Some("j2"))).unwrap();
        insert(&db, &row("r4", "statement_line", "k1", Some("j2"))).unwrap();

        let transfers: Vec<String> = list_by_kind(&db, "transfer")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(transfers, vec!["r1", "r3"]);
        assert_eq!(list_by_job(&db, "j1").unwrap().len(), 2);
        assert_eq!(list_all(&db).unwrap().len(), 4);

        let mut keys = all_dedup_keys(&db).unwrap();
        keys.sort();
        let pair = |k: &str, v: &str| (k.to_string(), v.to_string());
        assert_eq!(
            keys,
            vec![
                pair("statement_line", "k1"),
                pair("statement_line", "k2"),
                pair("transfer", "k1"),
            ]
        );
        assert_eq!(count(&db).unwrap(), 4);
    }
}
