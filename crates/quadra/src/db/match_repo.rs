//! Match repository: rows of the `matches` table.

use rusqlite::{params, Connection, Row};

use super::record_repo::{self, RecordRow};
use super::{Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct MatchRow {
    pub id: String,
    pub plan: String,
    pub source_id: String,
    pub candidate_id: String,
    pub delta_cents: i64,
    pub date_offset_days: i64,
    pub created_at: String,
}

impl MatchRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            plan: row.get("plan")?,
            source_id: row.get("source_id")?,
            candidate_id: row.get("candidate_id")?,
            delta_cents: row.get("delta_cents")?,
            date_offset_days: row.get("date_offset_days")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn insert_in(conn: &Connection, m: &MatchRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO matches (id, plan, source_id, candidate_id, delta_cents, date_offset_days, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            m.id,
            m.plan,
            m.source_id,
            m.candidate_id,
            m.delta_cents,
            m.date_offset_days,
            m.created_at,
        ],
    )?;
    Ok(())
}

fn update_all(conn: &Connection, records: &[RecordRow]) -> Result<(), DatabaseError> {
    for record in records {
        if !record_repo::update_in(conn, record)? {
            return Err(DatabaseError::MissingRow {
                table: "records",
                id: record.id.clone(),
            });
        }
    }
    Ok(())
}

/// Inserts a match and overwrites the records it moved forward, in one
/// transaction. A record row that has disappeared rolls everything back.
pub fn insert_with_records(
    db: &Database,
    m: &MatchRow,
    records: &[RecordRow],
) -> Result<(), DatabaseError> {
    db.with_transaction(|conn| {
        insert_in(conn, m)?;
        update_all(conn, records)
    })
}

/// Deletes a match and overwrites the records it released, in one
/// transaction. Returns `false` and writes nothing if the match is gone.
pub fn delete_with_records(
    db: &Database,
    id: &str,
    records: &[RecordRow],
) -> Result<bool, DatabaseError> {
    db.with_transaction(|conn| {
        if !delete_in(conn, id)? {
            return Ok(false);
        }
        update_all(conn, records)?;
        Ok(true)
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<MatchRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM matches WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], MatchRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Matches in which the record takes part on either side.
pub fn find_by_record(db: &Database, record_id: &str) -> Result<Vec<MatchRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM matches WHERE source_id = ?1 OR candidate_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map(params![record_id], MatchRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Candidate ids already claimed under a plan.
pub fn claimed_candidates(db: &Database, plan: &str) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT candidate_id FROM matches WHERE plan = ?1")?;
        let ids = stmt
            .query_map(params![plan], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    })
}

pub fn list_by_plan(db: &Database, plan: &str) -> Result<Vec<MatchRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM matches WHERE plan = ?1 ORDER BY created_at, rowid")?;
        let rows = stmt
            .query_map(params![plan], MatchRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

fn delete_in(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM matches WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, plan: &str, source: &str, candidate: &str) -> MatchRow {
        MatchRow {
            id: id.to_string(),
            plan: plan.to_string(),
            source_id: source.to_string(),
            candidate_id: candidate.to_string(),
            delta_cents: -1,
            date_offset_days: 1,
            created_at: "2024-03-10T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_insert_find_delete() {
        let db = Database::open_in_memory().unwrap();
        insert_with_records(&db, &row("m1", "statement_lines", "t1", "s1"), &[]).unwrap();

        let found = find_by_id(&db, "m1").unwrap().unwrap();
        assert_eq!(found.delta_cents, -1);
        assert_eq!(found.date_offset_days, 1);

        assert!(delete_with_records(&db, "m1", &[]).unwrap());
        assert!(find_by_id(&db, "m1").unwrap().is_none());
    }

    #[test]
    fn test_find_by_record_either_side() {
        let db = Database::open_in_memory().unwrap();
        insert_with_records(&db, &row("m1", "statement_lines", "t1", "s1"), &[]).unwrap();
        insert_with_records(&db, &row("m2", "fine_payments", "f1", "t1"), &[]).unwrap();
        insert_with_records(&db, &row("m3", "statement_lines", "t2", "s2"), &[]).unwrap();

        let ids: Vec<String> = find_by_record(&db, "t1").unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    fn record(id: &str, state: &str) -> RecordRow {
        RecordRow {
            id: id.to_string(),
            kind: "transfer".to_string(),
            state: state.to_string(),
            dedup_key: format!("key-{}", id),
            job_id: None,
            body: "{}".to_string(),
            created_at: "2024-03-10T10:00:00+00:00".to_string(),
            updated_at: "2024-03-10T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_insert_with_records_is_atomic() {
        let db = Database::open_in_memory().unwrap();
        record_repo::insert(&db, &record("t1", "ingested")).unwrap();

        // s1 was never stored, so the whole write is undone
        let err = insert_with_records(
            &db,
            &row("m1", "statement_lines", "t1", "s1"),
            &[record("t1", "matched"), record("s1", "matched")],
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::MissingRow { ref id, .. } if id == "s1"));
        assert!(find_by_id(&db, "m1").unwrap().is_none());
        assert_eq!(record_repo::find_by_id(&db, "t1").unwrap().unwrap().state, "ingested");

        record_repo::insert(&db, &record("s1", "ingested")).unwrap();
        insert_with_records(
            &db,
            &row("m1", "statement_lines", "t1", "s1"),
            &[record("t1", "matched"), record("s1", "matched")],
        )
        .unwrap();
        assert!(find_by_id(&db, "m1").unwrap().is_some());
        assert_eq!(record_repo::find_by_id(&db, "s1").unwrap().unwrap().state, "matched");
    }

    #[test]
    fn test_delete_with_records() {
        let db = Database::open_in_memory().unwrap();
        record_repo::insert(&db, &record("t1", "matched")).unwrap();
        insert_with_records(&db, &row("m1", "statement_lines", "t1", "s1"), &[]).unwrap();

        assert!(delete_with_records(&db, "m1", &[record("t1", "ingested")]).unwrap());
        assert!(find_by_id(&db, "m1").unwrap().is_none());
        assert_eq!(record_repo::find_by_id(&db, "t1").unwrap().unwrap().state, "ingested");

        // Already gone: records are left alone
        assert!(!delete_with_records(&db, "m1", &[record("t1", "matched")]).unwrap());
        assert_eq!(record_repo::find_by_id(&db, "t1").unwrap().unwrap().state, "ingested");
    }

    #[test]
    fn test_claimed_candidates_per_plan() {
        let db = Database::open_in_memory().unwrap();
        insert_with_records(&db, &row("m1", "invoices", "f1", "inv-1"), &[]).unwrap();
        insert_with_records(&db, &row("m2", "payroll", "t1", "sal-1"), &[]).unwrap();

        assert_eq!(claimed_candidates(&db, "invoices").unwrap(), vec!["inv-1"]);
        assert_eq!(list_by_plan(&db, "payroll").unwrap().len(), 1);
    }
}
