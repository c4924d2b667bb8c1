use crate::model::{format_date, AttendanceRecord, Student};
use crate::submit::{AttendanceLedger, RosterStore};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "rollcall.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            roll TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            parent_name TEXT NOT NULL DEFAULT '',
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_roll TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            reason TEXT,
            UNIQUE(student_roll, date),
            FOREIGN KEY(student_roll) REFERENCES students(roll)
        )",
        [],
    )?;
    // Workspaces created before call write-back existed lack these columns.
    ensure_attendance_transcript(&conn)?;
    ensure_attendance_updated_at(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;

    Ok(conn)
}

fn ensure_attendance_transcript(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "attendance", "transcript")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE attendance ADD COLUMN transcript TEXT", [])?;
    Ok(())
}

fn ensure_attendance_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "attendance", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE attendance ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// A ledger row as readers see it, including call write-back fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub id: i64,
    pub student_roll: String,
    pub date: String,
    pub status: String,
    pub reason: Option<String>,
    pub transcript: Option<String>,
    pub student_name: Option<String>,
    pub parent_name: Option<String>,
}

pub fn list_students(conn: &Connection) -> anyhow::Result<Vec<Student>> {
    let mut stmt =
        conn.prepare("SELECT roll, name, phone, parent_name FROM students ORDER BY roll")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Student {
                roll: r.get(0)?,
                name: r.get(1)?,
                phone: r.get(2)?,
                parent_name: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn student_exists(conn: &Connection, roll: &str) -> anyhow::Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM students WHERE roll = ?", [roll], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub fn insert_student(conn: &Connection, student: &Student) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO students(roll, name, phone, parent_name, created_at)
         VALUES(?, ?, ?, ?, datetime('now'))",
        (
            &student.roll,
            &student.name,
            &student.phone,
            &student.parent_name,
        ),
    )?;
    Ok(())
}

/// Removes the student and every attendance row that references it.
/// Returns false when the roll was unknown.
pub fn delete_student(conn: &Connection, roll: &str) -> anyhow::Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM attendance WHERE student_roll = ?", [roll])?;
    let removed = tx.execute("DELETE FROM students WHERE roll = ?", [roll])?;
    tx.commit()?;
    Ok(removed > 0)
}

pub fn upsert_attendance(conn: &Connection, records: &[AttendanceRecord]) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO attendance(student_roll, date, status, reason, updated_at)
             VALUES(?, ?, ?, ?, datetime('now'))
             ON CONFLICT(student_roll, date) DO UPDATE SET
               status = excluded.status,
               reason = excluded.reason,
               updated_at = excluded.updated_at",
        )?;
        for r in records {
            stmt.execute((
                &r.student_roll,
                format_date(r.date),
                r.status.as_str(),
                &r.reason,
            ))?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Applies a call gateway write-back. Status is left untouched.
/// Returns false when no row exists for (roll, date).
pub fn record_call_result(
    conn: &Connection,
    roll: &str,
    date: NaiveDate,
    reason: &str,
    transcript: Option<&str>,
) -> anyhow::Result<bool> {
    let changed = conn.execute(
        "UPDATE attendance
         SET reason = ?, transcript = COALESCE(?, transcript), updated_at = datetime('now')
         WHERE student_roll = ? AND date = ?",
        (reason, transcript, roll, format_date(date)),
    )?;
    Ok(changed > 0)
}

const LEDGER_SELECT: &str = "SELECT a.id, a.student_roll, a.date, a.status, a.reason, a.transcript,
            s.name, s.parent_name
     FROM attendance a
     LEFT JOIN students s ON s.roll = a.student_roll";

fn ledger_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerRow> {
    Ok(LedgerRow {
        id: r.get(0)?,
        student_roll: r.get(1)?,
        date: r.get(2)?,
        status: r.get(3)?,
        reason: r.get(4)?,
        transcript: r.get(5)?,
        student_name: r.get(6)?,
        parent_name: r.get(7)?,
    })
}

pub fn attendance_for_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<LedgerRow>> {
    let sql = format!("{} WHERE a.date = ? ORDER BY a.student_roll", LEDGER_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([format_date(date)], ledger_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn attendance_history(conn: &Connection, limit: usize) -> anyhow::Result<Vec<LedgerRow>> {
    let sql = format!(
        "{} ORDER BY a.date DESC, a.student_roll LIMIT ?",
        LEDGER_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit as i64], ledger_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn attendance_row(
    conn: &Connection,
    roll: &str,
    date: NaiveDate,
) -> anyhow::Result<Option<LedgerRow>> {
    let sql = format!("{} WHERE a.student_roll = ? AND a.date = ?", LEDGER_SELECT);
    let row = conn
        .query_row(&sql, (roll, format_date(date)), ledger_row)
        .optional()?;
    Ok(row)
}

/// Roster and ledger backed by one workspace connection.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl RosterStore for SqliteStore<'_> {
    fn list_students(&self) -> anyhow::Result<Vec<Student>> {
        list_students(self.conn)
    }
}

impl AttendanceLedger for SqliteStore<'_> {
    fn upsert_records(&self, records: &[AttendanceRecord]) -> anyhow::Result<()> {
        upsert_attendance(self.conn, records)
    }
}
