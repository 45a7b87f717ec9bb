//! User profile store
//!
//! The identity store is a document interface keyed by user id. This
//! module consumes it through SQLite, with the subject set held as a JSON
//! array column.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid subjects column: {0}")]
    Subjects(#[from] serde_json::Error),
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Create a profile for `id`. The email is stored lower-cased.
    pub fn create_profile(&self, id: &str, email: &str, username: &str) -> DbResult<UserProfile> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let email = email.to_lowercase();

        conn.execute(
            "INSERT INTO users (id, email, username, subjects, created_at, updated_at)
             VALUES (?1, ?2, ?3, '[]', ?4, ?4)",
            params![id, email, username, now.to_rfc3339()],
        )?;

        Ok(UserProfile {
            id: id.to_string(),
            email,
            username: username.to_string(),
            subjects: vec![],
            created_at: now,
            updated_at: now,
        })
    }

    /// Get the profile stored under `id`
    pub fn get_profile(&self, id: &str) -> DbResult<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, username, subjects, created_at, updated_at
             FROM users WHERE id = ?1",
        )?;
        Ok(stmt.query_row(params![id], map_profile_row).optional()?)
    }

    /// Find the profile registered under `email`, case-insensitively
    pub fn find_by_email(&self, email: &str) -> DbResult<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, username, subjects, created_at, updated_at
             FROM users WHERE email = ?1",
        )?;
        Ok(stmt
            .query_row(params![email.to_lowercase()], map_profile_row)
            .optional()?)
    }

    /// Add `subject` to the profile's subject set. Idempotent union:
    /// adding a subject that is already present leaves the set unchanged.
    pub fn add_subject(&self, id: &str, subject: &str) -> DbResult<UserProfile> {
        self.update_subjects(id, |subjects| {
            if !subjects.iter().any(|s| s == subject) {
                subjects.push(subject.to_string());
            }
        })
    }

    /// Remove `subject` from the profile's subject set. Idempotent
    /// difference: removing an absent subject is a no-op.
    pub fn remove_subject(&self, id: &str, subject: &str) -> DbResult<UserProfile> {
        self.update_subjects(id, |subjects| {
            subjects.retain(|s| s != subject);
        })
    }

    fn update_subjects(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Vec<String>),
    ) -> DbResult<UserProfile> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, username, subjects, created_at, updated_at
             FROM users WHERE id = ?1",
        )?;
        let Some(mut profile) = stmt.query_row(params![id], map_profile_row).optional()? else {
            return Err(DbError::ProfileNotFound(id.to_string()));
        };

        mutate(&mut profile.subjects);

        let now = Utc::now();
        conn.execute(
            "UPDATE users SET subjects = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                serde_json::to_string(&profile.subjects)?,
                now.to_rfc3339(),
                id
            ],
        )?;
        profile.updated_at = now;
        Ok(profile)
    }
}

fn map_profile_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    let subjects_json: String = row.get(3)?;
    let subjects: Vec<String> = serde_json::from_str(&subjects_json).unwrap_or_default();
    Ok(UserProfile {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        subjects,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
