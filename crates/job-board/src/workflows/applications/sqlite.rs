use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use super::domain::{
    ActorId, Application, ApplicationId, JobId, NewApplication, NewNote, Note, NoteId,
};
use super::repository::{ApplicationFilter, ApplicationRepository, RepositoryError};
use super::status::ApplicationStatus;

const APPLICATION_COLUMNS: &str = "SELECT id, job_id, applicant_name, applicant_email, phone,
        application_data, application_status, created_date, updated_date
     FROM job_applications";

/// Create the application and note tables.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout and never
/// drops or rewrites existing rows.
pub fn init_db(conn: &Connection) -> Result<(), RepositoryError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS job_applications (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id             INTEGER NOT NULL,
            applicant_name     TEXT NOT NULL,
            applicant_email    TEXT NOT NULL,
            phone              TEXT,
            application_data   TEXT NOT NULL DEFAULT '{}',
            application_status TEXT NOT NULL,
            created_date       TEXT NOT NULL,
            updated_date       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_job_applications_job
            ON job_applications(job_id);
        CREATE INDEX IF NOT EXISTS idx_job_applications_status
            ON job_applications(application_status, created_date DESC);
        CREATE TABLE IF NOT EXISTS job_application_notes (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            application_id INTEGER NOT NULL
                REFERENCES job_applications(id) ON DELETE CASCADE,
            user_id        INTEGER NOT NULL,
            note_text      TEXT NOT NULL,
            created_date   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_job_application_notes_application
            ON job_application_notes(application_id, created_date);",
    )?;
    Ok(())
}

/// SQLite-backed application store.
///
/// Wraps a single connection in a `Mutex`; each repository call is one
/// statement against one application row, so no explicit transactions are
/// needed.
pub struct SqliteApplicationRepository {
    db: Mutex<Connection>,
}

impl SqliteApplicationRepository {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let conn = if path == Path::new(":memory:") {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        debug!(path = %path.display(), "opened application database");
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn new(conn: Connection) -> Result<Self, RepositoryError> {
        init_db(&conn)?;
        register_functions(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn db(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.db
            .lock()
            .map_err(|_| RepositoryError::Unavailable("database mutex poisoned".to_string()))
    }
}

impl ApplicationRepository for SqliteApplicationRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let data = serde_json::to_string(&application.application_data)
            .map_err(|err| RepositoryError::Corrupt(err.to_string()))?;
        let submitted = format_timestamp(application.submitted_at);

        let db = self.db()?;
        db.execute(
            "INSERT INTO job_applications
             (job_id, applicant_name, applicant_email, phone, application_data,
              application_status, created_date, updated_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                to_sql_id(application.job_id.0),
                application.applicant_name,
                application.applicant_email,
                application.phone,
                data,
                application.status.as_str(),
                submitted,
            ],
        )?;
        let id = ApplicationId(from_sql_id(db.last_insert_rowid())?);

        Ok(Application {
            id,
            job_id: application.job_id,
            applicant_name: application.applicant_name,
            applicant_email: application.applicant_email,
            phone: application.phone,
            application_data: application.application_data,
            status: application.status,
            created_date: application.submitted_at,
            updated_date: application.submitted_at,
        })
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let db = self.db()?;
        select_application(&db, id)
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: &ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        let db = self.db()?;
        let rows_changed = db.execute(
            "UPDATE job_applications
             SET application_status = ?1,
                 updated_date       = ?2
             WHERE id = ?3",
            params![
                status.as_str(),
                format_timestamp(updated_at),
                to_sql_id(id.0)
            ],
        )?;
        if rows_changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        select_application(&db, id)?.ok_or(RepositoryError::NotFound)
    }

    fn delete(&self, id: ApplicationId) -> Result<(), RepositoryError> {
        let db = self.db()?;
        let rows_changed = db.execute(
            "DELETE FROM job_applications WHERE id = ?1",
            params![to_sql_id(id.0)],
        )?;
        if rows_changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = filter.status.as_deref() {
            values.push(Value::Text(status.to_string()));
            clauses.push(format!("application_status = ?{}", values.len()));
        }
        if let Some(job_id) = filter.job_id {
            values.push(Value::Integer(to_sql_id(job_id.0)));
            clauses.push(format!("job_id = ?{}", values.len()));
        }
        if let Some(search) = filter.search.as_deref() {
            values.push(Value::Text(format!(
                "%{}%",
                escape_like(&search.to_lowercase())
            )));
            let n = values.len();
            clauses.push(format!(
                "(fold_case(applicant_name) LIKE ?{n} ESCAPE '\\' \
                 OR fold_case(applicant_email) LIKE ?{n} ESCAPE '\\')"
            ));
        }
        if let Some(from) = filter.submitted_from {
            let start = from.and_time(NaiveTime::MIN).and_utc();
            values.push(Value::Text(format_timestamp(start)));
            clauses.push(format!("created_date >= ?{}", values.len()));
        }
        if let Some(next_day) = filter.submitted_to.and_then(|to| to.succ_opt()) {
            let end = next_day.and_time(NaiveTime::MIN).and_utc();
            values.push(Value::Text(format_timestamp(end)));
            clauses.push(format!("created_date < ?{}", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("{APPLICATION_COLUMNS}{where_clause} ORDER BY created_date DESC, id DESC");

        let db = self.db()?;
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), StoredApplication::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(StoredApplication::into_application)
            .collect()
    }

    fn insert_note(&self, note: NewNote) -> Result<Note, RepositoryError> {
        let db = self.db()?;
        let exists = db
            .query_row(
                "SELECT 1 FROM job_applications WHERE id = ?1",
                params![to_sql_id(note.application_id.0)],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        db.execute(
            "INSERT INTO job_application_notes (application_id, user_id, note_text, created_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                to_sql_id(note.application_id.0),
                to_sql_id(note.author_id.0),
                note.note_text,
                format_timestamp(note.created_at),
            ],
        )?;
        let id = NoteId(from_sql_id(db.last_insert_rowid())?);

        Ok(Note {
            id,
            application_id: note.application_id,
            author_id: note.author_id,
            note_text: note.note_text,
            created_date: note.created_at,
        })
    }

    fn notes(&self, id: ApplicationId) -> Result<Vec<Note>, RepositoryError> {
        let db = self.db()?;
        let mut stmt = db.prepare(
            "SELECT id, application_id, user_id, note_text, created_date
             FROM job_application_notes
             WHERE application_id = ?1
             ORDER BY created_date ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![to_sql_id(id.0)], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, application_id, user_id, note_text, created)| {
                Ok(Note {
                    id: NoteId(from_sql_id(id)?),
                    application_id: ApplicationId(from_sql_id(application_id)?),
                    author_id: ActorId(from_sql_id(user_id)?),
                    note_text,
                    created_date: parse_timestamp(&created)?,
                })
            })
            .collect()
    }

    fn note_count(&self, id: ApplicationId) -> Result<usize, RepositoryError> {
        let db = self.db()?;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM job_application_notes WHERE application_id = ?1",
            params![to_sql_id(id.0)],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

struct StoredApplication {
    id: i64,
    job_id: i64,
    applicant_name: String,
    applicant_email: String,
    phone: Option<String>,
    application_data: String,
    status: String,
    created_date: String,
    updated_date: String,
}

impl StoredApplication {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            job_id: row.get(1)?,
            applicant_name: row.get(2)?,
            applicant_email: row.get(3)?,
            phone: row.get(4)?,
            application_data: row.get(5)?,
            status: row.get(6)?,
            created_date: row.get(7)?,
            updated_date: row.get(8)?,
        })
    }

    fn into_application(self) -> Result<Application, RepositoryError> {
        let application_data = serde_json::from_str(&self.application_data)
            .map_err(|err| RepositoryError::Corrupt(format!("application {}: {err}", self.id)))?;

        Ok(Application {
            id: ApplicationId(from_sql_id(self.id)?),
            job_id: JobId(from_sql_id(self.job_id)?),
            applicant_name: self.applicant_name,
            applicant_email: self.applicant_email,
            phone: self.phone,
            application_data,
            status: ApplicationStatus::from_stored(self.status),
            created_date: parse_timestamp(&self.created_date)?,
            updated_date: parse_timestamp(&self.updated_date)?,
        })
    }
}

fn select_application(
    db: &Connection,
    id: ApplicationId,
) -> Result<Option<Application>, RepositoryError> {
    db.query_row(
        &format!("{APPLICATION_COLUMNS} WHERE id = ?1"),
        params![to_sql_id(id.0)],
        StoredApplication::from_row,
    )
    .optional()?
    .map(StoredApplication::into_application)
    .transpose()
}

// Fixed-width RFC 3339 so lexical order in SQLite matches time order.
/// SQLite's built-in `lower()` only folds ASCII; search needs the same
/// folding as `str::to_lowercase`.
fn register_functions(conn: &Connection) -> Result<(), RepositoryError> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )?;
    Ok(())
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Corrupt(format!("timestamp '{raw}': {err}")))
}

fn to_sql_id(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_id(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| RepositoryError::Corrupt(format!("negative id {value}")))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
