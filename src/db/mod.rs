use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::path::Path;
use thiserror::Error;

use crate::models::{
    ImageChange, NewTask, PAGE_SIZE, Page, PageRequest, Task, TaskChanges, User, page_count,
};

/// Current schema version written to the config table.
const SCHEMA_VERSION: i32 = 1;

/// Lifetime of a login session.
const SESSION_TTL_DAYS: i64 = 14;

const TASK_COLUMNS: &str =
    "id, user_id, title, description, complete, created, updated, image, link";

const USER_COLUMNS: &str = "id, username, password_hash, is_active, date_joined, last_login";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("a user with that username already exists: {0}")]
    UsernameTaken(String),
    #[error("invalid schema_version value: {0}")]
    SchemaVersion(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Which tasks a listing covers: always a single owner, optionally
/// narrowed by a case-insensitive title search.
#[derive(Debug, Clone, Copy)]
pub struct TaskFilter<'a> {
    pub owner: i64,
    pub search: Option<&'a str>,
}

impl<'a> TaskFilter<'a> {
    pub fn owned_by(owner: i64) -> Self {
        TaskFilter {
            owner,
            search: None,
        }
    }

    /// Blank search terms match everything.
    pub fn with_search(mut self, search: Option<&'a str>) -> Self {
        self.search = search.filter(|s| !s.is_empty());
        self
    }

    fn like_pattern(&self) -> Option<String> {
        self.search.map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        register_functions(&conn)?;
        Ok(Database { conn })
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        register_functions(&conn)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Create the schema tables if they don't exist, then run any pending version-gated migrations.
    pub fn migrate(&self) -> DbResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                username      TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_active     INTEGER NOT NULL DEFAULT 1,
                date_joined   TEXT NOT NULL,
                last_login    TEXT
            );

            CREATE TABLE IF NOT EXISTS sessions (
                key     TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created TEXT NOT NULL,
                expires TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT,
                description TEXT,
                complete    INTEGER NOT NULL DEFAULT 0,
                created     TEXT NOT NULL,
                updated     TEXT NOT NULL,
                image       TEXT,
                link        TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_nocase
                ON users(username COLLATE NOCASE);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(user_id, complete);
            ",
        )?;

        // Fresh databases start at version 0.
        self.conn.execute(
            "INSERT OR IGNORE INTO config (key, value) VALUES ('schema_version', '0')",
            [],
        )?;

        run_migrations(&self.conn)
    }

    // -- Config --

    pub fn set_config(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> DbResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    // -- Users --

    /// Insert a user with an already-hashed password.
    pub fn insert_user(&self, username: &str, password_hash: &str) -> DbResult<User> {
        let now = now();
        let result = self.conn.execute(
            "INSERT INTO users (username, password_hash, is_active, date_joined)
             VALUES (?1, ?2, 1, ?3)",
            params![username, password_hash, timestamp(&now)],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(DbError::UsernameTaken(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            date_joined: now,
            last_login: None,
        })
    }

    /// Exact (case-sensitive) username lookup, as used by login.
    pub fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = self
            .conn
            .query_row(&sql, params![username], row_to_user)
            .optional()?;
        Ok(user)
    }

    /// Whether the username is already in use, ignoring case.
    pub fn username_taken(&self, username: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 COLLATE NOCASE",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn set_user_active(&self, id: i64, active: bool) -> DbResult<()> {
        self.conn.execute(
            "UPDATE users SET is_active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(())
    }

    pub fn touch_last_login(&self, id: i64) -> DbResult<()> {
        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![timestamp(&now()), id],
        )?;
        Ok(())
    }

    // -- Sessions --

    /// Start a new session for the user and return its key.
    pub fn create_session(&self, user_id: i64) -> DbResult<String> {
        let key = uuid::Uuid::new_v4().simple().to_string();
        let now = now();
        let expires = now + Duration::days(SESSION_TTL_DAYS);
        self.conn.execute(
            "INSERT INTO sessions (key, user_id, created, expires) VALUES (?1, ?2, ?3, ?4)",
            params![key, user_id, timestamp(&now), timestamp(&expires)],
        )?;
        Ok(key)
    }

    /// Resolve a session key to its active, unexpired user.
    pub fn session_user(&self, key: &str) -> DbResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT u.id, u.username, u.password_hash, u.is_active, u.date_joined, u.last_login
                 FROM users u
                 JOIN sessions s ON s.user_id = u.id
                 WHERE s.key = ?1 AND s.expires > ?2 AND u.is_active = 1",
                params![key, timestamp(&now())],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn delete_session(&self, key: &str) -> DbResult<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Remove expired sessions, returning how many were dropped.
    pub fn purge_expired_sessions(&self) -> DbResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM sessions WHERE expires <= ?1",
            params![timestamp(&now())],
        )?;
        Ok(removed)
    }

    // -- Tasks --

    pub fn insert_task(&self, task: &NewTask) -> DbResult<Task> {
        let now = now();
        self.conn.execute(
            "INSERT INTO tasks (user_id, title, description, complete, created, updated, image, link)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                task.user_id,
                task.title,
                task.description,
                task.complete,
                timestamp(&now),
                timestamp(&now),
                task.image,
                task.link,
            ],
        )?;

        Ok(Task {
            id: self.conn.last_insert_rowid(),
            user_id: Some(task.user_id),
            title: Some(task.title.clone()),
            description: task.description.clone(),
            complete: task.complete,
            created: now,
            updated: now,
            image: task.image.clone(),
            link: task.link.clone(),
        })
    }

    /// Fetch a task by id, only if it belongs to `owner`.
    pub fn get_task(&self, id: i64, owner: i64) -> DbResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2");
        let task = self
            .conn
            .query_row(&sql, params![id, owner], row_to_task)
            .optional()?;
        Ok(task)
    }

    pub fn count_tasks(&self, filter: &TaskFilter) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE user_id = ?1 AND (?2 IS NULL OR lower_unicode(title) LIKE lower_unicode(?2) ESCAPE '\\')",
            params![filter.owner, filter.like_pattern()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Incomplete tasks within the filtered set.
    pub fn count_incomplete(&self, filter: &TaskFilter) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE user_id = ?1 AND (?2 IS NULL OR lower_unicode(title) LIKE lower_unicode(?2) ESCAPE '\\') AND complete = 0",
            params![filter.owner, filter.like_pattern()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Filtered tasks, incomplete first.
    pub fn list_tasks(&self, filter: &TaskFilter, limit: u32, offset: u32) -> DbResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND (?2 IS NULL OR lower_unicode(title) LIKE lower_unicode(?2) ESCAPE '\\')
             ORDER BY complete ASC, id ASC
             LIMIT ?3 OFFSET ?4"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![filter.owner, filter.like_pattern(), limit, offset],
            row_to_task,
        )?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// One page of the filtered listing, `None` when the page is out of range.
    pub fn task_page(&self, filter: &TaskFilter, request: PageRequest) -> DbResult<Option<Page<Task>>> {
        let total = self.count_tasks(filter)?;
        let num_pages = page_count(total, PAGE_SIZE);
        let Some(number) = request.resolve(num_pages) else {
            return Ok(None);
        };
        let items = self.list_tasks(filter, PAGE_SIZE, (number - 1) * PAGE_SIZE)?;
        Ok(Some(Page {
            items,
            number,
            num_pages,
            total,
        }))
    }

    /// Overwrite the editable fields of an owned task. Returns the updated
    /// task, or `None` if no such task belongs to `owner`.
    pub fn update_task(&self, id: i64, owner: i64, changes: &TaskChanges) -> DbResult<Option<Task>> {
        let (set_image, image) = match &changes.image {
            ImageChange::Keep => (false, None),
            ImageChange::Clear => (true, None),
            ImageChange::Replace(path) => (true, Some(path.as_str())),
        };
        let rows = self.conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, complete = ?3, link = ?4,
                 image = CASE WHEN ?5 THEN ?6 ELSE image END,
                 updated = MAX(updated, ?7)
             WHERE id = ?8 AND user_id = ?9",
            params![
                changes.title,
                changes.description,
                changes.complete,
                changes.link,
                set_image,
                image,
                timestamp(&now()),
                id,
                owner,
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_task(id, owner)
    }

    /// Delete an owned task. Returns whether a row was removed.
    pub fn delete_task(&self, id: i64, owner: i64) -> DbResult<bool> {
        let rows = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id, owner],
        )?;
        Ok(rows > 0)
    }

    /// Delete every listed task that belongs to `owner`; others are skipped.
    pub fn bulk_delete(&self, owner: i64, ids: &[i64]) -> DbResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM tasks WHERE user_id = ?1 AND id IN ({})",
            placeholders(2, ids.len())
        );
        let mut param_values: Vec<&dyn ToSql> = vec![&owner];
        param_values.extend(ids.iter().map(|id| id as &dyn ToSql));
        Ok(self.conn.execute(&sql, param_values.as_slice())?)
    }

    /// Overwrite the completion flag on every listed task owned by `owner`.
    pub fn bulk_set_complete(&self, owner: i64, ids: &[i64], complete: bool) -> DbResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let now = timestamp(&now());
        let sql = format!(
            "UPDATE tasks SET complete = ?1, updated = MAX(updated, ?2)
             WHERE user_id = ?3 AND id IN ({})",
            placeholders(4, ids.len())
        );
        let mut param_values: Vec<&dyn ToSql> = vec![&complete, &now, &owner];
        param_values.extend(ids.iter().map(|id| id as &dyn ToSql));
        Ok(self.conn.execute(&sql, param_values.as_slice())?)
    }
}

/// SQLite's own LIKE folds ASCII letters only; searches compare both sides
/// through `lower_unicode` instead.
fn register_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        "lower_unicode",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )?;
    Ok(())
}

/// Numbered placeholders `?start, ?start+1, ...` for an `IN (...)` list.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamps so stored values also sort as text.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read the current schema version from the config table.
fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let value = conn
        .query_row(
            "SELECT value FROM config WHERE key = 'schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    match value {
        Some(v) => v.parse::<i32>().map_err(|_| DbError::SchemaVersion(v)),
        None => Ok(0),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES ('schema_version', ?1)",
        params![version.to_string()],
    )?;
    Ok(())
}

/// Run all pending schema migrations in order.
///
/// Version 1 is the baseline created by `migrate()`. Later versions are
/// added as `if version < N` blocks, each wrapped in a transaction.
fn run_migrations(conn: &Connection) -> DbResult<()> {
    let version = get_schema_version(conn)?;

    if version < SCHEMA_VERSION {
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let created: String = row.get(5)?;
    let updated: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        complete: row.get(4)?,
        created: parse_timestamp(5, &created)?,
        updated: parse_timestamp(6, &updated)?,
        image: row
            .get::<_, Option<String>>(7)?
            .filter(|v| !v.is_empty()),
        link: row
            .get::<_, Option<String>>(8)?
            .filter(|v| !v.is_empty()),
    })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let joined: String = row.get(4)?;
    let last_login: Option<String> = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        is_active: row.get(3)?,
        date_joined: parse_timestamp(4, &joined)?,
        last_login: last_login
            .map(|raw| parse_timestamp(5, &raw))
            .transpose()?,
    })
}
