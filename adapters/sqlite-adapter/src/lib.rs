//! sqlite-adapter — SQLite implementation of the MovieRepository port for local/dev.
//!
//! Purpose
//! - Provide a lightweight, file-based document table to run the system
//!   locally without a database server.
//! - Implements the `MovieRepository` trait from the `domain` crate.
//! - Assigns object-id style identifiers at insert time.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - `rusqlite` is blocking; every call runs on `tokio::task::spawn_blocking`
//!   and holds the connection mutex for exactly one statement.
//! - Required fields are enforced by the schema as well as by the domain.

use std::path::Path;
use std::sync::{Arc, Mutex};

use domain::objectid::ObjectIdGenerator;
use domain::{CoreError, IdGenerator, Movie, MovieFilter, MovieId, MovieRepository, NewMovie};
use rusqlite::{params, Connection};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT id, title, year, language FROM movies";

/// SQLite-backed repository for local development.
pub struct SqliteRepo {
    conn: Arc<Mutex<Option<Connection>>>,
    ids: Arc<ObjectIdGenerator>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        Self::from_connection(conn)
    }

    /// Open at `path`, creating missing parent directories first.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| CoreError::Repository(format!("create db dir: {e}")))?;
            }
        }
        Self::new(path)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            ids: Arc::new(ObjectIdGenerator::new()),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| CoreError::Repository("store closed".into()))?;
            f(conn)
        })
        .await
        .map_err(|e| CoreError::Repository(format!("blocking task failed: {e}")))?
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL CHECK (length(trim(title)) > 0),
            year INTEGER NOT NULL CHECK (typeof(year) = 'integer'),
            language TEXT NOT NULL CHECK (length(trim(language)) > 0)
        );
        CREATE INDEX IF NOT EXISTS idx_movies_year ON movies(year);
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn row_to_movie(row: &rusqlite::Row) -> Result<Movie, CoreError> {
    let id: String = row.get(0).map_err(map_sqerr)?;
    let title: String = row.get(1).map_err(map_sqerr)?;
    let year: i64 = row.get(2).map_err(map_sqerr)?;
    let language: String = row.get(3).map_err(map_sqerr)?;

    let id = MovieId::parse(id).map_err(|e| CoreError::Repository(format!("bad id in db: {e}")))?;
    let year = i32::try_from(year)
        .map_err(|_| CoreError::Repository(format!("year {year} out of range in db")))?;
    Ok(Movie {
        id,
        title,
        year,
        language,
    })
}

/// Build the WHERE clause and positional values for a filter.
fn filter_clause(filter: &MovieFilter) -> (String, Vec<rusqlite::types::Value>) {
    use rusqlite::types::Value;

    let mut conditions = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(ref title) = filter.title {
        values.push(Value::Text(title.clone()));
        conditions.push(format!("title = ?{}", values.len()));
    }
    if let Some(year) = filter.year {
        values.push(Value::Integer(i64::from(year)));
        conditions.push(format!("year = ?{}", values.len()));
    }
    if let Some(ref language) = filter.language {
        values.push(Value::Text(language.clone()));
        conditions.push(format!("language = ?{}", values.len()));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, values)
}

impl MovieRepository for SqliteRepo {
    async fn create(&self, movie: NewMovie) -> Result<Movie, CoreError> {
        let id = self.ids.next_id();
        let stored = Movie::from_new(id, movie);
        let row = stored.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO movies(id, title, year, language) VALUES (?1, ?2, ?3, ?4)",
                params![row.id.as_str(), row.title, row.year, row.language],
            )
            .map_err(map_sqerr)?;
            Ok(())
        })
        .await?;
        debug!(id = %stored.id, "sqlite insert");
        Ok(stored)
    }

    async fn get(&self, id: &MovieId) -> Result<Option<Movie>, CoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
                .map_err(map_sqerr)?;
            let mut rows = stmt.query(params![id.as_str()]).map_err(map_sqerr)?;
            if let Some(row) = rows.next().map_err(map_sqerr)? {
                Ok(Some(row_to_movie(row)?))
            } else {
                Ok(None)
            }
        })
        .await
    }

    async fn find(&self, filter: &MovieFilter) -> Result<Vec<Movie>, CoreError> {
        let (clause, values) = filter_clause(filter);
        self.with_conn(move |conn| {
            let sql = format!("{SELECT_COLUMNS} {clause} ORDER BY rowid");
            let mut stmt = conn.prepare(&sql).map_err(map_sqerr)?;
            let mut rows = stmt
                .query(rusqlite::params_from_iter(values.iter()))
                .map_err(map_sqerr)?;
            let mut out = Vec::new();
            while let Some(row) = rows.next().map_err(map_sqerr)? {
                out.push(row_to_movie(row)?);
            }
            Ok(out)
        })
        .await
    }

    async fn replace(&self, id: &MovieId, movie: NewMovie) -> Result<u64, CoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            // changes() counts matched rows, so identical values still report 1.
            let changed = conn
                .execute(
                    "UPDATE movies SET title = ?1, year = ?2, language = ?3 WHERE id = ?4",
                    params![movie.title, movie.year, movie.language, id.as_str()],
                )
                .map_err(map_sqerr)?;
            Ok(changed as u64)
        })
        .await
    }

    async fn delete(&self, id: &MovieId) -> Result<u64, CoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let changed = conn
                .execute("DELETE FROM movies WHERE id = ?1", params![id.as_str()])
                .map_err(map_sqerr)?;
            Ok(changed as u64)
        })
        .await
    }

    async fn close(&self) -> Result<(), CoreError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
            match guard.take() {
                Some(c) => c.close().map_err(|(_, e)| map_sqerr(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| CoreError::Repository(format!("blocking task failed: {e}")))?
    }
}
