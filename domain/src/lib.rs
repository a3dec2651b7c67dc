//! Domain library for the Movies service.
//!
//! This crate is dependency-free (inherits workspace metadata only) and holds
//! the domain types, ports (traits), and error definitions. Keep adapters and
//! IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::SystemTime;

/// Opaque identifier of a stored movie.
///
/// Rendered as 24 lowercase hex characters (12 bytes). Assigned by the
/// persistence layer at creation time and never changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MovieId(String);

impl MovieId {
    /// Number of hex characters in a well-formed id.
    pub const LEN: usize = 24;

    /// Parse an id coming from outside (path segment, store row).
    pub fn parse<S: AsRef<str>>(s: S) -> Result<Self, CoreError> {
        let val = s.as_ref();
        if val.len() != Self::LEN {
            return Err(CoreError::InvalidId(format!(
                "expected {} hex characters, got {}",
                Self::LEN,
                val.len()
            )));
        }
        if !val.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidId("non-hex characters".into()));
        }
        Ok(Self(val.to_ascii_lowercase()))
    }

    /// Build an id from its raw 12 bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        let mut s = String::with_capacity(Self::LEN);
        for b in bytes {
            s.push(HEX[(b >> 4) as usize] as char);
            s.push(HEX[(b & 0x0f) as usize] as char);
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MovieId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Validated field values of a movie, ready to be persisted.
///
/// Used both for creation and for wholesale replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub language: String,
}

/// Stored movie record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: i32,
    pub language: String,
}

impl Movie {
    pub fn from_new(id: MovieId, new: NewMovie) -> Self {
        Self {
            id,
            title: new.title,
            year: new.year,
            language: new.language,
        }
    }
}

/// Exact-match filter over movie fields. `None` leaves a field unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub language: Option<String>,
}

impl MovieFilter {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.year.is_none() && self.language.is_none()
    }

    /// Check whether a movie satisfies every constrained field.
    pub fn matches(&self, movie: &Movie) -> bool {
        self.title.as_ref().map_or(true, |t| *t == movie.title)
            && self.year.map_or(true, |y| y == movie.year)
            && self.language.as_ref().map_or(true, |l| *l == movie.language)
    }
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Id generator interface; adapters call it once per created record.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> MovieId;
}

/// Repository port for persisting and loading movies.
///
/// Every method is one store round trip. Absence is reported through
/// `Option`/counts, never through `CoreError::NotFound`.
pub trait MovieRepository: Send + Sync {
    /// Persist a new record and return it with its assigned id.
    fn create(&self, movie: NewMovie) -> impl Future<Output = Result<Movie, CoreError>> + Send;
    /// Look up a record by id.
    fn get(&self, id: &MovieId) -> impl Future<Output = Result<Option<Movie>, CoreError>> + Send;
    /// All records matching the filter, in store-defined order.
    fn find(
        &self,
        filter: &MovieFilter,
    ) -> impl Future<Output = Result<Vec<Movie>, CoreError>> + Send;
    /// Overwrite all fields of an existing record. Returns the number replaced (0 or 1).
    fn replace(
        &self,
        id: &MovieId,
        movie: NewMovie,
    ) -> impl Future<Output = Result<u64, CoreError>> + Send;
    /// Remove a record. Returns the number deleted (0 or 1).
    fn delete(&self, id: &MovieId) -> impl Future<Output = Result<u64, CoreError>> + Send;
    /// Release the underlying store handle.
    fn close(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        async { Ok(()) }
    }
}

/// Core domain errors (no external error crates to keep deps at zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    Validation(String),
    InvalidId(String),
    NotFound,
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Validation(msg) => write!(f, "validation failed: {}", msg),
            CoreError::InvalidId(msg) => write!(f, "invalid id: {}", msg),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - domain library loaded", pkg, ver)
}

pub mod adapters;
pub mod objectid;
pub mod service;
pub mod validate;
