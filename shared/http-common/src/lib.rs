//! Shared HTTP utilities for the Movies workspace.
//!
//! Holds the client-facing failure contract: the two fixed messages, the JSON
//! body shape, and which status/key each endpoint uses when it fails. Kept
//! framework-agnostic (plain `u16` status codes) so any transport can use it.

// ============================================================================
// Fixed messages
// ============================================================================

/// Body message for every failure that is not a missing record.
pub const REQUEST_FAILED: &str = "Request failed";

/// Body message for id-addressed operations whose record is absent.
pub const RESOURCE_NOT_FOUND: &str = "Resource not found";

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Key of the single field in a failure body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKey {
    /// `{"Error": ...}`
    Capitalized,
    /// `{"error": ...}`
    Lowercase,
}

impl ErrorKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKey::Capitalized => "Error",
            ErrorKey::Lowercase => "error",
        }
    }
}

/// Create a failure JSON with the usual capitalized key.
///
/// Returns: `{"Error": "<message>"}`
pub fn json_err(message: &str) -> serde_json::Value {
    json_err_with_key(ErrorKey::Capitalized, message)
}

/// Create a failure JSON with an explicit key.
pub fn json_err_with_key(key: ErrorKey, message: &str) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert(key.as_str().to_string(), serde_json::Value::from(message));
    serde_json::Value::Object(body)
}

// ============================================================================
// Failure policy
// ============================================================================

/// The five movie endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Create,
    GetOne,
    List,
    Replace,
    Delete,
}

/// How request failures are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStyle {
    /// 400 with `{"Error": ...}` on every endpoint.
    #[default]
    Normalized,
    /// Historical contract: list answers 200, delete answers 200 with a
    /// lowercase `error` key.
    Legacy,
}

impl ErrorStyle {
    /// Status code and body key for a request failure on `endpoint`.
    pub fn request_failed(&self, endpoint: Endpoint) -> (u16, ErrorKey) {
        match (self, endpoint) {
            (ErrorStyle::Legacy, Endpoint::List) => (200, ErrorKey::Capitalized),
            (ErrorStyle::Legacy, Endpoint::Delete) => (200, ErrorKey::Lowercase),
            _ => (400, ErrorKey::Capitalized),
        }
    }
}
