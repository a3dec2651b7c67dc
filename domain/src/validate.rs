//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::{CoreError, MovieFilter, NewMovie};

/// A year as it arrives from the outside: JSON number or text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum YearValue {
    Number(i64),
    Text(String),
}

/// Raw movie fields from a request body. Every field is required.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovieInput {
    pub title: Option<String>,
    pub year: Option<YearValue>,
    pub language: Option<String>,
}

/// Raw filter fields from a query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub title: Option<String>,
    pub year: Option<String>,
    pub language: Option<String>,
}

/// Validate a required text field: present and not blank.
pub fn validate_text(field: &str, value: Option<String>) -> Result<String, CoreError> {
    match value {
        None => Err(CoreError::Validation(format!("{} is required", field))),
        Some(v) if v.trim().is_empty() => {
            Err(CoreError::Validation(format!("{} must not be empty", field)))
        }
        Some(v) => Ok(v),
    }
}

/// Validate a year: integral and within `i32`.
pub fn validate_year(value: Option<YearValue>) -> Result<i32, CoreError> {
    let n = match value {
        None => return Err(CoreError::Validation("year is required".into())),
        Some(YearValue::Number(n)) => n,
        Some(YearValue::Text(s)) => parse_year_text(&s)?,
    };
    i32::try_from(n).map_err(|_| CoreError::Validation(format!("year {} out of range", n)))
}

fn parse_year_text(s: &str) -> Result<i64, CoreError> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| CoreError::Validation(format!("year must be an integer, got '{}'", s)))
}

/// Turn a raw body into a `NewMovie`, reporting the first offending field.
pub fn validate_movie(input: MovieInput) -> Result<NewMovie, CoreError> {
    let title = validate_text("title", input.title)?;
    let year = validate_year(input.year)?;
    let language = validate_text("language", input.language)?;
    Ok(NewMovie {
        title,
        year,
        language,
    })
}

/// Turn raw query values into a `MovieFilter`. Text values are taken verbatim.
pub fn validate_filter(input: FilterInput) -> Result<MovieFilter, CoreError> {
    let year = match input.year {
        Some(s) => Some(validate_year(Some(YearValue::Text(s)))?),
        None => None,
    };
    Ok(MovieFilter {
        title: input.title,
        year,
        language: input.language,
    })
}
