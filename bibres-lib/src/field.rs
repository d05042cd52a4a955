//! Field extraction over normalized book records.
//!
//! Getters navigate a record with a [`FieldPath`], an ordered key sequence
//! from the record root to one attribute, and shape the leaf value with the
//! primitives in this module. The paths themselves are data, declared once
//! per backend adapter as a static table.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::{Error, ErrorKind};

/// A path of successive keys from the root of a normalized record to one
/// attribute.
pub type FieldPath = &'static [&'static str];

/// The book attributes a backend may expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// The book title.
    Title,
    /// The author or authors.
    Author,
    /// The year of publication.
    Year,
    /// The number of pages.
    PageCount,
    /// The publisher or publishers.
    Publisher,
    /// The place of publication.
    Location,
    /// The manufacturer's suggested retail price.
    Msrp,
    /// Contributors other than the authors.
    Contributors,
    /// The free-text attribution statement.
    ByStatement,
}

impl Field {
    /// The human readable name used in error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Author => "author",
            Field::Year => "publication date",
            Field::PageCount => "page count",
            Field::Publisher => "publisher",
            Field::Location => "publication location",
            Field::Msrp => "msrp",
            Field::Contributors => "contributors",
            Field::ByStatement => "by statement",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// The value of a field that may hold one or several entries.
///
/// Mirrors the collapse performed by [`unlist_if_singular`]: an empty set of
/// entries is the empty string, a singleton is the bare string and anything
/// larger stays a list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// A single entry, or the empty string when the record held none.
    One(String),
    /// Two or more entries.
    Many(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::One(entry) => f.write_str(entry),
            FieldValue::Many(entries) => f.write_str(&entries.join("; ")),
        }
    }
}

/// Collapses a list of entries to the bare entry when it holds at most one.
#[must_use]
pub fn unlist_if_singular(mut entries: Vec<String>) -> FieldValue {
    match entries.len() {
        0 => FieldValue::One(String::new()),
        1 => FieldValue::One(entries.remove(0)),
        _ => FieldValue::Many(entries),
    }
}

/// Walks `path` down from the root of `record` to the value of `field`.
///
/// # Errors
/// An `Err` of kind [`ErrorKind::MissingData`] naming the field is returned
/// when a key anywhere along the path is absent.
pub(crate) fn extract<'a>(record: &'a Value, path: FieldPath, field: Field) -> Result<&'a Value, Error> {
    let mut value = record;
    for key in path {
        value = value.get(key).ok_or_else(|| missing(field))?;
    }
    Ok(value)
}

pub(crate) fn missing(field: Field) -> Error {
    Error::new(
        ErrorKind::MissingData,
        format!("Book record has no {field}"),
    )
}

fn data_error(field: Field, found: &str) -> Error {
    Error::new(
        ErrorKind::Deserialize,
        format!("Expected the {field} field to hold {found}"),
    )
}

/// Projects a field value holding one or several entries to plain strings.
///
/// Accepts a bare string, a list of strings or a list of structured entries
/// carrying a `name` key (the OpenLibrary author shape).
pub(crate) fn project_strings(value: &Value, field: Field) -> Result<Vec<String>, Error> {
    match value {
        Value::String(entry) => Ok(vec![entry.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(entry) => Ok(entry.clone()),
                Value::Object(entry) => entry
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| data_error(field, "entries with a name")),
                _ => Err(data_error(field, "text entries")),
            })
            .collect(),
        _ => Err(data_error(field, "one or several text entries")),
    }
}

/// Renders a leaf value to text, used for fields that hold free text.
pub(crate) fn as_text(value: &Value, field: Field) -> Result<String, Error> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err(data_error(field, "text")),
    }
}

lazy_static! {
    static ref YEAR: Regex = Regex::new(r"\b[12]\d{3}\b").expect("Year pattern should be valid");
}

/// Pulls the single four digit year out of a free text publication date.
///
/// # Errors
/// An `Err` of kind [`ErrorKind::Deserialize`] is returned when the date
/// holds no year or more than one distinct year, neither is guessed at.
pub(crate) fn parse_year(date: &str, field: Field) -> Result<u16, Error> {
    let mut years: Vec<&str> = YEAR.find_iter(date).map(|m| m.as_str()).collect();
    years.sort_unstable();
    years.dedup();

    match years.as_slice() {
        [year] => year
            .parse()
            .map_err(|e| Error::wrap(ErrorKind::Deserialize, e)),
        [] => Err(Error::new(
            ErrorKind::Deserialize,
            format!("No year found in the {field} '{date}'"),
        )),
        _ => Err(Error::new(
            ErrorKind::Deserialize,
            format!("More than one year found in the {field} '{date}'"),
        )),
    }
}

/// Parses a leaf value as an integer, accepting a JSON number or a numeric
/// string.
pub(crate) fn parse_integer(value: &Value, field: Field) -> Result<u64, Error> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| data_error(field, "a whole number")),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|e| Error::wrap_with(ErrorKind::Deserialize, e, format!("Expected the {field} field to hold a whole number"))),
        _ => Err(data_error(field, "a whole number")),
    }
}

/// Parses a leaf value as a float, accepting a JSON number or a numeric
/// string.
pub(crate) fn parse_float(value: &Value, field: Field) -> Result<f64, Error> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| data_error(field, "a number")),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|e| Error::wrap_with(ErrorKind::Deserialize, e, format!("Expected the {field} field to hold a number"))),
        _ => Err(data_error(field, "a number")),
    }
}
