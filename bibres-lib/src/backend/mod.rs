//! Backend adapters for the remote metadata services.

mod isbndb;
mod open_library;

pub use isbndb::IsbnDb;
pub use open_library::OpenLibrary;

use serde_json::Value;

use crate::{
    api::Request,
    field::{Field, FieldPath},
    Error, ErrorKind,
};

/// A remote metadata service the resolver can query.
///
/// An implementation builds the service specific request for an ISBN,
/// reshapes the service's response envelope into its own record shape and
/// declares the [`FieldPath`] table that the field getters navigate. The
/// normalization step guarantees the path table is valid for the record
/// shape it produces.
pub trait Backend {
    /// The service name used in log lines and error messages.
    fn name(&self) -> &'static str;

    /// Builds the request descriptor for one ISBN lookup.
    ///
    /// A pure function of the ISBN and the adapter configuration.
    fn build_request(&self, isbn: &str) -> Request;

    /// Reshapes the raw response envelope into the record stored in the
    /// cache, keyed by the ISBN the caller asked for.
    ///
    /// # Errors
    /// An `Err` of kind [`ErrorKind::MalformedEnvelope`] is returned when
    /// the envelope does not carry exactly one top level entry, an arbitrary
    /// entry is never picked silently.
    fn normalize(&self, isbn: &str, raw: Value) -> Result<Value, Error>;

    /// The path table entry for `field`, or `None` when this service does
    /// not model it.
    fn path(&self, field: Field) -> Option<FieldPath>;
}

/// Unwraps an envelope contracted to carry exactly one top level entry.
pub(crate) fn single_entry(backend: &'static str, raw: Value) -> Result<(String, Value), Error> {
    match raw {
        Value::Object(entries) => {
            let count = entries.len();
            let mut entries = entries.into_iter();
            match (entries.next(), entries.next()) {
                (Some((key, value)), None) => Ok((key, value)),
                _ => Err(Error::new(
                    ErrorKind::MalformedEnvelope,
                    format!("Expected exactly one entry in the {backend} response, found {count}"),
                )),
            }
        }
        _ => Err(Error::new(
            ErrorKind::MalformedEnvelope,
            format!("Expected a JSON object in the {backend} response"),
        )),
    }
}
