use serde_json::Value;

use super::{single_entry, Backend};
use crate::{
    api::Request,
    field::{Field, FieldPath},
    Error,
};

const OPEN_LIBRARY_URL: &str = "https://openlibrary.org";

/// The public OpenLibrary books API, no authorization required.
///
/// Responses are keyed by a `"ISBN:<isbn>"` bibkey rather than the bare
/// ISBN, [`Backend::normalize`] unwraps the single entry so the record is
/// cached under the ISBN the caller asked for.
#[derive(Clone, Debug)]
pub struct OpenLibrary {
    base_url: String,
}

impl OpenLibrary {
    /// Creates an adapter against the public OpenLibrary host.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(OPEN_LIBRARY_URL)
    }

    /// Creates an adapter against `base_url` in place of the public host.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for OpenLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for OpenLibrary {
    fn name(&self) -> &'static str {
        "OpenLibrary"
    }

    fn build_request(&self, isbn: &str) -> Request {
        Request::new(format!(
            "{}/api/books?bibkeys=ISBN:{isbn}&jscmd=details&format=json",
            self.base_url
        ))
    }

    fn normalize(&self, _isbn: &str, raw: Value) -> Result<Value, Error> {
        // The bibkey the envelope is keyed by is dropped, the resolver caches
        // the record under the bare ISBN.
        single_entry(self.name(), raw).map(|(_, record)| record)
    }

    fn path(&self, field: Field) -> Option<FieldPath> {
        match field {
            Field::Title => Some(&["details", "title"]),
            Field::Author => Some(&["details", "authors"]),
            Field::Year => Some(&["details", "publish_date"]),
            Field::PageCount => Some(&["details", "number_of_pages"]),
            Field::Publisher => Some(&["details", "publishers"]),
            Field::Location => Some(&["details", "publish_places"]),
            Field::Contributors => Some(&["details", "contributions"]),
            Field::ByStatement => Some(&["details", "by_statement"]),
            Field::Msrp => None,
        }
    }
}
