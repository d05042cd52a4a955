use serde_json::Value;

use super::{single_entry, Backend};
use crate::{
    api::Request,
    field::{Field, FieldPath},
    Error, ErrorKind,
};

const ISBNDB_URL: &str = "https://api2.isbndb.com";

/// The ISBNdb REST API, authorized by an account API key.
#[derive(Clone, Debug)]
pub struct IsbnDb {
    api_key: String,
    base_url: String,
}

impl IsbnDb {
    /// Creates an adapter against the public ISBNdb host.
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self::with_base_url(api_key, ISBNDB_URL)
    }

    /// Creates an adapter against `base_url` in place of the public host.
    pub fn with_base_url<K, S>(api_key: K, base_url: S) -> Self
    where
        K: Into<String>,
        S: Into<String>,
    {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

impl Backend for IsbnDb {
    fn name(&self) -> &'static str {
        "ISBNdb"
    }

    fn build_request(&self, isbn: &str) -> Request {
        Request::new(format!("{}/book/{isbn}", self.base_url))
            .with_header("Authorization", self.api_key.clone())
    }

    fn normalize(&self, _isbn: &str, raw: Value) -> Result<Value, Error> {
        let (key, record) = single_entry(self.name(), raw)?;
        if key == "book" {
            Ok(record)
        } else {
            Err(Error::new(
                ErrorKind::MalformedEnvelope,
                format!("Expected a 'book' entry in the ISBNdb response, found '{key}'"),
            ))
        }
    }

    fn path(&self, field: Field) -> Option<FieldPath> {
        match field {
            Field::Title => Some(&["title"]),
            Field::Author => Some(&["authors"]),
            Field::Year => Some(&["date_published"]),
            Field::PageCount => Some(&["pages"]),
            Field::Publisher => Some(&["publisher"]),
            Field::Msrp => Some(&["msrp"]),
            Field::Location | Field::Contributors | Field::ByStatement => None,
        }
    }
}
