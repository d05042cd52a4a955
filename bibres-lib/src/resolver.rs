//! The orchestrating core: cache first, network once, typed errors always.

use std::path::Path;

use log::{info, trace};
use serde_json::Value;

use crate::{
    api::{self, Client},
    backend::Backend,
    cache::Cache,
    field::{self, Field, FieldValue},
    Error, ErrorKind,
};

/// Resolves book metadata by ISBN against one backend service, persisting
/// every answer to a local append-only cache.
///
/// Every answer is cached before it is returned, including the authoritative
/// "no data" answer, so an ISBN is queried over the network at most once for
/// the lifetime of the cache file. Transient failures are not cached and a
/// later call re-attempts the network.
///
/// ISBNs are opaque identifier strings, no checksum validation is performed
/// and ISBN-10/ISBN-13 forms of the same book are distinct keys.
pub struct Resolver<B, C = reqwest::blocking::Client> {
    backend: B,
    cache: Cache,
    client: C,
}

impl<B: Backend> Resolver<B> {
    /// Creates a resolver for `backend` with its cache file at `cache_path`.
    ///
    /// # Errors
    /// An `Err` is returned when the cache file cannot be opened or replayed,
    /// see [`Cache::open`].
    pub fn new<P: AsRef<Path>>(backend: B, cache_path: P) -> Result<Self, Error> {
        Self::with_client(backend, cache_path, reqwest::blocking::Client::new())
    }
}

impl<B: Backend, C: Client> Resolver<B, C> {
    /// Creates a resolver that issues its queries through a caller supplied
    /// [`Client`].
    ///
    /// # Errors
    /// An `Err` is returned when the cache file cannot be opened or replayed,
    /// see [`Cache::open`].
    pub fn with_client<P: AsRef<Path>>(backend: B, cache_path: P, client: C) -> Result<Self, Error> {
        let cache = Cache::open(cache_path)?;
        Ok(Self {
            backend,
            cache,
            client,
        })
    }

    /// Returns the raw record for `isbn`, querying the backend service only
    /// on a cache miss.
    ///
    /// # Errors
    /// An `Err` of kind [`ErrorKind::NoBookData`] is returned when the
    /// catalog has no record for the ISBN, the answer is cached so the
    /// network is never asked about this ISBN again.
    /// An `Err` of kind [`ErrorKind::QueryFailed`] is returned when the
    /// service could not be reached, nothing is cached and a later call
    /// re-attempts the query.
    /// An `Err` of kind [`ErrorKind::MalformedEnvelope`] or
    /// [`ErrorKind::Deserialize`] is returned when the service response
    /// violates its contract.
    pub fn get_book_data(&mut self, isbn: &str) -> Result<&Value, Error> {
        let isbn = isbn.trim();
        self.ensure_cached(isbn)?;

        match self.cache.get(isbn) {
            Some(record) if !record.is_null() => Ok(record),
            _ => Err(no_book_data(isbn)),
        }
    }

    fn ensure_cached(&mut self, isbn: &str) -> Result<(), Error> {
        if self.cache.get(isbn).is_some() {
            trace!("Cache hit for ISBN '{isbn}'");
            return Ok(());
        }

        info!("Searching for ISBN '{isbn}' using {}", self.backend.name());
        let request = self.backend.build_request(isbn);
        match api::query(&self.client, &request) {
            Ok(raw) => {
                let record = self.backend.normalize(isbn, raw)?;
                self.cache.put(isbn, record)
            }
            Err(err) if err.kind() == ErrorKind::NoBookData => {
                self.cache.put(isbn, Value::Null)?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn get_field(&mut self, isbn: &str, field: Field) -> Result<&Value, Error> {
        let path = self.backend.path(field).ok_or_else(|| field::missing(field))?;
        let record = self.get_book_data(isbn)?;
        field::extract(record, path, field)
    }

    fn get_listing(&mut self, isbn: &str, field: Field) -> Result<FieldValue, Error> {
        let value = self.get_field(isbn, field)?;
        let entries = field::project_strings(value, field)?;
        Ok(field::unlist_if_singular(entries))
    }

    /// The book title.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the record has no title.
    pub fn get_title(&mut self, isbn: &str) -> Result<String, Error> {
        let value = self.get_field(isbn, Field::Title)?;
        field::as_text(value, Field::Title)
    }

    /// The author or authors, collapsed to the bare name when there is at
    /// most one.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the record has no authors.
    pub fn get_author(&mut self, isbn: &str) -> Result<FieldValue, Error> {
        self.get_listing(isbn, Field::Author)
    }

    /// The year of publication, pulled out of the record's free-text
    /// publication date.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the record has no publication date
    /// and of kind [`ErrorKind::Deserialize`] when the date does not hold
    /// exactly one year.
    pub fn get_year(&mut self, isbn: &str) -> Result<u16, Error> {
        let value = self.get_field(isbn, Field::Year)?;
        let date = field::as_text(value, Field::Year)?;
        field::parse_year(&date, Field::Year)
    }

    /// The number of pages.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the record has no page count and of
    /// kind [`ErrorKind::Deserialize`] when it is not numeric.
    pub fn get_page_count(&mut self, isbn: &str) -> Result<u64, Error> {
        let value = self.get_field(isbn, Field::PageCount)?;
        field::parse_integer(value, Field::PageCount)
    }

    /// The publisher or publishers, collapsed to the bare name when there is
    /// at most one.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the record has no publisher.
    pub fn get_publisher(&mut self, isbn: &str) -> Result<FieldValue, Error> {
        self.get_listing(isbn, Field::Publisher)
    }

    /// The place or places of publication.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the backend does not model the field
    /// or the record lacks it.
    pub fn get_location(&mut self, isbn: &str) -> Result<FieldValue, Error> {
        self.get_listing(isbn, Field::Location)
    }

    /// Contributors other than the authors.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the backend does not model the field
    /// or the record lacks it.
    pub fn get_contributors(&mut self, isbn: &str) -> Result<FieldValue, Error> {
        self.get_listing(isbn, Field::Contributors)
    }

    /// The free-text attribution statement.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the backend does not model the field
    /// or the record lacks it.
    pub fn get_by_statement(&mut self, isbn: &str) -> Result<String, Error> {
        let value = self.get_field(isbn, Field::ByStatement)?;
        field::as_text(value, Field::ByStatement)
    }

    /// The manufacturer's suggested retail price.
    ///
    /// # Errors
    /// See [`Resolver::get_book_data`], plus an `Err` of kind
    /// [`ErrorKind::MissingData`] when the backend does not model the field
    /// or the record lacks it, and of kind [`ErrorKind::Deserialize`] when
    /// it is not numeric.
    pub fn get_msrp(&mut self, isbn: &str) -> Result<f64, Error> {
        let value = self.get_field(isbn, Field::Msrp)?;
        field::parse_float(value, Field::Msrp)
    }
}

fn no_book_data(isbn: &str) -> Error {
    Error::new(
        ErrorKind::NoBookData,
        format!("No book data for ISBN '{isbn}'"),
    )
}
