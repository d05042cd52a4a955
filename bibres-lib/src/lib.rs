#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::missing_safety_doc,
    clippy::missing_const_for_fn
)]
#![warn(missing_docs, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![doc = include_str!("../README.md")]

pub mod api;
pub mod backend;
mod cache;
mod error;
mod field;
mod resolver;

pub use cache::Cache;
pub use error::{Error, ErrorKind};
pub use field::{unlist_if_singular, Field, FieldPath, FieldValue};
pub use resolver::Resolver;

use backend::{IsbnDb, OpenLibrary};

use std::path::Path;

/// Creates a resolver for the public OpenLibrary API with its cache file at
/// `cache_path`.
///
/// # Errors
///
/// An `Err` is returned when the cache file cannot be opened or replayed.
///
/// # Examples
///
/// ```no_run
/// fn main() -> Result<(), bibres::Error> {
///     let mut resolver = bibres::open_library("openlibrary_db.txt")?;
///     let title = resolver.get_title("0140328726")?;
///     println!("{title}");
///     Ok(())
/// }
/// ```
pub fn open_library<P: AsRef<Path>>(cache_path: P) -> Result<Resolver<OpenLibrary>, Error> {
    Resolver::new(OpenLibrary::new(), cache_path)
}

/// Creates a resolver for the ISBNdb API authorized by `api_key`, with its
/// cache file at `cache_path`.
///
/// # Errors
///
/// An `Err` is returned when the cache file cannot be opened or replayed.
///
/// # Examples
///
/// ```no_run
/// fn main() -> Result<(), bibres::Error> {
///     let mut resolver = bibres::isbndb("isbndb_db.txt", "my-api-key")?;
///     let msrp = resolver.get_msrp("0140328726")?;
///     println!("{msrp}");
///     Ok(())
/// }
/// ```
pub fn isbndb<P, S>(cache_path: P, api_key: S) -> Result<Resolver<IsbnDb>, Error>
where
    P: AsRef<Path>,
    S: Into<String>,
{
    Resolver::new(IsbnDb::new(api_key), cache_path)
}
