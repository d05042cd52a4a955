//! The append-only store of answers keyed by ISBN.

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::Path,
};

use log::trace;
use serde_json::Value;

use crate::{Error, ErrorKind};

/// An append-only, line-oriented store of raw book records keyed by ISBN.
///
/// Every line of the backing file is one `{"<isbn>": <record>}` JSON object.
/// [`Value::Null`] marks an ISBN the backend authoritatively had no data for,
/// while an ISBN absent from the store has never been queried. Entries are
/// written once and never rewritten or compacted, when the file holds
/// duplicate keys the last line wins at load time.
///
/// A `Cache` exclusively owns its backing file handle and in-memory mapping.
#[derive(Debug)]
pub struct Cache {
    file: File,
    records: HashMap<String, Value>,
}

impl Cache {
    /// Opens the cache backed by `path`, creating the file when it does not
    /// exist, and replays every persisted line into memory.
    ///
    /// # Errors
    /// An `Err` of kind [`ErrorKind::IO`] is returned when the file cannot be
    /// opened or read.
    /// An `Err` of kind [`ErrorKind::Deserialize`] is returned when a line of
    /// the file is not a valid entry, no partial recovery is attempted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                Error::wrap_with(
                    ErrorKind::IO,
                    e,
                    format!("Failed to open the '{}' cache file", path.display()),
                )
            })?;

        let mut records = HashMap::new();
        for line in BufReader::new(&file).lines() {
            let line = line.map_err(|e| {
                Error::wrap_with(
                    ErrorKind::IO,
                    e,
                    format!("Cannot read the '{}' cache file", path.display()),
                )
            })?;
            let entry: HashMap<String, Value> = serde_json::from_str(&line).map_err(|e| {
                Error::wrap_with(
                    ErrorKind::Deserialize,
                    e,
                    format!("Malformed line in the '{}' cache file", path.display()),
                )
            })?;
            records.extend(entry);
        }

        trace!(
            "Loaded {} cached records from '{}'",
            records.len(),
            path.display()
        );

        Ok(Self { file, records })
    }

    /// Looks up the cached answer for `isbn` in memory, never touching the
    /// network or the disk.
    ///
    /// `Some(Value::Null)` is the authoritative "no data" answer and `None`
    /// means the ISBN has never been queried.
    #[must_use]
    pub fn get(&self, isbn: &str) -> Option<&Value> {
        self.records.get(isbn)
    }

    /// Appends one `{isbn: value}` entry to the backing file and mirrors it
    /// in memory.
    ///
    /// The write is flushed before this returns.
    ///
    /// # Errors
    /// An `Err` of kind [`ErrorKind::IO`] is returned when the entry cannot
    /// be appended, the entry is then not mirrored in memory.
    pub fn put(&mut self, isbn: &str, value: Value) -> Result<(), Error> {
        let entry = HashMap::from([(isbn, &value)]);
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| Error::wrap(ErrorKind::Deserialize, e))?;
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|e| {
                Error::wrap_with(ErrorKind::IO, e, "Failed to append to the cache file")
            })?;

        trace!("Cached an answer for ISBN '{isbn}'");
        self.records.insert(isbn.to_owned(), value);
        Ok(())
    }
}
