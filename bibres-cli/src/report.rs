use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use bibres::{
    backend::{IsbnDb, OpenLibrary},
    Error, ErrorKind, Resolver,
};

use eyre::WrapErr;
use log::{info, warn};

/// The fixed column order of the exported report.
const HEADING: [&str; 15] = [
    "isbn",
    "ol_title",
    "idb_title",
    "ol_author",
    "idb_author",
    "ol_contributor",
    "ol_by",
    "ol_publisher",
    "idb_publisher",
    "ol_location",
    "ol_year",
    "idb_year",
    "ol_pages",
    "idb_pages",
    "idb_msrp",
];

/// Writes one CSV row per resolvable ISBN read from `input`, one per line.
///
/// An ISBN without a title from either backend is skipped and reported as
/// unresolvable. "No such book" and "no such field" answers become empty
/// cells, while a transient network failure aborts the run so the report is
/// never silently incomplete.
pub(crate) fn write_book_csv(
    open_library: &mut Resolver<OpenLibrary>,
    isbn_db: &mut Resolver<IsbnDb>,
    input: &Path,
    output: &Path,
) -> eyre::Result<String> {
    let input_file = File::open(input)
        .wrap_err_with(|| format!("Cannot open the ISBN list '{}'", input.display()))?;

    let mut writer = csv::Writer::from_path(output)
        .wrap_err_with(|| format!("Cannot create the report '{}'", output.display()))?;
    writer.write_record(HEADING)?;

    let mut rows = 0_u32;
    let mut bad_isbns = Vec::new();

    for line in BufReader::new(input_file).lines() {
        let line = line?;
        let isbn = line.trim();
        if isbn.is_empty() {
            continue;
        }

        let ol_title = available(open_library.get_title(isbn))?;
        let idb_title = available(isbn_db.get_title(isbn))?;

        // A book neither backend can even title is not worth a row.
        if ol_title.is_none() && idb_title.is_none() {
            warn!("No title found for ISBN '{isbn}' in either backend");
            bad_isbns.push(isbn.to_owned());
            continue;
        }

        let record = [
            isbn.to_owned(),
            cell(ol_title),
            cell(idb_title),
            cell(available(open_library.get_author(isbn))?),
            cell(available(isbn_db.get_author(isbn))?),
            cell(available(open_library.get_contributors(isbn))?),
            cell(available(open_library.get_by_statement(isbn))?),
            cell(available(open_library.get_publisher(isbn))?),
            cell(available(isbn_db.get_publisher(isbn))?),
            cell(available(open_library.get_location(isbn))?),
            cell(available(open_library.get_year(isbn))?),
            cell(available(isbn_db.get_year(isbn))?),
            cell(available(open_library.get_page_count(isbn))?),
            cell(available(isbn_db.get_page_count(isbn))?),
            cell(available(isbn_db.get_msrp(isbn))?),
        ];
        writer.write_record(&record)?;
        rows += 1;
    }

    writer.flush()?;
    info!("Wrote {rows} rows to '{}'", output.display());

    if bad_isbns.is_empty() {
        Ok(format!("Wrote {rows} rows to '{}'", output.display()))
    } else {
        Ok(format!(
            "Wrote {rows} rows to '{}', skipped {} unresolvable ISBNs: {}",
            output.display(),
            bad_isbns.len(),
            bad_isbns.join(", ")
        ))
    }
}

/// Downgrades the "no such book" and "no such field" answers to an absent
/// value. Transient failures stay errors, an unreachable backend must fail
/// the run rather than quietly produce empty cells.
fn available<T>(result: Result<T, Error>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if matches!(err.kind(), ErrorKind::NoBookData | ErrorKind::MissingData) => {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn no_data_answers_downgrade_to_an_empty_cell() {
        let no_book = Error::new(ErrorKind::NoBookData, "no record");
        let no_field = Error::new(ErrorKind::MissingData, "no field");

        assert_eq!(None, available::<String>(Err(no_book)).unwrap());
        assert_eq!(None, available::<String>(Err(no_field)).unwrap());
    }

    #[test]
    fn transient_failures_are_not_downgraded() {
        let unreachable = Error::new(ErrorKind::QueryFailed, "unreachable");

        let err = available::<String>(Err(unreachable)).unwrap_err();

        assert_eq!(ErrorKind::QueryFailed, err.kind());
    }

    #[test]
    fn absent_values_render_as_empty_cells() {
        assert_eq!("", cell::<u16>(None));
        assert_eq!("1988", cell(Some(1988_u16)));
    }
}
