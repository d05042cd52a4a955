#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::missing_safety_doc,
    clippy::missing_const_for_fn
)]

use std::{path::PathBuf, process};

mod report;

use clap::Parser;
use log::trace;

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err}");
        process::exit(2);
    }
}

fn try_main() -> eyre::Result<()> {
    let cli = Cli::parse();

    setup_errlog(usize::from(cli.verbosity))?;

    trace!("Opening the backend caches..");
    let mut open_library = bibres::open_library(&cli.open_library_db)?;
    let mut isbn_db = bibres::isbndb(&cli.isbndb_db, &cli.api_key)?;

    let message = report::write_book_csv(&mut open_library, &mut isbn_db, &cli.input, &cli.output)?;

    println!("{message}");
    Ok(())
}

fn setup_errlog(verbosity: usize) -> eyre::Result<()> {
    // Errors and warnings are always shown, each -v adds more detail.
    stderrlog::new().verbosity(verbosity + 1).init()?;
    Ok(())
}

#[derive(Parser)]
#[clap(name = "bookcsv")]
#[clap(about = "Export a CSV of book metadata for a list of ISBNs")]
#[clap(version, author)]
struct Cli {
    /// The ISBNdb API key sent in the Authorization header
    api_key: String,

    /// File with one ISBN per line
    #[clap(short, long, parse(from_os_str), default_value = "isbn_list.txt")]
    input: PathBuf,

    /// Path of the CSV file to write
    #[clap(short, long, parse(from_os_str), default_value = "book_list.csv")]
    output: PathBuf,

    /// Path of the OpenLibrary cache file
    #[clap(long, parse(from_os_str), default_value = "openlibrary_db.txt")]
    open_library_db: PathBuf,

    /// Path of the ISBNdb cache file
    #[clap(long, parse(from_os_str), default_value = "isbndb_db.txt")]
    isbndb_db: PathBuf,

    /// How chatty the program is when performing commands
    ///
    /// The number of times this flag is used will increase how chatty
    /// the program is.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,
}
