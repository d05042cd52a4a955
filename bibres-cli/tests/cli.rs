use assert_cmd::prelude::*;
use std::process::Command;

// We check the --help output in order to confirm that the clap cli is setup correctly.
// Any arguments that are set up incorrectly will cause clap to panic regardless of the
// arguments or options provided.
// Calling help does not require any application logic so if this test fails then we know it
// is to do with the clap cli setup code.
#[test]
fn check_clap_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("bookcsv")?;

    cmd.arg("--help");
    cmd.assert().success();

    Ok(())
}

// The ISBNdb API key is required, the program must refuse to run without it
// rather than querying unauthorized.
#[test]
fn missing_api_key_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("bookcsv")?;

    cmd.assert().failure();

    Ok(())
}
