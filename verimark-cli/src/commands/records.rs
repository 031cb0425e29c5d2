//! Records command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::utils::{format_timestamp, load_records, short_hash};

/// Execute the records command.
pub fn execute(records_path: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let session = load_records(&records_path)?;

    if json {
        let out = session.export_json().context("Failed to serialize records")?;
        println!("{out}");
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    if session.is_empty() {
        println!("{}", "No records".dimmed());
        return Ok(());
    }

    for record in session.records() {
        let visibility = if record.is_public {
            "public".green()
        } else {
            "private".yellow()
        };
        println!(
            "{:>10}  {}  {}  {}  {}",
            record.block_number,
            short_hash(&record.hash, 18),
            format_timestamp(&record.timestamp),
            visibility,
            record.file_name
        );
    }
    Ok(())
}
