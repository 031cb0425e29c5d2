//! Register command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{debug, info};
use verimark_core::{InMemoryLedger, VerimarkError};

use crate::utils::{format_timestamp, load_records, read_media, save_records, short_hash};

/// Execute the register command.
///
/// Block numbers continue after the highest block already in the records
/// file, so repeated runs keep a single increasing sequence.
pub async fn execute(
    files: Vec<PathBuf>,
    is_public: bool,
    records_path: PathBuf,
    quiet: bool,
) -> Result<()> {
    let mut session = load_records(&records_path)?;
    let ledger = match session.latest_block() {
        Some(block) => {
            let next = block.checked_add(1).ok_or_else(|| {
                VerimarkError::ledger_permanent(format!(
                    "{} already holds the highest possible block ({block})",
                    records_path.display()
                ))
            })?;
            InMemoryLedger::starting_at(next)
        }
        None => InMemoryLedger::new(),
    };
    debug!(existing = session.len(), "Registering files");

    for path in &files {
        let file = read_media(path)?;
        let record = session
            .register(&file, is_public, &ledger)
            .await
            .with_context(|| format!("Failed to register {}", path.display()))?;

        info!(
            file = %record.file_name,
            block = record.block_number,
            hash = %record.hash,
            "Registered"
        );

        if !quiet {
            println!(
                "{} {}  {} {}  {} {}",
                "Registered".green().bold(),
                record.file_name,
                "block".dimmed(),
                record.block_number,
                "hash".dimmed(),
                short_hash(&record.hash, 18)
            );
            println!(
                "   {} {}  {} {}",
                "tx".dimmed(),
                short_hash(&record.transaction_id, 18),
                "at".dimmed(),
                format_timestamp(&record.timestamp)
            );
        }
    }

    save_records(&records_path, &session)?;
    if !quiet {
        println!();
        println!(
            "   {} {} ({} records)",
            "Saved:".dimmed(),
            records_path.display(),
            session.len()
        );
    }
    Ok(())
}
