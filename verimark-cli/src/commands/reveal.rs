//! Reveal command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use verimark_core::extract_steganography;

use crate::utils::read_media;

/// Execute the reveal command. The message goes to stdout unadorned so it
/// can be piped.
pub fn execute(file: PathBuf, password: Option<String>) -> Result<()> {
    let media = read_media(&file)?;
    let message =
        extract_steganography(&media, password.as_deref()).context("Failed to reveal message")?;

    info!(bytes = message.len(), "Message revealed");
    println!("{message}");
    Ok(())
}
