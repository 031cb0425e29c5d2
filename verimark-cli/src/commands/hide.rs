//! Hide command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;
use verimark_core::{embed_steganography, SteganographyMethod, SteganographyOptions};

use crate::utils::{build_output_path, read_media, write_media};

pub struct HideArgs {
    pub file: PathBuf,
    pub message: String,
    pub method: SteganographyMethod,
    pub password: Option<String>,
    pub quality: Option<u8>,
    pub output: Option<PathBuf>,
}

/// Execute the hide command.
pub fn execute(args: HideArgs, quiet: bool) -> Result<()> {
    let file = read_media(&args.file)?;

    let mut options = SteganographyOptions::new(args.message).with_method(args.method);
    if let Some(password) = args.password {
        options = options.with_password(password);
    }
    if let Some(quality) = args.quality {
        options = options.with_quality(quality);
    }

    let stego = embed_steganography(&file, &options).context("Failed to hide message")?;

    let output = args
        .output
        .unwrap_or_else(|| build_output_path(&args.file, "hidden"));
    write_media(&output, &stego)?;

    let encrypted = options.effective_password().is_some();
    info!(
        path = %output.display(),
        method = ?options.method,
        encrypted,
        "Message hidden"
    );

    if !quiet {
        println!();
        println!("{}", "Message hidden".green().bold());
        println!();
        println!("   {} {}", "Output:".dimmed(), output.display());
        println!("   {} {:?}", "Method:".dimmed(), options.method);
        println!("   {} {} bytes", "Message:".dimmed(), options.message.len());
        if encrypted {
            println!("   {} {}", "Encryption:".dimmed(), "ChaCha20-Poly1305".green());
        }
    }

    Ok(())
}
