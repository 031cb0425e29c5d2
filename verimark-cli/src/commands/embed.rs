//! Embed command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;
use verimark_core::{embed_watermark, WatermarkAlgorithm, WatermarkOptions, WatermarkType};

use crate::utils::{build_output_path, read_media, write_media};

pub struct EmbedArgs {
    pub file: PathBuf,
    pub content: String,
    pub kind: WatermarkType,
    pub qr_code: Option<String>,
    pub algorithm: WatermarkAlgorithm,
    pub strength: Option<u8>,
    pub redundancy: Option<u8>,
    pub password: Option<String>,
    pub encrypt: bool,
    pub output: Option<PathBuf>,
}

impl EmbedArgs {
    fn options(&self) -> WatermarkOptions {
        WatermarkOptions {
            kind: self.kind,
            content: self.content.clone(),
            strength: self.strength,
            algorithm: self.algorithm,
            redundancy: self.redundancy,
            encryption: self.encrypt,
            password: self.password.clone(),
            qr_code: self.qr_code.clone(),
        }
    }
}

/// Execute the embed command.
pub fn execute(args: EmbedArgs, quiet: bool) -> Result<()> {
    let file = read_media(&args.file)?;
    let options = args.options();

    let marked = embed_watermark(&file, &options).context("Failed to embed watermark")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| build_output_path(&args.file, "watermarked"));
    write_media(&output, &marked)?;

    info!(
        path = %output.display(),
        algorithm = ?options.algorithm,
        strength = options.resolved_strength(),
        redundancy = options.resolved_redundancy(),
        protected = options.effective_password().is_some(),
        "Watermark embedded"
    );

    if !quiet {
        println!();
        println!("{}", "Watermark embedded".green().bold());
        println!();
        println!("   {} {}", "Output:".dimmed(), output.display());
        println!("   {} {:?}", "Algorithm:".dimmed(), options.algorithm);
        println!("   {} {}", "Strength:".dimmed(), options.resolved_strength());
        println!("   {} {}", "Redundancy:".dimmed(), options.resolved_redundancy());
        if options.effective_password().is_some() {
            let mode = if options.encryption {
                "encrypted"
            } else {
                "password-bound"
            };
            println!("   {} {}", "Protection:".dimmed(), mode);
        }
    }

    Ok(())
}
