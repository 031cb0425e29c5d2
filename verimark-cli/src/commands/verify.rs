//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{error, info, warn};
use verimark_core::{extract_watermark, VerificationFailure, VerificationResult, VerimarkError};

use crate::utils::read_media;

/// Execute the verify command.
pub fn execute(file: PathBuf, password: Option<String>, json: bool, quiet: bool) -> Result<()> {
    let media = read_media(&file)?;
    let result =
        extract_watermark(&media, password.as_deref()).context("Failed to extract watermark")?;

    if json {
        let out = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{out}");
    }

    match result.failure {
        None => {
            info!(
                confidence = result.confidence_score,
                tampered = result.tampered_areas.len(),
                "Watermark verified"
            );
            if !json && !quiet {
                print_verified(&result);
            }
            Ok(())
        }
        Some(failure) => {
            error!(?failure, confidence = result.confidence_score, "Watermark not verified");
            if !json && !quiet {
                println!();
                println!("{}", "Watermark not verified".red().bold());
                println!("   {} {}", "Reason:".dimmed(), failure.message().red());
            }
            Err(failure_error(failure).into())
        }
    }
}

fn print_verified(result: &VerificationResult) {
    println!();
    println!("{}", "Watermark verified".green().bold());
    println!();
    if let Some(content) = &result.original_watermark {
        println!("   {} {}", "Content:".dimmed(), content);
    }
    if let Some(content_type) = result.content_type {
        println!("   {} {:?}", "Type:".dimmed(), content_type);
    }
    println!(
        "   {} {:.1}%",
        "Confidence:".dimmed(),
        result.confidence_score * 100.0
    );

    if result.tampered_areas.is_empty() {
        println!("   {} {}", "Tampering:".dimmed(), "none detected".green());
    } else {
        warn!(areas = result.tampered_areas.len(), "Tampered regions found");
        println!(
            "   {} {} region(s)",
            "Tampering:".dimmed(),
            result.tampered_areas.len().to_string().yellow()
        );
        for area in &result.tampered_areas {
            println!(
                "     {} {}x{} at ({}, {})",
                "-".yellow(),
                area.width,
                area.height,
                area.x,
                area.y
            );
        }
    }
}

fn failure_error(failure: VerificationFailure) -> VerimarkError {
    let message = failure.message().to_string();
    match failure {
        VerificationFailure::PasswordRequired | VerificationFailure::InvalidPassword => {
            VerimarkError::PasswordError(message)
        }
        VerificationFailure::NotDetected | VerificationFailure::IntegrityFailed => {
            VerimarkError::IntegrityError(message)
        }
    }
}
