//! Verimark CLI - invisible watermarks, hidden messages and content proofs.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use verimark_core::{SteganographyMethod, WatermarkAlgorithm, WatermarkType};

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (invalid options)
  65  Verification failed (no watermark, corrupted or unsupported data)
  66  Input error (missing or unreadable file)
  69  Ledger unavailable
  74  I/O error (cannot write output)
  77  Password required or invalid";

#[derive(Parser)]
#[command(name = "verimark")]
#[command(author, version, about = "Invisible watermarks, hidden messages and content proofs", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// When to use colored output
    #[arg(long, global = true, value_enum, default_value = "auto")]
    color: ColorArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Text,
    Image,
    Link,
}

impl From<KindArg> for WatermarkType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => WatermarkType::Text,
            KindArg::Image => WatermarkType::Image,
            KindArg::Link => WatermarkType::Link,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Dct,
    Dwt,
}

impl From<AlgorithmArg> for WatermarkAlgorithm {
    fn from(algorithm: AlgorithmArg) -> Self {
        match algorithm {
            AlgorithmArg::Dct => WatermarkAlgorithm::Dct,
            AlgorithmArg::Dwt => WatermarkAlgorithm::Dwt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Lsb,
    Dct,
    Advanced,
}

impl From<MethodArg> for SteganographyMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Lsb => SteganographyMethod::Lsb,
            MethodArg::Dct => SteganographyMethod::Dct,
            MethodArg::Advanced => SteganographyMethod::Advanced,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an invisible watermark into an image
    Embed {
        /// Path to the carrier image
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Text, link or label to embed
        #[arg(short, long)]
        content: String,

        /// What the watermark represents
        #[arg(short = 't', long = "type", value_enum, default_value = "text")]
        kind: KindArg,

        /// Raw QR content embedded instead of --content for image watermarks
        #[arg(long)]
        qr_code: Option<String>,

        /// Embedding domain
        #[arg(short, long, value_enum, default_value = "dct")]
        algorithm: AlgorithmArg,

        /// Embedding strength, 0-100 (default 50)
        #[arg(short, long)]
        strength: Option<u8>,

        /// Number of payload copies, 1-15 (default 3)
        #[arg(short, long)]
        redundancy: Option<u8>,

        /// Bind the watermark to a password
        #[arg(short, long)]
        password: Option<String>,

        /// Encrypt the payload with the password
        #[arg(long, requires = "password")]
        encrypt: bool,

        /// Output path (defaults to <FILE stem>.watermarked.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract and verify a watermark
    Verify {
        /// Path to the image to check
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Password for protected watermarks
        #[arg(short, long)]
        password: Option<String>,

        /// Print the full verification result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hide a text message inside an image
    Hide {
        /// Path to the carrier image
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Message to hide
        #[arg(short, long)]
        message: String,

        /// Hiding method
        #[arg(long, value_enum, default_value = "lsb")]
        method: MethodArg,

        /// Encrypt the message with a password
        #[arg(short, long)]
        password: Option<String>,

        /// Quality for the dct method, 0-100 (default 75)
        #[arg(long)]
        quality: Option<u8>,

        /// Output path (defaults to <FILE stem>.hidden.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reveal a hidden message
    Reveal {
        /// Path to the image carrying the message
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Password for encrypted messages
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Generate content proofs and append them to a records file
    Register {
        /// Files to register
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Mark the records as private
        #[arg(long)]
        private: bool,

        /// Records file to append to
        #[arg(long, default_value = verimark_core::session::EXPORT_FILE_NAME)]
        records: PathBuf,
    },

    /// List registered records
    Records {
        /// Records file to read
        #[arg(long, default_value = verimark_core::session::EXPORT_FILE_NAME)]
        records: PathBuf,

        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_color(choice: ColorArg) {
    match choice {
        ColorArg::Auto => {}
        ColorArg::Always => colored::control::set_override(true),
        ColorArg::Never => colored::control::set_override(false),
    }
}

fn init_tracing(verbose: u8, quiet: bool, color: ColorArg) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(color != ColorArg::Never)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;

    match cli.command {
        Commands::Embed {
            file,
            content,
            kind,
            qr_code,
            algorithm,
            strength,
            redundancy,
            password,
            encrypt,
            output,
        } => {
            let args = commands::embed::EmbedArgs {
                file,
                content,
                kind: kind.into(),
                qr_code,
                algorithm: algorithm.into(),
                strength,
                redundancy,
                password,
                encrypt,
                output,
            };
            commands::embed::execute(args, quiet)
        }
        Commands::Verify {
            file,
            password,
            json,
        } => commands::verify::execute(file, password, json, quiet),
        Commands::Hide {
            file,
            message,
            method,
            password,
            quality,
            output,
        } => {
            let args = commands::hide::HideArgs {
                file,
                message,
                method: method.into(),
                password,
                quality,
                output,
            };
            commands::hide::execute(args, quiet)
        }
        Commands::Reveal { file, password } => commands::reveal::execute(file, password),
        Commands::Register {
            files,
            private,
            records,
        } => commands::register::execute(files, !private, records, quiet).await,
        Commands::Records { records, json } => commands::records::execute(records, json, quiet),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_color(cli.color);
    init_tracing(cli.verbose, cli.quiet, cli.color);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
