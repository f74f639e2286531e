//! CLI tool for building and inspecting tracking URLs.
//!
//! Uses the same environment configuration as the server, so URLs built here decode on
//! the running service.
//!
//! # Usage
//!
//! ```bash
//! # Generate an encryption key for TRACKING_ENCRYPTION_KEY
//! cargo run --bin trackctl -- keygen
//!
//! # Build tracking URLs
//! cargo run --bin trackctl -- open -m email_id=42 -m campaign=spring
//! cargo run --bin trackctl -- click https://example.com/offer -m email_id=42
//!
//! # Inspect a tracking URL or bare segment
//! cargo run --bin trackctl -- decode "https://t.example.com/track/click/eyJrIjoi..."
//!
//! # Rewrite an HTML email
//! cargo run --bin trackctl -- adapt newsletter.html -o tracked.html -m email_id=42
//!
//! # Show the resolved tracking configuration
//! cargo run --bin trackctl -- config
//! ```

use email_tracker::application::services::{HtmlAdapter, UrlCodec};
use email_tracker::config::{self, Config};
use email_tracker::domain::{EncryptionKey, Metadata, TrackingKind, TrackingPayload};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CLI tool for email tracking URLs.
#[derive(Parser)]
#[command(name = "trackctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Metadata flags shared by the URL-building commands.
#[derive(clap::Args)]
struct MetadataArgs {
    /// Metadata entry as key=value; values that parse as JSON keep their type
    #[arg(short, long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,

    /// Metadata as one JSON object; `--meta` entries are applied on top
    #[arg(long, value_name = "JSON")]
    metadata: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyFormat {
    Base64,
    Hex,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random 256-bit encryption key
    Keygen {
        #[arg(short, long, value_enum, default_value = "base64")]
        format: KeyFormat,
    },

    /// Build an open-tracking pixel URL
    Open {
        #[command(flatten)]
        metadata: MetadataArgs,
    },

    /// Build a click-tracking URL
    Click {
        /// Destination URL (absolute http or https)
        target: String,

        #[command(flatten)]
        metadata: MetadataArgs,
    },

    /// Decode a tracking URL or encoded segment
    Decode {
        /// Full tracking URL or bare path segment
        input: String,
    },

    /// Rewrite an HTML document for tracking
    Adapt {
        /// HTML file to read
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        metadata: MetadataArgs,

        /// Overwrite the output file without asking
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show the resolved tracking configuration
    Config,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { format } => keygen(format)?,
        Commands::Open { metadata } => {
            let metadata = parse_metadata(&metadata)?;
            println!("{}", load_codec()?.open_url(&metadata)?);
        }
        Commands::Click { target, metadata } => {
            let metadata = parse_metadata(&metadata)?;
            println!("{}", load_codec()?.click_url(&target, &metadata)?);
        }
        Commands::Decode { input } => decode(&load_codec()?, &input)?,
        Commands::Adapt {
            input,
            output,
            metadata,
            yes,
        } => adapt(load_codec()?, &input, output.as_deref(), &metadata, yes)?,
        Commands::Config => show_config(&load_config()?),
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    config::load_from_env().context("Failed to load configuration")
}

fn load_codec() -> Result<UrlCodec> {
    Ok(UrlCodec::new(Arc::new(load_config()?.tracking_config())))
}

fn keygen(format: KeyFormat) -> Result<()> {
    let key = EncryptionKey::generate().map_err(|e| anyhow::anyhow!("RNG unavailable: {}", e))?;

    match format {
        KeyFormat::Base64 => println!("{}", key.to_base64()),
        KeyFormat::Hex => println!("{}", hex::encode(key.as_bytes())),
    }

    Ok(())
}

/// Builds metadata from `--metadata` JSON and `--meta key=value` flags.
fn parse_metadata(args: &MetadataArgs) -> Result<Metadata> {
    let mut metadata = match &args.metadata {
        Some(json) => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("--metadata is not valid JSON")?;
            Metadata::try_from(value).map_err(anyhow::Error::msg)?
        }
        None => Metadata::new(),
    };

    for entry in &args.meta {
        let (key, raw) = entry
            .split_once('=')
            .with_context(|| format!("Metadata entry '{}' must be key=value", entry))?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        metadata.insert(key.trim(), value);
    }

    Ok(metadata)
}

/// Decodes a full URL (open or click base) or a bare segment and prints the payload.
fn decode(codec: &UrlCodec, input: &str) -> Result<()> {
    let segment = codec
        .extract_segment(input, TrackingKind::Open)
        .or_else(|| codec.extract_segment(input, TrackingKind::Click))
        .unwrap_or(input);

    let payload = codec
        .decode(segment)
        .context("Invalid tracking payload")?;

    print_payload(&payload)
}

fn print_payload(payload: &TrackingPayload) -> Result<()> {
    println!("{}", "🔍 Tracking payload".bright_blue().bold());
    println!();
    println!("  Kind:      {}", payload.kind.to_string().cyan());
    if let Some(target) = &payload.target_url {
        println!("  Target:    {}", target.bright_yellow());
    }
    match payload.issued_at {
        Some(at) => println!("  Issued at: {}", at.to_rfc3339().bright_black()),
        None => println!("  Issued at: {}", "-".bright_black()),
    }
    println!("  Metadata:");
    for line in serde_json::to_string_pretty(&payload.metadata)?.lines() {
        println!("    {}", line);
    }
    println!();

    Ok(())
}

/// Rewrites an HTML file, asking before an existing output file is replaced.
fn adapt(
    codec: UrlCodec,
    input: &Path,
    output: Option<&Path>,
    metadata: &MetadataArgs,
    skip_confirm: bool,
) -> Result<()> {
    let metadata = parse_metadata(metadata)?;
    let html = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let adapted = HtmlAdapter::new(codec).adapt(&html, &metadata)?;

    let Some(output) = output else {
        print!("{}", adapted);
        return Ok(());
    };

    if output.exists() && !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", output.display()))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    std::fs::write(output, adapted)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} {}",
        "✅ Tracked HTML written to".green().bold(),
        output.display().to_string().cyan()
    );

    Ok(())
}

fn show_config(config: &Config) {
    println!("{}", "⚙️  Tracking configuration".bright_blue().bold());
    println!();
    println!("  Open base URL:    {}", config.open_base_url.cyan());
    println!("  Click base URL:   {}", config.click_base_url.cyan());
    println!(
        "  Encryption:       {}",
        if config.encryption_key.is_some() {
            "enabled".green()
        } else {
            "disabled".yellow()
        }
    );
    println!("  Max encoded len:  {}", config.max_encoded_len);
    println!("  Email id key:     {}", config.email_id_key.cyan());
    println!(
        "  Default metadata: {}",
        serde_json::to_string(&config.default_metadata).unwrap_or_default()
    );
    println!(
        "  Webhook:          {}",
        config.webhook_url.as_deref().unwrap_or("disabled")
    );
    println!(
        "  Event store:      {}",
        config
            .database_url
            .as_deref()
            .map(config::mask_connection_string)
            .unwrap_or_else(|| "in-memory".to_string())
    );
    println!();
}
