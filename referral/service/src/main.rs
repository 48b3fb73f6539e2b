// Copyright (c) 2024 The Botho Foundation

//! BTH Referral Service
//!
//! Tracks wallet referrals and serves referral stats and the leaderboard.

use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, time::Duration};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bth_referral_core::ReferralConfig;
use bth_referral_service::{api, Database, ReferralService};

/// BTH Referral Service - referral registration, stats and leaderboard
#[derive(Parser, Debug)]
#[command(name = "bth-referral")]
#[command(about = "Referral tracking service for BTH wallets")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "referral.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run database migrations only
    #[arg(long)]
    migrate: bool,

    /// Override the listen address from the configuration
    #[arg(long)]
    listen: Option<String>,

    /// Override the database path from the configuration
    #[arg(long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("BTH Referral Service starting...");

    // Load configuration
    let mut config = if args.config.exists() {
        info!("Loading configuration from {}", args.config.display());
        ReferralConfig::from_file(&args.config)?
    } else {
        info!("Using default configuration");
        ReferralConfig::default()
    };

    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(db_path) = args.db {
        config.referral.db_path = db_path;
    }

    // Initialize database
    info!("Initializing database at {}", config.referral.db_path);
    let db = Database::open(
        &config.referral.db_path,
        Duration::from_millis(config.referral.busy_timeout_ms),
    )?;
    db.migrate()?;

    if args.migrate {
        info!("Database migration complete");
        return Ok(());
    }

    info!("Referral configuration:");
    info!("  Listen: {}", config.server.listen_addr);
    info!("  Site URL: {}", config.referral.site_url);
    info!("  Leaderboard size: {}", config.referral.leaderboard_size);

    let service = ReferralService::new(db, config.referral.clone());
    api::serve(service, &config.server).await?;

    Ok(())
}
