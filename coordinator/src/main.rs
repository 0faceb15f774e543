//! Luxae Coupons CLI
//!
//! Manages the coupon file and runs redemption simulations against an
//! in-process ledger.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coupon_common::{CouponId, CouponStatus, LedgerAddress};
use coupon_coordinator::{
    CoordinatorConfig, CouponService, CouponStats, CouponUpdate, CreateBatchRequest,
    MetricsSnapshot,
};
use coupon_ledger::{EvmAddressValidator, OfflineLedger, SimulatedLedger};
use coupon_store::{JsonFileStore, MemoryStore};

const SIMULATED_SIGNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const SIMULATED_RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Luxae Coupons CLI
#[derive(Parser, Debug)]
#[command(name = "coupons")]
#[command(about = "Issue, manage and redeem Luxae token coupons")]
struct Args {
    /// Coupon data file (defaults to COUPON_DATA_FILE or data/coupons.json)
    #[arg(long, env = "COUPON_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a batch of pending coupons
    Create {
        /// Number of coupons to issue
        #[arg(short, long)]
        count: usize,

        /// Token value of each coupon
        #[arg(short, long)]
        value: Decimal,

        /// Recipient address recorded on every coupon
        #[arg(long)]
        recipient: Option<String>,

        /// Description recorded on every coupon
        #[arg(long)]
        description: Option<String>,
    },

    /// List coupons
    List {
        /// Only coupons with this status
        #[arg(long)]
        status: Option<CouponStatus>,
    },

    /// Show one coupon
    Get { id: CouponId },

    /// Change status, recipient or description of a coupon
    Update {
        id: CouponId,

        #[arg(long)]
        status: Option<CouponStatus>,

        #[arg(long)]
        recipient: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a coupon that was never redeemed
    Delete { id: CouponId },

    /// Show aggregate counts and values
    Stats,

    /// Redeem a coupon on the configured ledger
    Redeem {
        id: CouponId,

        /// Recipient address (defaults to the coupon's recorded recipient)
        #[arg(long)]
        recipient: Option<String>,
    },

    /// Run a batch and concurrent redemptions against a simulated ledger
    Simulate {
        /// Number of coupons to issue
        #[arg(long, default_value = "5")]
        coupons: usize,

        /// Token value of each coupon
        #[arg(long, default_value = "10")]
        value: Decimal,

        /// Concurrent redemption attempts per coupon
        #[arg(long, default_value = "3")]
        attempts: usize,

        /// Token decimals of the simulated ledger
        #[arg(long, default_value = "18")]
        decimals: u32,

        /// Simulated confirmation latency in milliseconds
        #[arg(long, default_value = "25")]
        latency_ms: u64,
    },
}

/// Outcome of `coupons simulate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationReport {
    attempts: usize,
    successful_redemptions: usize,
    rejected_redemptions: usize,
    ledger_transfers: usize,
    recipient_balance: String,
    stats: CouponStats,
    metrics: MetricsSnapshot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CoordinatorConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(path) = args.data_file.clone() {
        config.data_file = path;
    }

    init_logging(&config.log_level, args.json);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    match args.command {
        Command::Create {
            count,
            value,
            recipient,
            description,
        } => {
            let coupons = file_service(&config)?
                .create_batch(CreateBatchRequest {
                    count,
                    unit_value: value,
                    recipient_address: recipient,
                    description,
                })
                .await?;
            print_json(&coupons)
        }
        Command::List { status } => print_json(&file_service(&config)?.list(status)),
        Command::Get { id } => print_json(&file_service(&config)?.get(id)?),
        Command::Update {
            id,
            status,
            recipient,
            description,
        } => {
            let update = CouponUpdate {
                status,
                recipient_address: recipient,
                description,
            };
            let coupon = file_service(&config)?.apply_update(id, update).await?;
            print_json(&coupon)
        }
        Command::Delete { id } => {
            file_service(&config)?.delete_coupon(id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::Stats => print_json(&file_service(&config)?.stats()?),
        Command::Redeem { id, recipient } => {
            let outcome = file_service(&config)?
                .redeem(id, recipient.as_deref())
                .await?;
            print_json(&outcome)
        }
        Command::Simulate {
            coupons,
            value,
            attempts,
            decimals,
            latency_ms,
        } => {
            let report = simulate(&config, coupons, value, attempts, decimals, latency_ms).await?;
            print_json(&report)
        }
    }
}

fn init_logging(default_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Service over the coupon file. No token contract is configured for the
/// CLI, so redemptions fail before any transfer.
fn file_service(config: &CoordinatorConfig) -> anyhow::Result<CouponService> {
    let store = JsonFileStore::open(config.data_file.clone())
        .with_context(|| format!("opening {}", config.data_file.display()))?;

    Ok(CouponService::new(
        config,
        Arc::new(store),
        Arc::new(OfflineLedger),
        Arc::new(EvmAddressValidator::default()),
    ))
}

async fn simulate(
    config: &CoordinatorConfig,
    coupons: usize,
    value: Decimal,
    attempts: usize,
    decimals: u32,
    latency_ms: u64,
) -> anyhow::Result<SimulationReport> {
    let base = 10u128
        .checked_pow(decimals)
        .context("decimals too large for a simulated supply")?;
    let supply = base.saturating_mul(1_000_000_000);

    let ledger = Arc::new(
        SimulatedLedger::new(LedgerAddress::new(SIMULATED_SIGNER), decimals, supply)
            .with_confirmation_delay(Duration::from_millis(latency_ms)),
    );
    let service = Arc::new(CouponService::new(
        config,
        Arc::new(MemoryStore::new()),
        ledger.clone(),
        Arc::new(EvmAddressValidator::default()),
    ));

    info!(coupons, attempts, %value, "Starting redemption simulation");

    let issued = service
        .create_batch(CreateBatchRequest {
            count: coupons,
            unit_value: value,
            recipient_address: Some(SIMULATED_RECIPIENT.to_string()),
            description: Some("simulation".to_string()),
        })
        .await?;

    let mut tasks = JoinSet::new();
    for coupon in &issued {
        for _ in 0..attempts {
            let service = service.clone();
            let id = coupon.id;
            tasks.spawn(async move { service.redeem(id, None).await });
        }
    }

    let mut successful = 0;
    let mut rejected = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.context("redemption task panicked")? {
            Ok(_) => successful += 1,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Simulated redemption rejected");
                rejected += 1;
            }
        }
    }

    let recipient_balance = ledger.balance(&LedgerAddress::new(SIMULATED_RECIPIENT));
    let report = SimulationReport {
        attempts: issued.len() * attempts,
        successful_redemptions: successful,
        rejected_redemptions: rejected,
        ledger_transfers: ledger.transfers().len(),
        recipient_balance: coupon_ledger::format_units(recipient_balance, decimals),
        stats: service.stats()?,
        metrics: service.metrics(),
    };

    info!(
        successful = report.successful_redemptions,
        transfers = report.ledger_transfers,
        "Simulation complete"
    );
    Ok(report)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
