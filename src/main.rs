//! Leveraged ETF Hedge Calculator
//!
//! Sizes an index-futures hedge for a 2x leveraged ETF holding and recommends
//! opening, holding, or closing it based on the index's moving average.

mod api;
mod hedging;
mod metrics;
mod models;
mod session;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{CachedMarketData, MarketData, MarketDataClient};
use crate::hedging::HedgeConfig;
use crate::models::HedgeState;
use crate::session::{Quoted, SessionState};

/// Hedge calculator CLI.
#[derive(Parser)]
#[command(name = "hedgecalc")]
#[command(about = "Size an index-futures hedge for a leveraged ETF holding", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Moving-average window in trading days
    #[arg(short = 'd', long, env = "HEDGE_MA_DAYS")]
    ma_days: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the hedge once and print the recommendation
    Evaluate {
        /// ETF lots held
        #[arg(long, default_value = "7")]
        lots: u32,

        /// ETF price per share (fetched when omitted)
        #[arg(long)]
        price: Option<Decimal>,

        /// Index level (fetched when omitted)
        #[arg(long)]
        index: Option<Decimal>,

        /// Moving-average level (fetched when omitted)
        #[arg(long)]
        ma: Option<Decimal>,

        /// Currently holding a short futures hedge
        #[arg(long)]
        hedged: bool,

        /// Do not fetch market data; use the given or default values
        #[arg(long)]
        offline: bool,
    },

    /// Interactive session: change inputs and re-evaluate
    Session {
        /// ETF lots held
        #[arg(long, default_value = "7")]
        lots: u32,

        /// Starting hedge state (hedged or unhedged)
        #[arg(long, default_value = "unhedged")]
        state: HedgeState,

        /// Do not fetch market data
        #[arg(long)]
        offline: bool,
    },

    /// Show the latest close (and moving average) for a ticker
    Quote {
        /// Ticker symbol, e.g. ^TWII or 00631L.TW
        ticker: String,

        /// Also compute the moving average over this many days
        #[arg(long)]
        with_ma: Option<u32>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = HedgeConfig::from_env().context("Invalid HEDGE_* environment configuration")?;
    if let Some(days) = cli.ma_days {
        anyhow::ensure!(days >= 1, "--ma-days must be at least 1");
        config.ma_days = days;
    }

    let client = MarketDataClient::new(&config).context("Failed to create market data client")?;
    let source = CachedMarketData::new(client, config.cache_ttl());

    match cli.command {
        Commands::Evaluate {
            lots,
            price,
            index,
            ma,
            hedged,
            offline,
        } => {
            anyhow::ensure!(lots >= 1, "--lots must be at least 1");

            let mut state = SessionState::new(config);
            state.holding_lots = lots;
            state.hedge_state = HedgeState::from_flag(hedged);

            if !offline {
                if index.is_none() || ma.is_none() {
                    if let Err(e) = state.refresh_index(&source).await {
                        println!("Index/moving-average data unavailable ({}); using defaults.", e);
                    }
                }
                if price.is_none() {
                    if let Err(e) = state.refresh_unit_price(&source).await {
                        println!("ETF price unavailable ({}); using default.", e);
                    }
                }
            }

            if let Some(p) = price {
                state.unit_price = Quoted::manual(p);
            }
            if let Some(i) = index {
                state.index_price = Quoted::manual(i);
            }
            if let Some(m) = ma {
                state.moving_average = Quoted::manual(m);
            }

            let evaluation = state.evaluate().context("Cannot size hedge")?;
            info!(
                action = ?evaluation.recommendation.action,
                lots = evaluation.recommendation.suggested_lots,
                "Evaluation complete"
            );
            println!("{}", evaluation);
        }

        Commands::Session { lots, state, offline } => {
            anyhow::ensure!(lots >= 1, "--lots must be at least 1");

            let mut session = SessionState::new(config);
            session.holding_lots = lots;
            session.hedge_state = state;

            println!("\n=== Hedge Calculator Session ===");
            println!(
                "ETF: {} (x{})   Index: {}   Contract: {} per point",
                session.config().etf_ticker,
                session.config().leverage_ratio,
                session.config().index_ticker,
                session.config().contract.point_value
            );

            if !offline {
                for e in session.refresh_all(&source).await {
                    println!("Market data unavailable: {}", e);
                }
            }

            shell::Shell::new(&source, offline).run(&mut session).await?;
        }

        Commands::Quote { ticker, with_ma } => {
            match with_ma {
                Some(days) => {
                    let (price, ma) = source
                        .fetch_latest_price_and_moving_average(&ticker, days)
                        .await
                        .with_context(|| format!("No data for {}", ticker))?;
                    println!("{:<12} last {:>10}   {}-day MA {:>10}", ticker, price, days, ma);
                }
                None => {
                    let price = source
                        .fetch_latest_price(&ticker)
                        .await
                        .with_context(|| format!("No data for {}", ticker))?;
                    println!("{:<12} last {:>10}", ticker, price);
                }
            }
        }

        Commands::Config => {
            println!("\n=== Hedge Configuration ===\n");
            println!("Instruments:");
            println!("  ETF Ticker:           {}", config.etf_ticker);
            println!("  Leverage Ratio:       {}", config.leverage_ratio);
            println!("  Shares per Lot:       {}", config.shares_per_lot);
            println!("  Index Ticker:         {}", config.index_ticker);
            println!("  Contract Point Value: {}", config.contract.point_value);

            println!("\nSignal:");
            println!("  Moving Average Days:  {}", config.ma_days);
            println!("  History Range:        {}", config.history_range);

            println!("\nMarket Data:");
            println!("  Chart API:            {}", config.market_data_url);
            println!("  Cache TTL:            {}s", config.cache_ttl_secs);

            println!("\nDefaults (shown until data loads):");
            println!("  ETF Price:            {}", config.fallback_unit_price);
            println!("  Index:                {}", config.fallback_index_price);
            println!("  Moving Average:       {}", config.fallback_moving_average);
        }
    }

    Ok(())
}
