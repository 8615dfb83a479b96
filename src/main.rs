mod aggregator;
mod config;
mod dispatcher;
mod error;
mod gateway;
mod render;
mod sparkline;
mod types;
mod web;
mod widget;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{CardConfig, CardOverrides, DEFAULT_CONFIG_FILE};
use dispatcher::{Command, ConfigForm};
use types::PairConfigUpdate;
use web::{start_card_server, AppState};
use widget::Widget;

#[derive(Parser)]
#[command(name = "bot-card")]
#[command(author = "Trading Bot")]
#[command(version = "0.1.0")]
#[command(about = "Operator card for a remote crypto trading bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Backend base URL (overrides file and CARD_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Comma separated trading pairs, the first two are charted
    #[arg(long, value_delimiter = ',')]
    pairs: Option<Vec<String>>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the card over HTTP and keep it refreshed
    Serve {
        /// Listen port (default: 8099)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch one snapshot and print it
    Status {
        /// Print the view state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the bot on the configured pairs
    Start {
        /// Let the bot buy and sell on its own
        #[arg(long)]
        autotrade: bool,
    },
    /// Stop the bot
    Stop,
    /// Market buy (amount defaults to 50 USD)
    Buy {
        #[arg(short, long)]
        pair: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
    },
    /// Market sell
    Sell {
        #[arg(short, long)]
        pair: Option<String>,
        /// Sell a single package instead of the whole position
        #[arg(long)]
        package_id: Option<u64>,
    },
    /// Update strategy parameters, unset flags keep the current values
    SaveConfig {
        #[arg(long)]
        min_profit: Option<String>,
        #[arg(long)]
        hysteresis: Option<String>,
        #[arg(long)]
        drawdown: Option<String>,
        #[arg(long)]
        min_trades: Option<String>,
        #[arg(long)]
        base_package: Option<String>,
        #[arg(long)]
        multiplier: Option<String>,
        /// day, week or month
        #[arg(long)]
        lookback: Option<String>,
    },
    /// Clear the alert list
    ClearAlerts,
    /// Switch autotrade on or off
    Autotrade {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// List per-pair trading permissions
    Pairs,
    /// Update one pair's trading permissions
    PairConfig {
        pair: String,
        #[arg(long)]
        allowed: Option<bool>,
        /// Risk level, clamped to 0..=10
        #[arg(long)]
        risk: Option<i64>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let overrides = CardOverrides {
        backend_url: cli.backend_url,
        pairs: cli.pairs,
        bind_port: match &cli.command {
            Commands::Serve { port } => *port,
            _ => None,
        },
    };
    let config = CardConfig::load(&cli.config, overrides)?;

    match cli.command {
        Commands::Serve { .. } => {
            serve(config).await?;
        }
        Commands::Status { json } => {
            show_status(config, json).await?;
        }
        Commands::Start { autotrade } => {
            run_command(config, Command::Start { autotrade }).await?;
        }
        Commands::Stop => {
            run_command(config, Command::Stop).await?;
        }
        Commands::Buy { pair, amount } => {
            run_command(config, Command::Buy { pair, amount }).await?;
        }
        Commands::Sell { pair, package_id } => {
            run_command(config, Command::Sell { pair, package_id }).await?;
        }
        Commands::SaveConfig { min_profit, hysteresis, drawdown, min_trades, base_package, multiplier, lookback } => {
            let edits = render::CardForm {
                min_profit,
                hysteresis,
                drawdown,
                min_trades,
                base_package,
                multiplier,
                lookback,
                ..render::CardForm::default()
            };
            save_config(config, edits).await?;
        }
        Commands::ClearAlerts => {
            run_command(config, Command::ClearAlerts).await?;
        }
        Commands::Autotrade { enabled } => {
            run_command(config, Command::SetAutotrade { flag: enabled }).await?;
        }
        Commands::Pairs => {
            show_pairs(config).await?;
        }
        Commands::PairConfig { pair, allowed, risk } => {
            let update = PairConfigUpdate::new(pair, allowed, risk);
            run_command(config, Command::UpdatePairConfig(update)).await?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn serve(config: CardConfig) -> Result<()> {
    let port = config.bind_port;
    let widget = Arc::new(Widget::connect(config)?);
    widget.mount();

    let result = start_card_server(AppState::new(widget.clone()), port).await;
    widget.unmount();
    result
}

/// One refresh, printed. Exits non-zero when the cycle failed.
async fn show_status(config: CardConfig, json: bool) -> Result<()> {
    let widget = Widget::connect(config)?;
    let view = widget.refresh().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*view)?);
    } else {
        println!("{}", render::summary(&view, widget.config()));
    }

    match view.error() {
        Some(e) => Err(anyhow!("refresh failed: {}", e)),
        None => Ok(()),
    }
}

/// Refresh, dispatch, refresh again and print the resulting card.
async fn run_command(config: CardConfig, command: Command) -> Result<()> {
    let widget = Widget::connect(config)?;
    widget.refresh().await?;

    let response = widget.dispatch(&command).await?;
    info!("{} accepted: {}", command.name(), response);

    println!("{}", render::summary(&*widget.view().await, widget.config()));
    Ok(())
}

async fn save_config(config: CardConfig, edits: render::CardForm) -> Result<()> {
    let widget = Widget::connect(config)?;
    let view = widget.refresh().await?;
    if let Some(e) = view.error() {
        return Err(anyhow!("cannot read current config: {}", e));
    }

    let current = view.config().cloned().unwrap_or_default().with_fallbacks();
    let base = ConfigForm::from_values(&current);
    let form = ConfigForm {
        min_profit: edits.min_profit.unwrap_or(base.min_profit),
        hysteresis: edits.hysteresis.unwrap_or(base.hysteresis),
        drawdown: edits.drawdown.unwrap_or(base.drawdown),
        min_trades: edits.min_trades.unwrap_or(base.min_trades),
        base_package: edits.base_package.unwrap_or(base.base_package),
        multiplier: edits.multiplier.unwrap_or(base.multiplier),
        lookback: edits.lookback.unwrap_or(base.lookback),
    };

    let response = widget.dispatch(&Command::SaveConfig(form)).await?;
    info!("Config saved: {}", response);
    println!("{}", render::summary(&*widget.view().await, widget.config()));
    Ok(())
}

async fn show_pairs(config: CardConfig) -> Result<()> {
    let widget = Widget::connect(config)?;
    let pairs = widget.pair_configs().await?;

    println!("{:<10} {:<8} {}", "PAIR", "ALLOWED", "RISK");
    for pair in pairs {
        println!(
            "{:<10} {:<8} {}",
            pair.pair,
            pair.allowed.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
            pair.risk_level.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}
