use clap::{Parser, Subcommand};
use papertrade_core::{AppConfig, ConfigLoader, EventTag};
use papertrade_data::DatabaseClient;
use rust_decimal::Decimal;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

mod wiring;

const EXIT_OK: u8 = 0;
const EXIT_STARTUP: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_CANCELLED: u8 = 3;

#[derive(Parser)]
#[command(name = "papertrade")]
#[command(about = "Intraday crypto paper-trading daemon", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database, record starting cash, and warm up history
    Init {
        /// Starting cash in USD
        #[arg(long, default_value = "10000")]
        nav: String,
    },
    /// Run the trading daemon
    Run,
    /// Show NAV and open positions
    Status,
    /// Show recent event-log entries
    Logs {
        #[arg(long, default_value_t = 50)]
        limit: i64,
        /// Filter by level (INFO, WARN, ERROR)
        #[arg(long)]
        level: Option<String>,
        /// Filter by tag (CYCLE, TRADE, RISK, ...)
        #[arg(long)]
        tag: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match ConfigLoader::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let code = match cli.command {
        Commands::Init { nav } => cmd_init(&config, &nav).await,
        Commands::Run => cmd_run(config).await,
        Commands::Status => cmd_status(&config).await,
        Commands::Logs { limit, level, tag } => cmd_logs(&config, limit, level, tag).await,
    };
    ExitCode::from(code)
}

async fn connect(config: &AppConfig) -> Option<DatabaseClient> {
    match DatabaseClient::connect(&config.database.url, config.database.max_connections).await {
        Ok(db) => Some(db),
        Err(e) => {
            tracing::error!("database unreachable: {e:#}");
            None
        }
    }
}

async fn cmd_init(config: &AppConfig, nav: &str) -> u8 {
    let Ok(starting_cash) = Decimal::from_str(nav) else {
        tracing::error!("--nav '{nav}' is not a decimal amount");
        return EXIT_CONFIG;
    };
    if starting_cash <= Decimal::ZERO {
        tracing::error!("--nav must be positive");
        return EXIT_CONFIG;
    }

    let Some(db) = connect(config).await else {
        return EXIT_STARTUP;
    };
    let exchange = match wiring::exchange(config) {
        Ok(exchange) => exchange,
        Err(e) => {
            tracing::error!("exchange adapter: {e:#}");
            return EXIT_CONFIG;
        }
    };

    match papertrade_orchestrator::initialize(
        &db,
        exchange.as_ref(),
        config,
        starting_cash,
        chrono::Utc::now(),
    )
    .await
    {
        Ok(()) => {
            println!("Initialized with NAV ${starting_cash}");
            EXIT_OK
        }
        Err(e) => {
            tracing::error!("init failed: {e:#}");
            EXIT_STARTUP
        }
    }
}

async fn cmd_run(config: AppConfig) -> u8 {
    let Some(db) = connect(&config).await else {
        return EXIT_STARTUP;
    };
    if let Err(e) = db.migrate().await {
        tracing::error!("schema migration failed: {e:#}");
        return EXIT_STARTUP;
    }

    let runner = match wiring::runner(db, config) {
        Ok(runner) => Arc::new(runner),
        Err(e) => {
            tracing::error!("configuration error: {e:#}");
            return EXIT_CONFIG;
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing the current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    runner.run_forever(shutdown_rx).await;

    // Give in-flight event writes a moment before the pool drops.
    tokio::time::sleep(Duration::from_millis(100)).await;
    EXIT_CANCELLED
}

async fn cmd_status(config: &AppConfig) -> u8 {
    let Some(db) = connect(config).await else {
        return EXIT_STARTUP;
    };
    let pool = db.pool().clone();
    let nav = papertrade_data::NavRepository::new(pool.clone());
    let positions = papertrade_data::PositionRepository::new(pool);

    match nav.latest().await {
        Ok(Some(row)) => {
            println!("NAV: ${}", row.nav_usd.round_dp(2));
            println!("Realized PnL: ${}", row.realized_pnl.round_dp(2));
            println!("Unrealized PnL: ${}", row.unrealized_pnl.round_dp(2));
            println!("Drawdown: {:.2}%", row.dd_pct * 100.0);
            println!("As of: {}", row.ts.to_rfc3339());
        }
        Ok(None) => println!("No NAV snapshot yet. Run init first."),
        Err(e) => {
            tracing::error!("status query failed: {e:#}");
            return EXIT_STARTUP;
        }
    }

    match positions.all().await {
        Ok(rows) => {
            println!("\nPositions: {}", rows.len());
            for position in rows {
                println!(
                    "  {}: {} {} @ ${}, stop {}",
                    position.symbol,
                    position.qty,
                    position.side,
                    position.avg_price.round_dp(2),
                    position
                        .stop
                        .map_or("-".to_string(), |s| format!("${}", s.round_dp(2))),
                );
            }
            EXIT_OK
        }
        Err(e) => {
            tracing::error!("status query failed: {e:#}");
            EXIT_STARTUP
        }
    }
}

async fn cmd_logs(config: &AppConfig, limit: i64, level: Option<String>, tag: Option<String>) -> u8 {
    let tag = match tag {
        None => None,
        Some(raw) => match EventTag::parse(&raw) {
            Some(tag) => Some(tag),
            None => {
                tracing::error!("unknown tag '{raw}'");
                return EXIT_CONFIG;
            }
        },
    };

    let Some(db) = connect(config).await else {
        return EXIT_STARTUP;
    };
    let events = papertrade_data::EventRepository::new(db.pool().clone());

    match events.recent(limit, level.as_deref(), tag).await {
        Ok(rows) => {
            for row in rows {
                println!(
                    "{} [{}] {} {} {} {}",
                    row.ts.to_rfc3339(),
                    row.level,
                    row.tags.join(","),
                    row.symbol.unwrap_or_else(|| "-".to_string()),
                    row.action.unwrap_or_else(|| "-".to_string()),
                    row.payload
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "{}".to_string()),
                );
            }
            EXIT_OK
        }
        Err(e) => {
            tracing::error!("logs query failed: {e:#}");
            EXIT_STARTUP
        }
    }
}
