//! Teen Patti room server.
//!
//! Spawns room actors on demand through a RoomManager and serves them over
//! REST and WebSocket. Coins live in PostgreSQL when `DATABASE_URL` is set,
//! otherwise in an in-memory ledger.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use ctrlc::set_handler;
use pico_args::Arguments;
use teen_patti::{
    db::Database,
    history::{EventSink, LogEventSink, PgEventSink},
    ledger::{Ledger, MemoryLedger, PgLedger},
    room::RoomManager,
};
use tokio::sync::watch;
use tp_server::{
    api::{self, auth::TokenVerifier},
    config::ServerConfig,
    logging, metrics,
};
use tracing::{info, warn};

const HELP: &str = "\
Run the Teen Patti room server

USAGE:
  tp_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, in-memory ledger if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               Secret shared with the identity service (required)
  METRICS_BIND             Prometheus exporter address (e.g., 0.0.0.0:9090)
  DEFAULT_BALANCE          Opening balance on the in-memory ledger
  ROOM_*                   Room settings (ROOM_BOOT_AMOUNT, ROOM_TURN_TIMEOUT_SECS, ...)
  (Any of these may also be set in a .env file)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    // Catching signals for exit.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics at http://{}/metrics", addr);
    }

    let (database, ledger, history): (Option<Database>, Arc<dyn Ledger>, Arc<dyn EventSink>) =
        match &config.database {
            Some(db_config) => {
                let db = Database::new(db_config)
                    .await
                    .context("Failed to connect to database")?;
                info!("Database connected successfully");

                let ledger: Arc<dyn Ledger> = Arc::new(PgLedger::new(db.pool()));
                let history: Arc<dyn EventSink> = Arc::new(PgEventSink::spawn(db.pool()));
                (Some(db), ledger, history)
            }
            None => {
                warn!(
                    "No DATABASE_URL; using the in-memory ledger with {} coins per user",
                    config.default_balance
                );
                let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new(config.default_balance));
                let history: Arc<dyn EventSink> = Arc::new(LogEventSink);
                (None, ledger, history)
            }
        };

    let room_manager = Arc::new(RoomManager::new(config.room.clone(), ledger, history));

    let state = api::AppState {
        room_manager: room_manager.clone(),
        verifier: Arc::new(TokenVerifier::new(&config.security.jwt_secret)),
        database: database.clone(),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx, room_manager.clone()))
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Resolves once Ctrl+C or SIGTERM arrives, after closing every room so
/// open WebSockets are released.
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>, rooms: Arc<RoomManager>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
    info!("Shutdown requested, closing {} rooms", rooms.room_count().await);
    rooms.shutdown().await;
}
