use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use clap::Parser;
use eventide_core::{config::EventideConfig, Clock, SystemClock};
use rusqlite::Connection;
use tracing::{info, warn};

mod app;
mod dto;
mod http;
mod validate;

#[derive(Debug, Parser)]
#[command(name = "eventide-gateway", version, about = "Scheduled event service")]
struct Cli {
    /// Path to eventide.toml. Falls back to EVENTIDE_CONFIG, then ~/.eventide/eventide.toml.
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "eventide_gateway=info,eventide_scheduler=info,eventide_users=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    // load config: --config > EVENTIDE_CONFIG env > ~/.eventide/eventide.toml
    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("EVENTIDE_CONFIG").ok());
    let config = EventideConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        EventideConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let tick_interval = config.scheduler.tick_interval();

    let db_path = expand_home(&config.database.path);
    ensure_parent_dir(&db_path)?;
    info!(path = %db_path, "opening SQLite database");

    // run schema migrations (idempotent); users first for the foreign key
    {
        let db = open_db(&db_path)?;
        eventide_users::db::init_db(&db)?;
        eventide_scheduler::db::init_db(&db)?;
    }
    info!("database migrations complete");

    // each component gets its own connection
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let users = eventide_users::UserDirectory::new(Arc::new(Mutex::new(open_db(&db_path)?)));
    let events = eventide_scheduler::EventService::new(
        Arc::new(Mutex::new(open_db(&db_path)?)),
        clock.clone(),
    );
    let scheduler = eventide_scheduler::ExecutionScheduler::new(
        Arc::new(Mutex::new(open_db(&db_path)?)),
        clock,
        tick_interval,
    );

    let state = Arc::new(app::AppState::new(config, users, events));
    let router = app::build_router(state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Eventide gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // signal scheduler to stop and wait for any in-flight tick
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_task.await {
        warn!("scheduler task ended abnormally: {e}");
    }
    info!("shutdown complete");
    Ok(())
}

/// Open a connection with the pragmas every component relies on.
/// Foreign keys are per-connection in SQLite; the user cascade needs them on.
fn open_db(path: &str) -> rusqlite::Result<Connection> {
    let db = Connection::open(path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;
    Ok(db)
}

fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            format!("{home}/{rest}")
        }
        None => path.to_string(),
    }
}

fn ensure_parent_dir(path: &str) -> eventide_core::Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        assert_eq!(expand_home("/var/lib/eventide.db"), "/var/lib/eventide.db");
        assert!(!expand_home("~/eventide.db").starts_with('~'));
    }

    #[test]
    fn ensure_parent_dir_reports_io_failures() {
        let blocker = std::env::temp_dir().join(format!("eventide-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"").unwrap();
        let db_path = blocker.join("data").join("eventide.db");

        let err = ensure_parent_dir(db_path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, eventide_core::EventideError::Io(_)));
        assert_eq!(err.code(), "IO_ERROR");

        std::fs::remove_file(&blocker).unwrap();
    }

    #[test]
    fn cli_accepts_config_flag() {
        let cli = Cli::parse_from(["eventide-gateway", "--config", "/etc/eventide.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/etc/eventide.toml"));
    }
}
