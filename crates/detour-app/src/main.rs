//! Detour - routes forced sites through a security proxy.
//!
//! Runs the local API that the browser-side shim reports navigation events
//! to, keeps the redirect engine in step with the stored settings, and logs
//! to a daily rotating file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use detour_core::{LoopGuard, MarkerStore, ProxyPrefix, RedirectEngine, DEFAULT_PROXY_PREFIX};
use detour_server::{
    ApiToken, AppState, Server, ServerConfig, SettingsCache, DEFAULT_HOST, DEFAULT_PORT,
};
use detour_storage::{Database, PersistentMarkers};

/// Change-log rows kept when the heartbeat trims the table.
const STATE_CHANGES_KEEP: i64 = 1000;

/// File next to the database that holds the generated API token.
const TOKEN_FILE: &str = "api-token";

/// Detour - security-proxy redirector
#[derive(Parser, Debug)]
#[command(name = "detour", version, about)]
struct Args {
    /// Address to bind the API server to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind the API server to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Database file (default: platform data directory)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Security-proxy URL prefix
    #[arg(long, default_value = DEFAULT_PROXY_PREFIX)]
    proxy_prefix: String,

    /// Keep redirect markers in the database instead of memory
    #[arg(long)]
    persist_markers: bool,

    /// Token required on settings writes (default: generated and written
    /// next to the database)
    #[arg(long)]
    api_token: Option<String>,

    /// How often to check storage for settings changes, in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// Keep-alive heartbeat period, in seconds
    #[arg(long, default_value_t = 60)]
    heartbeat_secs: u64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "detour", "detour").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("detour={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("detour")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

/// Open the settings database.
fn open_database(args: &Args) -> Result<Database> {
    let db = match &args.db_path {
        Some(path) => Database::with_path(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?,
        None => Database::new().context("failed to open database")?,
    };

    if db.ensure_defaults()? {
        tracing::info!("First run, redirection enabled by default");
    }

    Ok(db)
}

/// Resolve the API token.
///
/// A generated token is written to `api-token` next to the database so the
/// extension's options page can be given it. The token itself is never logged.
fn api_token(args: &Args) -> Result<ApiToken> {
    if let Some(token) = &args.api_token {
        ensure!(!token.is_empty(), "--api-token must not be empty");
        return Ok(ApiToken::from_string(token.clone()));
    }

    let db_path = match &args.db_path {
        Some(path) => path.clone(),
        None => Database::default_db_path()?,
    };
    let dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let token = ApiToken::generate();
    let path = write_token(dir, &token)?;
    tracing::info!("API token written to {:?}", path);
    Ok(token)
}

fn write_token(dir: &Path, token: &ApiToken) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(TOKEN_FILE);
    std::fs::write(&path, token.as_str())
        .with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict {}", path.display()))?;
    }

    Ok(path)
}

/// Choose the marker store.
///
/// Persisted markers outlive the sessions they belong to, so the table is
/// emptied before the engine starts.
fn marker_store(args: &Args, db: &Database) -> Result<Arc<dyn MarkerStore>> {
    if args.persist_markers {
        let stale = db
            .clear_all_session_markers()
            .context("failed to clear stale redirect markers")?;
        if stale > 0 {
            tracing::info!(stale, "Cleared redirect markers from a previous run");
        }
        Ok(Arc::new(PersistentMarkers::new(db.clone())))
    } else {
        Ok(Arc::new(LoopGuard::new()))
    }
}

/// Periodic keep-alive tick; also trims the settings change log.
async fn heartbeat(db: Arc<Database>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        tracing::trace!("Heartbeat");

        match db.cleanup_old_changes(STATE_CHANGES_KEEP) {
            Ok(0) => {}
            Ok(deleted) => tracing::debug!(deleted, "Trimmed settings change log"),
            Err(e) => tracing::warn!("Failed to trim settings change log: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args);

    tracing::info!("Detour v{} starting", env!("CARGO_PKG_VERSION"));

    let prefix = ProxyPrefix::new(&args.proxy_prefix).context("invalid --proxy-prefix")?;
    let db = open_database(&args)?;
    let markers = marker_store(&args, &db)?;
    let token = api_token(&args)?;

    tracing::info!(
        prefix = %prefix,
        persist_markers = args.persist_markers,
        "Redirect engine configured"
    );

    let db = Arc::new(db);
    let engine = Arc::new(RedirectEngine::new(prefix, markers));
    let settings = Arc::new(SettingsCache::with_poll_interval(
        db.clone(),
        engine.clone(),
        Duration::from_millis(args.poll_interval_ms.max(1)),
    ));

    // Loads the stored settings into the engine
    let state = AppState::with_components(db.clone(), engine.clone(), settings.clone(), token);
    tracing::info!(
        enabled = engine.is_enabled(),
        patterns = engine.policy().len(),
        "Settings loaded"
    );

    tokio::spawn(settings.start_polling());
    tokio::spawn(heartbeat(db, Duration::from_secs(args.heartbeat_secs.max(1))));

    let config = ServerConfig::default()
        .with_host(args.host.clone())
        .with_port(args.port);
    let server = Server::with_state(config, state).context("failed to configure API server")?;

    tokio::select! {
        result = server.run() => result.context("API server failed")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown requested"),
    }

    tracing::info!("Detour stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::try_parse_from(["detour"]).unwrap();

        assert_eq!(args.host, DEFAULT_HOST);
        assert_eq!(args.port, DEFAULT_PORT);
        assert_eq!(args.proxy_prefix, DEFAULT_PROXY_PREFIX);
        assert_eq!(args.poll_interval_ms, 500);
        assert_eq!(args.heartbeat_secs, 60);
        assert!(!args.persist_markers);
        assert!(args.db_path.is_none());
        assert!(args.api_token.is_none());
    }

    #[test]
    fn args_overrides() {
        let args = Args::try_parse_from([
            "detour",
            "--port",
            "9000",
            "--persist-markers",
            "--proxy-prefix",
            "https://proxy.example.net/",
            "--db-path",
            "/tmp/detour-test.db",
        ])
        .unwrap();

        assert_eq!(args.port, 9000);
        assert!(args.persist_markers);
        assert_eq!(args.proxy_prefix, "https://proxy.example.net/");
        assert_eq!(args.db_path, Some(PathBuf::from("/tmp/detour-test.db")));
    }

    #[test]
    fn persisted_marker_store_starts_empty() {
        let db = Database::in_memory().unwrap();
        db.mark_session(1).unwrap();
        let args = Args::try_parse_from(["detour", "--persist-markers"]).unwrap();

        let store = marker_store(&args, &db).unwrap();

        assert!(!db.consume_session_marker(1).unwrap());
        store.mark(2).unwrap();
        assert!(db.consume_session_marker(2).unwrap());
    }

    #[test]
    fn in_memory_marker_store_leaves_database_alone() {
        let db = Database::in_memory().unwrap();
        db.mark_session(1).unwrap();
        let args = Args::try_parse_from(["detour"]).unwrap();

        let store = marker_store(&args, &db).unwrap();
        store.mark(2).unwrap();

        assert!(db.consume_session_marker(1).unwrap());
        assert!(!db.consume_session_marker(2).unwrap());
    }

    #[test]
    fn explicit_api_token_is_used() {
        let args = Args::try_parse_from(["detour", "--api-token", "abc123"]).unwrap();
        assert!(api_token(&args).unwrap().verify("abc123"));

        let args = Args::try_parse_from(["detour", "--api-token", ""]).unwrap();
        assert!(api_token(&args).is_err());
    }

    #[test]
    fn generated_api_token_is_written_next_to_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("detour.db");
        let args =
            Args::try_parse_from(["detour", "--db-path", db_path.to_str().unwrap()]).unwrap();

        let token = api_token(&args).unwrap();

        let stored = std::fs::read_to_string(dir.path().join("data").join(TOKEN_FILE)).unwrap();
        assert!(token.verify(&stored));
    }
}
