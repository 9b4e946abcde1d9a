//! ycp
//!
//! Reads live stream comments, counts repeated letters or configured words
//! per pattern and "types" a letter whenever a counter passes its limit.

mod config;
mod shutdown;
mod ui;

use clap::Parser;
use config::file::StoreBackend;
use config::{ConfigLoader, LoadedConfig, RunOverrides};
use shutdown::shutdown_signal;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use ycp_core::comment_log::{CommentLog, ConsoleCommentLog, FileCommentLog};
use ycp_core::processors::IngestionPipeline;
use ycp_core::sources::{self, CommentStream};
use ycp_core::store::{CounterStore, MemoryCounterStore, PgCounterStore};
use ycp_core::utils::log_file_name::comment_log_file_name;

/// ycp - live comment threshold engine
#[derive(Parser, Debug)]
#[command(name = "ycp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./ycp-config.toml", env = "YCP_CONFIG")]
    config: PathBuf,

    /// Development mode: in-memory counters, comments echoed to the console
    #[arg(long, default_value = "false")]
    dev: bool,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Read comments line by line from a file ("-" for stdin) instead of the
    /// built-in mock comments
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Start reading immediately instead of waiting for Enter
    #[arg(long, default_value = "false")]
    no_wait: bool,

    /// Print the final report as JSON
    #[arg(long, default_value = "false")]
    json: bool,

    /// Emit diagnostics as JSON lines
    #[arg(long, default_value = "false", env = "YCP_LOG_JSON")]
    log_json: bool,

    /// Override the initial action budget
    #[arg(long, env = "TOTAL_LIMIT")]
    total_limit: Option<u64>,

    /// Override the time limit, in seconds
    #[arg(long, env = "TIME_LIMIT")]
    time_limit: Option<u64>,

    /// Override the comment that ends the run
    #[arg(long, env = "FINAL_COMMENT")]
    final_comment: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting ycp v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(
        &args.config,
        RunOverrides {
            total_limit: args.total_limit,
            time_limit_secs: args.time_limit,
            final_comment: args.final_comment.clone(),
            memory_store: args.dev,
        },
    );
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let store = connect_store(&loaded_config, args.migrate).await?;
    let comment_log = open_comment_log(args.dev).await?;
    let reads_stdin = args.input.as_deref().is_some_and(|p| p.as_os_str() == "-");
    let source = open_source(args.input.as_deref(), &loaded_config).await?;

    let wait = !args.no_wait && !reads_stdin;
    ui::display_home_screen(&loaded_config, wait);
    if wait {
        ui::wait_for_enter().await?;
        ui::clear_console();
    }

    let pipeline = IngestionPipeline::new(
        &loaded_config.run,
        store.clone(),
        comment_log,
        Arc::new(ui::print_letter),
    );
    let result = pipeline.run(source, shutdown_signal()).await;

    // Close store connections gracefully
    tracing::info!("Closing counter store...");
    store.close().await;

    let report = result.map_err(|e| {
        tracing::error!("Run failed: {}", e);
        e
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::display_final_screen(&report);
    }

    tracing::info!(run_id = %report.run_id, "ycp finished");
    Ok(())
}

/// Build the counter store selected by the configuration.
async fn connect_store(
    config: &LoadedConfig,
    migrate: bool,
) -> anyhow::Result<Arc<dyn CounterStore>> {
    let database_url = match (config.store.backend, &config.store.database_url) {
        (StoreBackend::Memory, _) => {
            tracing::info!("Using in-memory counter store");
            return Ok(Arc::new(MemoryCounterStore::new()));
        }
        (StoreBackend::Postgres, Some(url)) => url,
        (StoreBackend::Postgres, None) => {
            return Err(config::ConfigError::MissingDatabaseUrl.into());
        }
    };

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.store.max_connections)
        .acquire_timeout(config.run.store_op_timeout)
        .connect(database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    Ok(Arc::new(PgCounterStore::new(db_pool)))
}

/// Console log in dev mode, otherwise a fresh timestamped file.
async fn open_comment_log(dev: bool) -> anyhow::Result<Arc<dyn CommentLog>> {
    if dev {
        return Ok(Arc::new(ConsoleCommentLog));
    }

    let file_name = comment_log_file_name(time::OffsetDateTime::now_utc());
    let log = FileCommentLog::create(&file_name).await.map_err(|e| {
        tracing::error!("Failed to create comment log {}: {}", file_name, e);
        e
    })?;
    tracing::info!("Logging comments to {:?}", log.path());
    Ok(Arc::new(log))
}

async fn open_source(
    input: Option<&std::path::Path>,
    config: &LoadedConfig,
) -> anyhow::Result<CommentStream> {
    let pacing = config.source.pacing;
    let Some(path) = input else {
        tracing::info!("Reading built-in mock comments");
        return Ok(sources::mock_comments(pacing));
    };

    if path.as_os_str() == "-" {
        tracing::info!("Reading comments from stdin");
        return Ok(sources::from_lines(
            tokio::io::BufReader::new(tokio::io::stdin()),
            pacing,
        ));
    }

    let file = tokio::fs::File::open(path).await.map_err(|e| {
        tracing::error!("Failed to open comment input {:?}: {}", path, e);
        e
    })?;
    tracing::info!("Reading comments from {:?}", path);
    Ok(sources::from_lines(tokio::io::BufReader::new(file), pacing))
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

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
