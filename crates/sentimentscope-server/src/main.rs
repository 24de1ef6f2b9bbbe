//! SentimentScope
//!
//! Smartphone review analytics: import reviews, classify their sentiment,
//! model per-phone topics and serve the results over HTTP.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use metrics_exporter_prometheus::PrometheusHandle;
use sentimentscope_server::{
    create_pipeline_router, create_query_router, pipeline, AppConfig, AppState, ConfigOverrides,
    Models,
};
use sentimentscope_store::Store;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sentimentscope")]
#[command(author, version, about = "Smartphone review sentiment and topic analytics", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "sentimentscope.yaml", env = "SENTIMENTSCOPE_CONFIG")]
    config: PathBuf,

    /// SQLite database file
    #[arg(short, long, env = "SENTIMENTSCOPE_DATABASE")]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the query and/or pipeline APIs
    Serve {
        /// Which surfaces to run
        #[arg(long, value_enum, default_value_t = Surface::All)]
        surface: Surface,

        /// Listen address
        #[arg(long, env = "SENTIMENTSCOPE_HOST")]
        host: Option<String>,

        /// Query API port
        #[arg(long, env = "SENTIMENTSCOPE_QUERY_PORT")]
        query_port: Option<u16>,

        /// Pipeline API port
        #[arg(long, env = "SENTIMENTSCOPE_PIPELINE_PORT")]
        pipeline_port: Option<u16>,

        /// Start without loading the analysis models
        #[arg(long)]
        skip_models: bool,
    },

    /// Import reviews from a CSV file
    Import {
        /// File with brand_name, phone_name and review_text columns
        file: PathBuf,

        /// Field delimiter
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },

    /// Run an analysis pass and print the result as JSON
    Process {
        #[arg(value_enum, default_value_t = Pass::All)]
        pass: Pass,
    },

    /// Create the database schema
    InitDb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Surface {
    All,
    Query,
    Pipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pass {
    Sentiment,
    Topics,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    let mut overrides = ConfigOverrides {
        database: cli.database.clone(),
        ..Default::default()
    };
    if let Commands::Serve {
        host,
        query_port,
        pipeline_port,
        skip_models,
        ..
    } = &cli.command
    {
        overrides.host = host.clone();
        overrides.query_port = *query_port;
        overrides.pipeline_port = *pipeline_port;
        overrides.skip_models = *skip_models;
    }

    let config = AppConfig::load(&cli.config, &overrides)?;
    info!("Configuration loaded");
    info!("Database: {}", config.database.path.display());

    match cli.command {
        Commands::InitDb => {
            Store::connect(&config.database).await?;
            info!("Database schema ready");
        }
        Commands::Import { file, delimiter } => {
            if !delimiter.is_ascii() {
                anyhow::bail!("delimiter must be an ASCII character");
            }
            let store = Store::connect(&config.database).await?;
            let reader = std::fs::File::open(&file)?;
            info!("Importing reviews from {}", file.display());
            let report = pipeline::import_reviews(&store, reader, delimiter as u8).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Process { pass } => {
            let metrics_handle = init_metrics()?;
            let state = build_state(config, metrics_handle).await?;
            let output = match pass {
                Pass::Sentiment => serde_json::to_value(pipeline::run_sentiment_pass(&state).await?)?,
                Pass::Topics => serde_json::to_value(pipeline::run_topic_pass(&state).await?)?,
                Pass::All => serde_json::to_value(pipeline::run_all(&state).await?)?,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Serve { surface, .. } => {
            let metrics_handle = init_metrics()?;
            let state = build_state(config, metrics_handle).await?;
            serve(state, surface).await?;
        }
    }

    Ok(())
}

async fn build_state(config: AppConfig, metrics_handle: PrometheusHandle) -> Result<AppState> {
    let store = Store::connect(&config.database).await?;

    info!("Loading analysis models...");
    let models = Models::load(&config.models, &config.pipeline).await;
    let loaded = models.loaded();
    info!(
        sentiment = loaded.sentiment,
        embedding = loaded.embedding,
        tagger = loaded.tagger,
        "Models initialized"
    );

    Ok(AppState::new(config, store, models, metrics_handle))
}

/// Run the selected surfaces until a shutdown signal arrives
async fn serve(state: AppState, surface: Surface) -> Result<()> {
    let server = &state.config.server;
    let mut tasks = tokio::task::JoinSet::new();

    if matches!(surface, Surface::All | Surface::Query) {
        let addr: SocketAddr = format!("{}:{}", server.host, server.query_port).parse()?;
        let app = create_query_router(state.clone());
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Query API listening on http://{}", addr);
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });
    }

    if matches!(surface, Surface::All | Surface::Pipeline) {
        let addr: SocketAddr = format!("{}:{}", server.host, server.pipeline_port).parse()?;
        let app = create_pipeline_router(state.clone());
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Pipeline API listening on http://{}", addr);
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("sentimentscope=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sentimentscope=info,tower_http=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "sentimentscope_requests_total",
        "Total number of HTTP requests by surface, route and status"
    );
    metrics::describe_counter!(
        "sentimentscope_reviews_classified_total",
        "Reviews assigned a sentiment, by label"
    );
    metrics::describe_counter!(
        "sentimentscope_classification_errors_total",
        "Reviews whose classification failed"
    );
    metrics::describe_histogram!(
        "sentimentscope_classification_latency_us",
        metrics::Unit::Microseconds,
        "Sentiment model latency in microseconds"
    );
    metrics::describe_counter!(
        "sentimentscope_topics_created_total",
        "Topics stored by the topic pass"
    );
    metrics::describe_counter!(
        "sentimentscope_topic_fit_failures_total",
        "Phones for which every topic modeling attempt failed"
    );
    metrics::describe_counter!(
        "sentimentscope_reviews_imported_total",
        "Reviews inserted by CSV import"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
