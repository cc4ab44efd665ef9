//! CLI entry point for the online bus tracker.
//!
//! `serve` runs the JSON API; `routes` and `vehicles` are one-shot commands
//! for checking static data and the live feed from a terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use online_bus_tracker::api::{AppState, VehiclesResponse, create_router};
use online_bus_tracker::config::{FeedArgs, StaticArgs};
use online_bus_tracker::feed::Snapshot;
use online_bus_tracker::reconcile::reconcile;
use online_bus_tracker::static_data::RouteIndex;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "online_bus_tracker")]
#[command(about = "Live transit vehicle positions over a JSON API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve /getRoutes and /getVehicles
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "LISTEN_ADDR", default_value = "localhost:8080")]
        listen: String,

        #[command(flatten)]
        static_data: StaticArgs,

        #[command(flatten)]
        feed: FeedArgs,
    },
    /// Load the static data and list its routes
    Routes {
        #[command(flatten)]
        static_data: StaticArgs,
    },
    /// Reconcile one snapshot and print the /getVehicles body
    Vehicles {
        /// Read the snapshot from this protobuf file instead of the live feed
        #[arg(short, long, value_name = "FILE")]
        source: Option<String>,

        /// Only show vehicles on this route short name
        #[arg(short, long)]
        route: Option<String>,

        #[command(flatten)]
        static_data: StaticArgs,

        #[command(flatten)]
        feed: FeedArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/online_bus_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("online_bus_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            static_data,
            feed,
        } => {
            let index = RouteIndex::load(&static_data.static_dir).context("Failed to read routes")?;
            let feed = feed.live_feed()?;
            serve(&listen, AppState::new(index, feed)).await?;
        }
        Commands::Routes { static_data } => {
            let index = RouteIndex::load(&static_data.static_dir).context("Failed to read routes")?;

            let routes = index.sorted_routes();

            for route in &routes {
                let mut directions: Vec<_> = route.directions().collect();
                directions.sort_by_key(|d| d.id);
                let directions: Vec<_> = directions.iter().map(|d| d.text.as_str()).collect();

                info!(
                    route_id = %route.id,
                    short_name = %route.short_name,
                    long_name = %route.long_name,
                    ?directions,
                    "Route"
                );
            }

            let without_directions = routes.iter().filter(|r| r.directions().next().is_none()).count();
            info!(total = routes.len(), without_directions, "Route list summary");
        }
        Commands::Vehicles {
            source,
            route,
            static_data,
            feed,
        } => {
            let index = RouteIndex::load(&static_data.static_dir).context("Failed to read routes")?;

            let snapshot = match source {
                Some(path) => {
                    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {path}"))?;
                    Snapshot::decode(&bytes)?
                }
                None => feed.live_feed()?.fetch_snapshot().await?,
            };

            let route_filter = route.as_deref().filter(|r| !r.is_empty());
            let vehicles = reconcile(&snapshot, &index, route_filter)?;
            info!(
                entities = snapshot.entities().len(),
                vehicles = vehicles.len(),
                age_secs = snapshot.age().map(|age| age.num_seconds()),
                "Snapshot reconciled"
            );

            println!("{}", serde_json::to_string_pretty(&VehiclesResponse { vehicles })?);
        }
    }

    Ok(())
}

/// Binds `listen` and serves the API until Ctrl-C.
#[tracing::instrument(skip(state), fields(routes = state.index.len(), feed = %state.feed.url()))]
async fn serve(listen: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;

    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Failed to start http server")?;

    Ok(())
}
