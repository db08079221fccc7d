use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use mc_domain::NetworkPolicy;
use mc_gateway::cli::{Cli, Command, ServeArgs};
use mc_gateway::jobs::JobQueue;
use mc_gateway::runtime::ChatEngine;
use mc_gateway::state::AppState;
use mc_gateway::api;
use mc_providers::{ModelCache, ProviderRegistry};
use mc_store::{ArtifactLayout, RunStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None => {
            init_tracing();
            run_server(ServeArgs {
                addr: "127.0.0.1:8787".into(),
                artifact_dir: "./data".into(),
                net: false,
                allow_domains: Vec::new(),
            })
            .await
        }
        Some(Command::Serve(args)) => {
            init_tracing();
            run_server(args).await
        }
        Some(Command::Version) => {
            println!("megachat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mc_gateway=debug")),
        )
        .init();
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    tracing::info!(artifact_dir = %args.artifact_dir, "megachat starting");

    let layout = ArtifactLayout::new(&args.artifact_dir);
    let store = Arc::new(RunStore::new(layout));
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let models = Arc::new(ModelCache::new());
    let jobs = Arc::new(JobQueue::new());
    let policy = NetworkPolicy::new(args.net, args.allow_domains.clone());

    tracing::info!(
        net_enabled = policy.net_enabled,
        allow_domains = ?policy.allow_domains,
        providers = ?registry.names(),
        "network policy and providers configured"
    );

    let engine = Arc::new(ChatEngine::new(store, registry, models, jobs, policy));

    // Keys may live in MEGACHAT/.env; load them before the first turn.
    engine.load_env_best_effort();

    let state = AppState { engine };
    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    tracing::info!(addr = %args.addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
