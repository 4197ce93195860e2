use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod cli;
mod error;
mod metrics;
mod models;
mod services;
mod state;

use cli::{CommandArgs, SinkKind};
use services::exporter::render_envelope;
use services::host_identity::resolve_identity;
use services::poller::collect;
use services::{
    Exporter, IdentityResolver, Lifecycle, LogSink, ProcessSource, Sink, StdoutSink,
    SysinfoIdentity, SysinfoSource,
};
use state::{new_state, RuntimeConfig};

/// How long queued snapshots may take to reach the sink on exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();

    let config = Arc::new(RuntimeConfig::new(
        args.auto_refresh,
        args.hide_default_processes,
        args.refresh_interval,
        args.search.clone(),
    ));
    let source: Arc<dyn ProcessSource> = Arc::new(SysinfoSource::new());
    let resolver: Arc<dyn IdentityResolver> = Arc::new(SysinfoIdentity::new(args.interface.clone()));

    if args.once {
        return run_once(&config, source, resolver).await;
    }

    let sink: Arc<dyn Sink> = match args.sink {
        SinkKind::Log => Arc::new(LogSink),
        SinkKind::Stdout => Arc::new(StdoutSink),
    };
    let (exporter, delivery_worker) = Exporter::spawn(sink, args.queue_capacity);

    let lifecycle = Arc::new(Lifecycle::new(config.clone(), source, resolver, exporter));
    lifecycle.start().await.context("Failed to start service")?;
    if !args.auto_refresh {
        config.set_auto_refresh(false);
        log::info!("Auto refresh disabled, enable it through PUT /api/config");
    }

    print_banner(&args);

    let bind_address = format!("{}:{}", args.address, args.port);
    let data = web::Data::new(new_state(config, lifecycle.clone()));

    // actix-web stops the server on SIGINT / SIGTERM
    let served = HttpServer::new(move || App::new().app_data(data.clone()).configure(api::routes))
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await;

    lifecycle.shutdown().await;
    match tokio::time::timeout(DRAIN_TIMEOUT, delivery_worker).await {
        Ok(Ok(())) => log::info!("Delivery queue drained"),
        Ok(Err(e)) => log::error!("Delivery worker ended abnormally: {}", e),
        Err(_) => log::warn!(
            "Delivery queue not drained after {} seconds, remaining snapshots dropped",
            DRAIN_TIMEOUT.as_secs()
        ),
    }
    served.context("Control API failed")
}

async fn run_once(
    config: &RuntimeConfig,
    source: Arc<dyn ProcessSource>,
    resolver: Arc<dyn IdentityResolver>,
) -> anyhow::Result<()> {
    let identity = resolve_identity(resolver)
        .await
        .context("Failed to resolve host identity")?;
    let processes = collect(source, &config.view())
        .await
        .context("Failed to take snapshot")?;
    log::info!("{} running processes", processes.len());

    let payload = render_envelope(&identity, processes)?;
    StdoutSink.deliver(&payload);
    Ok(())
}

fn print_banner(args: &CommandArgs) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Process Agent v{:<38}║", env!("CARGO_PKG_VERSION"));
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Control API on http://{}:{}", args.address, args.port);
    println!("⏱  Snapshot every {} seconds, sink: {:?}", args.refresh_interval, args.sink);
    println!();
    println!("📋 Available endpoints:");
    println!("  GET    /api/config           - Current options");
    println!("  PUT    /api/config           - Change options");
    println!("  POST   /api/service/start    - Enable snapshots");
    println!("  POST   /api/service/stop     - Disable snapshots");
    println!("  GET    /api/processes        - Take a snapshot now");
    println!("  GET    /metrics              - Prometheus metrics");
    println!("  GET    /health               - Health check");
    println!("═══════════════════════════════════════════════════════════");
}
