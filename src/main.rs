use anyhow::Result;
use speedmonitor::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let usage_repo = Arc::new(
        usage_repo::UsageRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    usage_repo.init().await?;

    let today = chrono::Local::now().date_naive();
    worker::prune_expired(&usage_repo, today, app_config.database.retention_days).await;

    // Continue today's totals after a restart instead of starting from zero.
    let stored_today = usage_repo.get(today).await?;
    if let Some(d) = &stored_today {
        tracing::info!(
            day = %d.day,
            bytes_sent = d.bytes_sent,
            bytes_recv = d.bytes_recv,
            "resuming today's usage"
        );
    }
    let aggregator =
        aggregator::Aggregator::resume(stored_today, today, app_config.database.flush_rate);

    let (live_tx, live_rx) = watch::channel(models::LiveStatus::idle(
        aggregator.current().clone(),
    ));
    let ws_live_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let filter = sampler::AdapterFilter::from_config(&app_config.monitoring.monitored_adapter);
    tracing::info!(adapter = ?filter, "monitoring network counters");
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            sampler: sampler::NetworkSampler::new(sampler::SysinfoCounters::new(filter)),
            aggregator,
            usage_repo: usage_repo.clone(),
            live_tx,
            ws_live_connections: ws_live_connections.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            sample_interval_ms: app_config.monitoring.sample_interval_ms,
            max_tick_gap_secs: app_config.monitoring.max_tick_gap_secs,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
            retention_days: app_config.database.retention_days,
        },
    );

    let app = routes::app(live_rx, usage_repo, ws_live_connections);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let served = tokio::select! {
        result = axum::serve(listener, app) => result.map_err(anyhow::Error::from),
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            Ok(())
        }
    };

    // The worker flushes the in-progress day before it exits.
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    served
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
