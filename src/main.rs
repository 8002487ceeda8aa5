use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

mod api;
mod block;
mod config;
mod courseware;
mod handler;
mod http;
mod keys;
mod logger;
mod server;
mod store;
#[cfg(test)]
mod test_utils;

use server::ServerRole;
use store::{MemoryStore, PositionStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Create Tokio runtime, thread count from the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_addr = cfg.get_socket_addr()?;
    let api_addr = cfg.get_api_socket_addr()?;

    let store = MemoryStore::load(Path::new(&cfg.store.content_file))?;
    let positions = PositionStore::new(
        cfg.store.state_file.clone().into(),
        cfg.store.persist_positions,
    );

    let app_listener = server::create_listener(app_addr, cfg.server.backlog)?;
    let api_listener = server::create_listener(api_addr, cfg.server.backlog)?;

    let state = Arc::new(config::AppState::new(
        &cfg,
        Arc::new(store),
        Arc::new(positions),
    ));

    server::start_signal_handler(Arc::clone(&state.shutdown))?;
    logger::log_server_start(&app_addr, &api_addr, &cfg);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(run_dual_servers(app_listener, api_listener, state))
        .await;

    logger::log_info("[Shutdown] Stopped");
    Ok(())
}

async fn run_dual_servers(
    app_listener: TcpListener,
    api_listener: TcpListener,
    state: Arc<config::AppState>,
) {
    let app_connections = Arc::new(AtomicUsize::new(0));
    let api_connections = Arc::new(AtomicUsize::new(0));

    let api_server = tokio::task::spawn_local(server::start_server_loop(
        api_listener,
        Arc::clone(&state),
        Arc::clone(&api_connections),
        ServerRole::Api,
    ));

    server::start_server_loop(
        app_listener,
        Arc::clone(&state),
        Arc::clone(&app_connections),
        ServerRole::App,
    )
    .await;

    if let Err(e) = api_server.await {
        logger::log_api_error(&format!("API server task failed: {e}"));
    }

    // Connections were told to close; let in-flight responses finish on this LocalSet
    let drain_timeout = Duration::from_secs(state.config.performance.write_timeout);
    logger::log_shutdown(drain_timeout);
    server::wait_for_drain(&[app_connections, api_connections], drain_timeout).await;
}
