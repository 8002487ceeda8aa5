// Server loop module
// Accepts connections until the shutdown signal fires

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::{accept_connection, ServerRole};
use crate::config::AppState;
use crate::logger;

/// Accept loop shared by the application and API listeners
///
/// Returns once `state.shutdown` is notified; connections already spawned keep running
/// on the local task set.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    role: ServerRole,
) {
    let shutdown_signal = Arc::clone(&state.shutdown);
    let shutdown = shutdown_signal.notified();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, role);
                    }
                    Err(e) => match role {
                        ServerRole::Api => {
                            logger::log_api_error(&format!("Failed to accept connection: {e}"));
                        }
                        ServerRole::App => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    },
                }
            }

            () = &mut shutdown => {
                logger::log_info(&format!("[Shutdown] {role} listener closed"));
                return;
            }
        }
    }
}

/// Interval between active-connection checks while draining
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until every connection counter reaches zero, or `timeout` elapses.
///
/// Must run on the same `LocalSet` as the connection tasks so they can finish.
/// Returns whether all connections closed in time.
pub async fn wait_for_drain(counters: &[Arc<AtomicUsize>], timeout: Duration) -> bool {
    let active = || {
        counters
            .iter()
            .map(|c| c.load(Ordering::SeqCst))
            .sum::<usize>()
    };

    let drained = tokio::time::timeout(timeout, async {
        while active() > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    })
    .await
    .is_ok();

    if !drained {
        logger::log_warning(&format!(
            "[Shutdown] {} connection(s) still open after {}s, closing",
            active(),
            timeout.as_secs()
        ));
    }
    drained
}
