// Connection handling module
// Accepts a single TCP connection and serves it on the local task set

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api;
use crate::config::{AppState, Config};
use crate::handler;
use crate::logger;

/// Which listener a connection arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole {
    /// Courseware redirects and health probes
    App,
    /// Management API
    Api,
}

impl ServerRole {
    /// Only the application listener enforces `max_connections`
    const fn checks_limits(self) -> bool {
        matches!(self, Self::App)
    }
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::Api => write!(f, "api"),
        }
    }
}

/// Accept and process a connection, checking limits and logging.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    role: ServerRole,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if role.checks_limits() {
        if let Some(max_conn) = state.config.performance.max_connections {
            if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
                // Exceeded limit: rollback counter and reject
                conn_counter.fetch_sub(1, Ordering::SeqCst);
                logger::log_warning(&format!(
                    "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
                ));
                drop(stream);
                return;
            }
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        role,
    );
}

/// How long a connection may stay open before it is asked to close.
///
/// Keep-alive connections live for `keep_alive_timeout`; otherwise the larger of the
/// read and write timeouts bounds the single request.
pub fn connection_lifetime(config: &Config) -> Duration {
    let perf = &config.performance;
    if perf.keep_alive_timeout > 0 {
        Duration::from_secs(perf.keep_alive_timeout)
    } else {
        Duration::from_secs(std::cmp::max(perf.read_timeout, perf.write_timeout))
    }
}

/// Serve one connection in a `spawn_local` task.
///
/// At the end of its lifetime, or on shutdown, the connection is closed gracefully:
/// the in-flight response is finished within `write_timeout`, then the socket closes.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    role: ServerRole,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let perf = &state.config.performance;
        let lifetime = connection_lifetime(&state.config);
        let drain_timeout = Duration::from_secs(perf.write_timeout);

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(perf.keep_alive_timeout > 0)
            .header_read_timeout(Duration::from_secs(perf.read_timeout));

        let shutdown_signal = Arc::clone(&state.shutdown);
        let shutdown = shutdown_signal.notified();
        tokio::pin!(shutdown);
        let expired = tokio::time::sleep(lifetime);
        tokio::pin!(expired);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move {
                    match role {
                        ServerRole::Api => api::handle_api_request(req, state).await,
                        ServerRole::App => handler::handle_request(req, state, peer_addr).await,
                    }
                }
            }),
        );
        tokio::pin!(conn);

        let finished = tokio::select! {
            result = conn.as_mut() => Some(result),
            () = &mut shutdown => None,
            () = &mut expired => {
                logger::log_debug(&format!(
                    "[Connection] {peer_addr} reached {}s lifetime on {role} listener, closing",
                    lifetime.as_secs()
                ));
                None
            }
        };

        let result = match finished {
            Some(result) => Some(result),
            None => {
                conn.as_mut().graceful_shutdown();
                tokio::time::timeout(drain_timeout, conn.as_mut()).await.ok()
            }
        };

        match result {
            Some(Ok(())) => {}
            Some(Err(err)) => logger::log_connection_error(&err),
            None => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} did not finish within {} seconds on {role} listener",
                    drain_timeout.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::demo_state;

    #[test]
    fn test_connection_lifetime() {
        let state = demo_state();
        let mut config = state.config.clone();
        assert_eq!(connection_lifetime(&config), Duration::from_secs(75));

        config.performance.keep_alive_timeout = 0;
        config.performance.read_timeout = 5;
        config.performance.write_timeout = 12;
        assert_eq!(connection_lifetime(&config), Duration::from_secs(12));
    }
}
