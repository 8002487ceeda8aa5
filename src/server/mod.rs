// Server module entry
// Listener setup, connection handling and shutdown signals

pub mod connection;
pub mod listener;
pub mod signal;

// Rust does not allow `loop` as a module name (keyword), so use server_loop
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used types
pub use connection::ServerRole;
pub use listener::create_listener;
pub use server_loop::{start_server_loop, wait_for_drain};
pub use signal::start_signal_handler;
