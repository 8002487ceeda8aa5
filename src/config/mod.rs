// Configuration module entry point
// Loads layered configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

use crate::courseware::CONTENT_DEPTH;

pub use state::AppState;
pub use types::Config;

/// Default config file (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Environment variable prefix, e.g. `APP_COURSEWARE__MFE_BASE_URL`
const ENV_PREFIX: &str = "APP";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Missing files fall back to defaults and environment variables
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("courseware.positioned_block_types")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.api_host", "127.0.0.1")?
            .set_default("server.api_port", 8000)?
            .set_default("server.backlog", 128)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "courseware-redirect/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("courseware.mfe_base_url", "http://localhost:2000")?
            .set_default(
                "courseware.content_depth",
                u64::try_from(CONTENT_DEPTH).unwrap_or(u64::MAX),
            )?
            .set_default(
                "courseware.positioned_block_types",
                vec!["course", "chapter", "sequential"],
            )?
            .set_default("store.content_file", "content.toml")?
            .set_default("store.state_file", "positions.toml")?
            .set_default("store.persist_positions", true)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn get_api_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.api_host, self.server.api_port)
            .parse()
            .map_err(|e| format!("Invalid API address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("/nonexistent/courseware-redirect-config").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.api_port, 8000);
        assert_eq!(cfg.courseware.content_depth, CONTENT_DEPTH);
        assert_eq!(
            cfg.courseware.positioned_block_types,
            vec!["course", "chapter", "sequential"]
        );
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.health.enabled);
        assert_eq!(cfg.health.liveness_path, "/healthz");
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "courseware-redirect-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
[server]
port = 9090

[courseware]
mfe_base_url = "https://learning.example.com"
positioned_block_types = ["sequential"]

[health]
liveness_path = "/live"
"#,
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.courseware.mfe_base_url, "https://learning.example.com");
        assert_eq!(cfg.courseware.positioned_block_types, vec!["sequential"]);
        assert_eq!(cfg.health.liveness_path, "/live");
        assert_eq!(cfg.health.readiness_path, "/readyz");
        std::fs::remove_file(path).unwrap();
    }
}
