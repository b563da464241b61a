//! Runtime configuration for the DIAL server binary.
//!
//! Grounded on `octofhir-server::config`: nested `#[serde(default)]` sections, each
//! field backed by a `default_*()` function, a `validate()` that returns plain
//! `Result<(), String>`, and a `loader` module layering a TOML file under
//! environment-variable overrides via the `config` crate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DialConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub worker: WorkerSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub features: FeatureSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl DialConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.public_port == 0 {
            return Err("server.public_port must be > 0".into());
        }
        if self.server.local_port == 0 {
            return Err("server.local_port must be > 0".into());
        }
        if self.server.public_port == self.server.local_port {
            return Err("server.public_port and server.local_port must differ".into());
        }
        if self.worker.queue_capacity == 0 {
            return Err("worker.queue_capacity must be > 0".into());
        }
        if self.worker.state_wait_timeout_ms == 0 {
            return Err("worker.state_wait_timeout_ms must be > 0".into());
        }
        if self.limits.max_uri_length == 0 {
            return Err("limits.max_uri_length must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid:?}"));
        }
        Ok(())
    }

    pub fn public_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.server.public_port))
    }

    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.server.local_port))
    }

    pub fn state_wait_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.worker.state_wait_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_public_port")]
    pub public_port: u16,
    #[serde(default = "default_local_port")]
    pub local_port: u16,
    /// Value advertised in `dialVer` and used to build the XML namespace.
    #[serde(default = "default_schema_uri")]
    pub schema_uri: String,
}

fn default_public_port() -> u16 {
    8008
}
fn default_local_port() -> u16 {
    8009
}
fn default_schema_uri() -> String {
    "urn:dial-multiscreen-org:schemas:dial".into()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            public_port: default_public_port(),
            local_port: default_local_port(),
            schema_uri: default_schema_uri(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSection {
    /// Pending-queue cap; push beyond this returns 403 (spec.md §4.5).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Per-operation state-wait deadline; 35s in the original for every lifecycle op.
    #[serde(default = "default_state_wait_timeout_ms")]
    pub state_wait_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    5
}
fn default_state_wait_timeout_ms() -> u64 {
    35_000
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            state_wait_timeout_ms: default_state_wait_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_max_uri_length")]
    pub max_uri_length: usize,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    #[serde(default = "default_max_dial_data_bytes")]
    pub max_dial_data_bytes: usize,
}

fn default_max_uri_length() -> usize {
    256
}
fn default_max_payload_bytes() -> usize {
    4096
}
fn default_max_dial_data_bytes() -> usize {
    4096
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_uri_length: default_max_uri_length(),
            max_payload_bytes: default_max_payload_bytes(),
            max_dial_data_bytes: default_max_dial_data_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSection {
    /// Legacy exemption: the YouTube app's launch payload is passed unencoded
    /// (spec.md §9, "YouTube payload exemption").
    #[serde(default = "default_youtube_payload_passthrough")]
    pub youtube_payload_passthrough: bool,
    /// `GDIAL_MERGE_URL_AND_BODY_QUERY` in the original; compile-time disabled there,
    /// default off here too (spec.md §9).
    #[serde(default)]
    pub merge_url_and_body_query: bool,
}

fn default_youtube_payload_passthrough() -> bool {
    true
}

impl Default for FeatureSection {
    fn default() -> Self {
        Self {
            youtube_payload_passthrough: default_youtube_payload_passthrough(),
            merge_url_and_body_query: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::DialConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Layers an optional TOML file (`dial-server.toml` by default) under
    /// `DIAL__`-prefixed environment overrides, then validates the result.
    pub fn load_config(path: Option<&str>) -> Result<DialConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = match path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from("dial-server.toml"),
        };
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        builder = builder.add_source(
            Environment::with_prefix("DIAL")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: DialConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DialConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_matching_ports() {
        let mut cfg = DialConfig::default();
        cfg.server.local_port = cfg.server.public_port;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_queue_capacity() {
        let mut cfg = DialConfig::default();
        cfg.worker.queue_capacity = 0;
        assert!(cfg.validate().is_err());
    }
}
