use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpyglassError};
use crate::tags;

/// Injected knobs for the capture pipeline. Nothing here is read at use
/// sites directly; every component receives the values it needs at
/// construction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Tracing target the span source subscribes to.
    pub source_name: String,
    /// Name of the framework's umbrella whole-request span, dropped by the
    /// mapper because the inbound producer already represents the request.
    pub umbrella_span_name: String,
    pub queue_capacity: usize,
    pub store_capacity: usize,
    /// How long a publisher connection sleeps between store polls.
    pub poll_interval: Duration,
    /// Prefix under which the host mounts the inspector's endpoints;
    /// inbound capture skips requests below it.
    pub mount_path: String,
    pub record_request_bodies: bool,
    pub record_response_bodies: bool,
    /// Captured bodies are cut at this many characters, with a marker appended.
    pub max_body_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_name: tags::SOURCE_NAME.to_string(),
            umbrella_span_name: "request".to_string(),
            queue_capacity: 5000,
            store_capacity: 5000,
            poll_interval: Duration::from_millis(300),
            mount_path: "/spyglass".to_string(),
            record_request_bodies: true,
            record_response_bodies: true,
            max_body_chars: 10_000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    source_name: Option<String>,
    umbrella_span_name: Option<String>,
    queue_capacity: Option<usize>,
    store_capacity: Option<usize>,
    poll_interval: Option<String>,
    mount_path: Option<String>,
    record_request_bodies: Option<bool>,
    record_response_bodies: Option<bool>,
    max_body_chars: Option<usize>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("SPYGLASS_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("spyglass/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| SpyglassError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| SpyglassError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        source_name: env::var("SPYGLASS_SOURCE_NAME").ok(),
        umbrella_span_name: env::var("SPYGLASS_UMBRELLA_SPAN_NAME").ok(),
        queue_capacity: env_usize("SPYGLASS_QUEUE_CAPACITY")?,
        store_capacity: env_usize("SPYGLASS_STORE_CAPACITY")?,
        poll_interval: env::var("SPYGLASS_POLL_INTERVAL").ok(),
        mount_path: env::var("SPYGLASS_MOUNT_PATH").ok(),
        record_request_bodies: env_bool("SPYGLASS_RECORD_REQUEST_BODIES")?,
        record_response_bodies: env_bool("SPYGLASS_RECORD_RESPONSE_BODIES")?,
        max_body_chars: env_usize("SPYGLASS_MAX_BODY_CHARS")?,
    })
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(v) => v
            .parse::<usize>()
            .map(Some)
            .map_err(|e| SpyglassError::Config(format!("bad {name} in environment: {e}"))),
        Err(_) => Ok(None),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match env::var(name) {
        Ok(v) => v
            .parse::<bool>()
            .map(Some)
            .map_err(|e| SpyglassError::Config(format!("bad {name} in environment: {e}"))),
        Err(_) => Ok(None),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.source_name {
        cfg.source_name = v;
    }
    if let Some(v) = overrides.umbrella_span_name {
        cfg.umbrella_span_name = v;
    }
    if let Some(v) = overrides.queue_capacity {
        cfg.queue_capacity = v;
    }
    if let Some(v) = overrides.store_capacity {
        cfg.store_capacity = v;
    }
    if let Some(v) = overrides.poll_interval {
        cfg.poll_interval = humantime::parse_duration(&v).map_err(|e| {
            SpyglassError::Config(format!("bad poll_interval in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.mount_path {
        cfg.mount_path = v;
    }
    if let Some(v) = overrides.record_request_bodies {
        cfg.record_request_bodies = v;
    }
    if let Some(v) = overrides.record_response_bodies {
        cfg.record_response_bodies = v;
    }
    if let Some(v) = overrides.max_body_chars {
        cfg.max_body_chars = v;
    }
    Ok(())
}
