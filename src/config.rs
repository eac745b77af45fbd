use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding `[backend].base_url`.
pub const ENV_BACKEND_URL: &str = "POCKETLM_BACKEND_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the PocketLM backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fixed request deadline for every backend call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    /// Bind address for the local bridge process.
    #[serde(default = "default_bridge_bind")]
    pub bind: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: default_bridge_bind(),
        }
    }
}

fn default_bridge_bind() -> String {
    "127.0.0.1:7878".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    /// Knowledge base used when `--collection` is not given.
    #[serde(default)]
    pub default_collection: Option<String>,
    /// Deadline for fetching PDF bytes before upload.
    #[serde(default = "default_pdf_fetch_timeout_secs")]
    pub pdf_fetch_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_collection: None,
            pdf_fetch_timeout_secs: default_pdf_fetch_timeout_secs(),
        }
    }
}

fn default_pdf_fetch_timeout_secs() -> u64 {
    60
}

impl Config {
    /// The bridge's HTTP base URL, derived from its bind address.
    pub fn bridge_url(&self) -> String {
        format!("http://{}", self.bridge.bind)
    }
}

/// Loads configuration from a TOML file.
///
/// A missing file is not an error — every setting has a default, so the
/// client works out of the box against a local backend. The
/// `POCKETLM_BACKEND_URL` environment variable overrides the configured
/// backend base URL either way.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
        if !url.trim().is_empty() {
            config.backend.base_url = url;
        }
    }

    if config.backend.base_url.trim().is_empty() {
        bail!("backend.base_url must not be empty");
    }
    if config.backend.timeout_secs == 0 {
        bail!("backend.timeout_secs must be > 0");
    }
    if config.bridge.bind.trim().is_empty() {
        bail!("bridge.bind must not be empty");
    }
    if config.capture.pdf_fetch_timeout_secs == 0 {
        bail!("capture.pdf_fetch_timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/plm.toml")).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.bridge.bind, "127.0.0.1:7878");
        assert!(config.capture.default_collection.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nbase_url = \"http://10.0.0.5:9000\"\n\n[capture]\ndefault_collection = \"research\"\n"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.capture.default_collection.as_deref(), Some("research"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\ntimeout_secs = 0\n").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_bridge_url() {
        let config = Config::default();
        assert_eq!(config.bridge_url(), "http://127.0.0.1:7878");
    }
}
