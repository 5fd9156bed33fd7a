//! Configuration parsing – reads a KEY=VALUE file (`pagecap.conf`).
//!
//! Lines starting with `#` are comments.  Values may be optionally
//! double-quoted.  Unknown keys are silently ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// Application configuration, fixed at startup and threaded into handlers.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub listen_addr: String,
    /// Directory holding capture records and formatted HTML siblings.
    pub data_dir: PathBuf,
    /// Request-body ceiling in megabytes, enforced at the HTTP layer.
    pub max_body_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:5000".into(),
            data_dir: PathBuf::from("coupang_data"),
            max_body_mb: 10,
        }
    }
}

impl Config {
    /// Default config path.
    pub fn default_path() -> &'static str {
        "pagecap.conf"
    }

    /// Body limit in bytes for the HTTP layer.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb * 1024 * 1024
    }
}

/// Parse a `KEY=VALUE` configuration file.
pub fn load(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))?;

    let map = parse_conf(&text);
    info!("Loaded config from {}", path.display());

    let defaults = Config::default();
    let get = |key: &str| -> Option<String> { map.get(key).cloned() };

    Ok(Config {
        listen_addr: get("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
        data_dir: get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir),
        max_body_mb: get("MAX_BODY_MB")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_body_mb),
    })
}

/// Load the config at `path`, falling back to built-in defaults when the
/// default path does not exist.  An explicitly given path must be readable.
pub fn load_or_default(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load(path)
}

/// Parse `KEY=VALUE` lines into a map, stripping optional double-quotes.
fn parse_conf(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim();
            let val = val.trim().trim_matches('"');
            map.insert(key.to_string(), val.to_string());
        }
    }
    map
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conf() {
        let text = r#"
# comment
LISTEN_ADDR="0.0.0.0:9090"
DATA_DIR=/tmp/captures
MAX_BODY_MB=25
"#;
        let map = parse_conf(text);
        assert_eq!(map["LISTEN_ADDR"], "0.0.0.0:9090");
        assert_eq!(map["DATA_DIR"], "/tmp/captures");
        assert_eq!(map["MAX_BODY_MB"], "25");
    }

    #[test]
    fn test_load_overrides_defaults() {
        let text = "DATA_DIR=/tmp/pagecap_test\nMAX_BODY_MB=2\n";
        let tmp = tempfile(text);
        let config = load(tmp.as_path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pagecap_test"));
        assert_eq!(config.max_body_bytes(), 2 * 1024 * 1024);
        // Untouched key keeps its default
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
    }

    #[test]
    fn test_missing_default_path_uses_defaults() {
        let config =
            load_or_default(Path::new("/nonexistent/pagecap.conf"), false).unwrap();
        assert_eq!(config.max_body_mb, 10);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        assert!(load_or_default(Path::new("/nonexistent/pagecap.conf"), true).is_err());
    }

    fn tempfile(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("pagecap_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.conf");
        std::fs::write(&path, content).unwrap();
        path
    }
}
