//! Client configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level examprep configuration.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the exam API, including any path prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where the access token is persisted between runs.
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    /// Explicit access token; takes precedence over the token file.
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("token_path", &self.token_path)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}
fn default_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token_path: None,
            token: None,
        }
    }
}

impl ClientConfig {
    /// The token file: `token_path` if set, else `~/.config/examprep/token`.
    pub fn token_file(&self) -> PathBuf {
        self.token_path
            .clone()
            .or_else(|| dirs_path().map(|d| d.join("token")))
            .unwrap_or_else(|| PathBuf::from(".examprep-token"))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examprep.toml` in the current directory
/// 2. `~/.config/examprep/config.toml`
///
/// Environment variable overrides: `EXAMPREP_API_URL`, `EXAMPREP_TOKEN`.
pub fn load_config() -> Result<ClientConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examprep.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Ok(url) = std::env::var("EXAMPREP_API_URL") {
        config.base_url = url;
    }
    if let Ok(token) = std::env::var("EXAMPREP_TOKEN") {
        config.token = Some(token);
    }

    config.base_url = resolve_env_vars(&config.base_url)
        .trim_end_matches('/')
        .to_string();
    config.token = config
        .token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());
    config.token_path = config
        .token_path
        .as_ref()
        .map(|p| PathBuf::from(resolve_env_vars(&p.to_string_lossy())));

    anyhow::ensure!(config.timeout_secs > 0, "timeout_secs must be at least 1");

    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examprep"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMPREP_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAMPREP_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_EXAMPREP_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_EXAMPREP_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.token.is_none());
    }

    #[test]
    fn debug_masks_token() {
        let config = ClientConfig {
            token: Some("eyJhbGciOi.secret".into()),
            ..Default::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("***"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examprep.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://api.example.com/v1/"
timeout_secs = 10
token_path = "/tmp/examprep-token"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(
            config.token_file(),
            PathBuf::from("/tmp/examprep-token")
        );
        if std::env::var("EXAMPREP_API_URL").is_err() {
            assert_eq!(config.base_url, "https://api.example.com/v1");
        }
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/examprep.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examprep.toml");
        std::fs::write(&path, "timeout_secs = 0\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }
}
