pub mod auth;
pub mod catalog;
pub mod exam;
pub mod init;
pub mod practice;
pub mod progress;
pub mod session;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use examprep_client::config::load_config_from;
use examprep_client::{AuthContext, ClientConfig, HttpGateway, TokenStore};
use examprep_core::error::{GatewayError, LoadCause, ShellError};
use examprep_core::model::User;

/// Configuration plus the auth context every command starts from.
pub struct App {
    pub config: ClientConfig,
    pub auth: AuthContext,
}

impl App {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        tracing::debug!(base_url = %config.base_url, "using exam API");
        let gateway = Arc::new(HttpGateway::new(&config)?);
        let auth = AuthContext::new(gateway, TokenStore::new(config.token_file()));
        Ok(Self { config, auth })
    }

    pub fn gateway(&self) -> Arc<HttpGateway> {
        Arc::clone(self.auth.gateway())
    }

    /// Restore the stored session or fail with a hint to log in.
    pub async fn require_user(&self) -> Result<User> {
        self.auth
            .restore(self.config.token.as_deref())
            .await
            .context("not logged in; run `examprep login` first")
    }
}

/// Convert a gateway failure into a CLI error with user-facing text.
pub fn api_error(e: GatewayError) -> anyhow::Error {
    if e.is_unauthorized() {
        anyhow::anyhow!("session expired; run `examprep login` again")
    } else {
        anyhow::anyhow!(e.user_message())
    }
}

/// Like [`api_error`] for failures that went through the session shell.
pub fn shell_error(e: ShellError) -> anyhow::Error {
    match &e {
        ShellError::Load {
            source: LoadCause::Gateway(g),
            ..
        }
        | ShellError::Finalize(g)
            if g.is_unauthorized() =>
        {
            api_error(g.clone())
        }
        _ => e.into(),
    }
}

/// Read one line from stdin after printing `label`. `None` at end of input.
pub fn prompt_line(label: &str) -> Result<Option<String>> {
    eprint!("{label}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok((read > 0).then(|| line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Use `value` if given, otherwise ask for it on stdin.
pub fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => prompt_line(label)?.with_context(|| format!("no input for {}", label.trim())),
    }
}
