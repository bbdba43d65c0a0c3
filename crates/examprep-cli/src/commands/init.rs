//! The `examprep init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("examprep.toml").exists() {
        println!("examprep.toml already exists, skipping.");
    } else {
        std::fs::write("examprep.toml", SAMPLE_CONFIG)?;
        println!("Created examprep.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point base_url at your exam API");
    println!("  2. Run: examprep register ... or examprep login --email you@example.com");
    println!("  3. Run: examprep exam start razonamiento --take");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examprep configuration

base_url = "http://localhost:3000/api"
timeout_secs = 30

# Where the access token is kept between runs.
# token_path = "${HOME}/.config/examprep/token"

# Or pass a token directly (EXAMPREP_TOKEN also works).
# token = "${EXAMPREP_TOKEN}"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let config: examprep_client::ClientConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.token.is_none());
    }
}
