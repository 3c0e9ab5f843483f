use crate::engine::qualify::{QualificationCriteria, DEFAULT_MAX_AGE_MINUTES};
use crate::execution::Credentials;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const ENV_FILE: &str = ".env";
const EMAIL_VAR: &str = "LISTING_BIDDER_EMAIL";
const PASSWORD_VAR: &str = "LISTING_BIDDER_PASSWORD";
/// Listings must be from the current day, so a longer window means nothing.
const MAX_AGE_LIMIT_MINUTES: i64 = 24 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    pub submission: SubmissionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    #[serde(default)]
    pub exclusion_keywords: Vec<String>,
    #[serde(default = "default_max_age_minutes")]
    pub max_age_minutes: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclusion_keywords: Vec::new(),
            max_age_minutes: DEFAULT_MAX_AGE_MINUTES,
        }
    }
}

impl FilterConfig {
    pub fn criteria(&self) -> QualificationCriteria {
        QualificationCriteria {
            exclusion_keywords: self.exclusion_keywords.clone(),
            max_age_minutes: self.max_age_minutes,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessagesConfig {
    #[serde(default = "default_messages_dir")]
    pub directory: PathBuf,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            directory: default_messages_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    pub base_url: String,
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_age_minutes() -> i64 {
    DEFAULT_MAX_AGE_MINUTES
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("posted_offers.txt")
}

fn default_messages_dir() -> PathBuf {
    PathBuf::from("messages")
}

fn default_sign_in_path() -> String {
    "/users/sign_in".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .with_context(|| "Failed to parse config TOML")?;
        let max_age = config.filter.max_age_minutes;
        if max_age <= 0 || max_age > MAX_AGE_LIMIT_MINUTES {
            anyhow::bail!(
                "filter.max_age_minutes must be in 1..={}, got {}",
                MAX_AGE_LIMIT_MINUTES,
                max_age
            );
        }
        Ok(config)
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    /// Site credentials. The email comes from the environment or a prompt and
    /// is saved to .env; the password is never written to disk.
    pub fn credentials() -> Result<Credentials> {
        let email = match std::env::var(EMAIL_VAR) {
            Ok(v) if !v.trim().is_empty() => sanitize_value(&v),
            _ => {
                let v = prompt("Account email")?;
                save_env_var(EMAIL_VAR, &v);
                v
            }
        };
        let password = match std::env::var(PASSWORD_VAR) {
            Ok(v) if !v.is_empty() => v,
            _ => prompt_hidden("Account password")?,
        };
        Ok(Credentials { email, password })
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = input.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", label);
    }
    Ok(value)
}

fn prompt_hidden(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    let value = rpassword::read_password()
        .with_context(|| format!("failed to read {}", label))?;
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", label);
    }
    Ok(value)
}

/// Strip carriage returns, BOM, and other invisible chars from a value.
fn sanitize_value(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

/// Append a KEY=VALUE line to .env and set it in the current process.
fn save_env_var(key: &str, value: &str) {
    std::env::set_var(key, value);
    let path = Path::new(ENV_FILE);
    let mut contents = std::fs::read_to_string(path).unwrap_or_default();
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!("{}={}\n", key, value));
    if let Err(e) = std::fs::write(path, contents) {
        tracing::warn!(key, error = %e, "failed to save {}", ENV_FILE);
    }
}
