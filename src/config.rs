use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SECRETS_FILE: &str = "api_secrets.toml";
const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 3;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const DEFAULT_LYRICS_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub genius_access_token: Option<String>,
    pub bind_addr: SocketAddr,
    pub discovery_timeout: Duration,
    pub http_timeout: Duration,
    pub lyrics_attempts: u32,
    pub lyrics_optional: bool,
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    genius: Option<GeniusSecrets>,
}

#[derive(Debug, Deserialize)]
struct GeniusSecrets {
    client_access_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            genius_access_token: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            discovery_timeout: Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            lyrics_attempts: DEFAULT_LYRICS_ATTEMPTS,
            lyrics_optional: false,
        }
    }
}

impl Config {
    /// Read the whole configuration once, at startup.
    ///
    /// `GENIUS_ACCESS_TOKEN` wins over the secrets file; the file is only
    /// consulted when the variable is unset.
    pub fn from_env() -> Result<Self> {
        let genius_access_token = match non_empty_var("GENIUS_ACCESS_TOKEN") {
            Some(token) => Some(token),
            None => {
                let path = non_empty_var("LYNOS_SECRETS_FILE")
                    .unwrap_or_else(|| DEFAULT_SECRETS_FILE.to_string());
                Self::load_secrets_file(Path::new(&path))?
            }
        };

        let bind_addr = parse_var("LYNOS_BIND", DEFAULT_BIND.parse::<SocketAddr>()?)?;
        let discovery_timeout = Duration::from_secs(parse_var(
            "LYNOS_DISCOVERY_TIMEOUT_SECS",
            DEFAULT_DISCOVERY_TIMEOUT_SECS,
        )?);
        let http_timeout = Duration::from_secs(parse_var(
            "LYNOS_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let lyrics_attempts = parse_var("LYNOS_LYRICS_ATTEMPTS", DEFAULT_LYRICS_ATTEMPTS)?;
        if lyrics_attempts == 0 {
            return Err(anyhow!("LYNOS_LYRICS_ATTEMPTS must be at least 1"));
        }
        let lyrics_optional = flag_var("LYNOS_LYRICS_OPTIONAL", false)?;

        Ok(Self {
            genius_access_token,
            bind_addr,
            discovery_timeout,
            http_timeout,
            lyrics_attempts,
            lyrics_optional,
        })
    }

    /// Token from a `[genius] client_access_token = "..."` file.
    /// A missing file is not an error; a malformed one is.
    pub fn load_secrets_file(path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let secrets: SecretsFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(secrets
            .genius
            .and_then(|g| g.client_access_token)
            .filter(|t| !t.trim().is_empty()))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {key} ({raw:?}): {e}")),
        None => Ok(default),
    }
}

fn flag_var(key: &str, default: bool) -> Result<bool> {
    let Some(raw) = non_empty_var(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Invalid value for {key} ({raw:?}): expected true/false, yes/no, on/off or 1/0"
        )),
    }
}
