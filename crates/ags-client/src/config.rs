use anyhow::{anyhow, Result};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/ags/";
pub const DEFAULT_RELAY_PATH: &str = "com";
pub const DEFAULT_ESCROW_PATH: &str = "tbe";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub relay_path: String,
    pub escrow_path: String,
    /// Applied to one-shot requests only, never to the long poll.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url"),
            relay_path: DEFAULT_RELAY_PATH.into(),
            escrow_path: DEFAULT_ESCROW_PATH.into(),
            request_timeout: None,
            user_agent: concat!("ags-client/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ..Self::default()
        })
    }

    /// Defaults overridden by `AGS_BASE_URL`, `AGS_RELAY_PATH`,
    /// `AGS_ESCROW_PATH` and `AGS_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("AGS_BASE_URL") {
            config.base_url = parse_base_url(&url)?;
        }
        if let Ok(path) = std::env::var("AGS_RELAY_PATH") {
            config.relay_path = path;
        }
        if let Ok(path) = std::env::var("AGS_ESCROW_PATH") {
            config.escrow_path = path;
        }
        if let Ok(secs) = std::env::var("AGS_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow!("AGS_TIMEOUT_SECS must be a whole number of seconds"))?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn relay_url(&self) -> Result<Url> {
        self.base_url
            .join(&self.relay_path)
            .map_err(|e| anyhow!("relay url: {e}"))
    }

    pub fn escrow_url(&self) -> Result<Url> {
        self.base_url
            .join(&self.escrow_path)
            .map_err(|e| anyhow!("escrow url: {e}"))
    }
}

/// Endpoint paths are joined relative to the base, so it must end in `/`.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|e| anyhow!("invalid base url {raw:?}: {e}"))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("invalid base url {raw:?}: cannot be a base"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_onto_base() {
        let config = ClientConfig::new("http://relay.example:8080/ags").unwrap();
        assert_eq!(
            config.relay_url().unwrap().as_str(),
            "http://relay.example:8080/ags/com"
        );
        assert_eq!(
            config.escrow_url().unwrap().as_str(),
            "http://relay.example:8080/ags/tbe"
        );
    }

    #[test]
    fn defaults_point_at_localhost() {
        let config = ClientConfig::default();
        assert_eq!(
            config.relay_url().unwrap().as_str(),
            "http://localhost:8080/ags/com"
        );
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(ClientConfig::new("not a url").is_err());
        assert!(ClientConfig::new("mailto:someone@example.com").is_err());
    }
}
