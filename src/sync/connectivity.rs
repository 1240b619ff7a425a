use std::fmt;
use std::net::ToSocketAddrs;

use reqwest::Url;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    /// Offline when forced, or when the API host does not resolve. Only a DNS
    /// lookup happens here, never an API call. A base URL without a host is a
    /// configuration error, not a connectivity state.
    pub fn detect(force_offline: bool, api_base_url: &str) -> Result<Self, ConfigError> {
        if force_offline {
            return Ok(Connectivity::Offline);
        }

        let (host, port) = host_and_port(api_base_url).ok_or_else(|| ConfigError::InvalidUrl {
            key: "api_base_url",
            value: api_base_url.to_string(),
        })?;
        let resolved = match (host.as_str(), port).to_socket_addrs() {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(err) => {
                tracing::debug!(error = %err, host = %host, "api host did not resolve");
                false
            }
        };
        Ok(if resolved {
            Connectivity::Online
        } else {
            Connectivity::Offline
        })
    }

    pub fn banner(self) -> &'static str {
        match self {
            Connectivity::Online => "Online: Drive sync is available.",
            Connectivity::Offline => {
                "Offline: All features work. Drive sync will resume when internet is available."
            }
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

fn host_and_port(url: &str) -> Option<(String, u16)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_string();
    let port = parsed.port_or_known_default()?;
    Some((host, port))
}
