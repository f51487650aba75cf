mod client;
mod model;

use std::net::{IpAddr, SocketAddr};

pub use client::PduHttpClient;
pub use model::*;

use derive_more::derive::{Display, Error};
use infrastructure::BasicAuth;
use serde::Deserialize;

use crate::poller::StatusSource;

#[derive(Debug, Deserialize, Clone)]
pub struct PduConfig {
    #[serde(default)]
    pub ip: String,
    #[serde(default = "default_true")]
    pub use_authentication: bool,
    #[serde(default = "default_credential")]
    pub username: String,
    #[serde(default = "default_credential")]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConfigError {
    #[display("Missing IP address")]
    MissingIp,

    #[display("Invalid IP address: {ip}")]
    InvalidIp { ip: String },
}

fn default_true() -> bool {
    true
}

fn default_credential() -> String {
    "admin".to_string()
}

impl Default for PduConfig {
    fn default() -> Self {
        Self {
            ip: String::new(),
            use_authentication: default_true(),
            username: default_credential(),
            password: default_credential(),
        }
    }
}

impl PduConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ip = self.ip.trim();

        if ip.is_empty() {
            return Err(ConfigError::MissingIp);
        }

        if ip.parse::<IpAddr>().is_err() && ip.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidIp { ip: ip.to_owned() });
        }

        Ok(())
    }

    pub fn base_url(&self) -> String {
        match self.ip.trim().parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("http://[{}]", v6),
            _ => format!("http://{}", self.ip.trim()),
        }
    }

    /// Credentials are only sent when authentication is enabled and both parts are set.
    pub fn basic_auth(&self) -> Option<BasicAuth> {
        if self.use_authentication && !self.username.is_empty() && !self.password.is_empty() {
            Some(BasicAuth::new(&self.username, &self.password))
        } else {
            None
        }
    }

    pub fn new_client(&self) -> anyhow::Result<PduHttpClient> {
        self.validate()?;
        PduHttpClient::new(&self.base_url(), self.basic_auth())
    }
}

impl StatusSource for PduHttpClient {
    async fn fetch_status(&self) -> anyhow::Result<StatusDocument> {
        self.get_status().await
    }
}
