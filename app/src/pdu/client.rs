use anyhow::Context;
use infrastructure::{BasicAuth, HttpClientConfig};
use reqwest_middleware::ClientWithMiddleware;

use super::model::{OutletSelector, StatusDocument};

/// All component bits set, i.e. the complete status document.
const STATUS_COMPONENTS: &str = "1073741823";

#[derive(Debug, Clone)]
pub struct PduHttpClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl PduHttpClient {
    pub fn new(base_url: &str, basic_auth: Option<BasicAuth>) -> anyhow::Result<Self> {
        let client = HttpClientConfig::new(basic_auth).new_tracing_client()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

impl PduHttpClient {
    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self) -> anyhow::Result<StatusDocument> {
        let response = self
            .client
            .get(format!("{}/statusjsn.js", self.base_url))
            .query(&[("components", STATUS_COMPONENTS)])
            .send()
            .await
            .context("Error requesting PDU status")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to fetch status: {} - {}", status, text);
        }

        response
            .json::<StatusDocument>()
            .await
            .context("Error parsing PDU status")
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_outlet_state(&self, outlet: OutletSelector, power_on: bool) -> anyhow::Result<()> {
        let params = vec![
            ("cmd", "1".to_string()),
            ("p", outlet.to_string()),
            ("s", state_param(power_on)),
        ];

        self.send_command("/ov.html", &params)
            .await
            .with_context(|| format!("Failed to set outlet state for outlet {}", outlet))
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_outlet(&self, outlet: OutletSelector) -> anyhow::Result<()> {
        let params = vec![("cmd", "12".to_string()), ("p", outlet.to_string())];

        self.send_command("/", &params)
            .await
            .with_context(|| format!("Failed to reset outlet {}", outlet))
    }

    /// Programs a device-side sequence: starting at `start_outlet`, each following
    /// outlet is switched to the next entry of `states`, `delay_seconds` apart.
    #[tracing::instrument(skip(self))]
    pub async fn start_batch(&self, start_outlet: u32, delay_seconds: u32, states: &[bool]) -> anyhow::Result<()> {
        let state_keys: Vec<String> = (1..=states.len()).map(|i| format!("a{}", i)).collect();

        let mut params = vec![
            ("cmd", "5".to_string()),
            ("p", start_outlet.to_string()),
            ("s", delay_seconds.to_string()),
        ];
        for (key, state) in state_keys.iter().zip(states) {
            params.push((key.as_str(), state_param(*state)));
        }

        self.send_command("/", &params)
            .await
            .context("Failed to start outlet batch mode")
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_batch(&self, outlet: u32) -> anyhow::Result<()> {
        let params = vec![("cmd", "2".to_string()), ("p", outlet.to_string())];

        self.send_command("/", &params)
            .await
            .context("Failed to cancel outlet batch mode")
    }

    async fn send_command(&self, path: &str, params: &[(&str, String)]) -> anyhow::Result<()> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("{} - {}", status, text);
        }

        tracing::debug!("PDU accepted command {} {:?}", path, params);

        Ok(())
    }
}

fn state_param(power_on: bool) -> String {
    String::from(if power_on { "1" } else { "0" })
}
