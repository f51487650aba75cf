use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use infrastructure::{HttpServerConfig, MonitoringConfig};
use serde::Deserialize;

use crate::pdu::PduConfig;

const MIN_POLL_INTERVAL_MS: u64 = 100;
const MAX_POLL_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub pdu: PduConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub verbose: bool,
    pub http_server: HttpServerConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config.toml"))
            .add_source(environment());

        let s = builder.build()?;
        s.try_deserialize()
    }

    /// Monitoring config with the verbose toggle applied.
    pub fn monitoring(&self) -> MonitoringConfig {
        if self.verbose {
            self.monitoring.clone().with_directive("smart_pdu=debug")
        } else {
            self.monitoring.clone()
        }
    }
}

/// Overrides from `SMART_PDU_`-prefixed variables. Nested keys are joined with `__`,
/// e.g. `SMART_PDU_POLLING__INTERVAL_MS=2500`.
fn environment() -> Environment {
    Environment::with_prefix("SMART_PDU")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("monitoring.logs.filters")
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    const MINIMAL: &str = r#"
        [http_server]
        port = 8080

        [monitoring.logs]
        default_level = "info"
    "#;

    #[test]
    fn defaults_for_missing_sections() {
        let settings = parse(MINIMAL);

        assert_eq!(settings.pdu.ip, "");
        assert!(settings.pdu.use_authentication);
        assert!(settings.polling.enabled);
        assert_eq!(settings.polling.interval(), Duration::from_millis(1000));
        assert!(!settings.verbose);
        assert_eq!(settings.http_server.bind_address, "0.0.0.0");
    }

    #[test]
    fn full_configuration() {
        let settings = parse(
            r#"
            verbose = true

            [pdu]
            ip = "192.168.1.50"
            use_authentication = false

            [polling]
            enabled = false
            interval_ms = 2500

            [http_server]
            port = 8080

            [monitoring]
            format = "json"

            [monitoring.logs]
            default_level = "warn"
            filters = ["actix_web=info"]
        "#,
        );

        assert_eq!(settings.pdu.ip, "192.168.1.50");
        assert!(!settings.pdu.use_authentication);
        assert!(!settings.polling.enabled);
        assert_eq!(settings.polling.interval(), Duration::from_millis(2500));
        assert_eq!(
            settings.monitoring().logs.filters,
            vec!["actix_web=info", "smart_pdu=debug"]
        );
    }

    #[test]
    fn interval_is_clamped() {
        let fast = PollingConfig {
            enabled: true,
            interval_ms: 10,
        };
        let slow = PollingConfig {
            enabled: true,
            interval_ms: 60_000,
        };

        assert_eq!(fast.interval(), Duration::from_millis(100));
        assert_eq!(slow.interval(), Duration::from_millis(10_000));
    }

    #[test]
    fn environment_overrides_nested_keys() {
        let vars = [
            ("SMART_PDU_POLLING__INTERVAL_MS", "2500"),
            ("SMART_PDU_PDU__USE_AUTHENTICATION", "false"),
            ("SMART_PDU_PDU__IP", "10.0.0.7"),
            ("SMART_PDU_MONITORING__LOGS__FILTERS", "actix_server=warn,hyper=info"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings: Settings = Config::builder()
            .add_source(File::from_str(MINIMAL, FileFormat::Toml))
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.polling.interval(), Duration::from_millis(2500));
        assert!(!settings.pdu.use_authentication);
        assert_eq!(settings.pdu.ip, "10.0.0.7");
        assert_eq!(settings.monitoring.logs.filters, vec!["actix_server=warn", "hyper=info"]);
    }
}
