use derive_more::Display;
use serde::Serialize;

use crate::pdu::{OutletSelector, PduHttpClient};
use crate::status::StatusReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PowerAction {
    #[display("on")]
    On,
    #[display("off")]
    Off,
    #[display("toggle")]
    Toggle,
    #[display("reset")]
    Reset,
}

/// Result of a single outlet command. Failures are reported to the caller
/// instead of being raised, so a failed outlet never aborts the caller's flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Sent,
    Rejected { reason: String },
    Failed { error: String },
}

/// Issues outlet commands against the device. Toggle is resolved from the
/// current snapshot; the snapshot itself is only ever updated by the next poll.
#[derive(Debug, Clone)]
pub struct OutletCommander {
    client: PduHttpClient,
    status: StatusReader,
}

impl OutletCommander {
    pub fn new(client: PduHttpClient, status: StatusReader) -> Self {
        Self { client, status }
    }

    pub async fn execute(&self, action: PowerAction, outlet: OutletSelector) -> CommandOutcome {
        match action {
            PowerAction::On => self.set_outlet_state(outlet, true).await,
            PowerAction::Off => self.set_outlet_state(outlet, false).await,
            PowerAction::Toggle => self.toggle_outlet(outlet).await,
            PowerAction::Reset => self.reset_outlet(outlet).await,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_outlet_state(&self, outlet: OutletSelector, power_on: bool) -> CommandOutcome {
        let result = self.client.set_outlet_state(outlet, power_on).await;
        CommandOutcome::from_result(result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_outlet(&self, outlet: OutletSelector) -> CommandOutcome {
        let OutletSelector::Outlet(number) = outlet else {
            return CommandOutcome::rejected("Toggling all outlets at once is not supported".to_string());
        };

        let current = self.status.current();
        let Some(state) = current.as_ref().and_then(|doc| doc.outlet(number)) else {
            return CommandOutcome::rejected(format!("Outlet {} not found in current status", number));
        };

        let power_on = !state.is_on();
        tracing::debug!("Toggling outlet {} to {}", number, if power_on { "on" } else { "off" });

        self.set_outlet_state(outlet, power_on).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_outlet(&self, outlet: OutletSelector) -> CommandOutcome {
        let result = self.client.reset_outlet(outlet).await;
        CommandOutcome::from_result(result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn batch_set_outlets(&self, start_outlet: u32, delay_seconds: u32, states: &[bool]) -> anyhow::Result<()> {
        if start_outlet == 0 {
            anyhow::bail!("Batch start outlet must be 1 or greater");
        }
        if states.is_empty() {
            anyhow::bail!("Batch requires at least one outlet state");
        }

        self.client.start_batch(start_outlet, delay_seconds, states).await?;
        tracing::info!(
            "Started batch of {} outlets from outlet {} with {}s delay",
            states.len(),
            start_outlet,
            delay_seconds
        );

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_batch(&self, outlet: u32) -> anyhow::Result<()> {
        self.client.cancel_batch(outlet).await?;
        tracing::info!("Cancelled batch for outlet {}", outlet);

        Ok(())
    }
}

impl CommandOutcome {
    fn rejected(reason: String) -> Self {
        tracing::warn!("Outlet command rejected: {}", reason);
        CommandOutcome::Rejected { reason }
    }

    fn from_result(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(_) => CommandOutcome::Sent,
            Err(e) => {
                tracing::error!("Outlet command failed: {:?}", e);
                CommandOutcome::Failed {
                    error: format!("{:#}", e),
                }
            }
        }
    }
}
