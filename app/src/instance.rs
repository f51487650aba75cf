use crate::commander::OutletCommander;
use crate::host::{InstanceState, ModuleStatusReporter};
use crate::pdu::{PduConfig, PduHttpClient};
use crate::poller::Poller;
use crate::settings::PollingConfig;
use crate::status::{StatusReader, StatusReconciler};

/// One configured connection to a PDU: its command dispatcher and poll schedule.
/// An invalid configuration leaves both absent and is reported through the
/// module status. The reconciler is held on every path so snapshot readers stay
/// attached for the life of the instance.
pub struct PduInstance {
    reconciler: StatusReconciler,
    commander: Option<OutletCommander>,
    poller: Option<Poller<PduHttpClient>>,
}

impl PduInstance {
    pub fn init(
        pdu: &PduConfig,
        polling: &PollingConfig,
        verbose: bool,
        reconciler: StatusReconciler,
        status: ModuleStatusReporter,
    ) -> Self {
        let client = match pdu.new_client() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Invalid PDU configuration: {:?}", e);
                status.set(InstanceState::BadConfig, Some(e.to_string()));
                return Self {
                    reconciler,
                    commander: None,
                    poller: None,
                };
            }
        };

        tracing::info!("Connecting to PDU at {}", pdu.base_url());
        status.set(InstanceState::Ok, Some("Connected".to_string()));

        let commander = OutletCommander::new(client.clone(), reconciler.reader());
        let mut poller = Poller::new(client, reconciler.clone(), status, verbose);

        if polling.enabled {
            poller.start(polling.interval());
        } else {
            tracing::info!("Polling disabled");
        }

        Self {
            reconciler,
            commander: Some(commander),
            poller: Some(poller),
        }
    }

    /// Snapshot feed of this instance. Stays open while the instance lives,
    /// also when the configuration is invalid.
    pub fn status_reader(&self) -> StatusReader {
        self.reconciler.reader()
    }

    pub fn commander(&self) -> Option<OutletCommander> {
        self.commander.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(Poller::is_running)
    }

    pub fn destroy(&mut self) {
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
    }
}
