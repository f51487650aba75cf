use std::sync::Arc;

use tokio::sync::watch;

use super::actions::{self, ActionDefinition};
use super::feedbacks::{self, FeedbackDefinition};
use super::variables::{self, VariableDefinition, VariableValues};
use crate::status::{OutletChoices, SensorMap, Snapshot, StatusReader, flatten};

/// Everything the host sees, derived from one snapshot. Replaced as a whole
/// whenever a new snapshot arrives.
#[derive(Debug, Clone)]
pub struct HostState {
    pub snapshot: Snapshot,
    pub choices: OutletChoices,
    pub sensors: SensorMap,
    pub actions: Vec<ActionDefinition>,
    pub feedbacks: Vec<FeedbackDefinition>,
    pub variable_definitions: Vec<VariableDefinition>,
    pub variable_values: VariableValues,
}

impl HostState {
    pub fn derive(snapshot: Snapshot) -> Self {
        let doc = snapshot.as_deref();
        let choices = OutletChoices::from_snapshot(doc);
        let sensors = doc.map(flatten).unwrap_or_default();

        Self {
            actions: actions::definitions(&choices),
            feedbacks: feedbacks::definitions(&choices),
            variable_definitions: variables::definitions(doc, &sensors),
            variable_values: variables::values(doc, &sensors),
            choices,
            sensors,
            snapshot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostRegistry {
    rx: watch::Receiver<Arc<HostState>>,
}

pub struct HostRegistryRunner {
    status: StatusReader,
    tx: watch::Sender<Arc<HostState>>,
}

impl HostRegistry {
    pub fn new(status: StatusReader) -> (Self, HostRegistryRunner) {
        let initial = Arc::new(HostState::derive(status.current()));
        let (tx, rx) = watch::channel(initial);

        (Self { rx }, HostRegistryRunner { status, tx })
    }

    pub fn current(&self) -> Arc<HostState> {
        self.rx.borrow().clone()
    }
}

impl HostRegistryRunner {
    pub async fn run(mut self) {
        while let Some(snapshot) = self.status.next().await {
            let current = Arc::new(HostState::derive(snapshot));
            let previous = self.tx.send_replace(current.clone());

            if previous.variable_definitions != current.variable_definitions {
                tracing::info!(
                    "Variable definitions changed, now {} variables",
                    current.variable_definitions.len()
                );
            }
            if previous.choices != current.choices {
                tracing::info!("Outlet choices changed, now {} outlets", current.choices.outlets.len());
            }
        }

        tracing::debug!("Status reconciler closed, stopping host registry");
    }
}
