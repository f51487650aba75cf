use std::sync::Arc;

use derive_more::Display;
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Ok,
    BadConfig,
    ConnectionFailure,
    UnknownWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub state: InstanceState,
    pub message: Option<String>,
}

/// Host-visible health of the module. Every component reports through a clone
/// of the same reporter; only actual changes are logged.
#[derive(Debug, Clone)]
pub struct ModuleStatusReporter {
    tx: Arc<watch::Sender<ModuleStatus>>,
}

impl ModuleStatus {
    pub fn new(state: InstanceState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: Some(message.into()),
        }
    }
}

impl ModuleStatusReporter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ModuleStatus::new(InstanceState::UnknownWarning, "Initializing"));
        Self { tx: Arc::new(tx) }
    }

    /// Returns whether the status actually changed.
    pub fn set(&self, state: InstanceState, message: Option<String>) -> bool {
        let status = ModuleStatus { state, message };

        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status.clone();
            true
        });

        if changed {
            match state {
                InstanceState::Ok => tracing::info!("Module status {}: {:?}", state, status.message),
                _ => tracing::warn!("Module status {}: {:?}", state, status.message),
            }
        }

        changed
    }

    pub fn ok(&self) -> bool {
        self.set(InstanceState::Ok, None)
    }

    pub fn current(&self) -> ModuleStatus {
        self.tx.borrow().clone()
    }
}

impl Default for ModuleStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn status_is_shared_between_clones() {
        let reporter = ModuleStatusReporter::new();
        let other = reporter.clone();

        other.set(InstanceState::BadConfig, Some("Missing IP address".to_string()));

        assert_eq!(
            reporter.current(),
            ModuleStatus::new(InstanceState::BadConfig, "Missing IP address")
        );
    }

    #[test]
    fn only_changes_are_reported() {
        let reporter = ModuleStatusReporter::new();

        assert!(reporter.ok());
        assert!(!reporter.ok());
        assert!(reporter.set(InstanceState::ConnectionFailure, Some("timeout".to_string())));
        assert!(!reporter.set(InstanceState::ConnectionFailure, Some("timeout".to_string())));
        assert!(reporter.set(InstanceState::ConnectionFailure, Some("refused".to_string())));
    }

    #[test]
    fn serializes_for_host() {
        let status = ModuleStatus::new(InstanceState::ConnectionFailure, "connection refused");

        assert_json_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({ "state": "connection_failure", "message": "connection refused" })
        );
    }
}
