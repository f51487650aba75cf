mod outlet;
mod sensor;

use std::sync::Arc;

use tokio::sync::watch;

use crate::pdu::StatusDocument;

pub use outlet::{OutletChoice, OutletChoices, outlet_name};
pub use sensor::{SensorMap, SensorReading, flatten};

/// Most recent status document, `None` until the first successful poll.
pub type Snapshot = Option<Arc<StatusDocument>>;

/// Single writer of the device snapshot. Every accepted document replaces the
/// previous one as a whole; readers never observe a partially applied update.
#[derive(Debug, Clone)]
pub struct StatusReconciler {
    tx: Arc<watch::Sender<Snapshot>>,
}

/// Read-only view of the snapshot for command handlers and host derivations.
#[derive(Debug, Clone)]
pub struct StatusReader {
    rx: watch::Receiver<Snapshot>,
}

impl StatusReconciler {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn reconcile(&self, doc: StatusDocument) {
        tracing::trace!("Reconciling status with {} outlets", doc.outputs.len());
        self.tx.send_replace(Some(Arc::new(doc)));
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader { rx: self.tx.subscribe() }
    }
}

impl Default for StatusReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReader {
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next replacement of the snapshot and returns it.
    /// Returns `None` once the reconciler is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> StatusDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_before_first_reconcile() {
        let reconciler = StatusReconciler::new();

        assert!(reconciler.reader().current().is_none());
    }

    #[test]
    fn reconcile_replaces_whole_snapshot() {
        let reconciler = StatusReconciler::new();
        let reader = reconciler.reader();

        reconciler.reconcile(doc(json!({
            "outputs": [{ "name": "A", "state": 1 }, { "name": "B", "state": 0 }],
            "misc": { "hostname": "pdu-1" },
            "sensor_descr": [{ "type": 51, "num": 1, "fields": [], "properties": [] }]
        })));
        reconciler.reconcile(doc(json!({
            "outputs": [{ "name": "A", "state": 0 }]
        })));

        let current = reader.current().unwrap();
        assert_eq!(current.outputs.len(), 1);
        assert!(current.outputs[0].is_off());
        assert!(current.misc.is_none());
        assert!(current.sensor_descr.is_none());
    }

    #[test]
    fn held_snapshot_is_not_mutated_by_later_reconcile() {
        let reconciler = StatusReconciler::new();
        let reader = reconciler.reader();

        reconciler.reconcile(doc(json!({ "outputs": [{ "name": "A", "state": 1 }] })));
        let held = reader.current().unwrap();

        reconciler.reconcile(doc(json!({ "outputs": [{ "name": "A", "state": 0 }] })));

        assert!(held.outputs[0].is_on());
        assert!(reader.current().unwrap().outputs[0].is_off());
    }

    #[tokio::test]
    async fn reader_is_notified_of_replacement() {
        let reconciler = StatusReconciler::new();
        let mut reader = reconciler.reader();

        let handle = tokio::spawn(async move { reader.next().await });
        tokio::task::yield_now().await;
        reconciler.reconcile(doc(json!({ "outputs": [{ "name": "A", "state": 1 }] })));

        let snapshot = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(snapshot.outputs.len(), 1);
    }

    #[tokio::test]
    async fn reader_ends_when_reconciler_is_dropped() {
        let reconciler = StatusReconciler::new();
        let mut reader = reconciler.reader();
        drop(reconciler);

        assert!(reader.next().await.is_none());
    }
}
