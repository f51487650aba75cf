use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::host::{InstanceState, ModuleStatusReporter};
use crate::pdu::StatusDocument;
use crate::status::StatusReconciler;

pub trait StatusSource: Send + Sync + 'static {
    fn fetch_status(&self) -> impl Future<Output = anyhow::Result<StatusDocument>> + Send;
}

/// Periodically fetches the device status and hands every successfully parsed
/// document to the reconciler.
///
/// At most one fetch is outstanding at any time, also across restarts of the
/// schedule: a tick that finds a fetch still running is skipped.
pub struct Poller<S> {
    task: PollTask<S>,
    schedule: Option<Schedule>,
}

struct Schedule {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct PollTask<S> {
    source: Arc<S>,
    reconciler: StatusReconciler,
    status: ModuleStatusReporter,
    verbose: bool,
    in_flight: Arc<Mutex<()>>,
}

impl<S> Clone for PollTask<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            reconciler: self.reconciler.clone(),
            status: self.status.clone(),
            verbose: self.verbose,
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<S: StatusSource> Poller<S> {
    pub fn new(source: S, reconciler: StatusReconciler, status: ModuleStatusReporter, verbose: bool) -> Self {
        Self {
            task: PollTask {
                source: Arc::new(source),
                reconciler,
                status,
                verbose,
                in_flight: Arc::new(Mutex::new(())),
            },
            schedule: None,
        }
    }

    /// Starts polling at the given interval, replacing a running schedule.
    pub fn start(&mut self, interval: Duration) {
        self.stop();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.task.clone().run(interval, cancel.clone()));

        tracing::info!("Started polling PDU status every {}ms", interval.as_millis());
        self.schedule = Some(Schedule { cancel, handle });
    }

    /// Halts future polls. A fetch already in flight completes, but its result is discarded.
    pub fn stop(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            schedule.cancel.cancel();
            tracing::info!("Stopped polling PDU status");
        }
    }

    pub fn is_running(&self) -> bool {
        self.schedule.as_ref().is_some_and(|s| !s.handle.is_finished())
    }
}

impl<S> Drop for Poller<S> {
    fn drop(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            schedule.cancel.cancel();
        }
    }
}

impl<S: StatusSource> PollTask<S> {
    async fn run(self, interval: Duration, cancel: CancellationToken) {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            let Ok(_guard) = self.in_flight.try_lock() else {
                tracing::warn!("Polling skipped: previous request still running");
                continue;
            };

            let result = self.source.fetch_status().await;

            if cancel.is_cancelled() {
                tracing::debug!("Discarding poll result after stop");
                break;
            }

            self.handle_result(result);
        }
    }

    fn handle_result(&self, result: anyhow::Result<StatusDocument>) {
        match result {
            Ok(doc) => {
                if self.verbose {
                    tracing::debug!("Polled PDU status with {} outlets", doc.outputs.len());
                }

                if doc.outputs.is_empty() {
                    self.status
                        .set(InstanceState::UnknownWarning, Some("No outlets available".to_string()));
                } else {
                    self.status.ok();
                }

                self.reconciler.reconcile(doc);
            }
            Err(e) => {
                tracing::debug!("Error polling PDU status: {:?}", e);
                self.status
                    .set(InstanceState::ConnectionFailure, Some(format!("{:#}", e)));
            }
        }
    }
}
