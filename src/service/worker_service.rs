use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::dto::status::PassReportDto;
use crate::model::trigger::ReconcileTrigger;
use crate::service::queue_service::PassQueue;
use crate::service::reconciler_service::Reconciler;
use crate::service::webhook_service::WebhookNotifier;

/// Report of the most recent pass, shared with the management endpoints.
pub type StatusBoard = Arc<RwLock<Option<PassReportDto>>>;

/// Drains the pass queue one trigger at a time.
pub struct PassWorker {
    queue: PassQueue,
    reconciler: Arc<Reconciler>,
    webhook: Option<WebhookNotifier>,
    status: StatusBoard,
}

impl PassWorker {
    pub fn new(
        queue: PassQueue,
        reconciler: Arc<Reconciler>,
        webhook: Option<WebhookNotifier>,
        status: StatusBoard,
    ) -> Self {
        Self {
            queue,
            reconciler,
            webhook,
            status,
        }
    }

    pub async fn run(self) {
        while let Some(trigger) = self.queue.next().await {
            self.run_once(&trigger).await;
        }
        log::info!("Pass queue closed, worker stopped");
    }

    /// A failed pass is reported and left for the next trigger to heal.
    pub async fn run_once(&self, trigger: &ReconcileTrigger) -> PassReportDto {
        let (result, report) = self.reconciler.reconcile_with_report(trigger).await;
        if let (Ok(summary), Some(webhook)) = (result, &self.webhook) {
            if webhook.should_notify(trigger) {
                webhook.notify(summary.entries);
            }
        }
        *self.status.write().await = Some(report.clone());
        report
    }
}

/// Closes the queue and waits up to `bound` for the worker to run the passes still pending.
/// Returns whether the worker stopped in time.
pub async fn drain_worker(queue: &PassQueue, worker: JoinHandle<()>, bound: Duration) -> bool {
    queue.close();
    match tokio::time::timeout(bound, worker).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            log::error!("Pass worker aborted - {err}");
            false
        }
        Err(_) => {
            log::warn!("Pending passes not drained within {bound:?}, {} left", queue.len());
            false
        }
    }
}
