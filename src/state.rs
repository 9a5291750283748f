use axum::extract::FromRef;

use lb_sync::service::queue_service::PassQueue;
use lb_sync::service::worker_service::StatusBoard;

#[derive(Clone)]
pub struct SyncState {
    queue: PassQueue,
    status: StatusBoard,
}

impl SyncState {
    pub fn new(queue: PassQueue, status: StatusBoard) -> Self {
        Self { queue, status }
    }
}

impl FromRef<SyncState> for PassQueue {
    fn from_ref(app_state: &SyncState) -> Self {
        app_state.queue.clone()
    }
}

impl FromRef<SyncState> for StatusBoard {
    fn from_ref(app_state: &SyncState) -> Self {
        app_state.status.clone()
    }
}
