use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::model::trigger::ReconcileTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// An identical trigger is already waiting, its pass will observe this change too.
    Coalesced,
    Closed,
}

#[derive(Default)]
struct QueueState {
    triggers: VecDeque<ReconcileTrigger>,
    closed: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    notify: Notify,
}

/// FIFO of pending passes drained by a single worker.
#[derive(Clone)]
pub struct PassQueue {
    inner: Arc<QueueInner>,
}

impl Default for PassQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PassQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, trigger: ReconcileTrigger) -> PushOutcome {
        let outcome = {
            let mut state = self.state();
            if state.closed {
                PushOutcome::Closed
            } else if state.triggers.contains(&trigger) {
                PushOutcome::Coalesced
            } else {
                state.triggers.push_back(trigger);
                PushOutcome::Queued
            }
        };
        if outcome == PushOutcome::Queued {
            self.inner.notify.notify_one();
        }
        outcome
    }

    /// Waits for the next trigger. `None` once the queue is closed and drained.
    pub async fn next(&self) -> Option<ReconcileTrigger> {
        loop {
            {
                let mut state = self.state();
                if let Some(trigger) = state.triggers.pop_front() {
                    return Some(trigger);
                }
                if state.closed {
                    return None;
                }
            }
            self.inner.notify.notified().await;
        }
    }

    pub fn close(&self) {
        self.state().closed = true;
        self.inner.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state().triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
