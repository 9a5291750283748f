//! Producers of the pass queue: the platform event stream and the periodic re-sync.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::dto::event::ChangeEvent;
use crate::model::trigger::ReconcileTrigger;
use crate::service::event_filter::trigger_for;
use crate::service::queue_service::{PassQueue, PushOutcome};
use crate::service::reconciler_service::record_skipped;

pub mod websocket;

pub const EVENTS_METRIC_NAME: &str = "lbsync_events_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Invalid,
    Ignored,
    Queued,
    Coalesced,
    Closed,
}

impl Dispatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dispatch::Invalid => "invalid",
            Dispatch::Ignored => "ignored",
            Dispatch::Queued => "queued",
            Dispatch::Coalesced => "coalesced",
            Dispatch::Closed => "closed",
        }
    }
}

impl From<PushOutcome> for Dispatch {
    fn from(value: PushOutcome) -> Self {
        match value {
            PushOutcome::Queued => Dispatch::Queued,
            PushOutcome::Coalesced => Dispatch::Coalesced,
            PushOutcome::Closed => Dispatch::Closed,
        }
    }
}

/// Parses one frame of the event stream and queues a pass when the event qualifies.
pub fn dispatch_message(message: &str, watched_kind: &str, queue: &PassQueue) -> Dispatch {
    let dispatch = match ChangeEvent::parse(message) {
        Err(err) => {
            log::warn!("Dropping unparsable event message - {err}");
            Dispatch::Invalid
        }
        Ok(event) if event.is_ping() => Dispatch::Ignored,
        Ok(event) => {
            log::debug!("Received event message: {message}");
            match trigger_for(&event, watched_kind) {
                Some(trigger) => Dispatch::from(queue.push(trigger)),
                None => {
                    record_skipped(&event);
                    Dispatch::Ignored
                }
            }
        }
    };
    metrics::counter!(EVENTS_METRIC_NAME, "decision" => dispatch.as_str()).increment(1);
    dispatch
}

/// Queues a full re-sync every `period` until the queue closes.
pub async fn run_resync(queue: PassQueue, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately, startup already queued its own pass
    interval.tick().await;
    loop {
        interval.tick().await;
        match queue.push(ReconcileTrigger::resync()) {
            PushOutcome::Closed => break,
            outcome => log::debug!("Periodic re-sync {outcome:?}"),
        }
    }
}
