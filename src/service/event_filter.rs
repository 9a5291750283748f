use crate::dto::event::ChangeEvent;
use crate::model::service::ServiceState;
use crate::model::trigger::ReconcileTrigger;

/// Extracts the pass trigger carried by an event, if the event is worth a pass at all.
///
/// Only the kind of the resource and its resulting lifecycle state matter: every pass
/// recomputes the whole desired state, so the identity of the changed service is dropped.
pub fn trigger_for(event: &ChangeEvent, watched_kind: &str) -> Option<ReconcileTrigger> {
    if event.is_ping() {
        return None;
    }
    match event.resource_type.as_deref() {
        Some(kind) if kind == watched_kind => {}
        other => {
            log::debug!("Ignoring '{}' event on resource type {other:?}", event.name);
            return None;
        }
    }
    let Some(resource) = event.resource() else {
        log::debug!("Ignoring '{}' event without resource payload", event.name);
        return None;
    };
    match &resource.state {
        Some(state) if state.triggers_reconcile() => {
            log::debug!("Event '{}' on {} {} ({state}) triggers a pass", event.name, watched_kind, resource.id);
            Some(ReconcileTrigger::event(state.clone(), resource.environment_id.clone()))
        }
        state => {
            log::debug!("Ignoring {} {} in state {:?}", watched_kind, resource.id, state.as_ref().map(ServiceState::as_str));
            None
        }
    }
}

pub fn should_reconcile(event: &ChangeEvent, watched_kind: &str) -> bool {
    trigger_for(event, watched_kind).is_some()
}
