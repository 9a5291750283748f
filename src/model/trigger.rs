use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::service::ServiceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerOrigin {
    Event,
    Startup,
    Resync,
    Manual,
}

/// What is left of an event once it has been judged worth a pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileTrigger {
    pub origin: TriggerOrigin,
    pub state: Option<ServiceState>,
    pub environment_id: Option<String>,
}

impl ReconcileTrigger {
    pub fn event(state: ServiceState, environment_id: Option<String>) -> Self {
        Self {
            origin: TriggerOrigin::Event,
            state: Some(state),
            environment_id,
        }
    }

    pub fn startup() -> Self {
        Self::synthetic(TriggerOrigin::Startup)
    }

    pub fn resync() -> Self {
        Self::synthetic(TriggerOrigin::Resync)
    }

    pub fn manual() -> Self {
        Self::synthetic(TriggerOrigin::Manual)
    }

    fn synthetic(origin: TriggerOrigin) -> Self {
        Self {
            origin,
            state: None,
            environment_id: None,
        }
    }
}

impl fmt::Display for ReconcileTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match self.origin {
            TriggerOrigin::Event => "event",
            TriggerOrigin::Startup => "startup",
            TriggerOrigin::Resync => "resync",
            TriggerOrigin::Manual => "manual",
        };
        f.write_str(origin)?;
        if let Some(state) = &self.state {
            write!(f, ":{state}")?;
        }
        if let Some(environment_id) = &self.environment_id {
            write!(f, "@{environment_id}")?;
        }
        Ok(())
    }
}
