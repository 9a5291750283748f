use crate::core::error::GatewayError;
use crate::model::entry::DesiredEntrySet;
use crate::model::service::ServiceState;
use crate::model::trigger::ReconcileTrigger;

/// Best-effort delivery of the applied entries to an external endpoint.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    states: Vec<ServiceState>,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: &str, states: Vec<ServiceState>) -> Self {
        Self {
            client,
            url: String::from(url),
            states,
        }
    }

    /// Only lifecycle transitions listed in the configuration fire the webhook.
    pub fn should_notify(&self, trigger: &ReconcileTrigger) -> bool {
        trigger.state.as_ref()
            .map(|state| self.states.contains(state))
            .unwrap_or(false)
    }

    pub async fn send(&self, entries: &DesiredEntrySet) -> Result<(), GatewayError> {
        log::info!("Sending webhook with {} entries", entries.len());
        let res = self.client.post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(entries)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }
        log::info!("Webhook sent");
        Ok(())
    }

    /// Fire-and-forget variant of [`send`](Self::send).
    pub fn notify(&self, entries: DesiredEntrySet) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.send(&entries).await {
                log::warn!("Webhook delivery to {} failed - {err}", notifier.url);
            }
        });
    }
}
