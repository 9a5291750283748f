use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use crate::core::config::LbSyncConfig;
use crate::core::error::SubscriptionError;
use crate::service::queue_service::PassQueue;
use crate::subscription::{dispatch_message, Dispatch};

pub const SUBSCRIBE_PATH: &str = "subscribe?eventNames=resource.change";

pub fn subscribe_url(cattle_url: &str) -> String {
    let ws_url = if let Some(rest) = cattle_url.strip_prefix("https:") {
        format!("wss:{rest}")
    } else if let Some(rest) = cattle_url.strip_prefix("http:") {
        format!("ws:{rest}")
    } else {
        String::from(cattle_url)
    };
    format!("{}/{SUBSCRIBE_PATH}", ws_url.trim_end_matches('/'))
}

pub fn basic_auth_header(access_key: &str, secret_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{access_key}:{secret_key}")))
}

/// Long-lived `resource.change` subscription.
pub struct EventSubscription {
    url: String,
    authorization: String,
    watched_kind: String,
}

impl EventSubscription {
    pub fn new(cattle_url: &str, access_key: &str, secret_key: &str, watched_kind: &str) -> Self {
        Self {
            url: subscribe_url(cattle_url),
            authorization: basic_auth_header(access_key, secret_key),
            watched_kind: String::from(watched_kind),
        }
    }

    pub fn from_config(conf: &LbSyncConfig) -> Self {
        Self::new(&conf.cattle_url, &conf.cattle_access_key, &conf.cattle_secret_key, &conf.watched_resource_type)
    }

    /// Feeds the queue until the connection ends. Always returns an error: the stream is not
    /// supposed to end while the process runs.
    pub async fn run(&self, queue: PassQueue) -> Result<(), SubscriptionError> {
        let mut request = self.url.as_str()
            .into_client_request()
            .map_err(|err| SubscriptionError::InvalidRequest(err.to_string()))?;
        let authorization = HeaderValue::from_str(&self.authorization)
            .map_err(|err| SubscriptionError::InvalidRequest(err.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, authorization);

        let (mut stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(SubscriptionError::Connect)?;
        log::info!("Websocket connection opened on {}", self.url);

        while let Some(frame) = stream.next().await {
            match frame.map_err(SubscriptionError::Stream)? {
                Message::Text(text) => {
                    if dispatch_message(&text, &self.watched_kind, &queue) == Dispatch::Closed {
                        log::info!("Pass queue closed, leaving subscription");
                        return Ok(());
                    }
                }
                Message::Close(frame) => {
                    log::info!("Websocket connection closed by server {frame:?}");
                    break;
                }
                _ => {}
            }
        }
        Err(SubscriptionError::Closed)
    }
}
