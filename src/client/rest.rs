use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::error::GatewayError;
use crate::dto::rancher::CollectionDto;

/// Authenticated JSON client for the Cattle API.
#[derive(Clone)]
pub struct RancherClient {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
    secret_key: String,
}

impl RancherClient {
    pub fn new(base_url: &str, access_key: &str, secret_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: String::from(base_url.trim_end_matches('/')),
            access_key: String::from(access_key),
            secret_key: String::from(secret_key),
        })
    }

    pub fn http(&self) -> reqwest::Client {
        self.client.clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header(ACCEPT, "application/json")
    }

    async fn check(res: Response) -> Result<Response, GatewayError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(GatewayError::Status { status: status.as_u16(), body })
    }

    async fn decode<Res: DeserializeOwned>(res: Response) -> Result<Res, GatewayError> {
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
    }

    pub async fn get<Res: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<Res, GatewayError> {
        log::debug!("GET {url} {query:?}");
        let res = self.authorized(self.client.get(url))
            .query(query)
            .send()
            .await?;
        Self::decode(Self::check(res).await?).await
    }

    pub async fn post<Req: Serialize + ?Sized>(&self, url: &str, req: &Req) -> Result<(), GatewayError> {
        log::debug!("POST {url}");
        let res = self.authorized(self.client.post(url))
            .json(req)
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    /// Reads every page of a collection, following `pagination.next`.
    pub async fn list_all<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<T>, GatewayError> {
        let mut page: CollectionDto<T> = self.get(url, query).await?;
        let mut visited = HashSet::from([String::from(url)]);
        let mut items = Vec::new();
        loop {
            let next = page.next_page().map(String::from);
            items.append(&mut page.data);
            match next {
                Some(next) if visited.insert(next.clone()) => {
                    page = self.get(&next, &[]).await?;
                }
                Some(next) => {
                    log::warn!("Pagination loop detected at {next}, stopping");
                    break;
                }
                None => break,
            }
        }
        Ok(items)
    }
}
