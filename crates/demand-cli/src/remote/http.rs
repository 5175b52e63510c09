//! HTTP implementation of the document backend
//!
//! Talks to the demand document API over REST with an optional bearer token.

use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{DemandError, Result};
use crate::model::{date_key, DailyEntry, ShardKey};
use crate::remote::backend::{DocOp, DocumentBackend, ShardDoc, ShardFilter, HARD_BATCH_CAP};

/// User agent for document API requests
const API_USER_AGENT: &str = concat!("demand-cli/", env!("CARGO_PKG_VERSION"));

/// Document API client
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a new backend for the given base URL
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build the full URL for a given path
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build headers, with authorization when a token is configured
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// Make a GET request and deserialize the JSON response
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.build_url(path))
            .headers(self.build_headers())
            .send()
            .await
            .map_err(DemandError::Connectivity)?;

        let response = handle_response_status(response).await?;
        response.json().await.map_err(DemandError::Connectivity)
    }

    /// POST a JSON body and discard the response body
    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .client
            .post(self.build_url(path))
            .headers(self.build_headers())
            .json(body)
            .send()
            .await
            .map_err(DemandError::Connectivity)?;

        handle_response_status(response).await?;
        Ok(())
    }
}

/// Map response status codes to errors
async fn handle_response_status(response: Response) -> Result<Response> {
    let status = response.status();

    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(response),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(DemandError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

impl DocumentBackend for HttpBackend {
    async fn commit(&self, ops: &[DocOp]) -> Result<()> {
        if ops.len() > HARD_BATCH_CAP {
            return Err(DemandError::BatchTooLarge(ops.len()));
        }
        self.post_json("/v1/batch", &ops).await
    }

    async fn list_shards(
        &self,
        filter: &ShardFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ShardDoc>> {
        let mut path = String::from("/v1/shards?");
        if let Some(client) = &filter.client {
            path.push_str(&format!("client={}&", client));
        }
        if let Some(city) = &filter.city {
            path.push_str(&format!("city={}&", city));
        }
        if let Some(limit) = limit {
            path.push_str(&format!("limit={}&", limit));
        }
        let path = path.trim_end_matches(['&', '?']).to_string();

        // A failure here is fatal for the enclosing read call
        self.get_json(&path)
            .await
            .map_err(|e| DemandError::shard_enumeration(e.to_string()))
    }

    async fn get_daily(&self, key: &ShardKey, date: NaiveDate) -> Result<Option<DailyEntry>> {
        let path = format!("/v1/shards/{}/daily/{}", key, date_key(date));
        match self.get_json(&path).await {
            Ok(entry) => Ok(Some(entry)),
            Err(DemandError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_daily_range(
        &self,
        key: &ShardKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyEntry>> {
        // Bounds are the YYYY-MM-DD strings; the server compares keys
        // lexicographically, which matches chronological order under that
        // format only.
        let path = format!(
            "/v1/shards/{}/daily?start={}&end={}",
            key,
            date_key(start),
            date_key(end)
        );
        self.get_json(&path).await
    }

    async fn list_daily_dates(&self, key: &ShardKey) -> Result<Vec<NaiveDate>> {
        let path = format!("/v1/shards/{}/dates", key);
        self.get_json(&path).await
    }
}
