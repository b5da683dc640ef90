//! HTTP client for a Perkeep-style search and blob server.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::RANGE;
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::debug;

use super::{BackendError, BlobRef, SchemaMeta, SearchBackend, SearchQuery, SearchResult};
use crate::config::{Config, Credentials};

pub struct HttpSearchClient {
    client: reqwest::Client,
    search_url: String,
    blob_url: String,
    download_url: String,
    auth: Option<Credentials>,
}

impl HttpSearchClient {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            search_url: config.endpoint(&config.search_path),
            blob_url: config.endpoint(&config.blob_path),
            download_url: config.endpoint(&config.download_path),
            auth: config.auth.clone(),
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(c) => builder.basic_auth(&c.user, Some(&c.password)),
            None => builder,
        }
    }
}

async fn check_status(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SearchBackend for HttpSearchClient {
    async fn query(&self, query: &SearchQuery) -> Result<SearchResult, BackendError> {
        debug!("POST {} expression={:?}", self.search_url, query.expression);
        let resp = self
            .authorized(self.client.post(&self.search_url))
            .json(query)
            .send()
            .await?;
        let body = check_status(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_schema_meta(&self, blob: &BlobRef) -> Result<SchemaMeta, BackendError> {
        let url = format!("{}/{}", self.blob_url, blob);
        let resp = self.authorized(self.client.get(&url)).send().await?;
        let body = check_status(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn read_file(
        &self,
        blob: &BlobRef,
        offset: u64,
        size: u32,
    ) -> Result<Bytes, BackendError> {
        if size == 0 {
            return Ok(Bytes::new());
        }
        let url = format!("{}/{}", self.download_url, blob);
        let last = offset + u64::from(size) - 1;
        let resp = self
            .authorized(self.client.get(&url))
            .header(RANGE, format!("bytes={offset}-{last}"))
            .send()
            .await?;
        // Reading at or past EOF.
        if resp.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Bytes::new());
        }
        let partial = resp.status() == StatusCode::PARTIAL_CONTENT;
        let data = check_status(resp).await?.bytes().await?;
        if partial {
            return Ok(data);
        }
        // Server ignored the range and sent the whole file.
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(size as usize).min(data.len());
        Ok(data.slice(start..end))
    }
}
