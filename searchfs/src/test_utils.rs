//! Scripted backend and describe-payload builders for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value, json};

use crate::backend::{BackendError, BlobRef, SchemaMeta, SearchBackend, SearchQuery, SearchResult};

/// Answers every query with the configured result, or a 503 when unset.
pub struct MockBackend {
    result: Mutex<Option<SearchResult>>,
    contents: Mutex<HashMap<String, Bytes>>,
    last_query: Mutex<Option<SearchQuery>>,
    queries: AtomicUsize,
    schema_fetches: AtomicUsize,
    delay: Duration,
}

impl MockBackend {
    pub fn new(result: SearchResult) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            contents: Mutex::new(HashMap::new()),
            last_query: Mutex::new(None),
            queries: AtomicUsize::new(0),
            schema_fetches: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        let backend = Self::new(SearchResult::default());
        backend.set_result(None);
        backend
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Registers file bytes; such blobs also get a `file` schema.
    pub fn with_content(self, blob: &str, data: &'static [u8]) -> Self {
        self.contents
            .lock()
            .unwrap()
            .insert(blob.to_string(), Bytes::from_static(data));
        self
    }

    pub fn set_result(&self, result: Option<SearchResult>) {
        *self.result.lock().unwrap() = result;
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn schema_fetches(&self) -> usize {
        self.schema_fetches.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<SearchQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

fn unavailable() -> BackendError {
    BackendError::Status {
        status: 503,
        body: "unavailable".into(),
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn query(&self, query: &SearchQuery) -> Result<SearchResult, BackendError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.lock().unwrap().clone().ok_or_else(unavailable)
    }

    async fn fetch_schema_meta(&self, blob: &BlobRef) -> Result<SchemaMeta, BackendError> {
        self.schema_fetches.fetch_add(1, Ordering::SeqCst);
        let contents = self.contents.lock().unwrap();
        let data = contents.get(blob.as_str()).ok_or_else(unavailable)?;
        Ok(SchemaMeta {
            camli_type: "file".into(),
            size: Some(data.len() as u64),
        })
    }

    async fn read_file(
        &self,
        blob: &BlobRef,
        offset: u64,
        size: u32,
    ) -> Result<Bytes, BackendError> {
        let contents = self.contents.lock().unwrap();
        let data = contents.get(blob.as_str()).ok_or_else(unavailable)?;
        let start = (offset as usize).min(data.len());
        let end = (start + size as usize).min(data.len());
        Ok(data.slice(start..end))
    }
}

/// Builds a search response the way the server would encode it.
#[derive(Default)]
pub struct ResultBuilder {
    blobs: Vec<Value>,
    meta: Map<String, Value>,
}

impl ResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn hit(mut self, permanode: &str) -> Self {
        self.blobs.push(json!({ "blob": permanode }));
        self
    }

    fn permanode(mut self, permanode: &str, attr: Value) -> Self {
        self.meta.insert(
            permanode.to_string(),
            json!({
                "blobRef": permanode,
                "camliType": "permanode",
                "permanode": { "attr": attr },
            }),
        );
        self.hit(permanode)
    }

    fn content(mut self, content: &str, body: Value) -> Self {
        let mut obj = json!({ "blobRef": content });
        if let (Some(obj), Value::Object(extra)) = (obj.as_object_mut(), body) {
            obj.extend(extra);
        }
        self.meta.insert(content.to_string(), obj);
        self
    }

    pub fn file(
        self,
        permanode: &str,
        content: &str,
        name: &str,
        mime_type: &str,
        time: Option<&str>,
    ) -> Self {
        self.permanode(permanode, json!({ "camliContent": [content] }))
            .content(
                content,
                json!({
                    "camliType": "file",
                    "file": { "fileName": name, "size": 0, "mimeType": mime_type, "time": time },
                }),
            )
    }

    pub fn sized_file(self, permanode: &str, content: &str, name: &str, size: u64) -> Self {
        self.permanode(permanode, json!({ "camliContent": [content] }))
            .content(
                content,
                json!({
                    "camliType": "file",
                    "file": { "fileName": name, "size": size, "mimeType": "text/plain" },
                }),
            )
    }

    pub fn dir(self, permanode: &str, content: &str, name: &str) -> Self {
        self.permanode(permanode, json!({ "camliContent": [content] }))
            .content(
                content,
                json!({ "camliType": "directory", "dir": { "fileName": name } }),
            )
    }

    pub fn opaque_content(self, permanode: &str, content: &str) -> Self {
        self.permanode(permanode, json!({ "camliContent": [content] }))
            .content(content, json!({ "camliType": "bytes" }))
    }

    pub fn hit_without_meta(self, permanode: &str) -> Self {
        self.hit(permanode)
    }

    pub fn non_permanode(mut self, blob: &str) -> Self {
        self.meta.insert(
            blob.to_string(),
            json!({ "blobRef": blob, "camliType": "file" }),
        );
        self.hit(blob)
    }

    pub fn permanode_without_content(self, permanode: &str) -> Self {
        self.permanode(permanode, json!({ "title": ["untitled"] }))
    }

    /// Points at `content` without describing it.
    pub fn permanode_with_content(self, permanode: &str, content: &str) -> Self {
        self.permanode(permanode, json!({ "camliContent": [content] }))
    }

    /// Adds a hit whose description is `meta` verbatim.
    pub fn raw_hit(self, blob: &str, meta: Value) -> Self {
        self.raw_meta(blob, meta).hit(blob)
    }

    /// Describes `blob` with `meta` verbatim, without adding a hit.
    pub fn raw_meta(mut self, blob: &str, meta: Value) -> Self {
        self.meta.insert(blob.to_string(), meta);
        self
    }

    pub fn build(self) -> SearchResult {
        serde_json::from_value(json!({
            "blobs": self.blobs,
            "description": { "meta": self.meta },
        }))
        .expect("valid search result")
    }

    pub fn build_without_description(self) -> SearchResult {
        serde_json::from_value(json!({ "blobs": self.blobs })).expect("valid search result")
    }
}
