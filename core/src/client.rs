//! Stateless request builder and envelope parser for the record backend.
//!
//! # Design
//! `RecordClient` knows the backend's routes and envelope format but nothing
//! about any particular table. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! the `HttpResponse`; the caller executes the round trip in between. The
//! per-entity services in [`crate::services`] supply table names, field lists
//! and record shapes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::envelope::{
    join_ids, DataEnvelope, ErrorEnvelope, FetchParams, RecordResult, RecordsPayload,
    ResultsEnvelope,
};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::RecordId;

pub const PROJECT_ID_HEADER: &str = "x-project-id";
pub const PUBLIC_KEY_HEADER: &str = "x-public-key";

/// Synchronous, stateless client for the record backend.
#[derive(Debug, Clone)]
pub struct RecordClient {
    base_url: String,
    project_id: String,
    public_key: String,
}

impl RecordClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            public_key: config.public_key.clone(),
        }
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/tables/{table}/records", self.base_url)
    }

    fn headers(&self, with_body: bool) -> Vec<(String, String)> {
        let mut headers = vec![
            (PROJECT_ID_HEADER.to_string(), self.project_id.clone()),
            (PUBLIC_KEY_HEADER.to_string(), self.public_key.clone()),
        ];
        if with_body {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        headers
    }

    fn json_request<B: Serialize>(&self, method: HttpMethod, path: String, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(method, path, Some(body)))
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        debug!(method = method.as_str(), path = %path, "backend request built");
        HttpRequest {
            method,
            headers: self.headers(body.is_some()),
            path,
            body,
        }
    }

    pub fn build_fetch_records(&self, table: &str, params: &FetchParams) -> Result<HttpRequest, ApiError> {
        let path = format!("{}/query", self.records_url(table));
        self.json_request(HttpMethod::Post, path, params)
    }

    /// Field names are plain column identifiers and go into the query string
    /// unescaped.
    pub fn build_get_record(&self, table: &str, id: RecordId, fields: &[&str]) -> HttpRequest {
        let mut path = format!("{}/{id}", self.records_url(table));
        if !fields.is_empty() {
            path.push_str("?fields=");
            path.push_str(&fields.join(","));
        }
        self.request(HttpMethod::Get, path, None)
    }

    pub fn build_create_records<T: Serialize>(&self, table: &str, records: &[T]) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.records_url(table), &RecordsPayload { records })
    }

    pub fn build_update_records<T: Serialize>(&self, table: &str, records: &[T]) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, self.records_url(table), &RecordsPayload { records })
    }

    pub fn build_delete_records(&self, table: &str, ids: &[RecordId]) -> HttpRequest {
        let path = format!("{}?ids={}", self.records_url(table), join_ids(ids));
        self.request(HttpMethod::Delete, path, None)
    }

    /// Parse a query response. A successful envelope without `data` is an
    /// empty result set.
    pub fn parse_fetch_records<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<Vec<T>, ApiError> {
        let envelope: DataEnvelope<Vec<T>> = decode(&response)?;
        ensure_success(envelope.success, envelope.message)?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub fn parse_get_record<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        let envelope: DataEnvelope<T> = decode(&response)?;
        ensure_success(envelope.success, envelope.message)?;
        envelope.data.ok_or(ApiError::NotFound)
    }

    /// Parse a create or update response into the first successfully written
    /// record. `None` means the backend reported success without results.
    pub fn parse_mutation<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<Option<T>, ApiError> {
        let envelope: ResultsEnvelope<T> = decode(&response)?;
        ensure_success(envelope.success, envelope.message)?;
        let Some(results) = envelope.results else {
            return Ok(None);
        };
        reject_failures(&results)?;
        Ok(results.into_iter().filter(|r| r.success).find_map(|r| r.data))
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        let envelope: ResultsEnvelope<serde_json::Value> = decode(&response)?;
        ensure_success(envelope.success, envelope.message)?;
        if let Some(results) = envelope.results {
            reject_failures(&results)?;
        }
        Ok(())
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    if let Ok(ErrorEnvelope { message: Some(message) }) = serde_json::from_str(&response.body) {
        return Err(ApiError::Backend(message));
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn ensure_success(success: bool, message: Option<String>) -> Result<(), ApiError> {
    if success {
        return Ok(());
    }
    Err(ApiError::Backend(
        message.unwrap_or_else(|| "backend request failed".to_string()),
    ))
}

/// Fail with the first rejected record's reason, if any record was rejected.
fn reject_failures<T>(results: &[RecordResult<T>]) -> Result<(), ApiError> {
    let reasons: Vec<Option<String>> = results
        .iter()
        .filter(|r| !r.success)
        .map(RecordResult::failure_reason)
        .collect();
    let Some(first) = reasons.first() else {
        return Ok(());
    };
    warn!(failed = reasons.len(), ?reasons, "backend rejected records");
    Err(ApiError::RecordRejected(
        first.clone().unwrap_or_else(|| "record was rejected".to_string()),
    ))
}
