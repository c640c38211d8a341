//! Assignment persistence boundary.
//!
//! Provides the `AssignmentStore` trait plus an in-memory and a REST
//! implementation. The engine never writes anywhere itself: callers hand the
//! approved selection to a store, and use [`AssignedIds`] to drop already
//! assigned profiles before the next computation.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;

use mentormatch_model::{AssignmentRecord, RawProfile};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from assignment store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Store not available")]
    Unavailable,
}

/// Trait for assignment stores (in-memory, REST, etc.)
///
/// Writes are upserts keyed on `(mentor_id, mentee_id)`; uniqueness rules
/// beyond that key belong to the store.
pub trait AssignmentStore {
    /// Insert or update records. Returns the number written.
    fn upsert(
        &self,
        records: &[AssignmentRecord],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Fetch every stored assignment.
    fn assigned(&self) -> impl Future<Output = Result<Vec<AssignmentRecord>, StoreError>> + Send;

    /// Get the store name for logging.
    fn name(&self) -> &'static str;
}

/// Process-local store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<(String, String), AssignmentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssignmentStore for MemoryStore {
    async fn upsert(&self, records: &[AssignmentRecord]) -> Result<usize, StoreError> {
        let mut rows = self.rows.lock().await;
        for record in records {
            rows.insert(
                (record.mentor_id.clone(), record.mentee_id.clone()),
                record.clone(),
            );
        }
        Ok(records.len())
    }

    async fn assigned(&self) -> Result<Vec<AssignmentRecord>, StoreError> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// REST store configuration (PostgREST-style endpoint).
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the REST API
    pub base_url: String,
    /// Table holding assignments
    pub table_name: String,
    /// API key sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            table_name: "mentor_mentee".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Store backed by a PostgREST-compatible HTTP API.
pub struct RestStore {
    config: RestConfig,
    client: reqwest::Client,
}

impl RestStore {
    /// Create a new REST store.
    pub fn new(config: RestConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table_name
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }
}

impl AssignmentStore for RestStore {
    async fn upsert(&self, records: &[AssignmentRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        tracing::debug!(count = records.len(), table = %self.config.table_name, "Upserting assignments");

        let request = self
            .client
            .post(self.table_url())
            .query(&[("on_conflict", "mentor_id,mentee_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(records);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(records.len())
    }

    async fn assigned(&self) -> Result<Vec<AssignmentRecord>, StoreError> {
        let request = self
            .client
            .get(self.table_url())
            .query(&[("select", "mentor_id,mentee_id,score,approved")]);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::ParseError(e.to_string()))?;
        parse_records(&body)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> StoreError {
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        StoreError::Unavailable
    } else {
        StoreError::RequestFailed(format!("HTTP {}: {}", status, body))
    }
}

fn parse_records(body: &str) -> Result<Vec<AssignmentRecord>, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::ParseError(e.to_string()))
}

/// Mentor and mentee ids that already hold an assignment.
#[derive(Debug, Clone, Default)]
pub struct AssignedIds {
    pub mentors: HashSet<String>,
    pub mentees: HashSet<String>,
}

impl AssignedIds {
    pub fn from_records(records: &[AssignmentRecord]) -> Self {
        Self {
            mentors: records.iter().map(|r| r.mentor_id.clone()).collect(),
            mentees: records.iter().map(|r| r.mentee_id.clone()).collect(),
        }
    }

    /// Drop profiles that are already assigned from both pools.
    ///
    /// Raw ids are compared trimmed, the way they are stored.
    pub fn retain_unassigned(&self, mentors: &mut Vec<RawProfile>, mentees: &mut Vec<RawProfile>) {
        let (before_mentors, before_mentees) = (mentors.len(), mentees.len());
        mentors.retain(|p| !self.mentors.contains(p.id.trim()));
        mentees.retain(|p| !self.mentees.contains(p.id.trim()));
        tracing::debug!(
            mentors_excluded = before_mentors - mentors.len(),
            mentees_excluded = before_mentees - mentees.len(),
            "Excluded assigned profiles"
        );
    }
}
