//! Adapter for a managed vector service reached over HTTP.
//!
//! The request body is `{"vector": [...], "floor": f64, "limit": usize}`. The
//! response may be a bare array of rows, an object with a `matches` array, or
//! an object whose `match_array` field holds the rows as a JSON-encoded string
//! (warehouse services that aggregate rows server-side answer that way).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::query::rank_rows;
use crate::{IndexError, StoreRow, VectorStore};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_default()
});

/// Where and how to reach the remote store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RemoteStoreConfig {
    pub url: String,
    /// Sent verbatim as the `Authorization` header.
    #[serde(default)]
    pub auth_header: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl RemoteStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_header: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.url.trim().is_empty() {
            return Err(IndexError::InvalidQuery("remote store url must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(IndexError::InvalidQuery("remote store timeout must be > 0".into()));
        }
        Ok(())
    }
}

/// [`VectorStore`] that delegates similarity search to an HTTP service.
#[derive(Clone, Debug)]
pub struct HttpVectorStore {
    cfg: RemoteStoreConfig,
}

impl HttpVectorStore {
    pub fn new(cfg: RemoteStoreConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &RemoteStoreConfig {
        &self.cfg
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn similarity_search(
        &self,
        vector: &[f32],
        floor: f64,
        cap: usize,
    ) -> Result<Vec<StoreRow>, IndexError> {
        if vector.is_empty() {
            return Err(IndexError::InvalidQuery("query vector is empty".into()));
        }
        if cap == 0 {
            return Ok(Vec::new());
        }

        let payload = json!({ "vector": vector, "floor": floor, "limit": cap });
        let mut request = HTTP_CLIENT
            .post(&self.cfg.url)
            .timeout(Duration::from_secs(self.cfg.timeout_secs))
            .header("Content-Type", "application/json");
        if let Some(header) = self.cfg.auth_header.as_deref() {
            request = request.header("Authorization", header);
        }

        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(|e| IndexError::Unavailable(format!("request to vector store failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Unavailable(format!("HTTP error {status}: {body}")));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| IndexError::MalformedRows(format!("invalid JSON response: {e}")))?;

        let mut rows = parse_rows(body)?;
        rank_rows(&mut rows);
        log::debug!("remote store returned {} rows", rows.len());
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("remote store at {}", self.cfg.url)
    }
}

/// Decode whichever row envelope the service answered with.
pub(crate) fn parse_rows(body: Value) -> Result<Vec<StoreRow>, IndexError> {
    let rows = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => {
            if let Some(rows) = map.remove("matches") {
                rows
            } else if let Some(encoded) = map.remove("match_array") {
                match encoded {
                    Value::String(s) if s.trim().is_empty() => return Ok(Vec::new()),
                    Value::String(s) => serde_json::from_str(&s).map_err(|e| {
                        IndexError::MalformedRows(format!("match_array is not valid JSON: {e}"))
                    })?,
                    Value::Null => return Ok(Vec::new()),
                    other => other,
                }
            } else {
                return Err(IndexError::MalformedRows(
                    "response has neither `matches` nor `match_array`".into(),
                ));
            }
        }
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(IndexError::MalformedRows(format!(
                "unexpected response shape: {other}"
            )))
        }
    };

    if rows.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(rows).map_err(|e| IndexError::MalformedRows(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_rows() {
        let rows = parse_rows(json!([
            {"incident_id": "INC1", "short_desc": "a", "resolution": "b", "similarity": 0.8}
        ]))
        .unwrap();
        assert_eq!(rows, vec![StoreRow::new("INC1", "a", "b", 0.8)]);
    }

    #[test]
    fn matches_envelope() {
        let rows = parse_rows(json!({"matches": [
            {"incident_id": "INC2", "short_desc": "c", "resolution": "d", "similarity": 0.7}
        ]}))
        .unwrap();
        assert_eq!(rows[0].incident_id, "INC2");
    }

    #[test]
    fn match_array_string_envelope() {
        let encoded = r#"[{"incident_id":"INC3","short_desc":"e","resolution":"f","similarity":0.9}]"#;
        let rows = parse_rows(json!({ "match_array": encoded })).unwrap();
        assert_eq!(rows[0].similarity, 0.9);
    }

    #[test]
    fn empty_or_null_aggregates_mean_no_rows() {
        assert!(parse_rows(json!({ "match_array": null })).unwrap().is_empty());
        assert!(parse_rows(json!({ "match_array": "" })).unwrap().is_empty());
        assert!(parse_rows(json!({ "matches": null })).unwrap().is_empty());
        assert!(parse_rows(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn undecodable_rows_are_malformed() {
        assert!(matches!(
            parse_rows(json!({ "match_array": "not json" })),
            Err(IndexError::MalformedRows(_))
        ));
        assert!(matches!(
            parse_rows(json!([{ "incident_id": "INC4" }])),
            Err(IndexError::MalformedRows(_))
        ));
        assert!(matches!(
            parse_rows(json!({ "rows": [] })),
            Err(IndexError::MalformedRows(_))
        ));
        assert!(matches!(parse_rows(json!(42)), Err(IndexError::MalformedRows(_))));
    }

    #[test]
    fn config_validation() {
        assert!(HttpVectorStore::new(RemoteStoreConfig::new("")).is_err());
        let mut cfg = RemoteStoreConfig::new("http://localhost:9000/search");
        cfg.timeout_secs = 0;
        assert!(HttpVectorStore::new(cfg).is_err());
        let store = HttpVectorStore::new(RemoteStoreConfig::new("http://localhost:9000/search")).unwrap();
        assert_eq!(store.describe(), "remote store at http://localhost:9000/search");
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let mut cfg = RemoteStoreConfig::new("http://127.0.0.1:9/search");
        cfg.timeout_secs = 2;
        let store = HttpVectorStore::new(cfg).unwrap();
        let err = store.similarity_search(&[1.0], 0.6, 5).await.unwrap_err();
        assert!(matches!(err, IndexError::Unavailable(_)));
    }
}
