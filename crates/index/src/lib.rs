//! # Incident Index
//!
//! Storage and similarity search over the corpus of historical incidents.
//! The pipeline only ever reads from this corpus; writes happen when the
//! corpus is loaded at startup.
//!
//! ## Core Features
//!
//! - **[`VectorStore`] seam**: the one call the resolver makes, "give me the
//!   rows whose cosine similarity to this vector clears `floor`, best first,
//!   at most `cap` of them". Two implementations ship here:
//!   - [`IncidentIndex`], an embedded index over a pluggable [`IndexBackend`]
//!     (in-memory today), loaded from a JSON or JSON-lines corpus file.
//!   - [`HttpVectorStore`], an adapter for a managed vector service reached over HTTP.
//! - **Compact storage**: records are bincode-encoded and zstd-compressed before
//!   they reach the backend.
//!
//! ## Example Usage
//!
//! ```
//! use index::{BackendConfig, HistoricalIncident, IncidentIndex, IndexConfig};
//!
//! let index = IncidentIndex::new(IndexConfig::new().with_backend(BackendConfig::in_memory())).unwrap();
//! index
//!     .upsert(&HistoricalIncident::new("INC001", "Gateway 504", "Restarted LB", vec![1.0, 0.0]))
//!     .unwrap();
//!
//! let rows = index.search(&[1.0, 0.0], 0.60, 5).unwrap();
//! assert_eq!(rows[0].incident_id, "INC001");
//! ```

mod backend;
mod corpus;
mod query;
mod remote;
mod store;

pub use backend::{BackendConfig, InMemoryBackend, IndexBackend};
pub use query::cosine_similarity;
pub use remote::{HttpVectorStore, RemoteStoreConfig};
pub use store::{StoreRow, VectorStore};

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Bump this value whenever the stored `HistoricalIncident` layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

/// A past incident with its precomputed embedding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoricalIncident {
    /// Schema version for backward compatibility when deserializing.
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub incident_id: String,
    pub short_desc: String,
    /// Resolution narrative recorded when the incident was closed.
    pub resolution: String,
    /// Embedding of the incident's full text, computed offline.
    pub embedding: Vec<f32>,
}

impl HistoricalIncident {
    pub fn new(
        incident_id: impl Into<String>,
        short_desc: impl Into<String>,
        resolution: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            incident_id: incident_id.into(),
            short_desc: short_desc.into(),
            resolution: resolution.into(),
            embedding,
        }
    }

    fn validate(&self) -> Result<(), IndexError> {
        if self.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::Corpus(format!(
                "incident {} has schema version {}, expected {INDEX_SCHEMA_VERSION}",
                self.incident_id, self.schema_version
            )));
        }
        if self.incident_id.trim().is_empty() {
            return Err(IndexError::Corpus("incident_id must not be empty".into()));
        }
        if self.embedding.is_empty() {
            return Err(IndexError::Corpus(format!(
                "incident {} has an empty embedding",
                self.incident_id
            )));
        }
        if self.embedding.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::Corpus(format!(
                "incident {} has a non-finite embedding value",
                self.incident_id
            )));
        }
        Ok(())
    }
}

const fn default_schema_version() -> u16 {
    INDEX_SCHEMA_VERSION
}

/// Compression codec options for index storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CompressionCodec {
    None,
    /// Zstd compression (default).
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for initializing the index.
#[derive(Clone, Debug, Default)]
pub struct IndexConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

/// Errors raised by the store layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Zstd(String),
    /// The corpus file or a record in it is unusable.
    #[error("Corpus error: {0}")]
    Corpus(String),
    /// The remote store is unreachable or answered with an error status.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// The store answered, but its rows could not be decoded.
    #[error("Malformed store rows: {0}")]
    MalformedRows(String),
    /// The query itself is unusable (e.g., empty vector).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Zstd(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Embedded incident index.
///
/// Clones share the same backend and vectors.
#[derive(Clone)]
pub struct IncidentIndex {
    backend: Arc<dyn IndexBackend>,
    cfg: IndexConfig,
    /// Embeddings by incident id, kept beside the backend so a search never
    /// has to decode records that end up below the floor.
    vectors: Arc<RwLock<hashbrown::HashMap<String, Vec<f32>>>>,
}

impl IncidentIndex {
    pub fn new(cfg: IndexConfig) -> Result<Self, IndexError> {
        let backend = cfg.backend.build()?;
        Ok(Self::with_backend(cfg, backend))
    }

    /// Build an index with a custom backend.
    pub fn with_backend(cfg: IndexConfig, backend: Box<dyn IndexBackend>) -> Self {
        Self {
            backend: Arc::from(backend),
            cfg,
            vectors: Arc::new(RwLock::new(hashbrown::HashMap::new())),
        }
    }

    /// Insert or replace a record. Re-inserting an id replaces its embedding,
    /// so the index never holds two entries for one incident.
    pub fn upsert(&self, rec: &HistoricalIncident) -> Result<(), IndexError> {
        rec.validate()?;
        let payload = self.encode_record(rec)?;
        self.backend.put(&rec.incident_id, &payload)?;
        self.vectors
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .insert(rec.incident_id.clone(), rec.embedding.clone());
        Ok(())
    }

    /// Insert many records under a single backend batch.
    pub fn batch_insert(&self, records: &[HistoricalIncident]) -> Result<(), IndexError> {
        let mut entries = Vec::with_capacity(records.len());
        for rec in records {
            rec.validate()?;
            entries.push((rec.incident_id.clone(), self.encode_record(rec)?));
        }
        self.backend.batch_put(entries)?;

        let mut vectors = self
            .vectors
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        vectors.reserve(records.len());
        for rec in records {
            vectors.insert(rec.incident_id.clone(), rec.embedding.clone());
        }
        Ok(())
    }

    pub fn get(&self, incident_id: &str) -> Result<Option<HistoricalIncident>, IndexError> {
        match self.backend.get(incident_id)? {
            Some(data) => Ok(Some(self.decode_record(&data)?)),
            None => Ok(None),
        }
    }

    /// Visit every stored record.
    pub fn scan(
        &self,
        visitor: &mut dyn FnMut(&HistoricalIncident) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.backend.scan(&mut |data: &[u8]| {
            let record = self.decode_record(data)?;
            visitor(&record)
        })
    }

    pub fn len(&self) -> Result<usize, IndexError> {
        self.backend.len()
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    pub(crate) fn decode_record(&self, data: &[u8]) -> Result<HistoricalIncident, IndexError> {
        let decompressed = self.cfg.compression.decompress(data)?;
        let (record, _): (HistoricalIncident, usize) =
            decode_from_slice(&decompressed, standard())?;
        if record.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::Decode(format!(
                "record {} has schema version {}, expected {INDEX_SCHEMA_VERSION}",
                record.incident_id, record.schema_version
            )));
        }
        Ok(record)
    }

    fn encode_record(&self, rec: &HistoricalIncident) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(rec, standard())?;
        self.cfg.compression.compress(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, embedding: Vec<f32>) -> HistoricalIncident {
        HistoricalIncident::new(id, format!("{id} desc"), format!("{id} fix"), embedding)
    }

    #[test]
    fn in_memory_backend_roundtrip() {
        let index = IncidentIndex::new(IndexConfig::new()).unwrap();
        let rec = sample("INC001", vec![0.1, 0.2, 0.3]);
        index.upsert(&rec).expect("upsert succeeds");

        let fetched = index.get("INC001").expect("get ok").expect("record exists");
        assert_eq!(fetched, rec);
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn uncompressed_codec_roundtrip() {
        let cfg = IndexConfig::new().with_compression(CompressionConfig::new(CompressionCodec::None, 0));
        let index = IncidentIndex::new(cfg).unwrap();
        index.upsert(&sample("INC002", vec![1.0])).unwrap();
        assert_eq!(index.get("INC002").unwrap().unwrap().short_desc, "INC002 desc");
    }

    #[test]
    fn upsert_replaces_existing_id() {
        let index = IncidentIndex::new(IndexConfig::new()).unwrap();
        index.upsert(&sample("INC001", vec![1.0, 0.0])).unwrap();
        index.upsert(&sample("INC001", vec![0.0, 1.0])).unwrap();
        assert_eq!(index.len().unwrap(), 1);
        let hits = index.search(&[0.0, 1.0], 0.5, 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_records_rejected() {
        let index = IncidentIndex::new(IndexConfig::new()).unwrap();
        assert!(matches!(
            index.upsert(&sample("INC001", vec![])),
            Err(IndexError::Corpus(_))
        ));
        assert!(matches!(
            index.upsert(&sample(" ", vec![1.0])),
            Err(IndexError::Corpus(_))
        ));
        assert!(matches!(
            index.upsert(&sample("INC003", vec![f32::NAN])),
            Err(IndexError::Corpus(_))
        ));
        assert!(index.is_empty().unwrap());
    }

    #[test]
    fn foreign_schema_version_rejected_on_insert() {
        let index = IncidentIndex::new(IndexConfig::new()).unwrap();
        let mut rec = sample("INC009", vec![1.0]);
        rec.schema_version = INDEX_SCHEMA_VERSION + 1;
        let err = index.upsert(&rec).unwrap_err();
        assert!(matches!(err, IndexError::Corpus(ref msg) if msg.contains("schema version")));
        assert!(index.is_empty().unwrap());
    }

    #[test]
    fn foreign_schema_version_rejected_on_decode() {
        let index = IncidentIndex::new(IndexConfig::new()).unwrap();
        let mut rec = sample("INC010", vec![1.0]);
        rec.schema_version = INDEX_SCHEMA_VERSION + 1;
        let payload = index.encode_record(&rec).unwrap();
        index.backend.put("INC010", &payload).unwrap();
        assert!(matches!(index.get("INC010"), Err(IndexError::Decode(_))));
    }

    #[test]
    fn clones_share_storage() {
        let index = IncidentIndex::new(IndexConfig::new()).unwrap();
        let other = index.clone();
        index.upsert(&sample("INC001", vec![1.0, 0.0])).unwrap();
        assert_eq!(other.len().unwrap(), 1);
        assert_eq!(other.search(&[1.0, 0.0], 0.5, 5).unwrap().len(), 1);
    }

    #[test]
    fn batch_insert_and_scan() {
        let index = IncidentIndex::new(IndexConfig::new()).unwrap();
        index
            .batch_insert(&[sample("INC001", vec![1.0]), sample("INC002", vec![2.0])])
            .unwrap();
        let mut ids = Vec::new();
        index
            .scan(&mut |rec| {
                ids.push(rec.incident_id.clone());
                Ok(())
            })
            .unwrap();
        ids.sort();
        assert_eq!(ids, vec!["INC001", "INC002"]);
    }
}
