//! Document database seam.
//!
//! The dashboard reads and writes schemaless JSON documents grouped into
//! named collections. [`DocumentStore`] is the query surface it needs:
//! add with a generated id, merge-upsert at a known id, point reads and
//! simple queries (equality filters, one sort key, a limit).
//!
//! [`MemoryDocumentStore`] keeps everything in a `DashMap` and can persist
//! a JSON snapshot between runs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub id: String,
    #[serde(flatten)]
    pub data: Document,
}

impl StoredDocument {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A query against one collection.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] std::io::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert under a generated id and return the id.
    async fn add(&self, collection: &str, data: Document) -> Result<String, DocumentError>;

    /// Create `collection/id` or merge `data` into it field by field.
    async fn set_merge(&self, collection: &str, id: &str, data: Document)
        -> Result<(), DocumentError>;

    async fn get(&self, collection: &str, id: &str)
        -> Result<Option<StoredDocument>, DocumentError>;

    async fn query(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>, DocumentError>;

    /// Persist buffered state, if the backend buffers any.
    async fn flush(&self) -> Result<(), DocumentError> {
        Ok(())
    }
}

/// Orders JSON scalars: missing/null first, then booleans, numbers, strings.
/// RFC 3339 UTC timestamps sort correctly as strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

type Collection = BTreeMap<String, Document>;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Collection>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryDocumentStore {
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            collections: DashMap::new(),
            snapshot_path,
        }
    }

    /// Create a store and load its snapshot if the file exists.
    pub fn load(snapshot_path: Option<PathBuf>) -> std::io::Result<Self> {
        let store = Self::new(snapshot_path);
        if let Some(path) = store.snapshot_path.clone() {
            if path.exists() {
                store.load_from_file(&path)?;
            }
        }
        Ok(store)
    }

    fn load_from_file(&self, path: &Path) -> std::io::Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let stored: HashMap<String, Collection> = serde_json::from_reader(reader)?;
        let mut documents = 0;
        for (name, collection) in stored {
            documents += collection.len();
            self.collections.insert(name, collection);
        }
        tracing::info!(documents, path = ?path, "Loaded document snapshot");
        Ok(())
    }

    /// Write every collection to the snapshot file. No-op without a path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let snapshot: HashMap<String, Collection> = self
            .collections
            .iter()
            .map(|c| (c.key().clone(), c.value().clone()))
            .collect();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)?;
        tracing::debug!(collections = snapshot.len(), "Saved document snapshot");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, data: Document) -> Result<String, DocumentError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> Result<(), DocumentError> {
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        let doc = entry.entry(id.to_string()).or_default();
        for (field, value) in data {
            doc.insert(field, value);
        }
        Ok(())
    }

    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, DocumentError> {
        Ok(self.collections.get(collection).and_then(|c| {
            c.get(id).map(|data| StoredDocument {
                id: id.to_string(),
                data: data.clone(),
            })
        }))
    }

    async fn query(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>, DocumentError> {
        let Some(collection) = self.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<StoredDocument> = collection
            .iter()
            .filter(|(_, doc)| query.matches(doc))
            .map(|(id, doc)| StoredDocument {
                id: id.clone(),
                data: doc.clone(),
            })
            .collect();
        drop(collection);

        if let Some((field, order)) = &query.order_by {
            results.sort_by(|a, b| {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn flush(&self) -> Result<(), DocumentError> {
        self.save()?;
        Ok(())
    }
}
