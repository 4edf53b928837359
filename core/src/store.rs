use crate::error::StoreError;
use crate::metadata::DocMetadata;
use crate::postings::PostingsList;
use crate::DocId;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const MANIFEST_VERSION: u32 = 1;

/// Postings and metadata never share a key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Postings,
    Meta,
}

/// Reserved keys of the metadata namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKey {
    DocIds,
    DocLengths,
    PageRanking,
    Manifest,
}

impl MetaKey {
    pub const METADATA_MAPS: [MetaKey; 3] = [MetaKey::DocIds, MetaKey::DocLengths, MetaKey::PageRanking];

    pub fn as_str(self) -> &'static str {
        match self {
            MetaKey::DocIds => "..docIDs",
            MetaKey::DocLengths => "..docLengths",
            MetaKey::PageRanking => "..pageRanking",
            MetaKey::Manifest => "..manifest",
        }
    }
}

/// Durable key/value storage behind an index. Calls block until the backend answers.
pub trait Store: Send + Sync {
    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, ns: Namespace, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    fn has_key(&self, ns: Namespace, key: &str) -> Result<bool, StoreError>;
    fn keys(&self, ns: Namespace) -> Result<Vec<String>, StoreError>;
    fn flush(&self) -> Result<(), StoreError>;
}

/// sled-backed store; one tree per namespace.
pub struct SledStore {
    db: sled::Db,
    postings: sled::Tree,
    meta: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// A store deleted when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let postings = db.open_tree("postings")?;
        let meta = db.open_tree("meta")?;
        Ok(Self { db, postings, meta })
    }

    fn tree(&self, ns: Namespace) -> &sled::Tree {
        match ns {
            Namespace::Postings => &self.postings,
            Namespace::Meta => &self.meta,
        }
    }
}

impl Store for SledStore {
    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree(ns).get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn put(&self, ns: Namespace, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.tree(ns).insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn has_key(&self, ns: Namespace, key: &str) -> Result<bool, StoreError> {
        Ok(self.tree(ns).contains_key(key.as_bytes())?)
    }

    fn keys(&self, ns: Namespace) -> Result<Vec<String>, StoreError> {
        self.tree(ns)
            .iter()
            .keys()
            .map(|k| {
                let k = k?;
                String::from_utf8(k.to_vec()).map_err(|e| StoreError::InvalidKey(e.into_bytes()))
            })
            .collect()
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

/// Volatile store for scratch indexes and tests.
#[derive(Default)]
pub struct MemoryStore {
    postings: RwLock<BTreeMap<String, Vec<u8>>>,
    meta: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self, ns: Namespace) -> &RwLock<BTreeMap<String, Vec<u8>>> {
        match ns {
            Namespace::Postings => &self.postings,
            Namespace::Meta => &self.meta,
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree(ns).read().get(key).cloned())
    }

    fn put(&self, ns: Namespace, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.tree(ns).write().insert(key.to_string(), value);
        Ok(())
    }

    fn has_key(&self, ns: Namespace, key: &str) -> Result<bool, StoreError> {
        Ok(self.tree(ns).read().contains_key(key))
    }

    fn keys(&self, ns: Namespace) -> Result<Vec<String>, StoreError> {
        Ok(self.tree(ns).read().keys().cloned().collect())
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Written next to the metadata maps on finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub created_at: String,
    pub num_docs: u32,
    pub num_terms: u32,
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|source| StoreError::Codec { key: key.to_string(), source })
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|source| StoreError::Codec { key: key.to_string(), source })
}

pub fn load_postings<S: Store + ?Sized>(store: &S, term: &str) -> Result<Option<PostingsList>, StoreError> {
    match store.get(Namespace::Postings, term)? {
        Some(bytes) => decode(term, &bytes).map(Some),
        None => Ok(None),
    }
}

pub fn save_postings<S: Store + ?Sized>(store: &S, term: &str, postings: &PostingsList) -> Result<(), StoreError> {
    store.put(Namespace::Postings, term, encode(term, postings)?)
}

fn load_map<S, V>(store: &S, key: MetaKey) -> Result<Option<HashMap<DocId, V>>, StoreError>
where
    S: Store + ?Sized,
    V: DeserializeOwned,
{
    match store.get(Namespace::Meta, key.as_str())? {
        Some(bytes) => decode(key.as_str(), &bytes).map(Some),
        None => Ok(None),
    }
}

fn save_map<S, V>(store: &S, key: MetaKey, map: &HashMap<DocId, V>) -> Result<(), StoreError>
where
    S: Store + ?Sized,
    V: Serialize,
{
    store.put(Namespace::Meta, key.as_str(), encode(key.as_str(), map)?)
}

/// Reads whichever metadata maps are present, warning about the absent ones.
pub fn load_metadata<S: Store + ?Sized>(store: &S) -> Result<DocMetadata, StoreError> {
    let mut meta = DocMetadata::new();
    match load_map(store, MetaKey::DocIds)? {
        Some(m) => meta.filenames = m,
        None => tracing::warn!(key = MetaKey::DocIds.as_str(), "couldn't retrieve docID to filename associations"),
    }
    match load_map(store, MetaKey::DocLengths)? {
        Some(m) => meta.lengths = m,
        None => tracing::warn!(key = MetaKey::DocLengths.as_str(), "couldn't retrieve document lengths"),
    }
    match load_map(store, MetaKey::PageRanking)? {
        Some(m) => meta.importance = m,
        None => tracing::warn!(key = MetaKey::PageRanking.as_str(), "couldn't retrieve importance scores"),
    }
    Ok(meta)
}

pub fn save_metadata<S: Store + ?Sized>(store: &S, meta: &DocMetadata) -> Result<(), StoreError> {
    save_map(store, MetaKey::DocIds, &meta.filenames)?;
    save_map(store, MetaKey::DocLengths, &meta.lengths)?;
    save_map(store, MetaKey::PageRanking, &meta.importance)?;
    Ok(())
}

pub fn save_manifest<S: Store + ?Sized>(store: &S, manifest: &IndexManifest) -> Result<(), StoreError> {
    let key = MetaKey::Manifest.as_str();
    store.put(Namespace::Meta, key, encode(key, manifest)?)
}

pub fn load_manifest<S: Store + ?Sized>(store: &S) -> Result<Option<IndexManifest>, StoreError> {
    let key = MetaKey::Manifest.as_str();
    match store.get(Namespace::Meta, key)? {
        Some(bytes) => decode(key, &bytes).map(Some),
        None => Ok(None),
    }
}
