use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::metadata::DocMetadata;
use crate::postings::{Offset, PostingsList};
use crate::store::{self, IndexManifest, Namespace, Store, MANIFEST_VERSION};
use crate::DocId;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Positional inverted index over a [`Store`].
///
/// Postings touched by [`Index::insert`] are buffered in memory and written back to the
/// store in batches. The metadata maps live in memory and are persisted by
/// [`Index::flush`], by [`Index::finalize`], or, as a last resort, when an index with
/// unflushed changes is dropped. Losing that flush loses every docID to filename, length
/// and importance association.
pub struct Index<S: Store> {
    store: Option<S>,
    config: IndexConfig,
    meta: DocMetadata,
    pending: HashMap<String, PostingsList>,
    doc_terms: HashMap<DocId, HashSet<String>>,
    dirty: bool,
}

impl<S: Store> Index<S> {
    /// An empty index over `store`.
    pub fn create(store: S, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Some(store),
            config,
            meta: DocMetadata::new(),
            pending: HashMap::new(),
            doc_terms: HashMap::new(),
            dirty: false,
        })
    }

    /// Reopens an index previously flushed into `store`.
    pub fn open(store: S, config: IndexConfig) -> Result<Self> {
        let meta = store::load_metadata(&store)?;
        tracing::info!(num_docs = meta.number_of_docs(), "opened index");
        let mut index = Self::create(store, config)?;
        index.meta = meta;
        Ok(index)
    }

    /// Combines partial indexes into a fresh index over `store`.
    ///
    /// Every source must cover its own docID range. With `strict_merge` enabled, sources
    /// that share a docID are rejected before `store` is touched. A merge that fails
    /// partway leaves no metadata or manifest behind.
    pub fn merge(store: S, config: IndexConfig, sources: &[&dyn Store]) -> Result<Self> {
        config.validate()?;
        let mut source_meta = Vec::with_capacity(sources.len());
        let mut source_docs = Vec::with_capacity(sources.len());
        for source in sources {
            let meta = store::load_metadata(*source)?;
            let mut docs: BTreeSet<DocId> = meta.doc_ids().collect();
            for term in source.keys(Namespace::Postings)? {
                if let Some(pl) = store::load_postings(*source, &term)? {
                    docs.extend(pl.doc_ids());
                }
            }
            source_meta.push(meta);
            source_docs.push(docs);
        }
        if config.strict_merge {
            check_disjoint(&source_docs)?;
        }

        let mut index = Self::create(store, config)?;
        for (i, (source, meta)) in sources.iter().zip(source_meta).enumerate() {
            index.meta.absorb(meta);
            let dest = index.store()?;
            let terms = source.keys(Namespace::Postings)?;
            tracing::info!(source = i, num_terms = terms.len(), "merging partial index");
            for term in terms {
                let Some(incoming) = store::load_postings(*source, &term)? else {
                    continue;
                };
                match store::load_postings(dest, &term)? {
                    Some(mut existing) => {
                        existing.merge(&incoming);
                        store::save_postings(dest, &term, &existing)?;
                    }
                    None => store::save_postings(dest, &term, &incoming)?,
                }
            }
        }
        index.dirty = true;
        tracing::info!(num_docs = index.number_of_docs(), sources = sources.len(), "merge complete");
        Ok(index)
    }

    /// Records that `term` occurs at `offset` in `doc_id`.
    ///
    /// Documents must be ingested in non-decreasing docID order with increasing offsets;
    /// any storage fault is returned and should abort ingestion.
    pub fn insert(&mut self, term: &str, doc_id: DocId, offset: Offset) -> Result<()> {
        if !self.pending.contains_key(term) {
            if self.pending.len() >= self.config.insert_buffer_terms {
                self.write_pending()?;
            }
            let list = store::load_postings(self.store()?, term)?.unwrap_or_default();
            self.pending.insert(term.to_string(), list);
        }
        if let Some(list) = self.pending.get_mut(term) {
            list.add(doc_id, offset)?;
        }
        self.doc_terms.entry(doc_id).or_default().insert(term.to_string());
        self.dirty = true;
        Ok(())
    }

    pub fn register_document(&mut self, doc_id: DocId, filename: impl Into<String>, length: u32) {
        self.meta.register(doc_id, filename, length);
        self.dirty = true;
    }

    pub fn set_importance(&mut self, doc_id: DocId, score: f64) {
        self.meta.importance.insert(doc_id, score);
        self.dirty = true;
    }

    pub fn set_importance_scores(&mut self, scores: HashMap<DocId, f64>) {
        self.meta.importance.extend(scores);
        self.dirty = true;
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn metadata(&self) -> &DocMetadata {
        &self.meta
    }

    /// Current corpus size, taken from the filename map on every call.
    pub fn number_of_docs(&self) -> usize {
        self.meta.number_of_docs()
    }

    /// Terms recorded for `doc_id` by inserts made through this handle.
    pub fn document_terms(&self, doc_id: DocId) -> Option<&HashSet<String>> {
        self.doc_terms.get(&doc_id)
    }

    /// Every term in the index, sorted.
    pub fn dictionary(&self) -> Result<Vec<String>> {
        let mut terms: BTreeSet<String> = self.store()?.keys(Namespace::Postings)?.into_iter().collect();
        terms.extend(self.pending.keys().cloned());
        Ok(terms.into_iter().collect())
    }

    /// Postings for `term`, or `None` if the term is unknown.
    ///
    /// Storage faults are logged and read as an absent term.
    pub fn postings(&self, term: &str) -> Option<PostingsList> {
        if let Some(list) = self.pending.get(term) {
            return Some(list.clone());
        }
        let store = self.store.as_ref()?;
        match store::load_postings(store, term) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(term, error = %e, "failed to read postings; treating term as absent");
                None
            }
        }
    }

    /// Whether a term with document frequency `df` is too common to be useful.
    pub fn is_term_bad(&self, df: usize) -> bool {
        let n = self.number_of_docs();
        if n == 0 {
            return false;
        }
        df as f64 / n as f64 > self.config.elimination_threshold
    }

    /// Writes buffered postings, metadata maps and the manifest, then flushes the store.
    pub fn flush(&mut self) -> Result<()> {
        self.write_pending()?;
        let num_terms = self.store()?.keys(Namespace::Postings)?.len();
        let store = self.store()?;
        store::save_metadata(store, &self.meta)?;
        let created_at = match store::load_manifest(store)? {
            Some(previous) => previous.created_at,
            None => now_rfc3339(),
        };
        let manifest = IndexManifest {
            version: MANIFEST_VERSION,
            created_at,
            num_docs: self.meta.number_of_docs() as u32,
            num_terms: num_terms as u32,
        };
        store::save_manifest(store, &manifest)?;
        store.flush()?;
        self.dirty = false;
        tracing::debug!(num_docs = manifest.num_docs, num_terms, "index flushed");
        Ok(())
    }

    /// Flushes everything and releases the store.
    pub fn finalize(mut self) -> Result<S> {
        self.flush()?;
        self.store.take().ok_or(IndexError::Finalized)
    }

    pub(crate) fn store(&self) -> Result<&S> {
        self.store.as_ref().ok_or(IndexError::Finalized)
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let store = self.store.as_ref().ok_or(IndexError::Finalized)?;
        for (term, list) in self.pending.drain() {
            store::save_postings(store, &term, &list)?;
        }
        Ok(())
    }
}

impl<S: Store> Drop for Index<S> {
    fn drop(&mut self) {
        if self.store.is_none() || !self.dirty {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::error!(error = %e, "failed to flush index on drop; metadata may be lost");
        }
    }
}

fn check_disjoint(source_docs: &[BTreeSet<DocId>]) -> Result<()> {
    for (i, a) in source_docs.iter().enumerate() {
        for (j, b) in source_docs.iter().enumerate().skip(i + 1) {
            let shared: Vec<DocId> = a.intersection(b).copied().collect();
            if !shared.is_empty() {
                return Err(IndexError::MergeConflict { doc_ids: shared, first_source: i, second_source: j });
            }
        }
    }
    Ok(())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
