use crate::error::IntegrityError;
use crate::DocId;
use std::collections::HashMap;

/// Per-document metadata: filename, token count and importance score.
///
/// The three maps are independent; a document may have a filename and length but no
/// importance score if it was added after importance scores were computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocMetadata {
    pub filenames: HashMap<DocId, String>,
    pub lengths: HashMap<DocId, u32>,
    pub importance: HashMap<DocId, f64>,
}

impl DocMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, doc_id: DocId, filename: impl Into<String>, length: u32) {
        self.filenames.insert(doc_id, filename.into());
        self.lengths.insert(doc_id, length);
    }

    /// Unions `other` into `self`. Entries already present are overwritten only by the
    /// same key, never dropped.
    pub fn absorb(&mut self, other: DocMetadata) {
        self.filenames.extend(other.filenames);
        self.lengths.extend(other.lengths);
        self.importance.extend(other.importance);
    }

    /// Total document count, always derived from the filename map.
    pub fn number_of_docs(&self) -> usize {
        self.filenames.len()
    }

    pub fn filename(&self, doc_id: DocId) -> Result<&str, IntegrityError> {
        self.filenames
            .get(&doc_id)
            .map(String::as_str)
            .ok_or(IntegrityError::MissingFilename(doc_id))
    }

    /// Length used to normalise lexical scores; zero is as unusable as absent.
    pub fn length(&self, doc_id: DocId) -> Result<u32, IntegrityError> {
        match self.lengths.get(&doc_id) {
            None => Err(IntegrityError::MissingLength(doc_id)),
            Some(0) => Err(IntegrityError::ZeroLength(doc_id)),
            Some(&len) => Ok(len),
        }
    }

    pub fn importance(&self, doc_id: DocId) -> Result<f64, IntegrityError> {
        self.importance
            .get(&doc_id)
            .copied()
            .ok_or(IntegrityError::MissingImportance(doc_id))
    }

    /// Every docID mentioned by any of the three maps.
    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.filenames
            .keys()
            .chain(self.lengths.keys())
            .chain(self.importance.keys())
            .copied()
    }
}
