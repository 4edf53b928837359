use crate::DocId;
use std::time::Duration;
use thiserror::Error;

/// Faults raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("codec error for key {key:?}: {source}")]
    Codec {
        key: String,
        #[source]
        source: bincode::Error,
    },

    #[error("key is not valid utf-8: {0:?}")]
    InvalidKey(Vec<u8>),
}

/// A postings insertion that would break the ascending docID / offset order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PostingsError {
    #[error(
        "out-of-order insertion: ({doc_id}, {offset}) after ({last_doc_id}, {last_offset})"
    )]
    OutOfOrder {
        doc_id: DocId,
        offset: u32,
        last_doc_id: DocId,
        last_offset: u32,
    },
}

/// A document referenced by postings with no matching metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("document {0} has no length entry")]
    MissingLength(DocId),

    #[error("document {0} has a length of zero")]
    ZeroLength(DocId),

    #[error("document {0} has no filename entry")]
    MissingFilename(DocId),

    #[error("document {0} has no importance score")]
    MissingImportance(DocId),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Postings(#[from] PostingsError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(
        "merge conflict: sources {first_source} and {second_source} share {} document id(s), first {}",
        .doc_ids.len(),
        .doc_ids.first().copied().unwrap_or_default()
    )]
    MergeConflict {
        doc_ids: Vec<DocId>,
        first_source: usize,
        second_source: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("index has already been finalized")]
    Finalized,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("query deadline exceeded after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },
}

pub type Result<T> = std::result::Result<T, IndexError>;
