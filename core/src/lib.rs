//! Positional inverted index with intersection, phrase and ranked retrieval.
//!
//! Terms map to [`PostingsList`]s kept in a pluggable [`Store`]; document metadata
//! (filename, length, importance score) lives alongside under reserved keys.

pub mod config;
pub mod error;
pub mod index;
pub mod metadata;
pub mod postings;
pub mod query;
pub mod store;
pub mod tokenizer;

pub type DocId = u32;

pub use config::IndexConfig;
pub use error::{IndexError, IntegrityError, PostingsError, Result, SearchError, StoreError};
pub use index::Index;
pub use metadata::DocMetadata;
pub use postings::{Offset, PostingsEntry, PostingsList};
pub use query::{Query, QueryType, RankingType, SearchOptions};
pub use store::{MemoryStore, Namespace, SledStore, Store};
