use crate::error::PostingsError;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Zero-based token position of a term occurrence within a document.
pub type Offset = u32;

/// One document's occurrences of a term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingsEntry {
    pub doc_id: DocId,
    /// Per-query accumulator. Never persisted; only offsets survive a merge.
    #[serde(skip)]
    pub score: f64,
    /// Strictly ascending token positions.
    pub offsets: Vec<Offset>,
}

impl PostingsEntry {
    pub fn new(doc_id: DocId) -> Self {
        Self { doc_id, score: 0.0, offsets: Vec::new() }
    }

    pub fn with_offsets(doc_id: DocId, offsets: Vec<Offset>) -> Self {
        Self { doc_id, score: 0.0, offsets }
    }

    /// Number of occurrences of the term in this document.
    pub fn term_frequency(&self) -> usize {
        self.offsets.len()
    }
}

/// Postings for a single term, kept ascending by docID for every merge-style operation.
///
/// [`PostingsList::sort_by_score`] reorders entries for presentation only; call
/// [`PostingsList::sort_by_doc_id`] before feeding such a list back into a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingsList {
    entries: Vec<PostingsEntry>,
}

impl PostingsList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from arbitrary entries, restoring ascending docID order.
    pub fn from_entries(mut entries: Vec<PostingsEntry>) -> Self {
        entries.sort_by_key(|e| e.doc_id);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PostingsEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PostingsEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PostingsEntry> {
        self.entries.iter_mut()
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.entries.iter().map(|e| e.doc_id)
    }

    /// Looks up an entry; the list must be in docID order.
    pub fn get(&self, doc_id: DocId) -> Option<&PostingsEntry> {
        self.entries
            .binary_search_by_key(&doc_id, |e| e.doc_id)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, doc_id: DocId) -> Option<&mut PostingsEntry> {
        match self.entries.binary_search_by_key(&doc_id, |e| e.doc_id) {
            Ok(i) => Some(&mut self.entries[i]),
            Err(_) => None,
        }
    }

    /// Appends an occurrence. Insertions must arrive in non-decreasing docID order
    /// and, within a document, strictly increasing offset order.
    pub fn add(&mut self, doc_id: DocId, offset: Offset) -> Result<(), PostingsError> {
        if let Some(last) = self.entries.last_mut() {
            let last_offset = last.offsets.last().copied().unwrap_or_default();
            let in_order = match last.doc_id.cmp(&doc_id) {
                Ordering::Less => true,
                Ordering::Equal => last.offsets.is_empty() || offset > last_offset,
                Ordering::Greater => false,
            };
            if !in_order {
                return Err(PostingsError::OutOfOrder { doc_id, offset, last_doc_id: last.doc_id, last_offset });
            }
            if last.doc_id == doc_id {
                last.offsets.push(offset);
                return Ok(());
            }
        }
        self.entries.push(PostingsEntry::with_offsets(doc_id, vec![offset]));
        Ok(())
    }

    /// Folds postings of the same term from another index into this one.
    ///
    /// Entries are interleaved by docID; a docID present on both sides gets the sorted,
    /// deduplicated union of its offsets. Entries new to `self` are deep-copied.
    pub fn merge(&mut self, other: &PostingsList) {
        if other.is_empty() {
            return;
        }
        let mine = std::mem::take(&mut self.entries);
        let mut merged = Vec::with_capacity(mine.len() + other.len());
        let mut theirs = other.entries.iter().peekable();
        for entry in mine {
            while let Some(o) = theirs.next_if(|o| o.doc_id < entry.doc_id) {
                merged.push(o.clone());
            }
            match theirs.next_if(|o| o.doc_id == entry.doc_id) {
                Some(o) => {
                    let offsets = merge_offsets(&entry.offsets, &o.offsets);
                    merged.push(PostingsEntry { offsets, ..entry });
                }
                None => merged.push(entry),
            }
        }
        merged.extend(theirs.cloned());
        self.entries = merged;
    }

    /// Every docID present in either list. For a docID in both, `a`'s entry is kept;
    /// scores are not combined.
    pub fn union(a: &PostingsList, b: &PostingsList) -> PostingsList {
        let mut out = Vec::with_capacity(a.len().max(b.len()));
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (x, y) = (&a.entries[i], &b.entries[j]);
            match x.doc_id.cmp(&y.doc_id) {
                Ordering::Less => {
                    out.push(x.clone());
                    i += 1;
                }
                Ordering::Greater => {
                    out.push(y.clone());
                    j += 1;
                }
                Ordering::Equal => {
                    out.push(x.clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&a.entries[i..]);
        out.extend_from_slice(&b.entries[j..]);
        PostingsList { entries: out }
    }

    /// Entries of `a` whose docID also appears in `b`.
    pub fn remove_all_not_in(a: &PostingsList, b: &PostingsList) -> PostingsList {
        let mut out = Vec::with_capacity(a.len().min(b.len()));
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (x, y) = (&a.entries[i], &b.entries[j]);
            match x.doc_id.cmp(&y.doc_id) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    out.push(x.clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        PostingsList { entries: out }
    }

    /// Documents where some occurrence in `b` sits exactly one position after an
    /// occurrence in `a`. Surviving entries carry the matching `b` offsets so the
    /// filter can be chained across a whole phrase.
    pub fn remove_all_not_followed_by(a: &PostingsList, b: &PostingsList) -> PostingsList {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (x, y) = (&a.entries[i], &b.entries[j]);
            match x.doc_id.cmp(&y.doc_id) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    let offsets = followers(&x.offsets, &y.offsets);
                    if !offsets.is_empty() {
                        out.push(PostingsEntry::with_offsets(y.doc_id, offsets));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        PostingsList { entries: out }
    }

    /// Shifts every offset one position forward, bridging a phrase slot whose term
    /// was eliminated. An offset of `Offset::MAX` has no successor and is dropped.
    pub fn move_offsets(mut a: PostingsList) -> PostingsList {
        for entry in &mut a.entries {
            entry.offsets = entry.offsets.iter().filter_map(|o| o.checked_add(1)).collect();
        }
        a
    }

    /// Descending score; equal scores fall back to ascending docID.
    pub fn sort_by_score(&mut self) {
        self.entries
            .sort_by(|x, y| y.score.total_cmp(&x.score).then(x.doc_id.cmp(&y.doc_id)));
    }

    pub fn sort_by_doc_id(&mut self) {
        self.entries.sort_by_key(|e| e.doc_id);
    }

    pub fn is_sorted_by_doc_id(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].doc_id < w[1].doc_id)
    }
}

impl<'a> IntoIterator for &'a PostingsList {
    type Item = &'a PostingsEntry;
    type IntoIter = std::slice::Iter<'a, PostingsEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Offsets in `next` that directly follow some offset in `prev`. Both inputs ascending.
fn followers(prev: &[Offset], next: &[Offset]) -> Vec<Offset> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < prev.len() && j < next.len() {
        let want = u64::from(prev[i]) + 1;
        match want.cmp(&u64::from(next[j])) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(next[j]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

fn merge_offsets(a: &[Offset], b: &[Offset]) -> Vec<Offset> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out.sort_unstable();
    out.dedup();
    out
}
