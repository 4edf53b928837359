//! Query evaluation: conjunctive intersection, ordered phrase matching and ranked
//! retrieval.
//!
//! Every mode drops terms that [`Index::is_term_bad`] rejects. Intersection and ranked
//! queries simply skip them; phrase queries keep their slot by shifting the running
//! offsets one position per eliminated term.

use crate::error::SearchError;
use crate::index::Index;
use crate::postings::PostingsList;
use crate::store::Store;
use crate::tokenizer::tokenize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Intersection,
    Phrase,
    Ranked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingType {
    TfIdf,
    Importance,
    Combination,
}

impl RankingType {
    fn lexical(self) -> bool {
        matches!(self, RankingType::TfIdf | RankingType::Combination)
    }

    fn importance(self) -> bool {
        matches!(self, RankingType::Importance | RankingType::Combination)
    }
}

/// Ordered query terms plus a relevance weight per term (1.0 when unspecified).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub terms: Vec<String>,
    pub weights: HashMap<String, f64>,
}

impl Query {
    pub fn new<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self { terms: terms.into_iter().map(Into::into).collect(), weights: HashMap::new() }
    }

    /// Tokenizes free text the same way documents are tokenized.
    pub fn parse(text: &str) -> Self {
        Self::new(tokenize(text).into_iter().map(|t| t.term))
    }

    pub fn with_weight(mut self, term: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(term.into(), weight);
        self
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Sort ranked results by descending score.
    pub sort: bool,
    pub deadline: Option<Instant>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { sort: true, deadline: None }
    }
}

impl SearchOptions {
    pub fn unsorted() -> Self {
        Self { sort: false, ..Self::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }
}

struct Clock {
    started: Instant,
    deadline: Option<Instant>,
}

impl Clock {
    fn start(deadline: Option<Instant>) -> Self {
        Self { started: Instant::now(), deadline }
    }

    fn check(&self) -> Result<(), SearchError> {
        match self.deadline {
            Some(d) if Instant::now() >= d => {
                Err(SearchError::DeadlineExceeded { elapsed: self.started.elapsed() })
            }
            _ => Ok(()),
        }
    }
}

impl<S: Store> Index<S> {
    /// Evaluates `query` with sorted output and no deadline.
    pub fn search(
        &self,
        query: &Query,
        query_type: QueryType,
        ranking: RankingType,
    ) -> Result<PostingsList, SearchError> {
        self.search_with(query, query_type, ranking, SearchOptions::default())
    }

    pub fn search_with(
        &self,
        query: &Query,
        query_type: QueryType,
        ranking: RankingType,
        opts: SearchOptions,
    ) -> Result<PostingsList, SearchError> {
        let clock = Clock::start(opts.deadline);
        let result = match query_type {
            QueryType::Intersection => self.intersection_query(query, &clock)?,
            QueryType::Phrase => self.phrase_query(query, &clock)?,
            QueryType::Ranked => self.ranked_query(query, ranking, opts.sort, &clock)?,
        };
        tracing::debug!(
            ?query_type,
            hits = result.len(),
            elapsed_ms = clock.started.elapsed().as_secs_f64() * 1000.0,
            "query evaluated"
        );
        Ok(result)
    }

    fn intersection_query(&self, query: &Query, clock: &Clock) -> Result<PostingsList, SearchError> {
        let mut lists = Vec::new();
        let mut eliminated = Vec::new();
        for term in &query.terms {
            let Some(pl) = self.postings(term) else {
                return Ok(PostingsList::new());
            };
            if self.is_term_bad(pl.len()) {
                tracing::debug!(term = term.as_str(), df = pl.len(), "term eliminated");
                eliminated.push(pl);
            } else {
                lists.push(pl);
            }
        }

        // With every term eliminated the smallest list stands in unfiltered.
        if lists.is_empty() {
            return Ok(eliminated.into_iter().min_by_key(PostingsList::len).unwrap_or_default());
        }

        lists.sort_by_key(PostingsList::len);
        let mut lists = lists.into_iter();
        let mut all = lists.next().unwrap_or_default();
        for pl in lists {
            clock.check()?;
            if all.is_empty() {
                break;
            }
            all = PostingsList::remove_all_not_in(&all, &pl);
        }
        Ok(all)
    }

    fn phrase_query(&self, query: &Query, clock: &Clock) -> Result<PostingsList, SearchError> {
        let mut terms = query.terms.iter();
        let mut all = None;
        for term in terms.by_ref() {
            let pl = self.postings(term);
            if self.is_term_bad(pl.as_ref().map_or(0, PostingsList::len)) {
                tracing::debug!(term = term.as_str(), "skipping eliminated leading phrase term");
                continue;
            }
            tracing::debug!(term = term.as_str(), "phrase seed");
            all = Some(pl.unwrap_or_default());
            break;
        }
        let Some(mut all) = all else {
            tracing::debug!("no phrase term survived elimination");
            return Ok(PostingsList::new());
        };

        for term in terms {
            clock.check()?;
            if all.is_empty() {
                break;
            }
            let Some(pl) = self.postings(term) else {
                return Ok(PostingsList::new());
            };
            if self.is_term_bad(pl.len()) {
                tracing::debug!(term = term.as_str(), "bridging eliminated phrase term");
                all = PostingsList::move_offsets(all);
            } else {
                all = PostingsList::remove_all_not_followed_by(&all, &pl);
            }
        }
        Ok(all)
    }

    fn ranked_query(
        &self,
        query: &Query,
        ranking: RankingType,
        sort: bool,
        clock: &Clock,
    ) -> Result<PostingsList, SearchError> {
        let mut good = Vec::new();
        for term in &query.terms {
            match self.postings(term) {
                Some(pl) if !pl.is_empty() && !self.is_term_bad(pl.len()) => good.push((term.as_str(), pl)),
                Some(pl) if !pl.is_empty() => {
                    tracing::debug!(term = term.as_str(), df = pl.len(), "term eliminated")
                }
                _ => {}
            }
        }

        let mut all = PostingsList::new();
        for (_, pl) in &good {
            all = PostingsList::union(&all, pl);
        }
        for entry in all.iter_mut() {
            entry.score = 0.0;
        }

        let meta = self.metadata();
        if ranking.lexical() {
            let n = self.number_of_docs() as f64;
            for (term, pl) in &good {
                clock.check()?;
                let idf = (n / pl.len() as f64).log10();
                let factor = idf * query.weight(term);
                for posting in pl {
                    if let Some(entry) = all.get_mut(posting.doc_id) {
                        entry.score += posting.term_frequency() as f64 * factor;
                    }
                }
            }
            for entry in all.iter_mut() {
                meta.filename(entry.doc_id)?;
                entry.score /= f64::from(meta.length(entry.doc_id)?);
            }
        }

        if ranking.importance() {
            clock.check()?;
            let multiplier = self.config().importance_multiplier;
            for entry in all.iter_mut() {
                entry.score += meta.importance(entry.doc_id)? * multiplier;
            }
        }

        if sort {
            all.sort_by_score();
        }
        Ok(all)
    }
}
