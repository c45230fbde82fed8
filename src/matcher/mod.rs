//! Question Matching Engine
//!
//! Ranks known questions against extracted text. Candidate generation goes
//! through an inverted token index built once per store snapshot, so a match
//! touches only records sharing at least one token with the query rather
//! than scanning the whole store.
//!
//! Matching is a pure function of the extracted text and the store snapshot:
//! identical inputs yield identical ordered results.

pub mod normalize;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::extraction::ExtractedText;
use crate::store::{QuestionStore, StoreError, StoreSnapshot};

use normalize::{canonical_form, token_set, tokenize, Token};

/// Weight of query-token containment in the blended score.
const CONTAINMENT_WEIGHT: f64 = 0.5;
/// Weight of symmetric token overlap (Jaccard) in the blended score.
const JACCARD_WEIGHT: f64 = 0.2;
/// Weight of edit similarity over canonical forms in the blended score.
const EDIT_WEIGHT: f64 = 0.3;

/// Matcher tuning knobs
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Candidates scoring below this confidence (0-100) are dropped
    pub min_confidence: u8,
    /// Maximum number of results returned
    pub max_results: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_confidence: 40,
            max_results: 10,
        }
    }
}

/// A scored candidate question for given extracted text.
///
/// Ordered sequences of these are sorted by descending confidence, ties
/// broken by ascending question id.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatchResult {
    /// Id of the matched [`crate::store::QuestionRecord`]
    pub question_id: String,
    /// Match confidence, 0-100
    pub confidence: u8,
    /// Substring of the extracted text that triggered the match
    pub snippet: String,
}

/// Per-record data precomputed for scoring.
struct IndexedRecord {
    tokens: BTreeSet<String>,
    canonical: String,
}

/// Inverted token index over one store snapshot.
struct MatchIndex {
    /// token -> positions of records containing it (ascending)
    postings: HashMap<String, Vec<u32>>,
    entries: Vec<IndexedRecord>,
}

impl MatchIndex {
    fn build(snapshot: &StoreSnapshot) -> Self {
        let mut postings: HashMap<String, Vec<u32>> = HashMap::new();
        let mut entries = Vec::with_capacity(snapshot.len());

        for (pos, record) in snapshot.iter().enumerate() {
            let tokens = token_set(&tokenize(&record.question));
            for token in &tokens {
                postings.entry(token.clone()).or_default().push(pos as u32);
            }
            let canonical = canonical_form(&tokens);
            entries.push(IndexedRecord { tokens, canonical });
        }

        debug!(
            records = entries.len(),
            distinct_tokens = postings.len(),
            "match index built"
        );

        Self { postings, entries }
    }
}

struct IndexCache {
    snapshot: StoreSnapshot,
    index: MatchIndex,
}

/// Ranks known questions against extracted text.
pub struct QuestionMatcher {
    store: Arc<dyn QuestionStore>,
    config: MatcherConfig,
    /// Index for the most recent snapshot, rebuilt when the store swaps
    cache: RwLock<Option<Arc<IndexCache>>>,
}

impl QuestionMatcher {
    pub fn new(store: Arc<dyn QuestionStore>, config: MatcherConfig) -> Self {
        Self {
            store,
            config,
            cache: RwLock::new(None),
        }
    }

    /// Rank known questions against the extracted text.
    ///
    /// An empty result list means "no known match" and is a normal outcome;
    /// the only error path is failing to reach the store.
    pub fn match_text(&self, text: &ExtractedText) -> Result<Vec<MatchResult>, StoreError> {
        let cache = self.current_index()?;
        let index = &cache.index;
        let snapshot = &cache.snapshot;

        let query_tokens = tokenize(&text.text);
        let query_set = token_set(&query_tokens);
        if query_set.is_empty() {
            return Ok(Vec::new());
        }
        let query_canonical = canonical_form(&query_set);

        // Candidate generation: records sharing at least one query token.
        let mut shared_counts: HashMap<u32, usize> = HashMap::new();
        for token in &query_set {
            if let Some(positions) = index.postings.get(token) {
                for &pos in positions {
                    *shared_counts.entry(pos).or_insert(0) += 1;
                }
            }
        }

        let mut results: Vec<MatchResult> = Vec::new();
        for (&pos, &shared) in &shared_counts {
            let entry = &index.entries[pos as usize];
            let confidence = score(
                shared,
                query_set.len(),
                entry.tokens.len(),
                &query_canonical,
                &entry.canonical,
            );
            if confidence < self.config.min_confidence {
                continue;
            }
            results.push(MatchResult {
                question_id: snapshot[pos as usize].id.clone(),
                confidence,
                snippet: snippet(&text.text, &query_tokens, &entry.tokens),
            });
        }

        // Descending confidence, ties broken by ascending id.
        results.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.question_id.cmp(&b.question_id))
        });
        results.truncate(self.config.max_results);

        debug!(
            query_tokens = query_set.len(),
            candidates = shared_counts.len(),
            results = results.len(),
            "matching complete"
        );

        Ok(results)
    }

    /// Snapshot the store and reuse or rebuild the index for it.
    fn current_index(&self) -> Result<Arc<IndexCache>, StoreError> {
        let snapshot = self.store.snapshot()?;

        if let Some(ref cached) = *self.cache.read() {
            if Arc::ptr_eq(&cached.snapshot, &snapshot) {
                return Ok(cached.clone());
            }
        }

        let rebuilt = Arc::new(IndexCache {
            index: MatchIndex::build(&snapshot),
            snapshot,
        });
        *self.cache.write() = Some(rebuilt.clone());
        Ok(rebuilt)
    }
}

/// Blend token overlap and edit similarity into a 0-100 confidence.
///
/// Containment (how much of the query the record covers) carries most of the
/// weight, Jaccard penalizes records much larger than the query, and edit
/// distance over the canonical forms separates near-identical wordings from
/// loose token coincidences.
fn score(
    shared: usize,
    query_len: usize,
    record_len: usize,
    query_canonical: &str,
    record_canonical: &str,
) -> u8 {
    let containment = shared as f64 / query_len as f64;
    let union = query_len + record_len - shared;
    let jaccard = if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    };
    let edit = strsim::normalized_levenshtein(query_canonical, record_canonical);

    let blended = CONTAINMENT_WEIGHT * containment + JACCARD_WEIGHT * jaccard + EDIT_WEIGHT * edit;
    (blended * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Slice of the raw extracted text spanning the query tokens the record
/// shares, i.e. what triggered this match.
fn snippet(raw: &str, query_tokens: &[Token], record_tokens: &BTreeSet<String>) -> String {
    let mut lo = None;
    let mut hi = None;
    for token in query_tokens {
        if record_tokens.contains(&token.text) {
            lo = Some(lo.map_or(token.start, |v: usize| v.min(token.start)));
            hi = Some(hi.map_or(token.end, |v: usize| v.max(token.end)));
        }
    }
    match (lo, hi) {
        (Some(lo), Some(hi)) => raw[lo..hi].trim().to_string(),
        _ => String::new(),
    }
}
