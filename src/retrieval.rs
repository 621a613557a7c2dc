//! Retrieval Context Builder
//!
//! Turns a free-text query into a bounded set of relevant knowledge
//! snippets. The keyword path (rarity-weighted term overlap over an
//! in-memory document set) is always available; when a vector-retrieval
//! backend is configured the router is tried first and the keyword path
//! serves as the fallback.
//!
//! Retrieval never hard-fails a chat request: absence of context is a
//! valid, non-error outcome.

use std::sync::{Arc, RwLock};

use crate::provider::{ProviderInput, ProviderOutput, RetrievalQuery};
use crate::router::{ProviderRouter, RouteOptions};
use crate::types::{Capability, RetrievalSnippet};

/// Default number of snippets handed to the generation prompt.
pub const DEFAULT_TOP_K: usize = 3;

/// Tokens shorter than this carry no signal and are skipped.
const MIN_TERM_LEN: usize = 3;

struct IndexedDocument {
    source_id: String,
    text: String,
    lowered: String,
}

/// In-memory keyword index over the knowledge documents.
///
/// Insertion order is preserved and breaks score ties, so ranking is stable
/// across identical queries.
#[derive(Default)]
pub struct KeywordIndex {
    documents: RwLock<Vec<IndexedDocument>>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document. `source_id` is the attribution handle that ends up
    /// in citations.
    pub fn insert(&self, source_id: impl Into<String>, text: impl Into<String>) {
        let text = text.into();
        let lowered = text.to_lowercase();
        // A panicked writer poisons the lock; the document list is always
        // left in a consistent state, so recover rather than propagate.
        self.documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(IndexedDocument {
                source_id: source_id.into(),
                text,
                lowered,
            });
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Score every document against `query` and return the `top_k` best.
    ///
    /// `score = Σ idf(term)` over the query terms the document contains,
    /// with `idf = 1 + ln(N / df)`; zero-score documents are dropped, ties
    /// keep insertion order, and at most `top_k` snippets come back.
    pub fn query(&self, query: &str, top_k: usize) -> Vec<RetrievalSnippet> {
        if top_k == 0 {
            return Vec::new();
        }
        let documents = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if documents.is_empty() {
            return Vec::new();
        }

        let terms = query_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let total = documents.len() as f64;
        let weights: Vec<(String, f64)> = terms
            .into_iter()
            .filter_map(|term| {
                let df = documents
                    .iter()
                    .filter(|doc| doc.lowered.contains(&term))
                    .count();
                (df > 0).then(|| {
                    let idf = 1.0 + (total / df as f64).ln();
                    (term, idf)
                })
            })
            .collect();

        let mut scored: Vec<RetrievalSnippet> = documents
            .iter()
            .filter_map(|doc| {
                let score: f64 = weights
                    .iter()
                    .filter(|(term, _)| doc.lowered.contains(term))
                    .map(|(_, idf)| idf)
                    .sum();
                (score > 0.0).then(|| RetrievalSnippet {
                    source_id: doc.source_id.clone(),
                    text: doc.text.clone(),
                    score,
                })
            })
            .collect();

        // Stable sort: equal scores keep document insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).expect("finite scores"));
        scored.truncate(top_k);
        scored
    }
}

/// Lowercased, deduplicated query terms in first-seen order.
fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in query.split_whitespace() {
        let term: String = token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if term.len() >= MIN_TERM_LEN && !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Builds generation context, preferring a configured vector backend and
/// falling back to the keyword index.
pub struct ContextBuilder {
    index: Arc<KeywordIndex>,
    router: Option<Arc<ProviderRouter>>,
}

impl ContextBuilder {
    /// Keyword-only builder.
    pub fn new(index: Arc<KeywordIndex>) -> Self {
        Self {
            index,
            router: None,
        }
    }

    /// Try the router's `Retrieval` capability before the keyword index.
    pub fn with_router(mut self, router: Arc<ProviderRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn index(&self) -> &KeywordIndex {
        &self.index
    }

    /// Retrieve up to `top_k` snippets for `query`. Infallible: any vector
    /// backend failure degrades to the keyword path, and an empty result is
    /// a valid outcome.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        options: &RouteOptions,
    ) -> Vec<RetrievalSnippet> {
        if let Some(router) = &self.router
            && router.has_capability(Capability::Retrieval)
        {
            let input = ProviderInput::Retrieve(RetrievalQuery {
                query: query.to_string(),
                top_k,
            });
            match router.route(Capability::Retrieval, input, options).await {
                Ok(ProviderOutput::Snippets(snippets)) => {
                    let mut snippets: Vec<RetrievalSnippet> = snippets
                        .into_iter()
                        .filter(|snippet| snippet.score > 0.0)
                        .collect();
                    snippets.truncate(top_k);
                    return snippets;
                }
                Ok(_) => {
                    tracing::warn!(
                        "retrieval backend returned a non-snippet output, using keyword fallback"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        "vector retrieval failed, using keyword fallback"
                    );
                }
            }
        }
        self.index.query(query, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_index() -> KeywordIndex {
        let index = KeywordIndex::new();
        index.insert(
            "diabetes-diet",
            "Diabetes management benefits from a balanced diet and regular glucose checks.",
        );
        index.insert("diabetes-only", "Diabetes is a chronic metabolic condition.");
        index.insert("hydration", "Drinking water supports kidney function.");
        index
    }

    #[test]
    fn rarer_term_overlap_ranks_higher() {
        let index = seeded_index();
        let results = index.query("diabetes management diet", 5);
        assert!(results.len() >= 2);
        assert_eq!(results[0].source_id, "diabetes-diet");
        assert_eq!(results[1].source_id, "diabetes-only");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn zero_score_documents_are_dropped() {
        let index = seeded_index();
        let results = index.query("diabetes", 10);
        assert!(results.iter().all(|s| s.score > 0.0));
        assert!(results.iter().all(|s| s.source_id != "hydration"));
    }

    #[test]
    fn top_k_bounds_the_result() {
        let index = seeded_index();
        assert!(index.query("diabetes diet water", 1).len() <= 1);
        assert!(index.query("diabetes diet water", 0).is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = KeywordIndex::new();
        index.insert("first", "aspirin dosage guidance");
        index.insert("second", "aspirin dosage guidance");
        let results = index.query("aspirin dosage", 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_id, "first");
        assert_eq!(results[1].source_id, "second");
    }

    #[test]
    fn short_and_unknown_terms_yield_nothing() {
        let index = seeded_index();
        assert!(index.query("a an it", 5).is_empty());
        assert!(index.query("zzzzunknown", 5).is_empty());
        assert!(index.query("", 5).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive_and_punctuation_tolerant() {
        let index = seeded_index();
        let results = index.query("DIABETES, diet!", 5);
        assert_eq!(results[0].source_id, "diabetes-diet");
    }

    #[test]
    fn a_poisoned_lock_does_not_disable_the_index() {
        let index = Arc::new(seeded_index());
        let poisoner = Arc::clone(&index);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.documents.write().unwrap();
            panic!("poison the index lock");
        })
        .join();

        index.insert("late", "Aspirin thins the blood.");
        assert_eq!(index.len(), 4);
        assert!(!index.query("diabetes", 5).is_empty());
    }

    #[tokio::test]
    async fn keyword_only_builder_retrieves_without_router() {
        let builder = ContextBuilder::new(Arc::new(seeded_index()));
        let snippets = builder
            .retrieve("diabetes diet", 2, &RouteOptions::new())
            .await;
        assert_eq!(snippets.first().map(|s| s.source_id.as_str()), Some("diabetes-diet"));
    }
}
