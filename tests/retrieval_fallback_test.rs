//! Vector retrieval upgrade path and its keyword fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mediscope_core::error::ProviderError;
use mediscope_core::provider::{CapabilityProvider, ProviderInput, ProviderOutput};
use mediscope_core::retrieval::{ContextBuilder, KeywordIndex};
use mediscope_core::retry::RetryPolicy;
use mediscope_core::router::{ProviderRouter, RouteOptions};
use mediscope_core::types::{Capability, ProviderBackend, RetrievalSnippet};

struct VectorBackend {
    reply: Result<Vec<RetrievalSnippet>, ProviderError>,
}

#[async_trait]
impl CapabilityProvider for VectorBackend {
    fn capability(&self) -> Capability {
        Capability::Retrieval
    }

    async fn invoke(&self, _: ProviderInput) -> Result<ProviderOutput, ProviderError> {
        self.reply.clone().map(ProviderOutput::Snippets)
    }
}

fn snippet(id: &str, score: f64) -> RetrievalSnippet {
    RetrievalSnippet {
        source_id: id.into(),
        text: format!("vector snippet {id}"),
        score,
    }
}

fn retrieval_backend() -> ProviderBackend {
    ProviderBackend::new(Capability::Retrieval, "vector-store", 1)
        .with_max_attempts(2)
        .with_timeout(Duration::from_secs(1))
}

fn router_with(provider: Arc<dyn CapabilityProvider>) -> Arc<ProviderRouter> {
    Arc::new(
        ProviderRouter::builder()
            .with_retry_policy(
                RetryPolicy::new()
                    .with_base_delay(Duration::from_millis(1))
                    .with_max_delay(Duration::from_millis(4)),
            )
            .register(retrieval_backend(), provider)
            .build()
            .unwrap(),
    )
}

fn keyword_index() -> Arc<KeywordIndex> {
    let index = Arc::new(KeywordIndex::new());
    index.insert("keyword-doc", "Diabetes management benefits from a balanced diet.");
    index
}

#[tokio::test]
async fn configured_vector_backend_takes_precedence() {
    let router = router_with(Arc::new(VectorBackend {
        reply: Ok(vec![snippet("vec-1", 0.9), snippet("vec-2", 0.7)]),
    }));
    let builder = ContextBuilder::new(keyword_index()).with_router(router);

    let snippets = builder
        .retrieve("diabetes diet", 5, &RouteOptions::new())
        .await;
    assert_eq!(snippets.len(), 2);
    assert_eq!(snippets[0].source_id, "vec-1");
}

#[tokio::test]
async fn vector_results_are_bounded_and_filtered() {
    let router = router_with(Arc::new(VectorBackend {
        reply: Ok(vec![
            snippet("vec-1", 0.9),
            snippet("vec-zero", 0.0),
            snippet("vec-2", 0.5),
            snippet("vec-3", 0.4),
        ]),
    }));
    let builder = ContextBuilder::new(keyword_index()).with_router(router);

    let snippets = builder
        .retrieve("diabetes diet", 2, &RouteOptions::new())
        .await;
    assert_eq!(snippets.len(), 2);
    assert!(snippets.iter().all(|s| s.score > 0.0));
}

#[tokio::test]
async fn vector_outage_falls_back_to_keyword_scoring() {
    let router = router_with(Arc::new(VectorBackend {
        reply: Err(ProviderError::Connection("store down".into())),
    }));
    let builder = ContextBuilder::new(keyword_index()).with_router(router);

    let snippets = builder
        .retrieve("diabetes diet", 5, &RouteOptions::new())
        .await;
    // Retrieval never hard-fails: the keyword path serves the request.
    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].source_id, "keyword-doc");
}

#[tokio::test]
async fn no_retrieval_backend_uses_keyword_path_directly() {
    let router = Arc::new(ProviderRouter::builder().build().unwrap());
    let builder = ContextBuilder::new(keyword_index()).with_router(router);

    let snippets = builder
        .retrieve("diabetes diet", 5, &RouteOptions::new())
        .await;
    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].source_id, "keyword-doc");
}

#[tokio::test]
async fn no_match_is_a_valid_empty_outcome() {
    let router = Arc::new(ProviderRouter::builder().build().unwrap());
    let builder = ContextBuilder::new(keyword_index()).with_router(router);

    let snippets = builder
        .retrieve("unrelated astrophysics question", 5, &RouteOptions::new())
        .await;
    assert!(snippets.is_empty());
}
