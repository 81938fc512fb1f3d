//! End-to-end retrieval over an in-memory graph with deterministic providers.

use async_trait::async_trait;
use drift_embed::{Embedder, FailingEmbedder, MockEmbedder, MockLLMClient};
use drift_graph::InMemoryGraphIndex;
use drift_retrieval::inference::{ConnectionStrategy, InferenceError};
use drift_retrieval::text::QueryTerms;
use drift_retrieval::{
    ConfigUpdate, DriftConfig, DriftError, DriftRetriever, GraphEdge, GraphNode,
    InferenceEngine, InferenceStrategy, InferredConnection, QueryOptions, TraversalDirection,
};
use drift_types::{IndexError, SimilarityIndex};
use std::sync::Arc;

const ML_NODES: [(&str, &str); 5] = [
    ("ml", "Machine learning is a field of artificial intelligence"),
    ("dl", "Deep learning is a subset of machine learning based on neural networks"),
    ("nn", "Neural networks are composed of layers of connected neurons"),
    ("cnn", "Convolutional neural networks excel at image recognition"),
    ("bp", "Backpropagation trains neural networks by propagating gradients"),
];

async fn ml_graph() -> Arc<InMemoryGraphIndex> {
    let embedder = MockEmbedder::new();
    let index = InMemoryGraphIndex::new();
    for (id, content) in ML_NODES {
        let embedding = embedder.embed(content).await.unwrap();
        index.add_node(GraphNode::new(id, content, embedding)).await;
    }
    index
        .add_edges_batch(&[
            GraphEdge::new("e1", "dl", "ml", "subset_of"),
            GraphEdge::new("e2", "dl", "nn", "based_on").with_weight(0.9),
            GraphEdge::new("e3", "cnn", "nn", "type_of"),
            GraphEdge::new("e4", "bp", "nn", "trains").with_weight(0.8),
            GraphEdge::new("e5", "nn", "ml", "part_of").with_weight(0.7),
        ])
        .await
        .unwrap();
    Arc::new(index)
}

async fn ml_retriever(config: DriftConfig) -> DriftRetriever {
    DriftRetriever::new(ml_graph().await, Arc::new(MockEmbedder::new()), config).unwrap()
}

#[tokio::test]
async fn deep_learning_question_is_answered_from_the_graph() {
    let retriever = ml_retriever(DriftConfig::default()).await;
    let answer = retriever.query("What is deep learning?").await.unwrap();
    assert!(!answer.is_empty());
    assert!(answer.contains("Deep learning is a subset of machine learning"));
}

/// Taxonomy graph: machine learning branches into deep, supervised and
/// unsupervised learning; deep learning leads on to neural networks.
async fn taxonomy_graph() -> Arc<InMemoryGraphIndex> {
    let embedder = MockEmbedder::new();
    let index = InMemoryGraphIndex::new();
    for (id, content) in [
        ("ml", "Machine learning lets computers learn patterns from data"),
        ("dl", "Deep learning trains neural networks with many layers"),
        ("nn", "Neural networks are layers of connected artificial neurons"),
        ("sup", "Supervised learning fits models to labelled examples"),
        ("unsup", "Unsupervised learning finds structure in unlabelled data"),
    ] {
        let embedding = embedder.embed(content).await.unwrap();
        index.add_node(GraphNode::new(id, content, embedding)).await;
    }
    index
        .add_edges_batch(&[
            GraphEdge::new("ml-dl", "ml", "dl", "includes"),
            GraphEdge::new("dl-nn", "dl", "nn", "uses"),
            GraphEdge::new("ml-sup", "ml", "sup", "includes"),
            GraphEdge::new("ml-unsup", "ml", "unsup", "includes"),
            GraphEdge::new("sup-unsup", "sup", "unsup", "contrasts_with").with_weight(0.5),
        ])
        .await
        .unwrap();
    Arc::new(index)
}

#[tokio::test]
async fn taxonomy_question_is_answered_in_every_direction() {
    for direction in [
        TraversalDirection::Forward,
        TraversalDirection::Backward,
        TraversalDirection::Bidirectional,
    ] {
        let retriever = DriftRetriever::new(
            taxonomy_graph().await,
            Arc::new(MockEmbedder::new()),
            DriftConfig {
                direction,
                ..DriftConfig::default()
            },
        )
        .unwrap();
        let resp = retriever
            .query_detailed("What is deep learning?", &QueryOptions::default())
            .await
            .unwrap();
        assert!(!resp.answer.is_empty(), "{direction}");
        assert!(!resp.paths.is_empty(), "{direction}");
        assert!(
            resp.answer.contains("Deep learning trains neural networks"),
            "{direction}: {}",
            resp.answer
        );
    }
}

#[tokio::test]
async fn detailed_query_exposes_every_stage() {
    let retriever = ml_retriever(DriftConfig::default()).await;
    let resp = retriever
        .query_detailed("What is deep learning?", &QueryOptions::default())
        .await
        .unwrap();

    assert!(!resp.entry_points.is_empty() && resp.entry_points.len() <= 3);
    assert!(!resp.paths.is_empty() && resp.paths.len() <= 5);
    for path in &resp.paths {
        assert_eq!(path.edges().len(), path.len() - 1);
        assert!(path.score() >= 0.3 && path.score() <= 1.0);
    }
    for conn in &resp.inferred_connections {
        assert_ne!(conn.source_node, conn.target_node);
        assert!(conn.confidence >= 0.3);
    }
    assert_eq!(resp.metrics.selected_paths, resp.paths.len());
    assert!(resp.metrics.total_us >= resp.metrics.traversal_us);

    let json = serde_json::to_value(&resp).unwrap();
    assert!(json["paths"][0]["nodes"].is_array());
    assert!(json["metrics"]["raw_paths"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn zero_top_k_is_a_configuration_error() {
    let err = DriftRetriever::new(
        ml_graph().await,
        Arc::new(MockEmbedder::new()),
        DriftConfig {
            top_k_paths: 0,
            ..DriftConfig::default()
        },
    )
    .err()
    .unwrap();
    assert_eq!(err.field(), "top_k_paths");
}

#[tokio::test]
async fn empty_graph_and_empty_query_are_distinct_errors() {
    let empty = DriftRetriever::new(
        Arc::new(InMemoryGraphIndex::new()),
        Arc::new(MockEmbedder::new()),
        DriftConfig::default(),
    )
    .unwrap();
    assert!(matches!(
        empty.query("What is deep learning?").await,
        Err(DriftError::EmptyCorpus)
    ));

    let retriever = ml_retriever(DriftConfig::default()).await;
    assert!(matches!(retriever.query("").await, Err(DriftError::EmptyQuery)));
    assert!(matches!(retriever.query(" \t\n").await, Err(DriftError::EmptyQuery)));
}

/// Index with nodes whose nearest-neighbour lookup can be made to fail.
struct BrokenIndex {
    fail: bool,
}

#[async_trait]
impl SimilarityIndex for BrokenIndex {
    async fn get_node(&self, _id: &str) -> Result<Option<GraphNode>, IndexError> {
        Ok(None)
    }

    async fn find_similar(&self, _v: &[f32], _k: usize) -> Result<Vec<GraphNode>, IndexError> {
        if self.fail {
            Err(IndexError::Other("connection refused".into()))
        } else {
            Ok(Vec::new())
        }
    }

    async fn get_outgoing_edges(&self, _id: &str) -> Result<Vec<GraphEdge>, IndexError> {
        Ok(Vec::new())
    }

    async fn get_incoming_edges(&self, _id: &str) -> Result<Vec<GraphEdge>, IndexError> {
        Ok(Vec::new())
    }

    async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, IndexError> {
        Ok(vec![GraphNode::new("x", "unreachable", vec![])])
    }
}

#[tokio::test]
async fn missing_entry_points_and_index_failures_surface() {
    let no_seeds = DriftRetriever::new(
        Arc::new(BrokenIndex { fail: false }),
        Arc::new(MockEmbedder::new()),
        DriftConfig::default(),
    )
    .unwrap();
    let err = no_seeds.query("anything").await.unwrap_err();
    assert!(matches!(err, DriftError::NoEntryPoints(ref q) if q == "anything"));
    assert!(err.is_user_facing());

    let failing = DriftRetriever::new(
        Arc::new(BrokenIndex { fail: true }),
        Arc::new(MockEmbedder::new()),
        DriftConfig::default(),
    )
    .unwrap();
    let err = failing.query("anything").await.unwrap_err();
    assert!(matches!(err, DriftError::Index(_)));
    assert!(!err.is_user_facing());
}

#[tokio::test]
async fn embedding_failure_is_a_provider_error() {
    let retriever = DriftRetriever::new(
        ml_graph().await,
        Arc::new(FailingEmbedder::new("embedding quota exceeded")),
        DriftConfig::default(),
    )
    .unwrap();
    let err = retriever.query("What is deep learning?").await.unwrap_err();
    assert!(matches!(err, DriftError::Embedder(_)));
    assert!(!err.is_user_facing());
    assert!(err.to_string().contains("embedding quota exceeded"));
}

#[tokio::test]
async fn llm_answers_and_failures_propagate() {
    let llm = Arc::new(MockLLMClient::replying("Deep learning stacks neural network layers."));
    let retriever = ml_retriever(DriftConfig {
        include_provenance: false,
        ..DriftConfig::default()
    })
    .await
    .with_llm(llm.clone());
    let answer = retriever.query("What is deep learning?").await.unwrap();
    assert_eq!(answer, "Deep learning stacks neural network layers.");
    assert!(llm.prompts()[0].contains("What is deep learning?"));

    let broken = ml_retriever(DriftConfig::default())
        .await
        .with_llm(Arc::new(MockLLMClient::failing("rate limited")));
    assert!(matches!(
        broken.query("What is deep learning?").await,
        Err(DriftError::Llm(_))
    ));
}

struct ExplodingStrategy;

#[async_trait]
impl ConnectionStrategy for ExplodingStrategy {
    fn kind(&self) -> InferenceStrategy {
        InferenceStrategy::Semantic
    }

    async fn propose(
        &self,
        _nodes: &[GraphNode],
        _query: &QueryTerms,
    ) -> Result<Vec<InferredConnection>, InferenceError> {
        Err(InferenceError::Other("model crashed".into()))
    }
}

#[tokio::test]
async fn inference_failure_does_not_fail_the_query() {
    let index = ml_graph().await;
    let engine = InferenceEngine::new(index.clone(), 10).with_strategy(Arc::new(ExplodingStrategy));
    let retriever = DriftRetriever::new(index, Arc::new(MockEmbedder::new()), DriftConfig::default())
        .unwrap()
        .with_inference_engine(engine);
    let resp = retriever
        .query_detailed("What is deep learning?", &QueryOptions::default())
        .await
        .unwrap();
    assert!(resp.inferred_connections.is_empty());
    assert!(!resp.paths.is_empty());
}

#[tokio::test]
async fn every_strategy_completes_a_query() {
    for strategy in [
        InferenceStrategy::Semantic,
        InferenceStrategy::Similarity,
        InferenceStrategy::Structural,
    ] {
        let retriever = ml_retriever(DriftConfig {
            inference_strategy: strategy,
            inference_confidence_threshold: 0.0,
            ..DriftConfig::default()
        })
        .await;
        let resp = retriever
            .query_detailed("neural networks", &QueryOptions::default())
            .await
            .unwrap();
        assert!(!resp.answer.is_empty(), "{strategy}");
        assert!(resp.inferred_connections.len() <= 10);
    }
}

#[tokio::test]
async fn runtime_updates_are_validated_and_applied() {
    let retriever = ml_retriever(DriftConfig::default()).await;

    let err = retriever
        .update_config(&ConfigUpdate {
            top_k_paths: Some(0),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), "top_k_paths");

    let updated = retriever
        .update_config(&ConfigUpdate {
            top_k_paths: Some(1),
            direction: Some(TraversalDirection::Forward),
            enable_inference: Some(false),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.top_k_paths, 1);

    let resp = retriever
        .query_detailed("What is deep learning?", &QueryOptions::default())
        .await
        .unwrap();
    assert!(resp.paths.len() <= 1);
    assert!(resp.inferred_connections.is_empty());
}

#[tokio::test]
async fn repeated_queries_hit_the_inference_cache() {
    let retriever = ml_retriever(DriftConfig::default()).await;
    retriever.query("What is deep learning?").await.unwrap();
    retriever.query("what is deep learning").await.unwrap();
    let stats = retriever.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);

    retriever.clear_inference_cache();
    assert_eq!(retriever.cache_stats().len, 0);
}

#[tokio::test]
async fn concurrent_queries_share_one_retriever() {
    let retriever = Arc::new(ml_retriever(DriftConfig::default()).await);
    let handles: Vec<_> = ["deep learning", "neural networks", "image recognition", "gradients"]
        .into_iter()
        .map(|q| {
            let r = retriever.clone();
            tokio::spawn(async move { r.query(q).await })
        })
        .collect();
    for h in handles {
        assert!(!h.await.unwrap().unwrap().is_empty());
    }
}
