use anyhow::Context;
use ragcode_code_chunker::{MultiSegmenter, SemanticChunker};
use ragcode_codebase_indexer::{FileEvent, Indexer, IndexerConfig, Watcher};
use ragcode_codebase_retrieval::{
    ContextExpander, ExpandConfig, FusionConfig, HeuristicReranker, HierarchicalFilter,
    MmrReranker, Reranker, RetrieverBuilder,
};
use ragcode_embeddings::OllamaEmbedder;
use ragcode_graph::DependencyGraph;
use ragcode_llm::OllamaChat;
use ragcode_prompt::{PromptTemplate, TemplateGenerator};
use ragcode_server::api;
use ragcode_server::config::Config;
use ragcode_server::state::AppState;
use ragcode_sparse_index::{Bm25Scorer, KeywordIndex, RedisIndex};
use ragcode_vector_store::{ChunkStore, QdrantStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const COLLECTION_INIT_TIMEOUT: Duration = Duration::from_secs(10);
const WATCH_DEBOUNCE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(&config);

    info!(
        ollama_url = %config.ollama_url,
        embedding_model = %config.embedding_model,
        llm_model = %config.llm_model,
        vector_store = %config.vector_store_url,
        port = config.server_port,
        "ragcode server starting"
    );

    // Ollama adapters
    let embedder = Arc::new(OllamaEmbedder::with_concurrency(
        config.ollama_url.clone(),
        config.embedding_model.clone(),
        config.embedding_workers,
        config.max_concurrent_embeddings,
    ));
    let llm = Arc::new(OllamaChat::new(
        config.ollama_url.clone(),
        config.llm_model.clone(),
    ));

    // Qdrant chunk store; the collection carries the embedding model's
    // dimension rather than a hard-coded size.
    let qdrant = QdrantStore::new(&config.vector_store_url, config.collection_name.clone())
        .context("failed to initialize vector store")?;
    tokio::time::timeout(
        COLLECTION_INIT_TIMEOUT,
        qdrant.init_collection(config.embedding_dimension),
    )
    .await
    .context("collection initialization timed out")?
    .context("failed to initialize collection")?;
    let store: Arc<dyn ChunkStore> = Arc::new(qdrant);

    // Redis inverted index for the BM25 side
    let keyword: Option<Arc<dyn KeywordIndex>> = if config.hybrid_enabled {
        let index = RedisIndex::connect(&config.redis_connection_url(), "rag:")
            .await
            .context("failed to connect to redis")?;
        Some(Arc::new(index))
    } else {
        info!("hybrid retrieval disabled, running dense-only");
        None
    };

    // Dependency graph and expander
    let graph = Arc::new(DependencyGraph::new());
    let expander = ContextExpander::new(Arc::clone(&graph), Arc::clone(&store));

    // Reranker stack: heuristics, optionally wrapped in MMR
    let reranker: Box<dyn Reranker> = if config.use_mmr {
        Box::new(MmrReranker::new(
            Box::new(HeuristicReranker::new()),
            config.mmr_lambda,
        ))
    } else {
        Box::new(HeuristicReranker::new())
    };

    let fusion = FusionConfig {
        strategy: config.fusion_strategy,
        vector_weight: config.hybrid_vector_weight,
        ..Default::default()
    };

    let query_embedder: Arc<dyn ragcode_embeddings::Embedder> = embedder.clone();
    let mut retriever_builder = RetrieverBuilder::new(query_embedder, Arc::clone(&store))
        .reranker(reranker)
        .hierarchy(HierarchicalFilter::new(3))
        .expander(expander, ExpandConfig::default())
        .fusion(fusion);
    if let Some(keyword) = &keyword {
        let scorer = Bm25Scorer::new(config.bm25_k1, config.bm25_b, Arc::clone(keyword));
        retriever_builder = retriever_builder.keyword_search(Arc::clone(keyword), scorer);
    }
    let retriever = Arc::new(
        retriever_builder
            .build()
            .context("failed to build retriever")?,
    );

    // Ingest pipeline
    let indexer = Indexer::new(
        MultiSegmenter::new(),
        SemanticChunker::new(config.max_chunk_size, config.chunk_overlap),
        embedder,
        Arc::clone(&store),
        keyword,
        Some(graph),
        IndexerConfig {
            max_chunk_size: config.max_chunk_size,
            chunk_overlap: config.chunk_overlap,
            num_workers: config.num_workers,
            ..Default::default()
        },
    );

    let prompter = Arc::new(
        TemplateGenerator::new(PromptTemplate::by_name(&config.prompt_template))
            .with_model(config.llm_model.clone()),
    );

    // File watcher: re-index on change, drop on delete. Losing the watcher
    // only disables auto-indexing, it never stops the server.
    let _watcher = config
        .watch_path
        .as_deref()
        .and_then(|path| start_watcher(path, indexer.clone()));

    let state = AppState::new(indexer, retriever, llm, prompter);
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "api server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("api server failed")?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Spawn the debounced watcher loop; returns the watcher so it stays alive.
fn start_watcher(path: &str, indexer: Indexer) -> Option<Watcher> {
    let mut watcher = match Watcher::new(WATCH_DEBOUNCE) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!(error = %e, "failed to create file watcher");
            return None;
        }
    };

    if let Err(e) = watcher.watch(Path::new(path)) {
        warn!(path, error = %e, "failed to watch path, auto-indexing disabled");
        return None;
    }

    let mut events = watcher.debounced_events();
    tokio::spawn(async move {
        while let Some((changed, event)) = events.recv().await {
            let outcome = match event {
                FileEvent::Delete => {
                    info!(path = %changed.display(), "file deleted, removing from index");
                    indexer.delete_file(&changed).await
                }
                FileEvent::Create | FileEvent::Modify => {
                    info!(path = %changed.display(), ?event, "file changed, re-indexing");
                    indexer.index_file(&changed).await
                }
            };
            if let Err(e) = outcome {
                error!(path = %changed.display(), error = %e, "failed to handle file event");
            }
        }
    });

    info!(path, debounce_ms = WATCH_DEBOUNCE.as_millis() as u64, "file watcher started");
    Some(watcher)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install shutdown handler");
    }
    info!("shutdown signal received");
}
