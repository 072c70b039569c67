use crate::error::IndexerError;
use crate::metrics::IndexMetrics;
use ignore::WalkBuilder;
use md5::{Digest, Md5};
use ragcode_code_chunker::{Language, MultiSegmenter, Segmenter, SemanticChunker};
use ragcode_domain::{CodeChunk, DomainError, IndexingJob, JobStatus};
use ragcode_embeddings::Embedder;
use ragcode_graph::{DependencyGraph, GraphBuilder};
use ragcode_sparse_index::KeywordIndex;
use ragcode_vector_store::ChunkStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Ingest configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks per embedding / upsert sub-batch
    pub batch_size: usize,
    /// Upsert attempts before surfacing the failure
    pub max_retries: usize,
    /// File-level parallelism for directory walks
    pub num_workers: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 512,
            chunk_overlap: 50,
            batch_size: 20,
            max_retries: 3,
            num_workers: 4,
        }
    }
}

/// Coordinates the per-file ingest pipeline and directory fan-out.
///
/// The `file_hashes` map gates re-indexing: a file whose content hash is
/// unchanged since the last successful run is skipped. The cache is instance
/// state; cold starts re-index everything.
#[derive(Clone)]
pub struct Indexer {
    segmenter: Arc<MultiSegmenter>,
    chunker: Arc<SemanticChunker>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    keyword: Option<Arc<dyn KeywordIndex>>,
    graph: Option<Arc<DependencyGraph>>,
    config: Arc<IndexerConfig>,
    file_hashes: Arc<RwLock<HashMap<String, String>>>,
    jobs: Arc<RwLock<HashMap<String, IndexingJob>>>,
    job_counter: Arc<AtomicU64>,
    metrics: Arc<IndexMetrics>,
}

impl Indexer {
    pub fn new(
        segmenter: MultiSegmenter,
        chunker: SemanticChunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
        keyword: Option<Arc<dyn KeywordIndex>>,
        graph: Option<Arc<DependencyGraph>>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            segmenter: Arc::new(segmenter),
            chunker: Arc::new(chunker),
            embedder,
            store,
            keyword,
            graph,
            config: Arc::new(config),
            file_hashes: Arc::new(RwLock::new(HashMap::new())),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            job_counter: Arc::new(AtomicU64::new(0)),
            metrics: Arc::new(IndexMetrics::new()),
        }
    }

    /// Index a file or directory, tracking the run as a job and resetting
    /// the metrics for this top-level call.
    pub async fn index(&self, path: &str) -> Result<IndexingJob, IndexerError> {
        let target = Path::new(path);
        if !target.exists() {
            return Err(DomainError::not_found(format!("path does not exist: {path}")).into());
        }

        let job_id = format!("job-{}", self.job_counter.fetch_add(1, Ordering::Relaxed) + 1);
        let mut job = IndexingJob::new(&job_id, path);
        job.status = JobStatus::Running;
        self.jobs.write().await.insert(job_id.clone(), job.clone());

        self.metrics.reset();
        let outcome = if target.is_dir() {
            self.index_directory(target).await
        } else {
            self.index_file(target).await
        };
        self.metrics.finish();
        self.metrics.log_summary();

        job.finish(outcome.as_ref().err().map(ToString::to_string));
        self.jobs.write().await.insert(job_id, job.clone());

        outcome.map(|_| job)
    }

    /// Index a single file, skipping it when the content has not changed
    /// since the last run.
    pub async fn index_file(&self, path: &Path) -> Result<(), IndexerError> {
        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "indexing file");

        let language = Language::from_path(path);
        if language == Language::Unknown {
            debug!(path = %path_str, "skipping unknown file type");
            self.metrics.record_file(false, false);
            return Ok(());
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(source) => {
                self.metrics.record_file(false, true);
                return Err(IndexerError::Read {
                    path: path_str,
                    source,
                });
            }
        };

        let current_hash = content_hash(&bytes);
        {
            let hashes = self.file_hashes.read().await;
            if hashes.get(&path_str) == Some(&current_hash) {
                debug!(path = %path_str, "file unchanged, skipping");
                self.metrics.record_file(false, false);
                return Ok(());
            }
        }

        let content = String::from_utf8_lossy(&bytes);
        let segments = match self.segmenter.segment(&path_str, &content) {
            Ok(segments) => segments,
            Err(e) => {
                self.metrics.record_file(false, true);
                return Err(e.into());
            }
        };

        if segments.is_empty() {
            debug!(path = %path_str, "no chunks extracted");
            self.metrics.record_file(false, false);
            return Ok(());
        }

        let mut chunks = self.chunker.chunk(segments);

        if let Err(e) = self.embed_batched(&mut chunks).await {
            self.metrics.record_file(false, true);
            return Err(e);
        }

        // Delete existing chunks first so nothing stale survives under this
        // path; a failed delete is logged and ingest proceeds.
        if let Err(e) = self.store.delete_by_path(&path_str).await {
            warn!(path = %path_str, error = %e, "failed to delete old chunks");
        }

        if let Err(e) = self.store_batched(&chunks).await {
            self.metrics.record_file(false, true);
            return Err(e);
        }

        if let Some(keyword) = &self.keyword {
            if let Err(e) = keyword.add_chunks(&chunks).await {
                error!(path = %path_str, error = %e, "failed to update keyword index");
            }
        }

        if let Some(graph) = &self.graph {
            GraphBuilder::new(Arc::clone(graph)).build(&chunks);
        }

        self.file_hashes.write().await.insert(path_str.clone(), current_hash);

        self.metrics.record_file(true, false);
        self.metrics.record_chunks(chunks.len());
        info!(path = %path_str, chunks = chunks.len(), "file indexed");
        Ok(())
    }

    /// Walk a directory tree and index every known-language file through a
    /// bounded worker pool. Per-file failures are summarized; the walk
    /// always completes.
    pub async fn index_directory(&self, dir: &Path) -> Result<(), IndexerError> {
        info!(path = %dir.display(), "indexing directory");

        let files = discover_files(dir);
        let total = files.len();

        let semaphore = Arc::new(Semaphore::new(self.config.num_workers.max(1)));
        let mut tasks = JoinSet::new();

        for file in files {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("worker semaphore closed");
            let indexer = self.clone();

            tasks.spawn(async move {
                let result = indexer.index_file(&file).await;
                drop(permit);
                (file, result)
            });
        }

        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((file, Err(e))) => {
                    error!(path = %file.display(), error = %e, "failed to index file");
                    failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "indexing task panicked");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            warn!(failed, total, "some files failed to index");
        }
        info!(total, failed, "directory indexing complete");
        Ok(())
    }

    /// Drop a file from the hash gate and the vector store.
    pub async fn delete_file(&self, path: &Path) -> Result<(), IndexerError> {
        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "deleting file from index");

        self.file_hashes.write().await.remove(&path_str);
        self.store
            .delete_by_path(&path_str)
            .await
            .map_err(|e| IndexerError::Store {
                attempts: 1,
                message: e.to_string(),
            })
    }

    /// Status of a previously started indexing job.
    pub async fn job(&self, job_id: &str) -> Result<IndexingJob, DomainError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("job not found"))
    }

    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn embed_batched(&self, chunks: &mut [CodeChunk]) -> Result<(), IndexerError> {
        let batch_size = self.config.batch_size.max(1);
        for batch in chunks.chunks_mut(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
        }
        Ok(())
    }

    async fn store_batched(&self, chunks: &[CodeChunk]) -> Result<(), IndexerError> {
        let batch_size = self.config.batch_size.max(1);
        for batch in chunks.chunks(batch_size) {
            self.store_with_retry(batch).await?;
        }
        Ok(())
    }

    /// Quadratic backoff: attempt n sleeps `n² · 100ms` before retrying.
    async fn store_with_retry(&self, batch: &[CodeChunk]) -> Result<(), IndexerError> {
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis((attempt * attempt) as u64 * 100);
                warn!(
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %last_error,
                    "retrying chunk store"
                );
                self.metrics.record_retry();
                tokio::time::sleep(backoff).await;
            }

            match self.store.store(batch).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = e.to_string(),
            }
        }

        Err(IndexerError::Store {
            attempts: max_retries,
            message: last_error,
        })
    }
}

/// Recursively collect indexable files, skipping hidden directories,
/// `node_modules`, and `vendor`.
fn discover_files(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            name != "node_modules" && name != "vendor"
        })
        .build();

    walker
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| Language::from_path(path) != Language::Unknown)
        .collect()
}

/// MD5 content hash used for change detection between runs.
fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
