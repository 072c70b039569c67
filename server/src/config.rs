use ragcode_codebase_retrieval::FusionStrategy;
use std::str::FromStr;

/// Application configuration, read from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Ollama
    pub ollama_url: String,
    pub embedding_model: String,
    pub llm_model: String,

    // Vector store
    pub vector_store_url: String,
    pub collection_name: String,
    pub embedding_dimension: u64,

    // Redis
    pub redis_url: String,
    pub redis_password: String,
    pub redis_db: i64,

    // Server
    pub server_port: u16,
    pub log_level: String,
    pub log_format: String,

    // Ingest
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
    pub num_workers: usize,
    pub embedding_workers: usize,
    pub max_concurrent_embeddings: usize,
    pub watch_path: Option<String>,

    // Retrieval
    pub hybrid_enabled: bool,
    pub hybrid_vector_weight: f32,
    pub fusion_strategy: FusionStrategy,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub use_mmr: bool,
    pub mmr_lambda: f32,

    // Prompt
    pub prompt_template: String,
}

impl Config {
    pub fn from_env() -> Self {
        let default_workers = (2 * std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(2))
        .max(4);

        Self {
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            embedding_model: env_or("EMBEDDING_MODEL", "all-minilm"),
            llm_model: env_or("LLM_MODEL", "llama3.2:1b"),

            vector_store_url: env_or("VECTOR_STORE_URL", "http://localhost:6334"),
            collection_name: env_or("COLLECTION_NAME", "code_chunks"),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", 384),

            redis_url: env_or("REDIS_URL", "redis://localhost:6379"),
            redis_password: env_or("REDIS_PASSWORD", ""),
            redis_db: env_parse("REDIS_DB", 0),

            server_port: env_parse("SERVER_PORT", 8080),
            log_level: env_or("LOG_LEVEL", "debug"),
            log_format: env_or("LOG_FORMAT", "json"),

            // all-minilm takes 512 tokens per input
            max_chunk_size: env_parse("MAX_CHUNK_SIZE", 512),
            chunk_overlap: env_parse("CHUNK_OVERLAP", 50),
            num_workers: env_parse("NUM_WORKERS", default_workers),
            embedding_workers: env_parse("EMBEDDING_WORKERS", 8),
            max_concurrent_embeddings: env_parse("MAX_CONCURRENT_EMBEDDINGS", 16),
            watch_path: std::env::var("WATCH_PATH").ok().filter(|p| !p.is_empty()),

            hybrid_enabled: env_parse("HYBRID_ENABLED", true),
            hybrid_vector_weight: env_parse("HYBRID_VECTOR_WEIGHT", 0.7),
            fusion_strategy: std::env::var("FUSION_STRATEGY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(FusionStrategy::Rrf),
            bm25_k1: env_parse("BM25_K1", 1.2),
            bm25_b: env_parse("BM25_B", 0.75),
            use_mmr: env_parse("USE_MMR", true),
            mmr_lambda: env_parse("MMR_LAMBDA", 0.7),

            prompt_template: env_or("PROMPT_TEMPLATE", "professional"),
        }
    }

    /// Redis connection URL with the configured password and database.
    pub fn redis_connection_url(&self) -> String {
        let base = if self.redis_url.contains("://") {
            self.redis_url.clone()
        } else {
            format!("redis://{}", self.redis_url)
        };

        let mut url = base;
        if !self.redis_password.is_empty() && !url.contains('@') {
            url = url.replacen("redis://", &format!("redis://:{}@", self.redis_password), 1);
        }
        if self.redis_db > 0 && !url.splitn(3, '/').nth(2).is_some_and(|rest| rest.contains('/')) {
            url = format!("{}/{}", url.trim_end_matches('/'), self.redis_db);
        }
        url
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_sensible_without_env() {
        let config = Config::from_env();
        assert_eq!(config.embedding_model, "all-minilm");
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.max_chunk_size, 512);
        assert_eq!(config.chunk_overlap, 50);
        assert!(config.hybrid_enabled);
        assert_eq!(config.fusion_strategy, FusionStrategy::Rrf);
        assert!(config.num_workers >= 4);
    }

    #[test]
    fn redis_url_composition() {
        let mut config = Config::from_env();
        config.redis_url = "localhost:6379".into();
        config.redis_password = String::new();
        config.redis_db = 0;
        assert_eq!(config.redis_connection_url(), "redis://localhost:6379");

        config.redis_password = "secret".into();
        config.redis_db = 2;
        assert_eq!(
            config.redis_connection_url(),
            "redis://:secret@localhost:6379/2"
        );
    }
}
