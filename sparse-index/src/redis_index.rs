use crate::error::SparseIndexError;
use crate::index::{preview_of, IndexedDocument, KeywordIndex};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::debug;

const SCAN_BATCH: usize = 1000;

/// Redis-backed inverted index.
///
/// Key schema under `{prefix}`:
///
/// | key | value |
/// |---|---|
/// | `index:token:{t}` | posting set of doc ids |
/// | `tf:{t}:{doc}` | per-doc term frequency |
/// | `stats:token:{t}:df` | document frequency |
/// | `doc:{doc}:length` | token count |
/// | `doc:{doc}:content` | first 200 bytes, preview |
/// | `stats:doc_count` | collection size |
/// | `stats:avg_doc_length` | running mean |
pub struct RedisIndex {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisIndex {
    /// Connect to Redis and bind the index to a keyspace prefix.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, SparseIndexError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
        })
    }

    fn token_key(&self, token: &str) -> String {
        format!("{}index:token:{}", self.key_prefix, token)
    }

    fn tf_key(&self, token: &str, doc_id: &str) -> String {
        format!("{}tf:{}:{}", self.key_prefix, token, doc_id)
    }

    fn df_key(&self, token: &str) -> String {
        format!("{}stats:token:{}:df", self.key_prefix, token)
    }

    fn doc_length_key(&self, doc_id: &str) -> String {
        format!("{}doc:{}:length", self.key_prefix, doc_id)
    }

    fn doc_content_key(&self, doc_id: &str) -> String {
        format!("{}doc:{}:content", self.key_prefix, doc_id)
    }

    fn stats_key(&self, name: &str) -> String {
        format!("{}stats:{}", self.key_prefix, name)
    }

    /// Collect every key under the prefix with a cursor scan.
    async fn scan_keys(&self) -> Result<Vec<String>, SparseIndexError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.key_prefix);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl KeywordIndex for RedisIndex {
    async fn add_documents(&self, docs: &[IndexedDocument]) -> Result<(), SparseIndexError> {
        if docs.is_empty() {
            return Ok(());
        }

        // Stats are read before the pipeline executes, so the running mean is
        // derived from the pre-batch collection.
        let old_count = self.doc_count().await?;
        let old_avg = self.avg_doc_length().await?;

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();

        for doc in docs {
            pipe.set(self.doc_length_key(&doc.id), doc.length as i64).ignore();
            pipe.set(self.doc_content_key(&doc.id), preview_of(&doc.content)).ignore();

            for (token, freq) in &doc.tokens {
                pipe.sadd(self.token_key(token), &doc.id).ignore();
                pipe.set(self.tf_key(token, &doc.id), *freq).ignore();
                pipe.incr(self.df_key(token), 1).ignore();
            }
        }

        pipe.incr(self.stats_key("doc_count"), docs.len() as i64).ignore();

        let total_length: i64 = docs.iter().map(|d| d.length as i64).sum();
        let new_count = old_count + docs.len() as i64;
        let new_avg = (old_avg * old_count as f64 + total_length as f64) / new_count as f64;
        pipe.set(self.stats_key("avg_doc_length"), new_avg).ignore();

        pipe.query_async::<()>(&mut conn).await?;
        debug!(docs = docs.len(), "added documents to inverted index");
        Ok(())
    }

    async fn remove_document(&self, doc_id: &str) -> Result<(), SparseIndexError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.del(self.doc_length_key(doc_id)).ignore();
        pipe.del(self.doc_content_key(doc_id)).ignore();
        pipe.decr(self.stats_key("doc_count"), 1).ignore();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn search(&self, tokens: &[String], limit: usize) -> Result<Vec<String>, SparseIndexError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = tokens.iter().map(|t| self.token_key(t)).collect();
        let mut conn = self.conn.clone();
        let mut doc_ids: Vec<String> = redis::cmd("SUNION")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        if limit > 0 && doc_ids.len() > limit {
            doc_ids.truncate(limit);
        }
        Ok(doc_ids)
    }

    async fn term_frequency(&self, term: &str, doc_id: &str) -> Result<i64, SparseIndexError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(self.tf_key(term, doc_id)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn doc_frequency(&self, term: &str) -> Result<i64, SparseIndexError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(self.df_key(term)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn doc_count(&self) -> Result<i64, SparseIndexError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(self.stats_key("doc_count")).await?;
        Ok(value.unwrap_or(0))
    }

    async fn avg_doc_length(&self) -> Result<f64, SparseIndexError> {
        let mut conn = self.conn.clone();
        let value: Option<f64> = conn.get(self.stats_key("avg_doc_length")).await?;
        Ok(value.unwrap_or(0.0))
    }

    async fn doc_length(&self, doc_id: &str) -> Result<i64, SparseIndexError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(self.doc_length_key(doc_id)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn documents_by_ids(
        &self,
        doc_ids: &[String],
    ) -> Result<HashMap<String, String>, SparseIndexError> {
        if doc_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for doc_id in doc_ids {
            pipe.get(self.doc_content_key(doc_id));
        }

        let previews: Vec<Option<String>> = pipe.query_async(&mut conn).await?;
        Ok(doc_ids
            .iter()
            .zip(previews)
            .filter_map(|(id, preview)| preview.map(|p| (id.clone(), p)))
            .collect())
    }

    async fn clear(&self) -> Result<(), SparseIndexError> {
        let keys = self.scan_keys().await?;
        let mut conn = self.conn.clone();

        for batch in keys.chunks(SCAN_BATCH) {
            let mut pipe = redis::pipe();
            for key in batch {
                pipe.del(key).ignore();
            }
            pipe.query_async::<()>(&mut conn).await?;
        }

        debug!(keys = keys.len(), "cleared inverted index");
        Ok(())
    }

    async fn export(&self) -> Result<serde_json::Value, SparseIndexError> {
        let keys = self.scan_keys().await?;
        let mut conn = self.conn.clone();
        let mut data = serde_json::Map::new();

        for key in keys {
            // Posting lists are sets; GET fails on them and they are skipped,
            // matching the string-only export shape.
            let value: Result<Option<String>, _> = conn.get(&key).await;
            if let Ok(Some(value)) = value {
                data.insert(key, serde_json::Value::String(value));
            }
        }

        Ok(serde_json::Value::Object(data))
    }
}
