use crate::chunk::CodeChunk;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::str::FromStr;

/// A user's search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub max_results: usize,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub filters: HashMap<String, String>,
}

/// Graph relation that produced an expansion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionKind {
    Callee,
    Caller,
    ParentType,
    ChildMethod,
    Import,
}

impl ExpansionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpansionKind::Callee => "callee",
            ExpansionKind::Caller => "caller",
            ExpansionKind::ParentType => "parent_type",
            ExpansionKind::ChildMethod => "child_method",
            ExpansionKind::Import => "import",
        }
    }
}

/// Where a search result came from.
///
/// Serialized as `"vector"`, `"keyword"`, `"hybrid"`, or
/// `"expansion:{callee|caller|parent_type|child_method|import}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Vector,
    Keyword,
    Hybrid,
    Expansion(ExpansionKind),
}

impl std::fmt::Display for SearchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchSource::Vector => f.write_str("vector"),
            SearchSource::Keyword => f.write_str("keyword"),
            SearchSource::Hybrid => f.write_str("hybrid"),
            SearchSource::Expansion(kind) => write!(f, "expansion:{}", kind.as_str()),
        }
    }
}

impl FromStr for SearchSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vector" => Ok(SearchSource::Vector),
            "keyword" => Ok(SearchSource::Keyword),
            "hybrid" => Ok(SearchSource::Hybrid),
            "expansion:callee" => Ok(SearchSource::Expansion(ExpansionKind::Callee)),
            "expansion:caller" => Ok(SearchSource::Expansion(ExpansionKind::Caller)),
            "expansion:parent_type" => Ok(SearchSource::Expansion(ExpansionKind::ParentType)),
            "expansion:child_method" => Ok(SearchSource::Expansion(ExpansionKind::ChildMethod)),
            "expansion:import" => Ok(SearchSource::Expansion(ExpansionKind::Import)),
            other => Err(format!("unknown search source: {other}")),
        }
    }
}

impl Serialize for SearchSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SearchSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A single retrieval hit: the chunk plus the scores accumulated through the
/// pipeline. `score` is the working value (raw similarity, then fused score);
/// `relevance_score` is the final reranked value the caller sorts by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: CodeChunk,
    #[serde(skip)]
    pub score: f32,
    pub source: SearchSource,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub vector_score: f32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keyword_score: f32,
    #[serde(default)]
    pub relevance_score: f32,
}

fn is_zero(v: &f32) -> bool {
    *v == 0.0
}

impl SearchResult {
    pub fn new(chunk: CodeChunk, score: f32, source: SearchSource) -> Self {
        Self {
            chunk,
            score,
            source,
            vector_score: 0.0,
            keyword_score: 0.0,
            relevance_score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_tags_round_trip() {
        for src in [
            SearchSource::Vector,
            SearchSource::Keyword,
            SearchSource::Hybrid,
            SearchSource::Expansion(ExpansionKind::Callee),
            SearchSource::Expansion(ExpansionKind::Caller),
            SearchSource::Expansion(ExpansionKind::ParentType),
            SearchSource::Expansion(ExpansionKind::ChildMethod),
            SearchSource::Expansion(ExpansionKind::Import),
        ] {
            let tag = src.to_string();
            assert_eq!(tag.parse::<SearchSource>().unwrap(), src);
        }
    }

    #[test]
    fn search_query_defaults_from_json() {
        let query: SearchQuery = serde_json::from_str(r#"{"query": "how does auth work"}"#).unwrap();
        assert_eq!(query.query, "how does auth work");
        assert_eq!(query.max_results, 0);
        assert!(query.filters.is_empty());
    }

    #[test]
    fn search_result_serializes_source_tag() {
        let chunk = crate::CodeChunk::new("a.rs", "rust", crate::ChunkType::Function, "fn a() {}", 1, 1);
        let result = SearchResult::new(chunk, 0.9, SearchSource::Expansion(ExpansionKind::ParentType));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "expansion:parent_type");
        // The working score never crosses the wire.
        assert!(json.get("score").is_none());
    }
}
