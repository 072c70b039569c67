use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Type of code chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Function,
    Class,
    Method,
    Import,
    Comment,
    Other,
}

impl ChunkType {
    /// String tag used in metadata maps and vector-store payloads
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkType::Function => "function",
            ChunkType::Class => "class",
            ChunkType::Method => "method",
            ChunkType::Import => "import",
            ChunkType::Comment => "comment",
            ChunkType::Other => "other",
        }
    }

    /// Parse a metadata tag back into a chunk type; unknown tags map to `Other`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "function" => ChunkType::Function,
            "class" => ChunkType::Class,
            "method" => ChunkType::Method,
            "import" => ChunkType::Import,
            "comment" => ChunkType::Comment,
            _ => ChunkType::Other,
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous, semantically meaningful slice of a source file.
///
/// The `id` is a pure function of `(file_path, start_line, end_line, content)`:
/// two chunks with identical coordinates and content are the same chunk and
/// share one id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    pub id: String,
    pub file_path: String,
    pub language: String,
    pub content: String,
    pub chunk_type: ChunkType,
    /// 1-indexed, inclusive
    pub start_line: usize,
    /// 1-indexed, inclusive
    pub end_line: usize,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Derived list (imports ∪ calls); kept for the vector-store payload only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CodeChunk {
    /// Create a chunk with a freshly computed id and current timestamps.
    pub fn new(
        file_path: impl Into<String>,
        language: impl Into<String>,
        chunk_type: ChunkType,
        content: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        let file_path = file_path.into();
        let content = content.into();
        let now = Utc::now();
        Self {
            id: chunk_fingerprint(&file_path, start_line, end_line, &content),
            file_path,
            language: language.into(),
            content,
            chunk_type,
            start_line,
            end_line,
            metadata: HashMap::new(),
            dependencies: Vec::new(),
            embedding: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute the id from the current coordinates and content.
    ///
    /// Must be called after any mutation of `file_path`, `start_line`,
    /// `end_line`, or `content`.
    pub fn refresh_id(&mut self) {
        self.id = chunk_fingerprint(&self.file_path, self.start_line, self.end_line, &self.content);
    }

    /// Metadata lookup that treats a missing key as an empty string.
    pub fn meta(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Stable content fingerprint: SHA-256 of `path:start:end:content`,
/// truncated to 16 bytes and rendered as lowercase hex.
pub fn chunk_fingerprint(file_path: &str, start_line: usize, end_line: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update(b":");
    hasher.update(start_line.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(end_line.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = chunk_fingerprint("src/main.rs", 1, 10, "fn main() {}");
        let b = chunk_fingerprint("src/main.rs", 1, 10, "fn main() {}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn fingerprint_changes_with_any_coordinate() {
        let base = chunk_fingerprint("a.rs", 1, 2, "x");
        assert_ne!(base, chunk_fingerprint("b.rs", 1, 2, "x"));
        assert_ne!(base, chunk_fingerprint("a.rs", 2, 2, "x"));
        assert_ne!(base, chunk_fingerprint("a.rs", 1, 3, "x"));
        assert_ne!(base, chunk_fingerprint("a.rs", 1, 2, "y"));
    }

    #[test]
    fn refresh_id_tracks_content() {
        let mut chunk = CodeChunk::new("a.rs", "rust", ChunkType::Function, "fn a() {}", 1, 1);
        let original = chunk.id.clone();
        chunk.content = "fn b() {}".to_string();
        chunk.refresh_id();
        assert_ne!(chunk.id, original);
    }

    #[test]
    fn chunk_type_round_trip() {
        for ty in [
            ChunkType::Function,
            ChunkType::Class,
            ChunkType::Method,
            ChunkType::Import,
            ChunkType::Comment,
            ChunkType::Other,
        ] {
            assert_eq!(ChunkType::from_tag(ty.as_str()), ty);
        }
        assert_eq!(ChunkType::from_tag("garbage"), ChunkType::Other);
    }
}
