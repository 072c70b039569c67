use crate::ast::AstSegmenter;
use crate::error::ChunkerError;
use crate::generic::GenericSegmenter;
use crate::language::Language;
use crate::pattern::PatternSegmenter;
use ragcode_domain::CodeChunk;
use std::path::Path;
use tracing::debug;

/// Turns a file's bytes into an ordered list of chunks honoring semantic
/// boundaries. Output ordering is source order; empty files yield no chunks.
pub trait Segmenter: Send + Sync {
    fn segment(&self, file_path: &str, content: &str) -> Result<Vec<CodeChunk>, ChunkerError>;
}

/// Dispatches to the right strategy by language tag:
///
/// - Rust → [`AstSegmenter`] (falls back to patterns when the file does not parse)
/// - docs/config → [`GenericSegmenter`]
/// - other known languages → [`PatternSegmenter`]
/// - unknown → no chunks
pub struct MultiSegmenter {
    ast: AstSegmenter,
    pattern: PatternSegmenter,
    generic: GenericSegmenter,
}

impl MultiSegmenter {
    pub fn new() -> Self {
        Self {
            ast: AstSegmenter::new(),
            pattern: PatternSegmenter::new(),
            generic: GenericSegmenter::new(),
        }
    }

    /// Read and segment a file from disk.
    pub fn segment_file(&self, path: &Path) -> Result<Vec<CodeChunk>, ChunkerError> {
        let content = std::fs::read_to_string(path)?;
        self.segment(&path.to_string_lossy(), &content)
    }
}

impl Default for MultiSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for MultiSegmenter {
    fn segment(&self, file_path: &str, content: &str) -> Result<Vec<CodeChunk>, ChunkerError> {
        let language = Language::from_path(Path::new(file_path));

        match language {
            Language::Unknown => Ok(Vec::new()),
            lang if lang.has_ast_support() => match self.ast.segment(file_path, content) {
                Ok(chunks) => Ok(chunks),
                Err(ChunkerError::Parse { path, message }) => {
                    debug!(%path, %message, "syntax tree unavailable, using pattern segmenter");
                    self.pattern.segment(file_path, content)
                }
                Err(other) => Err(other),
            },
            lang if lang.is_generic() => self.generic.segment(file_path, content),
            _ => self.pattern.segment(file_path, content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragcode_domain::ChunkType;

    #[test]
    fn routes_rust_to_ast() {
        let segmenter = MultiSegmenter::new();
        let chunks = segmenter
            .segment("lib.rs", "pub fn alpha() {}\n\npub fn beta() {}\n")
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].meta("name"), "alpha");
        assert_eq!(chunks[0].chunk_type, ChunkType::Function);
    }

    #[test]
    fn unparseable_rust_falls_back_to_patterns() {
        let segmenter = MultiSegmenter::new();
        // Unbalanced braces: syn rejects this, the pattern anchors still match.
        let chunks = segmenter
            .segment("broken.rs", "fn alpha() {\n    let x = 1;\n")
            .unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].meta("name"), "alpha");
    }

    #[test]
    fn unknown_language_yields_nothing() {
        let segmenter = MultiSegmenter::new();
        let chunks = segmenter.segment("data.bin", "whatever").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn markdown_routes_to_generic() {
        let segmenter = MultiSegmenter::new();
        let chunks = segmenter.segment("README.md", "# Title\n\nSome prose.\n").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Other);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let segmenter = MultiSegmenter::new();
        assert!(segmenter.segment("main.rs", "").unwrap().is_empty());
        assert!(segmenter.segment("main.py", "").unwrap().is_empty());
        assert!(segmenter.segment("notes.md", "").unwrap().is_empty());
    }
}
