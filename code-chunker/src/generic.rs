use crate::error::ChunkerError;
use crate::language::Language;
use crate::segmenter::Segmenter;
use ragcode_domain::{ChunkType, CodeChunk};
use std::path::Path;

const WINDOW_LINES: usize = 50;
const WINDOW_OVERLAP: usize = 5;

/// Fixed line-window segmenter for docs, config, and anything the other
/// strategies cannot anchor on. Whitespace-only windows are omitted.
pub struct GenericSegmenter {
    window: usize,
    overlap: usize,
}

impl GenericSegmenter {
    pub fn new() -> Self {
        Self {
            window: WINDOW_LINES,
            overlap: WINDOW_OVERLAP,
        }
    }
}

impl Default for GenericSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for GenericSegmenter {
    fn segment(&self, file_path: &str, content: &str) -> Result<Vec<CodeChunk>, ChunkerError> {
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let language = Language::from_path(Path::new(file_path));
        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        let step = self.window - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.window).min(total);
            let window_content = lines[start..end].join("\n");

            if !window_content.trim().is_empty() {
                chunks.push(CodeChunk::new(
                    file_path,
                    language.name(),
                    ChunkType::Other,
                    window_content,
                    start + 1,
                    end,
                ));
            }

            if end >= total {
                break;
            }
            start += step;
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_file_is_one_chunk() {
        let chunks = GenericSegmenter::new()
            .segment("notes.md", "# Title\n\nBody text.\n")
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
    }

    #[test]
    fn long_file_windows_overlap() {
        let content: String = (1..=120).map(|i| format!("line {i}\n")).collect();
        let chunks = GenericSegmenter::new().segment("big.md", &content).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 50);
        // Each window starts 45 lines after the previous: 5 lines of overlap.
        assert_eq!(chunks[1].start_line, 46);
        assert_eq!(chunks[2].end_line, 120);
    }

    #[test]
    fn whitespace_only_file_yields_nothing() {
        let chunks = GenericSegmenter::new().segment("blank.md", "\n\n   \n\n").unwrap();
        assert!(chunks.is_empty());
    }
}
