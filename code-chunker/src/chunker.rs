use crate::{DEFAULT_CHUNK_OVERLAP, DEFAULT_MAX_CHUNK_SIZE};
use chrono::Utc;
use ragcode_domain::{ChunkType, CodeChunk};
use tracing::debug;

/// Overlap banner prepended to carried-forward context in sub-chunks.
const OVERLAP_BANNER: &str = "// ...context...\n";

/// Applies the merge and size policy to the segmenter's output.
///
/// First merges a leading comment chunk into the following declaration so doc
/// comments travel with their code. Anything still larger than `max_size`
/// characters is split at natural boundaries (closed brace depth, blank line,
/// trailing newline) with the last `overlap` bytes of the previous sub-chunk
/// carried forward under a context banner.
pub struct SemanticChunker {
    max_size: usize,
    overlap: usize,
}

impl SemanticChunker {
    pub fn new(max_size: usize, overlap: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            overlap,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }

    /// Process already-segmented chunks: merge, normalize metadata, split.
    pub fn chunk(&self, chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
        let merged = self.merge_related(chunks);
        let mut result = Vec::with_capacity(merged.len());
        let now = Utc::now();

        for mut chunk in merged {
            chunk.updated_at = now;
            self.preserve_metadata(&mut chunk);
            chunk.refresh_id();

            if chunk.content.len() <= self.max_size {
                result.push(chunk);
                continue;
            }

            let split = self.split_large(&chunk);
            debug!(
                file = %chunk.file_path,
                original_size = chunk.content.len(),
                sub_chunks = split.len(),
                "split oversize chunk"
            );
            result.extend(split);
        }

        result
    }

    /// Merge a comment chunk into the immediately following function, class,
    /// or method declaration.
    fn merge_related(&self, chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
        if chunks.is_empty() {
            return chunks;
        }

        let mut result = Vec::with_capacity(chunks.len());
        let mut iter = chunks.into_iter().peekable();

        while let Some(current) = iter.next() {
            if current.chunk_type == ChunkType::Comment {
                let mergeable = iter.peek().is_some_and(|next| {
                    matches!(
                        next.chunk_type,
                        ChunkType::Function | ChunkType::Class | ChunkType::Method
                    )
                });
                if mergeable {
                    let code = iter.next().expect("peeked chunk present");
                    result.push(self.merge_two(current, code));
                    continue;
                }
            }
            result.push(current);
        }

        result
    }

    /// Combine a comment and its declaration; the declaration's metadata wins
    /// on key collisions.
    fn merge_two(&self, comment: CodeChunk, code: CodeChunk) -> CodeChunk {
        let mut metadata = comment.metadata;
        metadata.extend(code.metadata);
        metadata.insert("merged_from_comment".into(), "true".into());

        let mut dependencies = comment.dependencies;
        dependencies.extend(code.dependencies);

        let mut merged = CodeChunk::new(
            code.file_path,
            code.language,
            code.chunk_type,
            format!("{}\n{}", comment.content, code.content),
            comment.start_line,
            code.end_line,
        );
        merged.metadata = metadata;
        merged.dependencies = dependencies;
        merged
    }

    /// Ensure key identifiers survive in the metadata map so sub-chunks
    /// inherit them after splitting.
    fn preserve_metadata(&self, chunk: &mut CodeChunk) {
        let chunk_type = chunk.chunk_type.as_str().to_string();
        chunk.metadata.entry("chunk_type".into()).or_insert(chunk_type);

        let language = chunk.language.clone();
        chunk.metadata.entry("language".into()).or_insert(language);

        let file_path = chunk.file_path.clone();
        chunk.metadata.entry("file_path".into()).or_insert(file_path);

        if let Some(name) = chunk.metadata.get("name").filter(|n| !n.is_empty()).cloned() {
            chunk.metadata.insert("symbol_name".into(), name);
        }
    }

    fn split_large(&self, chunk: &CodeChunk) -> Vec<CodeChunk> {
        let content = &chunk.content;
        let step = self.step();
        let mut sub_chunks = Vec::new();
        let mut prev_overlap = String::new();
        let mut start = 0;

        while start < content.len() {
            let window_end = floor_char_boundary(content, (start + self.max_size).min(content.len()));
            let break_point = self.find_break_point(content, start, window_end);

            let body = &content[start..break_point];
            let full_content = if prev_overlap.is_empty() {
                body.to_string()
            } else {
                format!("{prev_overlap}{body}")
            };

            sub_chunks.push(self.create_sub_chunk(chunk, full_content, start));

            if break_point >= content.len() {
                break;
            }

            // Carry the tail of the uncontextualized body forward, aligned
            // left to a valid UTF-8 boundary.
            if self.overlap > 0 && !body.is_empty() {
                let mut overlap_start = body.len().saturating_sub(self.overlap);
                while overlap_start > 0 && !body.is_char_boundary(overlap_start) {
                    overlap_start -= 1;
                }
                prev_overlap = format!("{OVERLAP_BANNER}{}", &body[overlap_start..]);
            }

            start = next_start(content, start, break_point, step);
        }

        sub_chunks
    }

    fn step(&self) -> usize {
        let step = self.max_size.saturating_sub(self.overlap);
        if step >= 1 {
            step
        } else {
            (self.max_size / 2).max(1)
        }
    }

    /// Choose a break point in `(start, window_end]`, preferring in order:
    /// the position just past the last brace/paren/bracket where nesting
    /// returns to zero, the position after the last blank line, the position
    /// after the last newline in the final 20% of the window, the window end.
    fn find_break_point(&self, content: &str, start: usize, window_end: usize) -> usize {
        if window_end >= content.len() {
            return content.len();
        }

        let window = &content[start..window_end];

        if let Some(boundary) = block_boundary(window) {
            return start + boundary;
        }

        if let Some(idx) = window.rfind("\n\n") {
            if idx > 0 {
                return start + idx + 2;
            }
        }

        let search_range = self.max_size / 5;
        if search_range > 0 {
            if let Some(newline) = window.rfind('\n') {
                if newline + search_range > self.max_size {
                    return start + newline + 1;
                }
            }
        }

        window_end
    }

    fn create_sub_chunk(&self, original: &CodeChunk, content: String, start_offset: usize) -> CodeChunk {
        let start_line =
            original.start_line + original.content[..start_offset].matches('\n').count();
        let end_line = start_line + content.matches('\n').count();

        let mut metadata = original.metadata.clone();
        metadata.insert("start_line".into(), start_line.to_string());
        metadata.insert("end_line".into(), end_line.to_string());

        let mut sub = CodeChunk::new(
            original.file_path.clone(),
            original.language.clone(),
            original.chunk_type,
            content,
            start_line,
            end_line,
        );
        sub.metadata = metadata;
        sub.dependencies = original.dependencies.clone();
        sub
    }
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Byte position just past the last closing brace/paren/bracket where the
/// nesting depth returns to zero, when strictly inside the window.
fn block_boundary(window: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut last_zero: Option<usize> = None;

    for (i, ch) in window.char_indices() {
        match ch {
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => {
                depth = (depth - 1).max(0);
                if depth == 0 {
                    last_zero = Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    last_zero.filter(|&pos| pos > 0 && pos < window.len())
}

/// Advance the window without losing content: a natural break before the
/// stride wins; otherwise slide by the fixed step so the window tail repeats.
fn next_start(content: &str, start: usize, break_point: usize, step: usize) -> usize {
    let mut next = (start + step).min(break_point);
    while next > 0 && !content.is_char_boundary(next) {
        next -= 1;
    }
    if next <= start {
        next = break_point;
    }
    next
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
