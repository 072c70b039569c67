use crate::error::ChunkerError;
use crate::generic::GenericSegmenter;
use crate::language::Language;
use crate::segmenter::Segmenter;
use once_cell::sync::Lazy;
use ragcode_domain::{ChunkType, CodeChunk};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Anchor patterns matching the start line of a top-level declaration,
/// per language. A chunk spans from one anchor to the next.
static LANGUAGE_PATTERNS: Lazy<HashMap<&'static str, Vec<Regex>>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        (
            "python",
            &[r"^(async\s+def\s+\w+|def\s+\w+|class\s+\w+)"],
        ),
        (
            "javascript",
            &[
                r"^(export\s+)?(async\s+)?function\s+\w+",
                r"^(export\s+)?(default\s+)?class\s+\w+",
                r"^(export\s+)?(const|let|var)\s+\w+\s*=\s*(async\s+)?\(",
                r"^(export\s+)?(const|let|var)\s+\w+\s*=\s*(async\s+)?function",
            ],
        ),
        (
            "typescript",
            &[
                r"^(export\s+)?(async\s+)?function\s+\w+",
                r"^(export\s+)?(abstract\s+)?class\s+\w+",
                r"^(export\s+)?interface\s+\w+",
                r"^(export\s+)?type\s+\w+\s*=",
                r"^(export\s+)?(const|let|var)\s+\w+\s*=\s*(async\s+)?\(",
            ],
        ),
        (
            "java",
            &[
                r"^\s*(public|private|protected|static|final|abstract|synchronized)[\w\s<>\[\]]*\s+\w+\s*\(",
                r"^\s*(public|private|protected)?\s*(abstract\s+)?class\s+\w+",
                r"^\s*(public\s+)?interface\s+\w+",
                r"^\s*(public\s+)?enum\s+\w+",
            ],
        ),
        (
            "kotlin",
            &[
                r"^\s*(suspend\s+)?fun\s+\w+",
                r"^\s*(data\s+|sealed\s+|abstract\s+|open\s+)?class\s+\w+",
                r"^\s*object\s+\w+",
                r"^\s*interface\s+\w+",
            ],
        ),
        (
            "swift",
            &[
                r"^\s*(public|private|internal|open|fileprivate)?\s*(static\s+|class\s+)?(func)\s+\w+",
                r"^\s*(public|private|internal|open)?\s*(final\s+)?class\s+\w+",
                r"^\s*struct\s+\w+",
                r"^\s*protocol\s+\w+",
                r"^\s*enum\s+\w+",
            ],
        ),
        (
            "go",
            &[
                r"^func\s+(\([^)]*\)\s*)?\w+",
                r"^type\s+\w+",
                r"^(var|const)\s+\w+",
            ],
        ),
        (
            "rust",
            &[
                r"^\s*(pub(\([\w:]+\))?\s+)?(async\s+)?fn\s+\w+",
                r"^\s*(pub(\([\w:]+\))?\s+)?struct\s+\w+",
                r"^\s*(pub(\([\w:]+\))?\s+)?enum\s+\w+",
                r"^\s*(pub(\([\w:]+\))?\s+)?trait\s+\w+",
                r"^\s*impl(\s*<[^>]*>)?\s+\w+",
            ],
        ),
        (
            "cpp",
            &[
                r"^[\w:*&<>\s]+\s+\w+\s*\([^;]*\)\s*(\{|$)",
                r"^\s*(class|struct)\s+\w+",
                r"^\s*namespace\s+\w+",
            ],
        ),
        (
            "c",
            &[
                r"^[\w*\s]+\s+\w+\s*\([^;]*\)\s*\{",
                r"^\s*(struct|enum|union)\s+\w+",
            ],
        ),
        (
            "csharp",
            &[
                r"^\s*(public|private|protected|internal|static|virtual|override|abstract|async)[\w\s<>\[\]]*\s+\w+\s*\(",
                r"^\s*(public|private|protected|internal)?\s*(abstract\s+|sealed\s+)?class\s+\w+",
                r"^\s*(public\s+)?interface\s+\w+",
                r"^\s*(public\s+)?enum\s+\w+",
                r"^\s*namespace\s+[\w.]+",
            ],
        ),
        (
            "scala",
            &[
                r"^\s*(def)\s+\w+",
                r"^\s*(case\s+|abstract\s+|sealed\s+)?class\s+\w+",
                r"^\s*object\s+\w+",
                r"^\s*trait\s+\w+",
            ],
        ),
        (
            "ruby",
            &[r"^\s*def\s+\w+", r"^\s*class\s+\w+", r"^\s*module\s+\w+"],
        ),
        (
            "php",
            &[
                r"^\s*(public|private|protected|static)?\s*function\s+\w+",
                r"^\s*(abstract\s+|final\s+)?class\s+\w+",
                r"^\s*interface\s+\w+",
                r"^\s*trait\s+\w+",
            ],
        ),
        (
            "shell",
            &[r"^\s*\w[\w-]*\s*\(\s*\)\s*\{", r"^\s*function\s+\w+"],
        ),
    ];

    table
        .iter()
        .map(|(lang, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("anchor pattern must compile"))
                .collect();
            (*lang, compiled)
        })
        .collect()
});

/// Keywords stripped from an anchor line before extracting the declared name.
const NAME_KEYWORDS: &[&str] = &[
    "export default ",
    "export ",
    "public ",
    "private ",
    "protected ",
    "static ",
    "async ",
    "abstract ",
    "final ",
    "sealed ",
    "open ",
    "suspend ",
    "override ",
    "virtual ",
    "pub ",
    "async fn ",
    "fn ",
    "def ",
    "class ",
    "function ",
    "func ",
    "fun ",
    "struct ",
    "interface ",
    "trait ",
    "enum ",
    "impl ",
    "object ",
    "module ",
    "namespace ",
    "type ",
];

/// Regex-anchor segmenter for languages without a bundled parser.
///
/// Finds every line starting a top-level declaration and cuts one chunk per
/// `[anchor_i, anchor_{i+1})` span, trimming trailing blank lines. Falls back
/// to the generic line-window strategy when nothing matches.
pub struct PatternSegmenter {
    generic: GenericSegmenter,
}

impl PatternSegmenter {
    pub fn new() -> Self {
        Self {
            generic: GenericSegmenter::new(),
        }
    }
}

impl Default for PatternSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for PatternSegmenter {
    fn segment(&self, file_path: &str, content: &str) -> Result<Vec<CodeChunk>, ChunkerError> {
        let language = Language::from_path(Path::new(file_path));

        let Some(patterns) = LANGUAGE_PATTERNS.get(language.name()) else {
            return self.generic.segment(file_path, content);
        };

        let lines: Vec<&str> = content.lines().collect();
        let anchors = find_anchor_lines(&lines, patterns);

        if anchors.is_empty() {
            debug!(path = file_path, lang = language.name(), "no anchors matched, using generic windows");
            return self.generic.segment(file_path, content);
        }

        let total = lines.len();
        let mut chunks = Vec::with_capacity(anchors.len());

        for (i, &start) in anchors.iter().enumerate() {
            let mut end = if i + 1 < anchors.len() { anchors[i + 1] } else { total };

            // Trim trailing blank lines
            while end > start + 1 && lines[end - 1].trim().is_empty() {
                end -= 1;
            }

            let chunk_content = lines[start..end].join("\n");
            if chunk_content.trim().is_empty() {
                continue;
            }

            let mut chunk = CodeChunk::new(
                file_path,
                language.name(),
                chunk_type_for_line(lines[start]),
                chunk_content,
                start + 1,
                end,
            );
            chunk
                .metadata
                .insert("name".into(), extract_name(lines[start]));
            chunks.push(chunk);
        }

        debug!(
            path = file_path,
            lang = language.name(),
            chunks = chunks.len(),
            "segmented file with pattern anchors"
        );
        Ok(chunks)
    }
}

/// 0-indexed line numbers where any anchor pattern matches, ascending.
fn find_anchor_lines(lines: &[&str], patterns: &[Regex]) -> Vec<usize> {
    let mut matched: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| patterns.iter().any(|p| p.is_match(line)))
        .map(|(i, _)| i)
        .collect();
    matched.sort_unstable();
    matched
}

/// Infer the chunk type from the keyword present in the anchor line.
fn chunk_type_for_line(line: &str) -> ChunkType {
    let lower = line.trim().to_lowercase();
    let class_keywords = [
        "class ", "interface ", "trait ", "struct ", "enum ", "protocol ", "impl ",
    ];
    if class_keywords.iter().any(|kw| lower.contains(kw)) {
        ChunkType::Class
    } else {
        ChunkType::Function
    }
}

/// Pull the declared identifier out of an anchor line by stripping recognized
/// leading keywords, then reading up to the first delimiter.
fn extract_name(line: &str) -> String {
    let mut rest = line.trim();
    for keyword in NAME_KEYWORDS {
        if rest.to_lowercase().starts_with(keyword) {
            rest = &rest[keyword.len()..];
        }
    }

    if let Some(end) = rest.find([' ', '\t', '(', '<', '{', ':', '[', '=']) {
        if end > 0 {
            return rest[..end].to_string();
        }
    }
    if rest.len() > 64 {
        return rest[..64].to_string();
    }
    rest.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segment(path: &str, content: &str) -> Vec<CodeChunk> {
        PatternSegmenter::new().segment(path, content).unwrap()
    }

    #[test]
    fn python_functions_and_classes() {
        let source = "def first():\n    return 1\n\n\nclass Widget:\n    def render(self):\n        pass\n";
        let chunks = segment("app.py", source);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].meta("name"), "first");
        assert_eq!(chunks[0].chunk_type, ChunkType::Function);
        // Trailing blank lines are trimmed from the first span.
        assert_eq!(chunks[0].end_line, 2);
        assert_eq!(chunks[1].meta("name"), "Widget");
        assert_eq!(chunks[1].chunk_type, ChunkType::Class);
    }

    #[test]
    fn go_methods_anchor_on_receiver_form() {
        let source = "func (s *Server) Start() error {\n\treturn nil\n}\n\nfunc main() {\n}\n";
        let chunks = segment("server.go", source);
        assert_eq!(chunks.len(), 2);
        // The receiver form starts with a delimiter, so nothing is trimmed.
        assert_eq!(chunks[0].meta("name"), "(s *Server) Start() error {");
        assert_eq!(chunks[1].meta("name"), "main");
    }

    #[test]
    fn typescript_interface_is_class_typed() {
        let source = "export interface Shape {\n  area(): number;\n}\n";
        let chunks = segment("shapes.ts", source);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Class);
        assert_eq!(chunks[0].meta("name"), "Shape");
    }

    #[test]
    fn no_anchors_falls_back_to_generic() {
        let source = "just some\nplain text\nnothing declarative\n";
        let chunks = segment("script.py", source);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Other);
    }

    #[test]
    fn name_extraction_strips_keyword_stacks() {
        assert_eq!(extract_name("export async function fetchData() {"), "fetchData");
        assert_eq!(extract_name("pub async fn run(&self) {"), "run");
        assert_eq!(extract_name("class Widget:"), "Widget");
        // Unrecognized modifiers are left in place; the first word wins.
        assert_eq!(extract_name("data class Point(val x: Int)"), "data");
    }

    #[test]
    fn last_chunk_runs_to_eof() {
        let source = "def only():\n    a = 1\n    return a\n";
        let chunks = segment("one.py", source);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
    }
}
