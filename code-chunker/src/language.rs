use std::path::Path;

/// Supported language tags (closed set; `Unknown` files are skipped by ingest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Java,
    Kotlin,
    Swift,
    Go,
    C,
    Cpp,
    CSharp,
    Scala,
    Ruby,
    Php,
    Shell,
    Markdown,
    Config,
    Sql,
    Web,
    Unknown,
}

impl Language {
    /// Detect language from a file path's extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Detect language from an extension string.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "swift" => Language::Swift,
            "go" => Language::Go,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "scala" => Language::Scala,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "sh" | "bash" => Language::Shell,
            "md" | "markdown" => Language::Markdown,
            "json" | "yaml" | "yml" | "toml" | "ini" => Language::Config,
            "sql" => Language::Sql,
            "html" | "htm" | "css" => Language::Web,
            _ => Language::Unknown,
        }
    }

    /// The language tag as stored in chunk metadata and payloads.
    pub fn name(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Scala => "scala",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Shell => "shell",
            Language::Markdown => "markdown",
            Language::Config => "config",
            Language::Sql => "sql",
            Language::Web => "web",
            Language::Unknown => "unknown",
        }
    }

    /// Whether this language has a bundled syntax-tree parser.
    pub fn has_ast_support(self) -> bool {
        matches!(self, Language::Rust)
    }

    /// Languages without declaration structure worth anchoring on; these go
    /// straight to the generic line-window strategy.
    pub fn is_generic(self) -> bool {
        matches!(
            self,
            Language::Markdown | Language::Config | Language::Sql | Language::Web
        )
    }
}
