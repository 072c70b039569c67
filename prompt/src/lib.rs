//! Prompt assembly: fits ranked retrieval results into a token budget and
//! renders the final LLM prompt with a metadata header.
//!
//! The assembler never calls the LLM; it returns the prompt string.

use chrono::{SecondsFormat, Utc};
use ragcode_domain::SearchResult;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use tracing::debug;

const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Share of the token budget reserved for context chunks; the rest covers
/// the query and template boilerplate.
const CONTEXT_BUDGET_SHARE: f64 = 0.8;

/// Simple generic prompt (legacy).
const DEFAULT_PREAMBLE: &str = "You are a helpful code assistant. Use the provided code context to answer the user's question.\n\
If the context is insufficient, explain what's missing.\n\
\n\
Code Context:\n";

const DEFAULT_CLOSING: &str = "Answer:";

/// Prompt for a professional code assistant that both explains codebases and
/// reviews code.
const PROFESSIONAL_PREAMBLE: &str = "You are a senior software engineer and professional code reviewer. Your role is to:\n\
1. **Understand the codebase** — Explain architecture, data flow, design patterns, and how components interact.\n\
2. **Review code** — Assess correctness, maintainability, security, performance, and adherence to best practices.\n\
\n\
Guidelines:\n\
- Base your answers strictly on the provided code context. Cite file paths and line numbers when referencing code.\n\
- If the context is insufficient, state what's missing and suggest where to look.\n\
- For code review: be constructive, specific, and actionable. Prioritize critical issues (security, correctness) over style.\n\
- For understanding: explain the \"why\" and relationships, not just the \"what\".\n\
- Use clear structure (bullets, sections) for complex answers.\n\
\n\
Code Context (retrieved from the codebase):\n";

const PROFESSIONAL_CLOSING: &str = "Provide a professional, well-structured response:";

/// The fixed template shapes a prompt can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    Professional,
    Default,
}

impl PromptTemplate {
    /// Resolve a template by name. Unknown or empty names fall back to
    /// `professional`.
    pub fn by_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "default" => PromptTemplate::Default,
            _ => PromptTemplate::Professional,
        }
    }

    fn preamble(self) -> &'static str {
        match self {
            PromptTemplate::Professional => PROFESSIONAL_PREAMBLE,
            PromptTemplate::Default => DEFAULT_PREAMBLE,
        }
    }

    fn question_label(self) -> &'static str {
        match self {
            PromptTemplate::Professional => "User question",
            PromptTemplate::Default => "Question",
        }
    }

    fn closing(self) -> &'static str {
        match self {
            PromptTemplate::Professional => PROFESSIONAL_CLOSING,
            PromptTemplate::Default => DEFAULT_CLOSING,
        }
    }
}

/// Token-budget-aware prompt generator.
pub struct TemplateGenerator {
    template: PromptTemplate,
    /// Soft token budget for the context section; 0 = unlimited
    max_tokens: usize,
    chars_per_token: usize,
    model: Option<String>,
}

impl TemplateGenerator {
    pub fn new(template: PromptTemplate) -> Self {
        Self {
            template,
            max_tokens: 0,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            model: None,
        }
    }

    /// Set a soft token budget; results are trimmed lowest-scoring-first
    /// until the context fits.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_chars_per_token(mut self, chars_per_token: usize) -> Self {
        if chars_per_token > 0 {
            self.chars_per_token = chars_per_token;
        }
        self
    }

    /// Attach the model name to the metadata header.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Build the prompt: results sorted by relevance, fitted to the window,
    /// rendered into the template, and prefixed with a metadata comment.
    pub fn generate(&self, query: &str, results: &[SearchResult]) -> String {
        let mut sorted: Vec<&SearchResult> = results.iter().collect();
        sorted.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let fitted = self.fit_to_window(&sorted);
        debug!(
            total_results = results.len(),
            fitted_results = fitted.len(),
            max_tokens = self.max_tokens,
            "assembling prompt"
        );

        let header = self.render_header(results.len(), &fitted);

        let mut prompt = String::new();
        prompt.push_str(&header);
        prompt.push_str(self.template.preamble());

        for result in &fitted {
            let chunk = &result.chunk;
            let _ = write!(
                prompt,
                "\n--- {} (Lines {}-{}) ---\n{}\n",
                chunk.file_path, chunk.start_line, chunk.end_line, chunk.content
            );
        }

        let _ = write!(
            prompt,
            "\n{}: {}\n\n{}",
            self.template.question_label(),
            query,
            self.template.closing()
        );

        prompt
    }

    /// Drop the lowest-ranked results until the summed content characters fit
    /// in 80% of the budget. The top result is always kept.
    fn fit_to_window<'a>(&self, sorted: &[&'a SearchResult]) -> Vec<&'a SearchResult> {
        if self.max_tokens == 0 || sorted.is_empty() {
            return sorted.to_vec();
        }

        let budget =
            (self.max_tokens * self.chars_per_token) as f64 * CONTEXT_BUDGET_SHARE;
        let budget = budget as usize;

        let mut fitted = Vec::with_capacity(sorted.len());
        let mut used = 0usize;

        for result in sorted {
            let chunk_chars = result.chunk.content.len();
            if used + chunk_chars > budget && !fitted.is_empty() {
                debug!(
                    used_chars = used,
                    budget_chars = budget,
                    dropped = sorted.len() - fitted.len(),
                    "context window budget reached"
                );
                break;
            }
            fitted.push(*result);
            used += chunk_chars;
        }

        fitted
    }

    /// Metadata header comment with deterministic key order.
    fn render_header(&self, total: usize, fitted: &[&SearchResult]) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.push(format!(
            "generated_at={}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        if let Some(model) = &self.model {
            parts.push(format!("model={model}"));
        }
        parts.push(format!("context_results={}", fitted.len()));
        parts.push(format!("total_results={total}"));
        if self.max_tokens > 0 {
            parts.push(format!("max_tokens={}", self.max_tokens));
        }

        let files: BTreeSet<&str> = fitted
            .iter()
            .map(|r| r.chunk.file_path.as_str())
            .collect();
        let files: Vec<&str> = files.into_iter().collect();
        parts.push(format!("source_files={}", files.join(", ")));

        format!("<!-- RAG context: {} -->\n", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragcode_domain::{ChunkType, CodeChunk, SearchSource};

    fn result(path: &str, content: &str, relevance: f32) -> SearchResult {
        let chunk = CodeChunk::new(path, "rust", ChunkType::Function, content, 1, 9);
        let mut r = SearchResult::new(chunk, relevance, SearchSource::Hybrid);
        r.relevance_score = relevance;
        r
    }

    #[test]
    fn renders_results_in_relevance_order() {
        let generator = TemplateGenerator::new(PromptTemplate::Professional);
        let results = vec![
            result("low.rs", "fn low() {}", 0.2),
            result("high.rs", "fn high() {}", 0.9),
        ];

        let prompt = generator.generate("how does it work?", &results);

        let high_pos = prompt.find("high.rs").unwrap();
        let low_pos = prompt.find("low.rs").unwrap();
        // The header lists files alphabetically; compare block positions.
        let high_block = prompt.find("--- high.rs").unwrap();
        let low_block = prompt.find("--- low.rs").unwrap();
        assert!(high_block < low_block);
        assert!(high_pos > 0 && low_pos > 0);
        assert!(prompt.contains("(Lines 1-9)"));
        assert!(prompt.contains("User question: how does it work?"));
    }

    #[test]
    fn token_budget_drops_lowest_ranked_results() {
        // budget: 10 tokens × 4 chars × 0.8 = 32 chars of context.
        let generator = TemplateGenerator::new(PromptTemplate::Default).with_max_tokens(10);
        let results = vec![
            result("a.rs", &"a".repeat(20), 0.9),
            result("b.rs", &"b".repeat(20), 0.8),
            result("c.rs", &"c".repeat(20), 0.7),
        ];

        let prompt = generator.generate("q", &results);
        assert!(prompt.contains("--- a.rs"));
        assert!(!prompt.contains("--- b.rs"));
        assert!(!prompt.contains("--- c.rs"));
        assert!(prompt.contains("context_results=1"));
        assert!(prompt.contains("total_results=3"));
    }

    #[test]
    fn an_oversize_top_result_is_still_kept() {
        let generator = TemplateGenerator::new(PromptTemplate::Default).with_max_tokens(5);
        let results = vec![result("big.rs", &"x".repeat(500), 0.9)];

        let prompt = generator.generate("q", &results);
        assert!(prompt.contains("--- big.rs"));
    }

    #[test]
    fn header_keys_follow_the_canonical_order() {
        let generator = TemplateGenerator::new(PromptTemplate::Professional)
            .with_max_tokens(100)
            .with_model("llama3.2:1b");
        let results = vec![result("z.rs", "fn z() {}", 0.5), result("a.rs", "fn a() {}", 0.4)];

        let prompt = generator.generate("q", &results);
        let header_end = prompt.find("-->").unwrap();
        let header = &prompt[..header_end];

        let positions: Vec<usize> = [
            "generated_at=",
            "model=",
            "context_results=",
            "total_results=",
            "max_tokens=",
            "source_files=",
        ]
        .iter()
        .map(|key| header.find(key).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        // Source files are listed sorted.
        assert!(prompt.contains("source_files=a.rs, z.rs"));
    }

    #[test]
    fn template_selection_falls_back_to_professional() {
        assert_eq!(PromptTemplate::by_name("default"), PromptTemplate::Default);
        assert_eq!(PromptTemplate::by_name("professional"), PromptTemplate::Professional);
        assert_eq!(PromptTemplate::by_name(""), PromptTemplate::Professional);
        assert_eq!(PromptTemplate::by_name("mystery"), PromptTemplate::Professional);
    }

    #[test]
    fn default_template_uses_the_plain_labels() {
        let generator = TemplateGenerator::new(PromptTemplate::Default);
        let prompt = generator.generate("what is this?", &[result("a.rs", "fn a() {}", 0.5)]);
        assert!(prompt.starts_with("<!-- RAG context:"));
        assert!(prompt.contains("You are a helpful code assistant."));
        assert!(prompt.contains("Question: what is this?"));
        assert!(prompt.trim_end().ends_with("Answer:"));
    }

    #[test]
    fn empty_results_still_produce_a_prompt() {
        let generator = TemplateGenerator::new(PromptTemplate::Professional);
        let prompt = generator.generate("lonely question", &[]);
        assert!(prompt.contains("context_results=0"));
        assert!(prompt.contains("User question: lonely question"));
    }
}
