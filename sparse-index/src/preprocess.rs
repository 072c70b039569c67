use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("camel boundary pattern"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "this", "have", "i",
        "you", "we", "they", "what", "where", "when", "why", "how", "which", "who", "can",
        "could", "would", "should", "do", "does", "did", "don't", "doesn't", "didn't",
    ]
    .into_iter()
    .collect()
});

/// A preprocessed query: the original text, every token, and the tokens that
/// survive the stop-word filter.
#[derive(Debug, Clone, Default)]
pub struct ProcessedQuery {
    pub original: String,
    pub tokens: Vec<String>,
    pub filtered: Vec<String>,
}

/// Normalizes and tokenizes queries and document content the same way, so
/// index-time and query-time terms line up.
///
/// Splitting preserves code identifiers: `get_user_by_id` and `getUserById`
/// both become `get`, `user`, `by`, `id`.
#[derive(Debug, Default, Clone)]
pub struct QueryPreprocessor;

impl QueryPreprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn preprocess(&self, query: &str) -> ProcessedQuery {
        // Case is needed to find camelCase boundaries, so individual tokens
        // are lowercased after splitting rather than the whole query before.
        let tokens = self.tokenize(query.trim());
        let filtered = tokens
            .iter()
            .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t.as_str()))
            .cloned()
            .collect();

        ProcessedQuery {
            original: query.to_string(),
            tokens,
            filtered,
        }
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();

        let words = text
            .split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '_'))
            .filter(|w| !w.is_empty());

        for word in words {
            if word.contains('_') {
                for part in word.split('_').filter(|p| !p.is_empty()) {
                    tokens.extend(split_camel_case(part));
                }
            } else {
                tokens.extend(split_camel_case(word));
            }
        }

        tokens
    }
}

fn split_camel_case(word: &str) -> Vec<String> {
    if word.is_empty() {
        return Vec::new();
    }

    let spaced = CAMEL_BOUNDARY.replace_all(word, "$1 $2");
    let parts: Vec<String> = spaced
        .split_whitespace()
        .map(|p| p.to_lowercase())
        .collect();

    if parts.is_empty() {
        vec![word.to_lowercase()]
    } else {
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_snake_and_camel_case() {
        let pre = QueryPreprocessor::new();
        let processed = pre.preprocess("getUserById calls fetch_user_record");
        assert_eq!(
            processed.tokens,
            vec!["get", "user", "by", "id", "calls", "fetch", "user", "record"]
        );
    }

    #[test]
    fn filters_stop_words_and_single_chars(){
        let pre = QueryPreprocessor::new();
        let processed = pre.preprocess("how does the parser handle a file");
        assert_eq!(processed.filtered, vec!["parser", "handle", "file"]);
        // `tokens` keeps everything longer than nothing; `filtered` drops the noise.
        assert!(processed.tokens.contains(&"how".to_string()));
    }

    #[test]
    fn punctuation_splits_but_underscore_survives_to_split_stage() {
        let pre = QueryPreprocessor::new();
        let processed = pre.preprocess("api.handler::Route(x)");
        assert_eq!(processed.tokens, vec!["api", "handler", "route", "x"]);
    }

    #[test]
    fn empty_query_yields_empty_results() {
        let pre = QueryPreprocessor::new();
        let processed = pre.preprocess("");
        assert!(processed.tokens.is_empty());
        assert!(processed.filtered.is_empty());
    }

    #[test]
    fn preserves_original_text() {
        let pre = QueryPreprocessor::new();
        let processed = pre.preprocess("  Mixed Case Query  ");
        assert_eq!(processed.original, "  Mixed Case Query  ");
    }
}
