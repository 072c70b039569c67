use ragcode_domain::SearchResult;
use std::collections::HashMap;

/// Caps the number of results per source file so a single hot file cannot
/// crowd out the rest of the codebase.
pub struct HierarchicalFilter {
    max_per_file: usize,
}

impl HierarchicalFilter {
    pub fn new(max_per_file: usize) -> Self {
        Self {
            max_per_file: if max_per_file == 0 { 3 } else { max_per_file },
        }
    }

    /// Group by file, keep the top N of each group by `relevance_score`,
    /// then re-sort the survivors globally.
    pub fn process(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        if results.is_empty() {
            return results;
        }

        let mut by_file: HashMap<String, Vec<SearchResult>> = HashMap::new();
        for result in results {
            by_file
                .entry(result.chunk.file_path.clone())
                .or_default()
                .push(result);
        }

        let mut filtered = Vec::new();
        for (_, mut group) in by_file {
            group.sort_by(|a, b| {
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            group.truncate(self.max_per_file);
            filtered.extend(group);
        }

        filtered.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        filtered
    }
}
