use ragcode_codebase_indexer::Indexer;
use ragcode_codebase_retrieval::Retriever;
use ragcode_llm::ChatModel;
use ragcode_prompt::TemplateGenerator;
use std::sync::Arc;

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub indexer: Indexer,
    pub retriever: Arc<Retriever>,
    pub llm: Arc<dyn ChatModel>,
    pub prompter: Arc<TemplateGenerator>,
}

impl AppState {
    pub fn new(
        indexer: Indexer,
        retriever: Arc<Retriever>,
        llm: Arc<dyn ChatModel>,
        prompter: Arc<TemplateGenerator>,
    ) -> Self {
        Self {
            indexer,
            retriever,
            llm,
            prompter,
        }
    }
}
