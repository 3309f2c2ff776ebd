use std::sync::Arc;

use serde::Serialize;

use crate::error::{ChainRagError, Result};
use crate::index::IndexCache;
use crate::llm::{prompts, LlmProvider};
use crate::retrieval::{QueryPlanner, RetrievalOutcome, Retriever};
use crate::tag::Tag;

pub const NO_MATCHES_MESSAGE: &str =
    "No matching transactions were found in this account's history for that question.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Question answering over one account's prepared index: plan, retrieve,
/// then synthesize from the retrieved texts only.
#[derive(Clone)]
pub struct ChatService {
    cache: Arc<IndexCache>,
    planner: QueryPlanner,
    retriever: Retriever,
    llm: LlmProvider,
}

impl ChatService {
    pub fn new(
        cache: Arc<IndexCache>,
        planner: QueryPlanner,
        retriever: Retriever,
        llm: LlmProvider,
    ) -> Self {
        Self {
            cache,
            planner,
            retriever,
            llm,
        }
    }

    pub async fn answer(&self, question: &str, raw_tag: &str) -> Result<ChatAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChainRagError::Validation("Query must not be empty".to_string()));
        }

        let tag = Tag::normalize(raw_tag);

        // Fail fast on unprepared tags before spending an LLM call on planning.
        self.cache.get(&tag).await?;

        let intent = self.planner.plan(question).await;
        let documents = match self.retriever.retrieve(&tag, question, &intent).await? {
            RetrievalOutcome::Found(documents) => documents,
            RetrievalOutcome::NoMatches => {
                tracing::info!(tag = %tag, "No matching transactions; skipping synthesis");
                return Ok(ChatAnswer {
                    answer: NO_MATCHES_MESSAGE.to_string(),
                    sources: Vec::new(),
                });
            }
        };

        let sources: Vec<String> = documents.into_iter().map(|d| d.text).collect();
        let context = sources.join("\n\n");
        let prompt = prompts::answer_synthesis_prompt(&context, question);

        let answer = self.llm.complete(&prompt).await?;
        tracing::info!(tag = %tag, sources = sources.len(), "Answer synthesized");

        Ok(ChatAnswer { answer, sources })
    }
}
