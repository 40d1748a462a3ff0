//! The question-answering agent.
//!
//! Stateless across queries: every `chat()` call retrieves, assembles
//! context, builds the prompt, windows the history, and delegates to the
//! LLM adapter. Retrieval runs exactly once per query and the same result
//! sequence feeds both the context block and the returned evidence list,
//! so the two can never disagree.
//!
//! Failure policy: retrieval failures are hard errors (an answer grounded
//! on a failed retrieval would be wrong); LLM failures are absorbed into an
//! apologetic answer, because callers expect a conversational response even
//! on backend trouble.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::error::Result;
use crate::llm::{ChatMessage, ChatParams, LlmAdapter};
use crate::models::{ChatResult, ConversationTurn};
use crate::prompt::{bound_history, build_context, generate_prompt};
use crate::store::VectorStore;

pub struct Agent {
    store: Arc<VectorStore>,
    llm: Box<dyn LlmAdapter>,
    top_k: usize,
    params: ChatParams,
    max_history_turns: usize,
}

impl Agent {
    pub fn new(
        store: Arc<VectorStore>,
        llm: Box<dyn LlmAdapter>,
        top_k: usize,
        config: &LlmConfig,
    ) -> Self {
        info!(model = %llm.model_name(), "initialized LLM adapter");
        Self {
            store,
            llm,
            top_k,
            params: ChatParams::from(config),
            max_history_turns: config.max_history_turns,
        }
    }

    /// Answer a query, optionally continuing a conversation.
    ///
    /// Returns an error only for retrieval failures. An LLM failure yields
    /// `Ok` with a degraded [`ChatResult`]: apologetic answer, no evidence,
    /// `has_context` false.
    pub async fn chat(
        &self,
        query: &str,
        history: Option<&[ConversationTurn]>,
    ) -> Result<ChatResult> {
        let retrieved = self.store.query(query, self.top_k).await?;
        let context = build_context(&retrieved);
        let prompt = generate_prompt(query, &context);

        let mut messages: Vec<ChatMessage> = Vec::new();
        if let Some(history) = history {
            messages.extend(
                bound_history(history, self.max_history_turns)
                    .iter()
                    .map(ChatMessage::from_turn),
            );
        }
        messages.push(ChatMessage::user(prompt));

        match self.llm.chat(&messages, &self.params).await {
            Ok(answer) => Ok(ChatResult {
                answer,
                has_context: !context.is_empty(),
                retrieved_docs: retrieved,
            }),
            Err(e) => {
                warn!(error = %e, "LLM call failed, returning degraded answer");
                Ok(ChatResult {
                    answer: format!("Sorry, something went wrong while answering your question: {e}"),
                    retrieved_docs: Vec::new(),
                    has_context: false,
                })
            }
        }
    }

    /// Convenience wrapper returning only the answer text.
    pub async fn ask(&self, query: &str) -> Result<String> {
        Ok(self.chat(query, None).await?.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::embedding::EmbeddingProvider;
    use crate::error::Error;
    use crate::index::MemoryIndex;
    use crate::models::{Chunk, ChunkMetadata, DocType, Role};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let len = t.chars().count() as f32;
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
                    vec![len, vowels]
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    /// Records the message sequence it was sent and replies with a canned
    /// answer, or fails when `fail` is set.
    struct RecordingLlm {
        sent: Mutex<Vec<Vec<ChatMessage>>>,
        fail: bool,
    }

    impl RecordingLlm {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl LlmAdapter for RecordingLlm {
        async fn chat(&self, messages: &[ChatMessage], _params: &ChatParams) -> Result<String> {
            self.sent.lock().unwrap().push(messages.to_vec());
            if self.fail {
                Err(Error::Generation {
                    provider: "stub".to_string(),
                    reason: "quota exceeded".to_string(),
                })
            } else {
                Ok("canned answer".to_string())
            }
        }

        fn model_name(&self) -> String {
            "stub/model".to_string()
        }
    }

    fn store() -> Arc<VectorStore> {
        Arc::new(VectorStore::new(
            Arc::new(StubEmbedder),
            Arc::new(MemoryIndex::new()),
        ))
    }

    fn agent_over(store: Arc<VectorStore>, fail: bool) -> (Agent, Arc<RecordingLlm>) {
        // Box a second handle so the test can inspect recorded messages.
        let llm = Arc::new(RecordingLlm::new(fail));
        let adapter = ArcAdapter(llm.clone());
        (
            Agent::new(store, Box::new(adapter), 3, &LlmConfig::default()),
            llm,
        )
    }

    struct ArcAdapter(Arc<RecordingLlm>);

    #[async_trait]
    impl LlmAdapter for ArcAdapter {
        async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String> {
            self.0.chat(messages, params).await
        }

        fn model_name(&self) -> String {
            self.0.model_name()
        }
    }

    fn chunk(content: &str, filename: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                source_path: PathBuf::from(filename),
                doc_type: DocType::Txt,
                chunk_index: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_empty_index_falls_back_ungrounded() {
        let (agent, llm) = agent_over(store(), false);

        let result = agent.chat("unknown topic", None).await.unwrap();
        assert!(!result.has_context);
        assert!(result.retrieved_docs.is_empty());
        assert_eq!(result.answer, "canned answer");

        // Fallback template was used.
        let sent = llm.sent.lock().unwrap();
        let prompt = &sent[0].last().unwrap().content;
        assert!(prompt.contains("no relevant documents"));
    }

    #[tokio::test]
    async fn test_grounded_answer_carries_evidence() {
        let store = store();
        store
            .add(&[chunk("rust has ownership", "rust.md")])
            .await
            .unwrap();
        let (agent, llm) = agent_over(store, false);

        let result = agent.chat("ownership", None).await.unwrap();
        assert!(result.has_context);
        assert_eq!(result.retrieved_docs.len(), 1);
        assert_eq!(result.retrieved_docs[0].metadata.filename, "rust.md");

        let sent = llm.sent.lock().unwrap();
        let prompt = &sent[0].last().unwrap().content;
        assert!(prompt.contains("[Document 1: rust.md]"));
    }

    #[tokio::test]
    async fn test_history_windowed_to_ten_turns() {
        let (agent, llm) = agent_over(store(), false);

        let history: Vec<ConversationTurn> = (0..12)
            .map(|i| ConversationTurn {
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("turn {i}"),
            })
            .collect();

        agent.chat("topic X", Some(&history)).await.unwrap();

        let sent = llm.sent.lock().unwrap();
        // 10 history turns + 1 prompt turn.
        assert_eq!(sent[0].len(), 11);
        assert_eq!(sent[0][0].content, "turn 2");
        assert_eq!(sent[0][9].content, "turn 11");
    }

    #[tokio::test]
    async fn test_llm_failure_absorbed_into_degraded_result() {
        let store = store();
        store.add(&[chunk("some fact", "facts.md")]).await.unwrap();
        let (agent, _llm) = agent_over(store, true);

        let result = agent.chat("some fact", None).await.unwrap();
        assert!(!result.has_context);
        assert!(result.retrieved_docs.is_empty());
        assert!(result.answer.contains("Sorry"));
        assert!(result.answer.contains("quota exceeded"));
    }
}
