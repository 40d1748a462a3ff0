//! Context assembly, prompt templates, and the conversation window.
//!
//! Pure functions; all three are exercised on every `chat()` call.
//!
//! The assembled context block is presentational text only — citation or
//! attribution features must work from the original [`RetrievedResult`]
//! sequence, not by parsing this string.

use crate::models::{ConversationTurn, RetrievedResult};

/// Render retrieved chunks into a single context block.
///
/// Each result becomes `[Document i: <filename>]\n<content>` where `i` is
/// its 1-based position; blocks are joined with a blank line. Empty input
/// produces an empty string.
pub fn build_context(results: &[RetrievedResult]) -> String {
    let parts: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let filename = if result.metadata.filename.is_empty() {
                "unknown"
            } else {
                &result.metadata.filename
            };
            format!("[Document {}: {}]\n{}", i + 1, filename, result.content)
        })
        .collect();

    parts.join("\n\n")
}

/// Build the prompt turn for a query.
///
/// With a non-empty context, the model is instructed to answer from the
/// documents and to say explicitly when they lack the information. With an
/// empty context it falls back to general knowledge and must disclose that
/// the answer is not grounded in the knowledge base.
pub fn generate_prompt(query: &str, context: &str) -> String {
    if context.is_empty() {
        format!(
            "You are a professional AI assistant. The user's question is: {query}\n\n\
             Note: no relevant documents were found in the knowledge base. Answer from \
             your general knowledge, and remind the user that this answer is not based \
             on any specific document."
        )
    } else {
        format!(
            "You are a professional AI assistant answering questions from a document \
             knowledge base.\n\n\
             Answer the user's question based on the documents below. If the documents \
             do not contain the relevant information, say so explicitly.\n\n\
             Documents:\n{context}\n\n\
             User question: {query}\n\n\
             Provide an accurate, detailed answer:"
        )
    }
}

/// Keep the most recent `max_turns` entries of a conversation history.
///
/// Order is preserved; the caller's history is not touched. A history no
/// longer than `max_turns` is returned unchanged.
pub fn bound_history(history: &[ConversationTurn], max_turns: usize) -> &[ConversationTurn] {
    let skip = history.len().saturating_sub(max_turns);
    &history[skip..]
}
