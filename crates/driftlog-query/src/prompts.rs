//! Grounding prompt construction.

use driftlog_core::RankedResult;

/// Fixed refusal sentence, used by the generator when context is
/// insufficient and by the pipeline when retrieval finds nothing.
pub const NO_ANSWER: &str = "I don't have enough information to answer that.";

pub const SYSTEM_PROMPT: &str = "You are a travel knowledge assistant that answers questions using ONLY the provided context below. Do not use any external knowledge.

Rules:
- Base your answer strictly on the context. Do not add information from outside the context.
- Cite every factual claim with the bracket notation used in the context (e.g. [1], [2]). Use the same number that appears next to the passage you are citing.
- If the context does not contain enough information to answer the question, say explicitly: \"I don't have enough information to answer that.\"
- Never fabricate or guess information. If you are unsure, say so.";

const EMPTY_CONTEXT: &str = "(No context provided.)";

/// Number `chunks` from 1 in the given order and render them as context
/// blocks, followed by the question.
pub fn build_user_prompt(question: &str, chunks: &[RankedResult]) -> String {
    let context = if chunks.is_empty() {
        EMPTY_CONTEXT.to_string()
    } else {
        chunks
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let meta = &result.chunk.metadata;
                format!(
                    "[{}]\n{}\nSource: {} | Location: {}",
                    i + 1,
                    result.chunk.content,
                    meta.source_label(),
                    meta.location_label()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!("{}\n\nQuestion: {}", context, question)
}
