//! Prompt assembly for answer generation.

use super::SearchHit;

/// Fixed system instruction sent with every generation call.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided document excerpts. If the information is not in the excerpts, state that you cannot answer based on the provided context.";

/// Render all hits as numbered excerpts followed by the question.
pub fn format_prompt_with_context(hits: &[SearchHit], query: &str) -> String {
    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("Document {}:\n{}\n", i + 1, hit.text().trim()))
        .collect::<Vec<_>>()
        .join("\n---\n");

    format!(
        "You are a helpful assistant answering questions based on the following context:\n\n\
         {context}\n\n\
         Based on the above documents, answer this question:\n\
         {query}\n"
    )
}
