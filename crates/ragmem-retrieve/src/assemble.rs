//! Prompt assembly: pack retrieved chunks into a character budget and
//! render them through a named template.

use std::collections::HashMap;

use serde::Serialize;

use ragmem_core::types::{ChatTurn, RetrievedItem};

pub const DEFAULT_MAX_CONTEXT_LENGTH: usize = 4000;

const DEFAULT_TEMPLATE: &str = "You are a helpful assistant. Use the following context to answer the question.\n\n\
CONTEXT:\n\
{context}\n\n\
QUESTION:\n\
{query}\n\n\
Provide a concise and accurate answer based on the context above.";

const INSTRUCTIONAL_TEMPLATE: &str = "Answer the user's question by following these steps:\n\
1. Read the provided context carefully.\n\
2. Identify the key facts.\n\
3. Formulate a structured response.\n\n\
CONTEXT:\n\
{context}\n\n\
QUESTION:\n\
{query}";

pub struct ContextAssembler {
    max_context_length: usize,
    templates: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitedResponse {
    pub response: String,
    pub citations: Vec<String>,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_LENGTH)
    }
}

impl ContextAssembler {
    pub fn new(max_context_length: usize) -> Self {
        let mut templates = HashMap::new();
        templates.insert("default".to_string(), DEFAULT_TEMPLATE.to_string());
        templates.insert("instructional".to_string(), INSTRUCTIONAL_TEMPLATE.to_string());
        Self { max_context_length, templates }
    }

    /// Register or replace a named prompt template. Templates use
    /// `{context}` and `{query}` placeholders.
    pub fn register_template(&mut self, name: &str, template: &str) {
        self.templates.insert(name.to_string(), template.to_string());
    }

    /// Render the query and chunks through a template. Unknown template
    /// names fall back to `default`.
    pub fn assemble_prompt(
        &self,
        query: &str,
        items: &[RetrievedItem],
        template_name: &str,
    ) -> String {
        let kept = self.truncate_to_fit(items, self.max_context_length);
        let context = if kept.is_empty() {
            "No context available.".to_string()
        } else {
            kept.iter()
                .enumerate()
                .map(|(i, item)| {
                    let source = item
                        .metadata
                        .get("source")
                        .cloned()
                        .unwrap_or_else(|| format!("Document {}", i + 1));
                    let ext = item
                        .metadata
                        .get("extension")
                        .map(String::as_str)
                        .unwrap_or("txt");
                    format!(
                        "[Source: {source} (.{ext}) - Score: {:.3}]\n{}",
                        item.score, item.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let template = self
            .templates
            .get(template_name)
            .or_else(|| self.templates.get("default"))
            .map(String::as_str)
            .unwrap_or(DEFAULT_TEMPLATE);
        template.replace("{context}", &context).replace("{query}", query)
    }

    /// Like `assemble_prompt` with the default template, prefixed by a
    /// transcript of earlier turns when one exists.
    pub fn create_conversational_prompt(
        &self,
        query: &str,
        items: &[RetrievedItem],
        history: &[ChatTurn],
    ) -> String {
        let context_prompt = self.assemble_prompt(query, items, "default");
        if history.is_empty() {
            return context_prompt;
        }
        let mut transcript = String::new();
        for turn in history {
            transcript.push_str(&turn.role.to_uppercase());
            transcript.push_str(": ");
            transcript.push_str(&turn.content);
            transcript.push('\n');
        }
        format!("CONVERSATION HISTORY:\n{transcript}\nCURRENT TASK:\n{context_prompt}")
    }

    /// Greedy best-score-first selection under a character budget.
    ///
    /// If even the best chunk exceeds the budget, a prefix of it is kept so
    /// a non-zero budget never produces an empty context.
    pub fn truncate_to_fit(&self, items: &[RetrievedItem], max_length: usize) -> Vec<RetrievedItem> {
        let mut sorted: Vec<&RetrievedItem> = items.iter().collect();
        sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut current = 0usize;
        let mut kept = Vec::new();
        for item in sorted {
            let len = item.text.chars().count();
            if current + len > max_length {
                if current == 0 && max_length > 0 {
                    let mut clipped = item.clone();
                    clipped.text = item.text.chars().take(max_length).collect();
                    kept.push(clipped);
                }
                break;
            }
            kept.push(item.clone());
            current += len;
        }
        kept
    }

    /// Pair a model response with one numbered citation per chunk, in
    /// chunk order.
    pub fn add_citations(&self, response: &str, items: &[RetrievedItem]) -> CitedResponse {
        let citations = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let source = item
                    .metadata
                    .get("source")
                    .cloned()
                    .unwrap_or_else(|| format!("Chunk {}", i + 1));
                format!("[{}] {source}", i + 1)
            })
            .collect();
        CitedResponse { response: response.to_string(), citations }
    }
}
