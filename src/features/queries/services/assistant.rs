//! Memory-context assembly around the completion API.
//!
//! For one query: load both memory documents, render the context system
//! message, add one system message per reference, call the model, then
//! (optionally) summarise the exchange and append it to short-term memory.
//! A failed completion leaves memory untouched.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::features::memory::services::{
    recent_from, ConversationEntry, Document, MemoryKind, MemoryStore,
};
use crate::features::queries::services::reference_reader::ReferenceDocument;
use crate::modules::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::shared::constants::{SUMMARY_FALLBACK, SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE};
use crate::shared::prompts::{
    render_context_prompt, render_reference_prompt, render_summary_prompt, ContextSections,
};

const SUMMARY_PREFIXES: &[&str] = &["Summary:", "Here's a summary:", "Here is a summary:"];

/// Everything the assistant needs to answer one query
#[derive(Debug, Clone)]
pub struct AssistantRequest {
    pub user_id: i64,
    pub username: String,
    pub query_id: i64,
    pub query: String,
    pub chat_id: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub update_memory: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub response: String,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClientInfo<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AuxData<'a> {
    username: &'a str,
    user_id: i64,
    chat_id: Option<&'a str>,
    query_id: i64,
    client_info: ClientInfo<'a>,
}

pub struct Assistant {
    client: Arc<dyn CompletionClient>,
    memory: Arc<MemoryStore>,
    recent_conversations: usize,
    reference_prompt_chars: usize,
}

impl Assistant {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        memory: Arc<MemoryStore>,
        recent_conversations: usize,
        reference_prompt_chars: usize,
    ) -> Self {
        Self {
            client,
            memory,
            recent_conversations,
            reference_prompt_chars,
        }
    }

    pub async fn answer(
        &self,
        request: &AssistantRequest,
        references: &[ReferenceDocument],
    ) -> Result<AssistantReply> {
        let long_term = self.memory.load(request.user_id, MemoryKind::LongTerm).await?;
        let short_term = self.memory.load(request.user_id, MemoryKind::ShortTerm).await?;

        let messages = self.build_messages(request, &long_term, &short_term, references)?;

        info!(
            user_id = request.user_id,
            query_id = request.query_id,
            model = %request.model,
            references = references.len(),
            "Sending query to completion API"
        );

        let completion = self
            .client
            .complete(&CompletionRequest {
                model: request.model.clone(),
                messages,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            })
            .await?;

        info!(
            query_id = request.query_id,
            tokens = completion.total_tokens,
            "Received completion"
        );

        if !request.update_memory {
            return Ok(AssistantReply {
                response: completion.content,
                summary: None,
            });
        }

        let summary = self
            .summarize(&request.model, &request.query, &completion.content)
            .await;

        self.memory
            .append_conversation(
                request.user_id,
                ConversationEntry {
                    query: request.query.clone(),
                    response: completion.content.clone(),
                    summary: summary.clone(),
                    chat_id: request.chat_id.clone(),
                    timestamp: Utc::now().to_rfc3339(),
                },
            )
            .await?;

        Ok(AssistantReply {
            response: completion.content,
            summary: Some(summary),
        })
    }

    /// Context system message, one system message per reference, then the query
    pub fn build_messages(
        &self,
        request: &AssistantRequest,
        long_term: &Document,
        short_term: &Document,
        references: &[ReferenceDocument],
    ) -> Result<Vec<ChatMessage>> {
        let aux = AuxData {
            username: &request.username,
            user_id: request.user_id,
            chat_id: request.chat_id.as_deref(),
            query_id: request.query_id,
            client_info: ClientInfo {
                model: &request.model,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let sections = ContextSections {
            user_profile: section(long_term, "user_profile"),
            preferences: section(long_term, "preferences"),
            values: section(long_term, "values"),
            beliefs: section(long_term, "beliefs"),
            aux_data: to_json(&aux)?,
            past_conversations: to_json(&recent_from(short_term, self.recent_conversations))?,
            active_url: section(short_term, "active_url"),
        };

        let mut messages = Vec::with_capacity(references.len() + 2);
        messages.push(ChatMessage::system(
            render_context_prompt(&sections).map_err(|e| AppError::Internal(e.to_string()))?,
        ));

        for reference in references {
            let excerpt: String = reference
                .content
                .chars()
                .take(self.reference_prompt_chars)
                .collect();
            messages.push(ChatMessage::system(
                render_reference_prompt(&reference.name, &excerpt)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
            ));
        }

        messages.push(ChatMessage::user(request.query.clone()));
        Ok(messages)
    }

    /// Short summary for memory; never fails the request
    pub async fn summarize(&self, model: &str, query: &str, response: &str) -> String {
        let prompt = match render_summary_prompt(query, response) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render summary prompt: {}", e);
                return SUMMARY_FALLBACK.to_string();
            }
        };

        let request = CompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: SUMMARY_MAX_TOKENS,
            temperature: SUMMARY_TEMPERATURE,
        };

        match self.client.complete(&request).await {
            Ok(completion) => {
                let summary = clean_summary(&completion.content);
                info!(chars = summary.chars().count(), "Generated conversation summary");
                summary
            }
            Err(e) => {
                warn!("Error generating conversation summary: {}", e);
                SUMMARY_FALLBACK.to_string()
            }
        }
    }
}

/// JSON of a document section, `{}` when absent
fn section(doc: &Document, key: &str) -> String {
    doc.get(key)
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!({}))
        .to_string()
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Failed to encode prompt context: {}", e)))
}

/// Strip lead-ins such as "Summary:" the model tends to add
pub fn clean_summary(raw: &str) -> String {
    let mut summary = raw.trim();
    for prefix in SUMMARY_PREFIXES {
        if let Some(rest) = summary.strip_prefix(prefix) {
            summary = rest.trim();
        }
    }
    summary.to_string()
}
