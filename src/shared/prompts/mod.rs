//! Prompt template management module.
//!
//! Templates use Jinja2 syntax and are addressed by their path relative to
//! `templates/prompts/`.

pub mod engine;

pub use engine::{render_template, template_exists, TemplateError};

use minijinja::Value;
use std::collections::HashMap;

/// Templates the assistant cannot run without
pub const ASSISTANT_TEMPLATES: &[&str] = &[
    "assistant/context.jinja",
    "assistant/reference.jinja",
    "assistant/summary.jinja",
];

/// Pre-serialised sections of the assistant's system context
#[derive(Debug, Clone, Default)]
pub struct ContextSections {
    pub user_profile: String,
    pub preferences: String,
    pub values: String,
    pub beliefs: String,
    pub aux_data: String,
    pub past_conversations: String,
    pub active_url: String,
}

/// Render the system message carrying memory and request metadata.
pub fn render_context_prompt(sections: &ContextSections) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("user_profile", Value::from(sections.user_profile.as_str()));
    ctx.insert("preferences", Value::from(sections.preferences.as_str()));
    ctx.insert("values", Value::from(sections.values.as_str()));
    ctx.insert("beliefs", Value::from(sections.beliefs.as_str()));
    ctx.insert("aux_data", Value::from(sections.aux_data.as_str()));
    ctx.insert(
        "past_conversations",
        Value::from(sections.past_conversations.as_str()),
    );
    ctx.insert("active_url", Value::from(sections.active_url.as_str()));

    render_template("assistant/context.jinja", &ctx)
}

/// Render one reference document as a system message.
pub fn render_reference_prompt(name: &str, excerpt: &str) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("name", Value::from(name));
    ctx.insert("excerpt", Value::from(excerpt));

    render_template("assistant/reference.jinja", &ctx)
}

/// Render the summarisation request for a finished exchange.
pub fn render_summary_prompt(query: &str, response: &str) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("query", Value::from(query));
    ctx.insert("response", Value::from(response));

    render_template("assistant/summary.jinja", &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_prompt_layout() {
        let sections = ContextSections {
            user_profile: r#"{"name":"Ada"}"#.to_string(),
            preferences: "{}".to_string(),
            values: "{}".to_string(),
            beliefs: "{}".to_string(),
            aux_data: r#"{"chat_id":"c1"}"#.to_string(),
            past_conversations: "[]".to_string(),
            active_url: "{}".to_string(),
        };

        let prompt = render_context_prompt(&sections).unwrap();
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[0], r#"User Profile: {"name":"Ada"}"#);
        assert_eq!(lines[4], r#"Auxiliary Data: {"chat_id":"c1"}"#);
        assert_eq!(lines[6], "Active URL: {}");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_reference_prompt_is_not_html_escaped() {
        let prompt = render_reference_prompt("page.html", "<h1>Title</h1>").unwrap();
        assert_eq!(prompt, "Reference - page.html: <h1>Title</h1>...");
    }

    #[test]
    fn test_summary_prompt_contains_exchange() {
        let prompt = render_summary_prompt("What is Rust?", "A language.").unwrap();
        assert!(prompt.starts_with("Summarize the following conversation"));
        assert!(prompt.contains("User: What is Rust?"));
        assert!(prompt.contains("AI: A language."));
        assert!(prompt.trim_end().ends_with("Summary:"));
    }
}
