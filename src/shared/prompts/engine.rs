//! Template engine for prompt management using Jinja2 syntax.
//!
//! Built-in templates are compiled into the binary. Any `.jinja` file found
//! under `templates/prompts/` at startup replaces the built-in template with
//! the same relative name, so prompts can be tuned without a rebuild.

use minijinja::{Environment, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

const TEMPLATE_DIR: &str = "templates/prompts";

/// Templates shipped with the binary
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "assistant/context.jinja",
        include_str!("../../../templates/prompts/assistant/context.jinja"),
    ),
    (
        "assistant/reference.jinja",
        include_str!("../../../templates/prompts/assistant/reference.jinja"),
    ),
    (
        "assistant/summary.jinja",
        include_str!("../../../templates/prompts/assistant/summary.jinja"),
    ),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();

    for &(name, source) in BUILTIN_TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::error!("Built-in template {} failed to compile: {}", name, e);
        }
    }

    let template_path = Path::new(TEMPLATE_DIR);
    if template_path.exists() {
        load_templates_recursive(&mut env, template_path, template_path);
    }

    env
}

/// Recursively load `.jinja` overrides from a directory
fn load_templates_recursive(env: &mut Environment<'static>, base_path: &Path, current_path: &Path) {
    let Ok(entries) = std::fs::read_dir(current_path) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            load_templates_recursive(env, base_path, &path);
            continue;
        }
        if !path.extension().is_some_and(|ext| ext == "jinja") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(base_path) else {
            continue;
        };
        let template_name = relative.to_string_lossy().replace('\\', "/");
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                // Templates live for the whole process
                let static_name: &'static str = Box::leak(template_name.clone().into_boxed_str());
                let static_content: &'static str = Box::leak(content.into_boxed_str());
                if let Err(e) = env.add_template(static_name, static_content) {
                    tracing::warn!("Failed to load template {}: {}", template_name, e);
                } else {
                    tracing::debug!("Loaded template override: {}", template_name);
                }
            }
            Err(e) => tracing::warn!("Failed to read template {}: {}", template_name, e),
        }
    }
}

fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a template with the given context.
///
/// # Arguments
/// * `template_name` - Path relative to `templates/prompts/` (e.g. "assistant/summary.jinja")
/// * `ctx` - Variable name to value map
pub fn render_template(
    template_name: &str,
    ctx: &HashMap<&str, Value>,
) -> Result<String, TemplateError> {
    let template = get_environment()
        .get_template(template_name)
        .map_err(|_| TemplateError::NotFound(template_name.to_string()))?;

    let render_ctx = Value::from_iter(ctx.iter().map(|(k, v)| (*k, v.clone())));

    template
        .render(render_ctx)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}

/// Check if a template exists
pub fn template_exists(template_name: &str) -> bool {
    get_environment().get_template(template_name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_template() {
        let ctx = HashMap::new();
        let result = render_template("nonexistent.jinja", &ctx);
        assert!(matches!(result, Err(TemplateError::NotFound(_))));
        assert!(!template_exists("definitely_not_a_real_template.jinja"));
    }

    #[test]
    fn test_builtin_templates_are_registered() {
        for (name, _) in BUILTIN_TEMPLATES {
            assert!(template_exists(name), "{} should be registered", name);
        }
    }
}
