//! Rendering generation instructions from retrieved chunks.

use crate::types::{GroundingSource, PromptTemplates};
use faqdesk_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde_json::json;

const NO_CONTEXT: &str = "no_context";
const GROUNDED: &str = "grounded";

pub(crate) const DEFAULT_NO_CONTEXT: &str = r#"You are a helpful customer support assistant for our company.

IMPORTANT CONTEXT:
The knowledge base has no information relevant to the user's question.

YOUR TASK:
1. Say that you do not have specific information about this topic in the knowledge base
2. Be empathetic and professional
3. Tell the user a support ticket will be created for them
4. Tell the user a human agent will follow up soon

RESPONSE GUIDELINES:
- Keep it to 2-3 sentences
- Do NOT invent information or give general advice

EXAMPLE RESPONSE (wording may vary):
"I don't have specific information about that in my current knowledge base. I'll create a support ticket for you right away, and one of our team members will reach out to help you as soon as possible."
"#;

pub(crate) const DEFAULT_GROUNDED: &str = r#"You are a helpful customer support assistant for our company.

YOUR ROLE:
Answer customer questions using the knowledge base sources below. Be accurate, helpful and friendly.

CRITICAL INSTRUCTIONS:
1. Answer ONLY from the knowledge base sources provided
2. If the sources do not fully answer the question, say so explicitly
3. Never invent policies, procedures or facts absent from the sources
4. Acknowledge uncertainty or incomplete information clearly
5. Aim for 2-4 sentences unless more detail is clearly needed

KNOWLEDGE BASE SOURCES:
{{#each sources}}
<knowledge_source_{{rank}}>
  <source_file>{{sourceId}}</source_file>
  <section_title>{{heading}}</section_title>
  <relevance_score>{{relevance}}</relevance_score>
  <content>
{{content}}
  </content>
</knowledge_source_{{rank}}>
{{/each}}

HANDLING UNCERTAINTY:
If the sources do not adequately answer the question, respond along these lines:
"I don't have complete information about that in my knowledge base. I'll create a support ticket so our team can provide you with accurate details and assistance."

RESPONSE STYLE:
- Professional yet conversational
- Action-oriented: tell users what to do
- Concise

It is better to admit you don't know than to give incorrect information.
"#;

/// Renders the per-turn system instructions.
///
/// Both templates are compiled once at construction so a malformed override
/// fails at startup, not mid-conversation.
pub struct PromptBuilder {
    registry: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new(templates: &PromptTemplates) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text output; chunk content must not be HTML-escaped
        registry.register_escape_fn(handlebars::no_escape);
        // A misspelled field in an override is an error, not an empty string
        registry.set_strict_mode(true);

        registry
            .register_template_string(NO_CONTEXT, &templates.no_context)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;
        registry
            .register_template_string(GROUNDED, &templates.grounded)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self { registry })
    }

    /// Choose and render the instructions for a retrieval outcome.
    ///
    /// An empty `sources` selects the no-context template; otherwise every
    /// source is rendered in the given (rank) order.
    pub fn build_instructions(&self, sources: &[GroundingSource]) -> AppResult<String> {
        if sources.is_empty() {
            tracing::debug!("Rendering no-context instructions");
            return self.render(NO_CONTEXT, &json!({}));
        }

        tracing::debug!("Rendering grounded instructions with {} sources", sources.len());
        self.render(GROUNDED, &json!({ "sources": sources }))
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> AppResult<String> {
        self.registry
            .render(name, data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
    }
}
