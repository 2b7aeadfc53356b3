//! Prompt system for faqdesk.
//!
//! Provides the two generation instruction templates:
//! - a no-context template used when retrieval finds nothing
//! - a grounded template enumerating each retrieved chunk
//!
//! Both are Handlebars strings and can be overridden from YAML files.

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::PromptBuilder;
pub use loader::{load_prompt, load_templates};
pub use types::{GroundingSource, PromptDefinition, PromptTemplates};
