//! Loading template overrides from a prompts directory.

use crate::builder::{DEFAULT_GROUNDED, DEFAULT_NO_CONTEXT};
use crate::types::{PromptDefinition, PromptTemplates};
use faqdesk_core::{AppError, AppResult};
use std::path::Path;

const NO_CONTEXT_FILE: &str = "no_context.yml";
const GROUNDED_FILE: &str = "grounded.yml";

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            no_context: DEFAULT_NO_CONTEXT.to_string(),
            grounded: DEFAULT_GROUNDED.to_string(),
        }
    }
}

/// Resolve the templates for a run.
///
/// Without a directory the built-in templates are used. With one, each of
/// `no_context.yml` and `grounded.yml` that exists replaces its built-in
/// counterpart; a missing file keeps the default.
///
/// # Example
/// ```no_run
/// use faqdesk_prompt::load_templates;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let templates = load_templates(Some(Path::new("./prompts")))?;
/// println!("{}", templates.grounded);
/// # Ok(())
/// # }
/// ```
pub fn load_templates(prompts_dir: Option<&Path>) -> AppResult<PromptTemplates> {
    let mut templates = PromptTemplates::default();

    let Some(dir) = prompts_dir else {
        return Ok(templates);
    };

    if !dir.is_dir() {
        return Err(AppError::Prompt(format!(
            "Prompts directory not found: {:?}",
            dir
        )));
    }

    if let Some(def) = load_prompt(&dir.join(NO_CONTEXT_FILE))? {
        templates.no_context = def.template;
    }
    if let Some(def) = load_prompt(&dir.join(GROUNDED_FILE))? {
        templates.grounded = def.template;
    }

    Ok(templates)
}

/// Load a single prompt definition, `None` if the file does not exist.
pub fn load_prompt(prompt_file: &Path) -> AppResult<Option<PromptDefinition>> {
    if !prompt_file.exists() {
        tracing::debug!("No prompt override at {:?}", prompt_file);
        return Ok(None);
    }

    let contents = std::fs::read_to_string(prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt override: {} ({:?})", definition.id, prompt_file);

    Ok(Some(definition))
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
