//! Prompt builder: renders a definition's system and user templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use cookbook_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every required variable declared by the definition must be present in
/// `variables`; templates are rendered in strict mode with HTML escaping
/// disabled, so recipe text passes through verbatim.
///
/// # Example
/// ```no_run
/// use cookbook_prompt::{build_prompt, builtin_prompt, ANSWER_PROMPT_ID};
/// use std::collections::HashMap;
///
/// # fn example() -> cookbook_core::AppResult<()> {
/// let def = builtin_prompt(ANSWER_PROMPT_ID)?;
/// let vars = HashMap::from([
///     ("question".to_string(), "How long do I rest the dough?".to_string()),
///     ("context".to_string(), "Rest the dough for 30 minutes.".to_string()),
///     ("history".to_string(), "No previous conversation.".to_string()),
/// ]);
///
/// let built = build_prompt(&def, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .input
        .required_names()
        .filter(|name| !variables.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let handlebars = registry(definition)?;

    let system = match definition.system {
        Some(_) => Some(render(&handlebars, "system", variables)?),
        None => None,
    };
    let user = render(&handlebars, "user", variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables.clone(),
        },
    })
}

fn registry(definition: &PromptDefinition) -> AppResult<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    if let Some(system) = &definition.system {
        handlebars
            .register_template_string("system", system)
            .map_err(|e| AppError::Prompt(format!("Failed to register system template: {}", e)))?;
    }
    handlebars
        .register_template_string("user", &definition.template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    Ok(handlebars)
}

fn render(
    handlebars: &Handlebars<'static>,
    name: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render {} template: {}", name, e)))
}
