//! Prompt loader for YAML prompt definitions.
//!
//! Prompts ship compiled into the binary and can be overridden per workspace
//! by dropping `<id>.yml` into `.cookbook/prompts/`.

use crate::types::PromptDefinition;
use cookbook_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the prompt used to answer cookbook questions.
pub const ANSWER_PROMPT_ID: &str = "cookbook.answer";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[(
    ANSWER_PROMPT_ID,
    include_str!("../prompts/cookbook.answer.yml"),
)];

/// Load a prompt definition by ID.
///
/// A workspace override at `.cookbook/prompts/<id>.yml` wins over the
/// built-in definition of the same ID.
///
/// # Example
/// ```no_run
/// use cookbook_prompt::{load_prompt, ANSWER_PROMPT_ID};
/// use std::path::Path;
///
/// # fn example() -> cookbook_core::AppResult<()> {
/// let prompt = load_prompt(Path::new("."), ANSWER_PROMPT_ID)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".cookbook/prompts")
        .join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        return parse_prompt(&contents, &prompt_file.display().to_string());
    }

    builtin_prompt(prompt_id)
}

/// Load a prompt compiled into the binary.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;

    parse_prompt(contents, "built-in")
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML ({}): {}", origin, e))
    })?;

    validate_prompt(&definition)?;

    tracing::debug!(
        "Loaded prompt: {} ({}) from {}",
        definition.id,
        definition.title,
        origin
    );
    Ok(definition)
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, contents: &str) {
        let prompts_dir = dir.join(".cookbook/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), contents).unwrap();
    }

    #[test]
    fn test_builtin_answer_prompt() {
        let prompt = builtin_prompt(ANSWER_PROMPT_ID).unwrap();
        let required: Vec<&str> = prompt.input.required_names().collect();

        assert_eq!(required, vec!["question", "context", "history"]);
        assert!(prompt.system.unwrap().contains("don't know"));
    }

    #[test]
    fn test_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(prompt.id, ANSWER_PROMPT_ID);
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            ANSWER_PROMPT_ID,
            r#"
id: cookbook.answer
title: "Terse answers"
apiVersion: "1.1"
behavior:
  tone: dry
  style: terse
template: "{{question}}"
output:
  format: text
"#,
        );

        let prompt = load_prompt(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Terse answers");
        assert!(prompt.system.is_none());
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            load_prompt(temp_dir.path(), "nonexistent"),
            Err(AppError::Prompt(_))
        ));
    }

    #[test]
    fn test_invalid_yaml_override() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "broken", "invalid: yaml: content:");

        assert!(load_prompt(temp_dir.path(), "broken").is_err());
    }
}
