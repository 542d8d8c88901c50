use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::submission::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
    Name,
    Template,
    RequiredInputs,
}

/// Custom template as typed by the user. `required_inputs` stays raw text
/// until validation so malformed JSON can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateDraft {
    pub name: String,
    pub template: String,
    pub required_inputs: String,
}

impl TemplateDraft {
    pub fn example() -> Self {
        Self {
            name: "custom_material_analysis".to_string(),
            template: "Analyze the following material data:\n\n\
Tactile Properties: {tactile_data}\n\
Visual Description: {text_description}\n\
Task: {task_instruction}\n\n\
Provide a comprehensive analysis including material identification, properties, and potential applications."
                .to_string(),
            required_inputs: r#"["tactile_data", "text_description", "task_instruction"]"#
                .to_string(),
        }
    }

    pub fn set(&mut self, field: TemplateField, value: impl Into<String>) {
        let value = value.into();
        match field {
            TemplateField::Name => self.name = value,
            TemplateField::Template => self.template = value,
            TemplateField::RequiredInputs => self.required_inputs = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.template.is_empty() && self.required_inputs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTemplate {
    pub name: String,
    pub template: String,
    pub required_inputs: Vec<String>,
}

impl ValidatedTemplate {
    /// Wire form of `required_inputs`: a compact JSON array.
    pub fn required_inputs_json(&self) -> String {
        serde_json::Value::from(self.required_inputs.clone()).to_string()
    }
}

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok())
        .as_ref()
}

/// Distinct `{name}` placeholders in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let Some(pattern) = placeholder_pattern() else {
        return found;
    };
    for capture in pattern.captures_iter(template) {
        let name = &capture[1];
        if !found.iter().any(|existing| existing == name) {
            found.push(name.to_string());
        }
    }
    found
}

pub fn validate_draft(draft: &TemplateDraft) -> Result<ValidatedTemplate, ValidationError> {
    if draft.name.trim().is_empty()
        || draft.template.trim().is_empty()
        || draft.required_inputs.trim().is_empty()
    {
        return Err(ValidationError::TemplateFieldsMissing);
    }

    let required_inputs: Vec<String> = serde_json::from_str(&draft.required_inputs)
        .map_err(|_| ValidationError::RequiredInputsNotJsonArray)?;

    if let Some(missing) = placeholders(&draft.template)
        .into_iter()
        .find(|name| !required_inputs.contains(name))
    {
        return Err(ValidationError::UnlistedPlaceholder(missing));
    }

    Ok(ValidatedTemplate {
        name: draft.name.trim().to_string(),
        template: draft.template.clone(),
        required_inputs,
    })
}
