//! Prompt text derived from the main form.
//!
//! Everything here is pure; the reducer decides when a rebuild or an
//! optimization pass happens.

use crate::modes::rules_for;
use crate::state::MainFormState;
use crate::state::OptimizationStrategy;
use crate::state::PromptType;

pub const EMPTY_PROMPT_PLACEHOLDER: &str = "No input provided yet.";

pub const CONTEXT_HEADER: &str = "[Context]\n\
Task: Multimodal AI Analysis\n\
Objective: Provide comprehensive reasoning across modalities\n\
Output Format: Structured response with clear explanations";

pub const EXAMPLE_FRAMEWORK: &str = "\n\n**Example Analysis Framework:**\n\
Perform a detailed comprehensive multimodal analysis with cross-referencing of the following visual and textual information:\n\
\n\
**Textual Input Analysis:**\n\
Image Description: [Your image description here]\n\
Text Input: [Your text input here]\n\
\n\
Provide actionable insights with confidence levels utilizing the provided visual and textual context.\n\
\n\
[Context]";

/// True when any channel the current mode accepts carries content.
pub fn has_any_input(form: &MainFormState) -> bool {
    let rules = rules_for(form.prompt_type);
    (rules.tactile && form.tactile_file.is_some())
        || (rules.visual && form.visual_file.is_some())
        || !form.textual_input.trim().is_empty()
}

pub fn build_base_prompt(form: &MainFormState) -> String {
    let rules = rules_for(form.prompt_type);
    let mut sections: Vec<String> = Vec::new();

    if form.add_contextual_info {
        sections.push(CONTEXT_HEADER.to_string());
    }
    if let Some(file) = form.tactile_file.as_ref().filter(|_| rules.tactile) {
        sections.push(format!("Tactile Data File: {}", file.name));
    }
    if let Some(file) = form.visual_file.as_ref().filter(|_| rules.visual) {
        sections.push(format!("Visual Data File: {}", file.name));
    }
    if !form.textual_input.trim().is_empty() {
        sections.push(format!("Text Input: {}", form.textual_input));
    }

    if sections.is_empty() {
        EMPTY_PROMPT_PLACEHOLDER.to_string()
    } else {
        sections.join("\n\n")
    }
}

fn lead_line(prompt_type: PromptType) -> &'static str {
    match prompt_type {
        PromptType::TactileText => {
            "Perform a detailed multimodal analysis correlating the following tactile measurements with the textual information:"
        }
        PromptType::VisionText => {
            "Perform a detailed comprehensive multimodal analysis with cross-referencing of the following visual and textual information:"
        }
        PromptType::CombinedAll => {
            "Perform a comprehensive multimodal analysis integrating the following tactile, visual and textual information:"
        }
        PromptType::TextOnly => "Perform a detailed analysis of the following textual information:",
    }
}

fn context_focus(prompt_type: PromptType) -> &'static str {
    match prompt_type {
        PromptType::TactileText => "tactile and textual",
        PromptType::VisionText => "visual and textual",
        PromptType::CombinedAll => "tactile, visual and textual",
        PromptType::TextOnly => "textual",
    }
}

/// Rewrites a base prompt for the selected mode and strategy.
pub fn optimized_prompt(
    base: &str,
    prompt_type: PromptType,
    strategy: OptimizationStrategy,
) -> String {
    let lead = lead_line(prompt_type);
    let focus = context_focus(prompt_type);
    match strategy {
        OptimizationStrategy::Balanced => format!(
            "{lead}\n\n{base}\n\nProvide actionable insights with confidence levels utilizing the provided {focus} context."
        ),
        OptimizationStrategy::Clarity => format!(
            "{lead}\n\n{base}\n\nExplain the reasoning in plain language, state every assumption explicitly and keep the answer concise."
        ),
        OptimizationStrategy::Structure => format!(
            "{lead}\n\n**Input Summary:**\n{base}\n\n**Required Output:**\n\
1. Observations for each {focus} input\n\
2. Correlations between the inputs\n\
3. Conclusions with confidence levels"
        ),
        OptimizationStrategy::Specificity => format!(
            "{lead}\n\n{base}\n\nName the most likely material or object, list its measurable properties and give a confidence percentage for every claim."
        ),
    }
}

pub fn append_example(prompt_text: &str) -> String {
    format!("{prompt_text}{EXAMPLE_FRAMEWORK}")
}

/// Prompt sent with a unified analysis when the user left the prompt empty.
pub fn resolve_request_prompt(
    prompt_type: PromptType,
    prompt_text: &str,
    textual_input: &str,
) -> String {
    if !prompt_text.trim().is_empty() {
        return prompt_text.to_string();
    }
    let text = textual_input.trim();
    match prompt_type {
        PromptType::TextOnly => format!("Please analyze the following text: {text}"),
        _ if text.is_empty() => "Please analyze the provided data".to_string(),
        _ => format!("Please analyze the provided data. Additional context: {text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FileRef;
    use pretty_assertions::assert_eq;

    fn form() -> MainFormState {
        MainFormState::default()
    }

    #[test]
    fn empty_form_builds_placeholder() {
        assert_eq!(build_base_prompt(&form()), EMPTY_PROMPT_PLACEHOLDER);
        assert!(!has_any_input(&form()));
    }

    #[test]
    fn whitespace_text_counts_as_empty() {
        let form = MainFormState {
            textual_input: "   \n".to_string(),
            ..form()
        };
        assert_eq!(build_base_prompt(&form), EMPTY_PROMPT_PLACEHOLDER);
        assert!(!has_any_input(&form));
    }

    #[test]
    fn sections_follow_fixed_order() {
        let form = MainFormState {
            add_contextual_info: true,
            tactile_file: Some(FileRef::new("grip.csv", "text/csv", vec![1])),
            visual_file: Some(FileRef::new("cloth.png", "image/png", vec![2])),
            textual_input: "rough surface".to_string(),
            ..form()
        };

        let expected = format!(
            "{CONTEXT_HEADER}\n\nTactile Data File: grip.csv\n\nVisual Data File: cloth.png\n\nText Input: rough surface"
        );
        assert_eq!(build_base_prompt(&form), expected);
    }

    #[test]
    fn context_header_alone_is_not_input() {
        let form = MainFormState {
            add_contextual_info: true,
            ..form()
        };
        assert_eq!(build_base_prompt(&form), CONTEXT_HEADER);
        assert!(!has_any_input(&form));
    }

    #[test]
    fn disabled_channel_is_not_rendered() {
        let form = MainFormState {
            prompt_type: PromptType::VisionText,
            tactile_file: Some(FileRef::new("grip.csv", "text/csv", vec![1])),
            ..form()
        };
        assert_eq!(build_base_prompt(&form), EMPTY_PROMPT_PLACEHOLDER);
    }

    #[test]
    fn vision_balanced_rewrite_wraps_base() {
        let optimized = optimized_prompt(
            "Text Input: silk",
            PromptType::VisionText,
            OptimizationStrategy::Balanced,
        );
        assert!(optimized.starts_with(
            "Perform a detailed comprehensive multimodal analysis with cross-referencing"
        ));
        assert!(optimized.contains("\n\nText Input: silk\n\n"));
        assert!(optimized.ends_with("utilizing the provided visual and textual context."));
    }

    #[test]
    fn structure_rewrite_has_summary_and_output_sections() {
        let optimized = optimized_prompt(
            "Text Input: silk",
            PromptType::CombinedAll,
            OptimizationStrategy::Structure,
        );
        assert!(optimized.contains("**Input Summary:**\nText Input: silk"));
        assert!(optimized.contains("**Required Output:**"));
    }

    #[test]
    fn example_is_appended_after_existing_text() {
        let prompt = append_example("Describe it.");
        assert!(prompt.starts_with("Describe it.\n\n**Example Analysis Framework:**"));
        assert!(prompt.ends_with("[Context]"));
    }

    #[test]
    fn fallback_prompt_depends_on_mode_and_text() {
        assert_eq!(
            resolve_request_prompt(PromptType::TextOnly, "", "sandpaper"),
            "Please analyze the following text: sandpaper"
        );
        assert_eq!(
            resolve_request_prompt(PromptType::VisionText, "  ", "glossy"),
            "Please analyze the provided data. Additional context: glossy"
        );
        assert_eq!(
            resolve_request_prompt(PromptType::CombinedAll, "", ""),
            "Please analyze the provided data"
        );
        assert_eq!(
            resolve_request_prompt(PromptType::TextOnly, "custom", "ignored"),
            "custom"
        );
    }
}
