use std::fmt::Write as _;

use tvt_core::few_shot::ExampleSet;
use tvt_core::state::ConsoleState;
use tvt_core::state::FormModule;
use tvt_core::state::MainFormState;
use tvt_core::state::Notice;
use tvt_core::state::RequestOutcome;
use tvt_core::state::RequestPhase;
use tvt_core::state::SampleQuestions;
use tvt_core::state::TemplatesState;

pub const UNKNOWN_FAILURE: &str = "Unknown error occurred";

pub fn render_notice(notice: &Notice) -> String {
    format!(
        "[{}] {}: {}",
        notice.level.label(),
        notice.module.label(),
        notice.message
    )
}

/// Notices pushed after `seq`, oldest first.
pub fn render_notices_since(state: &ConsoleState, seq: u64) -> Vec<String> {
    state.notices.since(seq).map(render_notice).collect()
}

pub fn last_notice_seq(state: &ConsoleState) -> u64 {
    state.notices.last().map(|notice| notice.seq).unwrap_or(0)
}

pub fn render_outcome(outcome: &RequestOutcome) -> String {
    if !outcome.success {
        let error = outcome
            .error
            .as_deref()
            .filter(|error| !error.trim().is_empty())
            .unwrap_or(UNKNOWN_FAILURE);
        return format!("Error: {error}");
    }

    let mut out = String::new();
    out.push_str(outcome.text().unwrap_or("(empty response)"));
    out.push('\n');
    if let Some(prompt) = outcome.prompt_used.as_deref() {
        let _ = write!(out, "\nPrompt used:\n{prompt}\n");
    }
    if let Some(info) = outcome.model_info.as_ref() {
        let pretty = serde_json::to_string_pretty(info).unwrap_or_else(|_| info.to_string());
        let _ = write!(out, "\nModel information:\n{pretty}\n");
    }
    if let Some(modalities) = outcome.modalities_label() {
        let _ = write!(out, "\nModalities used: {modalities}\n");
    }
    if let Some(question) = outcome.question.as_deref() {
        let _ = write!(out, "\nOriginal question: {question}\n");
    }
    out
}

/// The settled result of one module, or its failure.
pub fn render_module_result(state: &ConsoleState, module: FormModule) -> Option<String> {
    let slot = state.requests.slot(module);
    if slot.phase == RequestPhase::Failed {
        let message = slot
            .last_error
            .as_ref()
            .map(|error| error.message.to_string())
            .unwrap_or_else(|| UNKNOWN_FAILURE.to_string());
        return Some(format!("Error: {message}"));
    }
    let outcome = match module {
        FormModule::Main => state.main.response.as_ref(),
        FormModule::Analysis => state.analysis.result.as_ref(),
        FormModule::FewShot => state.few_shot.result.as_ref(),
        FormModule::Qa => state.qa.result.as_ref(),
        FormModule::Templates => None,
    };
    outcome.map(render_outcome)
}

pub fn render_prompt_state(main: &MainFormState) -> String {
    let mut out = String::new();
    let status = if main.is_optimizing {
        "optimizing"
    } else if main.is_optimized {
        "optimized"
    } else {
        "draft"
    };
    let _ = writeln!(
        out,
        "mode: {} | strategy: {} | context: {} | auto-optimize: {} | {} ({})",
        main.prompt_type.label(),
        main.optimization_strategy.label(),
        on_off(main.add_contextual_info),
        on_off(main.auto_optimize),
        status,
        main.optimization_version,
    );
    if let Some(file) = main.tactile_file.as_ref() {
        let _ = writeln!(out, "tactile: {} ({} bytes)", file.name, file.byte_size);
    }
    if let Some(file) = main.visual_file.as_ref() {
        let _ = writeln!(out, "visual: {} ({} bytes)", file.name, file.byte_size);
    }
    if !main.textual_input.is_empty() {
        let _ = writeln!(out, "text: {}", main.textual_input);
    }
    let _ = writeln!(out, "history: {} version(s)", main.history.len());
    let _ = write!(out, "\n{}\n", main.prompt_text);
    out
}

pub fn render_history(main: &MainFormState) -> String {
    if main.history.is_empty() {
        return "No previous prompt versions.\n".to_string();
    }
    let mut out = String::new();
    for (index, entry) in main.history.iter().enumerate() {
        let first_line = entry.prompt_snapshot.lines().next().unwrap_or_default();
        let _ = writeln!(
            out,
            "{}. {} @{} {}",
            index + 1,
            entry.version,
            entry.timestamp_ms,
            first_line
        );
    }
    out
}

pub fn render_templates(templates: &TemplatesState) -> String {
    let mut out = String::new();
    if templates.available.is_empty() {
        out.push_str("No templates loaded.\n");
    }
    for name in &templates.available {
        let _ = writeln!(out, "- {name}");
    }
    if let Some(info) = templates.model_info.as_ref() {
        let pretty = serde_json::to_string_pretty(info).unwrap_or_else(|_| info.to_string());
        let _ = write!(out, "\nModel information:\n{pretty}\n");
    }
    out
}

pub fn render_sample_questions(questions: &SampleQuestions) -> String {
    let mut out = String::new();
    let single = &questions.single_modality;
    let sections: [(&str, &[String]); 5] = [
        ("Single modality (tactile)", &single.tactile),
        ("Single modality (vision)", &single.vision),
        ("Single modality (text)", &single.text),
        ("Dual modality", &questions.dual_modality),
        ("Multimodal", &questions.multimodal),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{title}:");
        for item in items {
            let _ = writeln!(out, "  - {item}");
        }
    }
    out
}

pub fn render_examples(examples: &ExampleSet) -> String {
    let mut out = String::new();
    for example in examples.iter() {
        let _ = writeln!(
            out,
            "#{} tactile: {} | text: {} | output: {}",
            example.id, example.tactile, example.text, example.output
        );
    }
    out
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
