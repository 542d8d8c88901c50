use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use super::actions::ConsoleAction;
use super::actions::OptimizationJob;
use super::actions::RequestJob;
use super::actions::RequestSettlement;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::few_shot::ExampleSet;
use super::modes::reconcile_channels;
use super::modes::rules_for;
use super::prompt::append_example;
use super::prompt::build_base_prompt;
use super::prompt::has_any_input;
use super::prompt::optimized_prompt;
use super::state::AnalysisField;
use super::state::Channel;
use super::state::ConsoleState;
use super::state::ErrorKind;
use super::state::FewShotInputField;
use super::state::FileRef;
use super::state::FormModule;
use super::state::MainFormState;
use super::state::NoticeLevel;
use super::state::PromptHistoryEntry;
use super::state::QaField;
use super::state::RequestError;
use super::state::RequestOutcome;
use super::state::SampleQuestions;
use super::submission::analysis_submission;
use super::submission::few_shot_submission;
use super::submission::main_submission;
use super::submission::qa_submission;
use super::submission::template_submission;
use super::submission::Operation;
use super::submission::Submission;
use super::submission::ValidationError;
use super::templates::TemplateDraft;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEffect {
    RequestFrame,
    StartOptimization(OptimizationJob),
    /// The in-flight optimization pass was superseded and may be dropped.
    CancelOptimization,
    SendRequest(RequestJob),
}

pub fn reduce(state: &mut ConsoleState, action: ConsoleAction) -> Vec<ConsoleEffect> {
    match action {
        ConsoleAction::User(user) => reduce_user(state, user),
        ConsoleAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut ConsoleState, action: UserAction) -> Vec<ConsoleEffect> {
    match action {
        UserAction::SetTactileFile(file) => set_main_file(state, Channel::Tactile, file),
        UserAction::SetVisualFile(file) => set_main_file(state, Channel::Visual, file),
        UserAction::SetTextualInput(text) => {
            if state.main.textual_input == text {
                return Vec::new();
            }
            state.main.textual_input = text;
            with_frame(recompute_prompt(state))
        }
        UserAction::SetPromptType(prompt_type) => {
            if state.main.prompt_type == prompt_type {
                return Vec::new();
            }
            state.main.prompt_type = prompt_type;
            let reconciliation = reconcile_channels(&mut state.main);
            if let Some(notice) = reconciliation.notice {
                state.notify(NoticeLevel::Info, FormModule::Main, notice);
            }
            if reconciliation.changed() {
                with_frame(recompute_prompt(state))
            } else {
                vec![ConsoleEffect::RequestFrame]
            }
        }
        UserAction::SetAddContextualInfo(enabled) => {
            if state.main.add_contextual_info == enabled {
                return Vec::new();
            }
            state.main.add_contextual_info = enabled;
            with_frame(recompute_prompt(state))
        }
        UserAction::SetAutoOptimize(enabled) => {
            if state.main.auto_optimize == enabled {
                return Vec::new();
            }
            state.main.auto_optimize = enabled;
            with_frame(recompute_prompt(state))
        }
        UserAction::SetOptimizationStrategy(strategy) => {
            state.main.optimization_strategy = strategy;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::EditPromptText(text) => {
            let effects = supersede_optimization(&mut state.main);
            state.main.prompt_text = text;
            state.main.is_optimized = false;
            with_frame(effects)
        }
        UserAction::OptimizePrompt => {
            if state.main.is_optimizing {
                state.notify(
                    NoticeLevel::Warn,
                    FormModule::Main,
                    "Prompt optimization already in progress",
                );
                return vec![ConsoleEffect::RequestFrame];
            }
            let base = build_base_prompt(&state.main);
            vec![start_optimization(state, base), ConsoleEffect::RequestFrame]
        }
        UserAction::RevertPrompt => {
            let Some(entry) = state.main.history.pop() else {
                state.notify(
                    NoticeLevel::Info,
                    FormModule::Main,
                    "No previous prompt version to revert to",
                );
                return vec![ConsoleEffect::RequestFrame];
            };
            let effects = supersede_optimization(&mut state.main);
            state.main.prompt_text = entry.prompt_snapshot;
            state.main.is_optimized = false;
            state.notify(
                NoticeLevel::Info,
                FormModule::Main,
                format!("Reverted to previous prompt ({})", entry.version),
            );
            with_frame(effects)
        }
        UserAction::InsertExample => {
            let effects = supersede_optimization(&mut state.main);
            state.main.prompt_text = append_example(&state.main.prompt_text);
            state.main.is_optimized = false;
            with_frame(effects)
        }
        UserAction::ClearPromptHistory => {
            state.main.history.clear();
            state.notify(NoticeLevel::Info, FormModule::Main, "Prompt history cleared");
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::ClearInputs => {
            let main = &mut state.main;
            let had_tactile = main.tactile_file.take().is_some();
            let had_visual = main.visual_file.take().is_some();
            let had_text = !main.textual_input.is_empty();
            main.textual_input.clear();
            main.response = None;
            if had_tactile || had_visual || had_text {
                with_frame(recompute_prompt(state))
            } else {
                vec![ConsoleEffect::RequestFrame]
            }
        }
        UserAction::SubmitMain => {
            let submission = main_submission(&state.main);
            submit(state, FormModule::Main, submission)
        }

        UserAction::SetAnalysisMode(mode) => {
            state.analysis.mode = mode;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetAnalysisField { field, value } => {
            let analysis = &mut state.analysis;
            match field {
                AnalysisField::TactileData => analysis.tactile_data = value,
                AnalysisField::TextDescription => analysis.text_description = value,
                AnalysisField::TaskInstruction => analysis.task_instruction = value,
                AnalysisField::CustomPrompt => analysis.custom_prompt = value,
            }
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetUseCustomPrompt(enabled) => {
            state.analysis.use_custom_prompt = enabled;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetAnalysisImage(file) => {
            state.analysis.image_file = file;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SubmitAnalysis => {
            let submission = analysis_submission(&state.analysis);
            submit(state, FormModule::Analysis, submission)
        }

        UserAction::AddExample => {
            state.few_shot.examples.add();
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::RemoveExample { id } => {
            if let Err(err) = state.few_shot.examples.remove(id) {
                state.notify(NoticeLevel::Warn, FormModule::FewShot, err.to_string());
            }
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::UpdateExample { id, field, value } => {
            if let Err(err) = state.few_shot.examples.update(id, field, value) {
                state.notify(NoticeLevel::Warn, FormModule::FewShot, err.to_string());
            }
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::LoadDemoExamples => {
            state.few_shot.examples = ExampleSet::demo();
            state.notify(NoticeLevel::Info, FormModule::FewShot, "Demo examples loaded!");
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::ReplaceExamples(examples) => {
            state.few_shot.examples = ExampleSet::from_examples(examples);
            let count = state.few_shot.examples.len();
            state.notify(
                NoticeLevel::Info,
                FormModule::FewShot,
                format!("Loaded {count} examples"),
            );
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetFewShotInput { field, value } => {
            match field {
                FewShotInputField::TactileData => state.few_shot.tactile_data = value,
                FewShotInputField::TextDescription => state.few_shot.text_description = value,
            }
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetFewShotImage(file) => {
            state.few_shot.image_file = file;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SubmitFewShot => {
            let submission = few_shot_submission(&state.few_shot);
            submit(state, FormModule::FewShot, submission)
        }

        UserAction::SetQaMode(mode) => {
            state.qa.mode = mode;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetQaField { field, value } => {
            let qa = &mut state.qa;
            match field {
                QaField::Question => qa.question = value,
                QaField::ModalityData => qa.modality_data = value,
                QaField::TactileData => qa.tactile_data = value,
                QaField::TextData => qa.text_data = value,
            }
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetModalityType(modality) => {
            state.qa.modality_type = modality;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SetQaImage(file) => {
            state.qa.image_file = file;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::SubmitQa => {
            let submission = qa_submission(&state.qa);
            submit(state, FormModule::Qa, submission)
        }
        UserAction::LoadSampleQuestions => begin_request(state, Submission::SampleQuestions),
        UserAction::UseSampleQuestion(question) => {
            state.qa.question = question;
            vec![ConsoleEffect::RequestFrame]
        }

        UserAction::LoadTemplates => begin_request(state, Submission::AvailableTemplates),
        UserAction::LoadModelInfo => begin_request(state, Submission::ModelInfo),
        UserAction::SetTemplateField { field, value } => {
            state.templates.draft.set(field, value);
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::ReplaceTemplateDraft(draft) => {
            state.templates.draft = draft;
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::LoadExampleTemplate => {
            state.templates.draft = TemplateDraft::example();
            state.notify(NoticeLevel::Info, FormModule::Templates, "Example template loaded");
            vec![ConsoleEffect::RequestFrame]
        }
        UserAction::CreateTemplate => {
            let submission = template_submission(&state.templates.draft);
            submit(state, FormModule::Templates, submission)
        }

        UserAction::DismissOutcome(module) => {
            state.requests.slot_mut(module).reset();
            vec![ConsoleEffect::RequestFrame]
        }
    }
}

fn reduce_runtime(state: &mut ConsoleState, action: RuntimeAction) -> Vec<ConsoleEffect> {
    match action {
        RuntimeAction::OptimizationFinished(job) => finish_optimization(state, job),
        RuntimeAction::RequestSettled(settlement) => settle_request(state, settlement),
    }
}

fn with_frame(mut effects: Vec<ConsoleEffect>) -> Vec<ConsoleEffect> {
    if !effects.contains(&ConsoleEffect::RequestFrame) {
        effects.push(ConsoleEffect::RequestFrame);
    }
    effects
}

fn set_main_file(
    state: &mut ConsoleState,
    channel: Channel,
    file: Option<FileRef>,
) -> Vec<ConsoleEffect> {
    let prompt_type = state.main.prompt_type;
    if file.is_some() && !rules_for(prompt_type).allows(channel) {
        state.notify(
            NoticeLevel::Info,
            FormModule::Main,
            format!("File upload disabled for {} mode", prompt_type.label()),
        );
        return vec![ConsoleEffect::RequestFrame];
    }

    let (slot, label) = match channel {
        Channel::Tactile => (&mut state.main.tactile_file, "Tactile"),
        Channel::Visual => (&mut state.main.visual_file, "Visual"),
        Channel::Text => return Vec::new(),
    };
    if *slot == file {
        return Vec::new();
    }
    let message = if file.is_some() {
        format!("{label} file uploaded successfully")
    } else {
        format!("{label} file removed")
    };
    *slot = file;

    state.notify(NoticeLevel::Success, FormModule::Main, message);
    with_frame(recompute_prompt(state))
}

/// Rebuilds the prompt after a watched input changed.
fn recompute_prompt(state: &mut ConsoleState) -> Vec<ConsoleEffect> {
    let base = build_base_prompt(&state.main);
    if state.main.auto_optimize && has_any_input(&state.main) {
        return vec![start_optimization(state, base)];
    }

    let effects = supersede_optimization(&mut state.main);
    state.main.prompt_text = base;
    state.main.is_optimized = false;
    effects
}

fn start_optimization(state: &mut ConsoleState, base_prompt: String) -> ConsoleEffect {
    let main = &mut state.main;
    main.generation += 1;
    let job = OptimizationJob {
        generation: main.generation,
        optimized_prompt: optimized_prompt(
            &base_prompt,
            main.prompt_type,
            main.optimization_strategy,
        ),
        base_prompt,
        version: Arc::clone(&main.optimization_version),
        delay_ms: state.optimizer.delay_ms,
    };
    main.in_flight = Some(job.generation);
    main.is_optimizing = true;
    ConsoleEffect::StartOptimization(job)
}

fn supersede_optimization(main: &mut MainFormState) -> Vec<ConsoleEffect> {
    main.generation += 1;
    main.is_optimizing = false;
    match main.in_flight.take() {
        Some(_) => vec![ConsoleEffect::CancelOptimization],
        None => Vec::new(),
    }
}

fn finish_optimization(state: &mut ConsoleState, job: OptimizationJob) -> Vec<ConsoleEffect> {
    let main = &mut state.main;
    if main.in_flight != Some(job.generation) {
        return Vec::new();
    }

    main.in_flight = None;
    main.is_optimizing = false;
    main.history.push(PromptHistoryEntry {
        version: job.version,
        prompt_snapshot: job.base_prompt,
        timestamp_ms: Utc::now().timestamp_millis(),
    });
    main.prompt_text = job.optimized_prompt;
    main.is_optimized = true;
    vec![ConsoleEffect::RequestFrame]
}

fn submit(
    state: &mut ConsoleState,
    module: FormModule,
    submission: Result<Submission, ValidationError>,
) -> Vec<ConsoleEffect> {
    match submission {
        Ok(submission) => begin_request(state, submission),
        Err(err) => {
            state.notify(NoticeLevel::Error, module, err.to_string());
            vec![ConsoleEffect::RequestFrame]
        }
    }
}

fn begin_request(state: &mut ConsoleState, submission: Submission) -> Vec<ConsoleEffect> {
    let operation = submission.operation();
    let module = operation.module();
    if state.is_loading(module) {
        state.notify(
            NoticeLevel::Warn,
            module,
            format!("A {} request is already in progress", module.label()),
        );
        return vec![ConsoleEffect::RequestFrame];
    }

    let request_id = state.requests.allocate();
    state.requests.slot_mut(module).begin(request_id, operation);
    vec![
        ConsoleEffect::SendRequest(RequestJob {
            module,
            request_id,
            submission,
        }),
        ConsoleEffect::RequestFrame,
    ]
}

enum SettledPayload {
    Outcome(RequestOutcome),
    Templates(Vec<String>),
    ModelInfo(Value),
    SampleQuestions(SampleQuestions),
    TemplateCreated,
}

fn decode_payload(operation: Operation, outcome: RequestOutcome) -> Result<SettledPayload, String> {
    match operation {
        Operation::AvailableTemplates => match outcome.extra_field::<Vec<String>>("templates") {
            Some(Ok(templates)) => Ok(SettledPayload::Templates(templates)),
            Some(Err(err)) => Err(format!("malformed template list: {err}")),
            None => Err("response did not include a template list".to_string()),
        },
        Operation::ModelInfo => outcome
            .model_info
            .map(SettledPayload::ModelInfo)
            .ok_or_else(|| "response did not include model information".to_string()),
        Operation::SampleQuestions => {
            match outcome.extra_field::<SampleQuestions>("sample_questions") {
                Some(Ok(questions)) => Ok(SettledPayload::SampleQuestions(questions)),
                Some(Err(err)) => Err(format!("malformed sample questions: {err}")),
                None => Err("response did not include sample questions".to_string()),
            }
        }
        Operation::CustomTemplate => Ok(SettledPayload::TemplateCreated),
        _ => Ok(SettledPayload::Outcome(outcome)),
    }
}

fn settle_request(state: &mut ConsoleState, settlement: RequestSettlement) -> Vec<ConsoleEffect> {
    let RequestSettlement {
        module,
        request_id,
        result,
    } = settlement;
    let slot = state.requests.slot(module);
    if slot.pending != Some(request_id) {
        return Vec::new();
    }
    let Some(operation) = slot.operation else {
        return Vec::new();
    };

    let decoded = match result {
        Ok(outcome) if outcome.success => decode_payload(operation, outcome)
            .map_err(|message| RequestError::new(ErrorKind::Application, message, request_id)),
        Ok(outcome) => Err(RequestError::new(
            ErrorKind::Application,
            outcome.error_message(),
            request_id,
        )),
        Err(failure) => Err(RequestError::new(
            ErrorKind::Transport,
            failure.message,
            request_id,
        )),
    };

    match decoded {
        Ok(payload) => {
            state.requests.slot_mut(module).succeed();
            with_frame(apply_payload(state, operation, payload))
        }
        Err(error) => {
            let message = failure_notice(operation, &error);
            state.requests.slot_mut(module).fail(error);
            state.notify(NoticeLevel::Error, module, message);
            vec![ConsoleEffect::RequestFrame]
        }
    }
}

fn apply_payload(
    state: &mut ConsoleState,
    operation: Operation,
    payload: SettledPayload,
) -> Vec<ConsoleEffect> {
    let module = operation.module();
    match payload {
        SettledPayload::Outcome(outcome) => {
            let message = match module {
                FormModule::Main => {
                    state.main.response = Some(outcome);
                    "Analysis completed!"
                }
                FormModule::Analysis => {
                    state.analysis.result = Some(outcome);
                    "Analysis completed successfully!"
                }
                FormModule::FewShot => {
                    state.few_shot.result = Some(outcome);
                    "Few-shot learning completed successfully!"
                }
                FormModule::Qa => {
                    state.qa.result = Some(outcome);
                    "Question answered successfully!"
                }
                FormModule::Templates => return Vec::new(),
            };
            state.notify(NoticeLevel::Success, module, message);
            Vec::new()
        }
        SettledPayload::Templates(templates) => {
            let count = templates.len();
            state.templates.available = templates;
            state.notify(
                NoticeLevel::Success,
                module,
                format!("Loaded {count} templates"),
            );
            Vec::new()
        }
        SettledPayload::ModelInfo(info) => {
            state.templates.model_info = Some(info);
            state.notify(NoticeLevel::Info, module, "Model information loaded");
            Vec::new()
        }
        SettledPayload::SampleQuestions(questions) => {
            state.qa.sample_questions = Some(questions);
            state.notify(NoticeLevel::Success, module, "Sample questions loaded!");
            Vec::new()
        }
        SettledPayload::TemplateCreated => {
            state.templates.draft = TemplateDraft::default();
            state.notify(
                NoticeLevel::Success,
                module,
                "Template created successfully!",
            );
            begin_request(state, Submission::AvailableTemplates)
        }
    }
}

fn failure_notice(operation: Operation, error: &RequestError) -> String {
    let prefix = match (operation, error.kind) {
        (Operation::UnifiedAnalysis, ErrorKind::Transport) => "Request failed",
        (
            Operation::UnifiedAnalysis
            | Operation::TactileText
            | Operation::VisionText
            | Operation::MultimodalComplete,
            ErrorKind::Application,
        ) => "Analysis failed",
        (Operation::FewShotLearning, ErrorKind::Application) => "Few-shot learning failed",
        (
            Operation::SingleModalityQa | Operation::DualModalityQa | Operation::MultimodalQa,
            ErrorKind::Application,
        ) => "Question answering failed",
        (Operation::SampleQuestions, _) => "Failed to load sample questions",
        (Operation::AvailableTemplates, _) => "Error loading templates",
        (Operation::ModelInfo, _) => "Error loading model information",
        (Operation::CustomTemplate, _) => "Error creating template",
        (_, ErrorKind::Transport) => "Error processing request",
    };
    format!("{prefix}: {}", error.message)
}

#[cfg(test)]
mod tests;
