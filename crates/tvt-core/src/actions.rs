use std::sync::Arc;

use super::few_shot::Example;
use super::few_shot::ExampleField;
use super::state::AnalysisField;
use super::state::AnalysisMode;
use super::state::FewShotInputField;
use super::state::FileRef;
use super::state::FormModule;
use super::state::ModalityType;
use super::state::OptimizationStrategy;
use super::state::PromptType;
use super::state::QaField;
use super::state::QaMode;
use super::state::RequestId;
use super::state::RequestOutcome;
use super::submission::Submission;
use super::templates::TemplateDraft;
use super::templates::TemplateField;

#[derive(Debug, Clone)]
pub enum ConsoleAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    // Main form.
    SetTactileFile(Option<FileRef>),
    SetVisualFile(Option<FileRef>),
    SetTextualInput(String),
    SetPromptType(PromptType),
    SetAddContextualInfo(bool),
    SetAutoOptimize(bool),
    SetOptimizationStrategy(OptimizationStrategy),
    EditPromptText(String),
    OptimizePrompt,
    RevertPrompt,
    InsertExample,
    ClearPromptHistory,
    ClearInputs,
    SubmitMain,

    // Analysis.
    SetAnalysisMode(AnalysisMode),
    SetAnalysisField {
        field: AnalysisField,
        value: String,
    },
    SetUseCustomPrompt(bool),
    SetAnalysisImage(Option<FileRef>),
    SubmitAnalysis,

    // Few-shot.
    AddExample,
    RemoveExample {
        id: u32,
    },
    UpdateExample {
        id: u32,
        field: ExampleField,
        value: String,
    },
    LoadDemoExamples,
    ReplaceExamples(Vec<Example>),
    SetFewShotInput {
        field: FewShotInputField,
        value: String,
    },
    SetFewShotImage(Option<FileRef>),
    SubmitFewShot,

    // Question answering.
    SetQaMode(QaMode),
    SetQaField {
        field: QaField,
        value: String,
    },
    SetModalityType(ModalityType),
    SetQaImage(Option<FileRef>),
    SubmitQa,
    LoadSampleQuestions,
    UseSampleQuestion(String),

    // Templates.
    LoadTemplates,
    LoadModelInfo,
    SetTemplateField {
        field: TemplateField,
        value: String,
    },
    ReplaceTemplateDraft(TemplateDraft),
    LoadExampleTemplate,
    CreateTemplate,

    DismissOutcome(FormModule),
}

/// One optimization pass, started by the reducer and completed by the runtime
/// after the configured delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationJob {
    pub generation: u64,
    pub base_prompt: String,
    pub optimized_prompt: String,
    pub version: Arc<str>,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestJob {
    pub module: FormModule,
    pub request_id: RequestId,
    pub submission: Submission,
}

/// Network-level failure: the request never produced a decodable envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub message: String,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestSettlement {
    pub module: FormModule,
    pub request_id: RequestId,
    pub result: Result<RequestOutcome, TransportFailure>,
}

#[derive(Debug, Clone)]
pub enum RuntimeAction {
    OptimizationFinished(OptimizationJob),
    RequestSettled(RequestSettlement),
}
