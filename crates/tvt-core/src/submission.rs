//! Validated, owned snapshots of a form taken at submit time.
//!
//! A snapshot never borrows from `ConsoleState`, so the form may keep changing
//! while the request it produced is in flight.

use thiserror::Error;

use crate::few_shot::Example;
use crate::modes::required_channel;
use crate::modes::rules_for;
use crate::state::AnalysisFormState;
use crate::state::AnalysisMode;
use crate::state::Channel;
use crate::state::FewShotFormState;
use crate::state::FileRef;
use crate::state::FormModule;
use crate::state::MainFormState;
use crate::state::ModalityType;
use crate::state::PromptType;
use crate::state::QaFormState;
use crate::state::QaMode;
use crate::templates::validate_draft;
use crate::templates::TemplateDraft;
use crate::templates::ValidatedTemplate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide at least one input: tactile file, image, or text")]
    NoInput,
    #[error("Please enter text for Text Only mode")]
    TextRequired,
    #[error("Please fill in all required fields and upload an image")]
    ImageRequired,
    #[error("Please fill in all required fields and upload a tactile file")]
    TactileFileRequired,
    #[error("Please fill in all required fields")]
    FieldsMissing,
    #[error("Please enter a question")]
    QuestionMissing,
    #[error("Please provide at least one type of data")]
    NoQaData,
    #[error("Please provide at least one example with some content")]
    NoExampleContent,
    #[error("Please fill in the new input fields")]
    NewInputMissing,
    #[error("Please fill in all template fields")]
    TemplateFieldsMissing,
    #[error("Required inputs must be valid JSON array format")]
    RequiredInputsNotJsonArray,
    #[error("Template placeholder '{0}' is not listed in required inputs")]
    UnlistedPlaceholder(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UnifiedAnalysis,
    TactileText,
    VisionText,
    MultimodalComplete,
    FewShotLearning,
    SingleModalityQa,
    DualModalityQa,
    MultimodalQa,
    SampleQuestions,
    AvailableTemplates,
    ModelInfo,
    CustomTemplate,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Self::UnifiedAnalysis => "unified analysis",
            Self::TactileText => "tactile-text analysis",
            Self::VisionText => "vision-text analysis",
            Self::MultimodalComplete => "complete multimodal analysis",
            Self::FewShotLearning => "few-shot learning",
            Self::SingleModalityQa => "single-modality question",
            Self::DualModalityQa => "dual-modality question",
            Self::MultimodalQa => "multimodal question",
            Self::SampleQuestions => "sample questions",
            Self::AvailableTemplates => "template list",
            Self::ModelInfo => "model information",
            Self::CustomTemplate => "custom template",
        }
    }

    /// Form module whose request slot tracks this operation.
    pub fn module(self) -> FormModule {
        match self {
            Self::UnifiedAnalysis => FormModule::Main,
            Self::TactileText | Self::VisionText | Self::MultimodalComplete => {
                FormModule::Analysis
            }
            Self::FewShotLearning => FormModule::FewShot,
            Self::SingleModalityQa
            | Self::DualModalityQa
            | Self::MultimodalQa
            | Self::SampleQuestions => FormModule::Qa,
            Self::AvailableTemplates | Self::ModelInfo | Self::CustomTemplate => {
                FormModule::Templates
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainSubmission {
    pub prompt_type: PromptType,
    pub prompt_text: String,
    pub textual_input: String,
    pub add_contextual_info: bool,
    pub tactile_file: Option<FileRef>,
    pub visual_file: Option<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSubmission {
    pub mode: AnalysisMode,
    pub tactile_data: String,
    pub text_description: String,
    pub task_instruction: String,
    pub use_custom_prompt: bool,
    pub custom_prompt: String,
    pub image_file: Option<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FewShotSubmission {
    pub examples: Vec<Example>,
    pub tactile_data: String,
    pub text_description: String,
    pub image_file: Option<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaSubmission {
    pub mode: QaMode,
    pub question: String,
    pub modality_type: ModalityType,
    pub modality_data: String,
    pub tactile_data: String,
    pub text_data: String,
    pub image_file: Option<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    UnifiedAnalysis(MainSubmission),
    Analysis(AnalysisSubmission),
    FewShot(FewShotSubmission),
    Qa(QaSubmission),
    SampleQuestions,
    AvailableTemplates,
    ModelInfo,
    CustomTemplate(ValidatedTemplate),
}

impl Submission {
    pub fn operation(&self) -> Operation {
        match self {
            Self::UnifiedAnalysis(_) => Operation::UnifiedAnalysis,
            Self::Analysis(input) => match input.mode {
                AnalysisMode::TactileText => Operation::TactileText,
                AnalysisMode::VisionText => Operation::VisionText,
                AnalysisMode::Complete => Operation::MultimodalComplete,
            },
            Self::FewShot(_) => Operation::FewShotLearning,
            Self::Qa(input) => match input.mode {
                QaMode::Single => Operation::SingleModalityQa,
                QaMode::Dual => Operation::DualModalityQa,
                QaMode::Multi => Operation::MultimodalQa,
            },
            Self::SampleQuestions => Operation::SampleQuestions,
            Self::AvailableTemplates => Operation::AvailableTemplates,
            Self::ModelInfo => Operation::ModelInfo,
            Self::CustomTemplate(_) => Operation::CustomTemplate,
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn main_submission(form: &MainFormState) -> Result<Submission, ValidationError> {
    let rules = rules_for(form.prompt_type);
    let tactile_file = form.tactile_file.clone().filter(|_| rules.tactile);
    let visual_file = form.visual_file.clone().filter(|_| rules.visual);
    let has_text = !blank(&form.textual_input);

    if form.prompt_type == PromptType::TextOnly && !has_text {
        return Err(ValidationError::TextRequired);
    }
    if tactile_file.is_none() && visual_file.is_none() && !has_text {
        return Err(ValidationError::NoInput);
    }
    match required_channel(form.prompt_type) {
        Some(Channel::Visual) if visual_file.is_none() => {
            return Err(ValidationError::ImageRequired)
        }
        Some(Channel::Tactile) if tactile_file.is_none() => {
            return Err(ValidationError::TactileFileRequired)
        }
        _ => {}
    }

    Ok(Submission::UnifiedAnalysis(MainSubmission {
        prompt_type: form.prompt_type,
        prompt_text: form.prompt_text.clone(),
        textual_input: form.textual_input.clone(),
        add_contextual_info: form.add_contextual_info,
        tactile_file,
        visual_file,
    }))
}

pub fn analysis_submission(form: &AnalysisFormState) -> Result<Submission, ValidationError> {
    match form.mode {
        AnalysisMode::TactileText => {
            if blank(&form.tactile_data) || blank(&form.task_instruction) {
                return Err(ValidationError::FieldsMissing);
            }
        }
        AnalysisMode::VisionText => {
            if blank(&form.text_description)
                || blank(&form.task_instruction)
                || form.image_file.is_none()
            {
                return Err(ValidationError::ImageRequired);
            }
        }
        AnalysisMode::Complete => {
            if blank(&form.tactile_data)
                || blank(&form.text_description)
                || blank(&form.task_instruction)
                || form.image_file.is_none()
            {
                return Err(ValidationError::ImageRequired);
            }
        }
    }

    Ok(Submission::Analysis(AnalysisSubmission {
        mode: form.mode,
        tactile_data: form.tactile_data.clone(),
        text_description: form.text_description.clone(),
        task_instruction: form.task_instruction.clone(),
        use_custom_prompt: form.use_custom_prompt,
        custom_prompt: form.custom_prompt.clone(),
        image_file: match form.mode {
            AnalysisMode::TactileText => None,
            AnalysisMode::VisionText | AnalysisMode::Complete => form.image_file.clone(),
        },
    }))
}

pub fn few_shot_submission(form: &FewShotFormState) -> Result<Submission, ValidationError> {
    if !form.examples.has_content() {
        return Err(ValidationError::NoExampleContent);
    }
    if blank(&form.tactile_data) || blank(&form.text_description) {
        return Err(ValidationError::NewInputMissing);
    }

    Ok(Submission::FewShot(FewShotSubmission {
        examples: form.examples.with_content().cloned().collect(),
        tactile_data: form.tactile_data.clone(),
        text_description: form.text_description.clone(),
        image_file: form.image_file.clone(),
    }))
}

pub fn qa_submission(form: &QaFormState) -> Result<Submission, ValidationError> {
    match form.mode {
        QaMode::Single => {
            if blank(&form.question) || blank(&form.modality_data) {
                return Err(ValidationError::FieldsMissing);
            }
        }
        QaMode::Dual | QaMode::Multi => {
            if blank(&form.question) {
                return Err(ValidationError::QuestionMissing);
            }
            if blank(&form.tactile_data) && blank(&form.text_data) && form.image_file.is_none()
            {
                return Err(ValidationError::NoQaData);
            }
        }
    }

    Ok(Submission::Qa(QaSubmission {
        mode: form.mode,
        question: form.question.clone(),
        modality_type: form.modality_type,
        modality_data: form.modality_data.clone(),
        tactile_data: form.tactile_data.clone(),
        text_data: form.text_data.clone(),
        image_file: match form.mode {
            QaMode::Single => None,
            QaMode::Dual | QaMode::Multi => form.image_file.clone(),
        },
    }))
}

pub fn template_submission(draft: &TemplateDraft) -> Result<Submission, ValidationError> {
    validate_draft(draft).map(Submission::CustomTemplate)
}
