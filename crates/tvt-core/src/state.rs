use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::config::Config;
use crate::few_shot::ExampleSet;
use crate::prompt::EMPTY_PROMPT_PLACEHOLDER;
use crate::submission::Operation;
use crate::templates::TemplateDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Tactile,
    Visual,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptType {
    TactileText,
    VisionText,
    #[default]
    CombinedAll,
    TextOnly,
}

impl PromptType {
    pub const ALL: [PromptType; 4] = [
        Self::TactileText,
        Self::VisionText,
        Self::CombinedAll,
        Self::TextOnly,
    ];

    /// Tag sent as `prompt_type` on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Self::TactileText => "Tactile-Text",
            Self::VisionText => "Vision-Text",
            Self::CombinedAll => "Tactile-Vision-Text Combined",
            Self::TextOnly => "Text Only",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::TactileText => "tactile-text",
            Self::VisionText => "vision-text",
            Self::CombinedAll => "combined",
            Self::TextOnly => "text-only",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL.into_iter().find(|mode| {
            mode.slug().eq_ignore_ascii_case(input) || mode.label().eq_ignore_ascii_case(input)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    #[default]
    Balanced,
    Clarity,
    Structure,
    Specificity,
}

impl OptimizationStrategy {
    pub const ALL: [OptimizationStrategy; 4] = [
        Self::Balanced,
        Self::Clarity,
        Self::Structure,
        Self::Specificity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Balanced => "Balanced Optimization",
            Self::Clarity => "Clarity Focus",
            Self::Structure => "Structure Focus",
            Self::Specificity => "Specificity Focus",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Clarity => "clarity",
            Self::Structure => "structure",
            Self::Specificity => "specificity",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL.into_iter().find(|strategy| {
            strategy.slug().eq_ignore_ascii_case(input)
                || strategy.label().eq_ignore_ascii_case(input)
        })
    }
}

/// An uploaded file held by a form until submission.
#[derive(Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            byte_size: content.len() as u64,
            mime_type: mime_type.into(),
            content,
        }
    }
}

impl fmt::Debug for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRef")
            .field("name", &self.name)
            .field("byte_size", &self.byte_size)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptHistoryEntry {
    pub version: Arc<str>,
    pub prompt_snapshot: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PromptHistory {
    entries: Vec<PromptHistoryEntry>,
}

impl PromptHistory {
    pub fn push(&mut self, entry: PromptHistoryEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<PromptHistoryEntry> {
        self.entries.pop()
    }

    pub fn last(&self) -> Option<&PromptHistoryEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptHistoryEntry> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormModule {
    Main,
    Analysis,
    FewShot,
    Qa,
    Templates,
}

impl FormModule {
    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Analysis => "analysis",
            Self::FewShot => "few-shot",
            Self::Qa => "qa",
            Self::Templates => "templates",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl NoticeLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub seq: u64,
    pub level: NoticeLevel,
    pub module: FormModule,
    pub message: String,
}

/// Bounded toast stream. Sequence numbers keep increasing across evictions so
/// a presentation layer can resume from the last one it rendered.
#[derive(Debug, Clone)]
pub struct NoticeBuffer {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<Notice>,
}

impl NoticeBuffer {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            next_seq: 1,
            buf: VecDeque::with_capacity(cap),
        }
    }

    pub fn push(&mut self, level: NoticeLevel, module: FormModule, message: impl Into<String>) {
        let notice = Notice {
            seq: self.next_seq,
            level,
            module,
            message: message.into(),
        };
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(notice);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.next_seq = 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.buf.iter()
    }

    pub fn since(&self, seq: u64) -> impl Iterator<Item = &Notice> {
        self.buf.iter().filter(move |notice| notice.seq > seq)
    }

    pub fn last(&self) -> Option<&Notice> {
        self.buf.back()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Application,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Application => "application",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: Arc<str>,
    pub request_id: RequestId,
}

impl RequestError {
    pub fn new(kind: ErrorKind, message: impl Into<Arc<str>>, request_id: RequestId) -> Self {
        Self {
            kind,
            message: message.into(),
            request_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl RequestPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Lifecycle of the request owned by one form module. Only a settlement that
/// carries `pending` may move the slot out of `Submitting`.
#[derive(Debug, Clone)]
pub struct RequestSlot {
    pub phase: RequestPhase,
    pub pending: Option<RequestId>,
    pub operation: Option<Operation>,
    pub last_error: Option<RequestError>,
}

impl Default for RequestSlot {
    fn default() -> Self {
        Self {
            phase: RequestPhase::Idle,
            pending: None,
            operation: None,
            last_error: None,
        }
    }
}

impl RequestSlot {
    pub fn is_loading(&self) -> bool {
        self.phase == RequestPhase::Submitting
    }

    pub fn begin(&mut self, request_id: RequestId, operation: Operation) {
        self.phase = RequestPhase::Submitting;
        self.pending = Some(request_id);
        self.operation = Some(operation);
    }

    pub fn succeed(&mut self) {
        self.phase = RequestPhase::Succeeded;
        self.pending = None;
        self.last_error = None;
    }

    pub fn fail(&mut self, error: RequestError) {
        self.phase = RequestPhase::Failed;
        self.pending = None;
        self.last_error = Some(error);
    }

    pub fn reset(&mut self) {
        if !self.is_loading() {
            *self = Self::default();
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestSlots {
    pub main: RequestSlot,
    pub analysis: RequestSlot,
    pub few_shot: RequestSlot,
    pub qa: RequestSlot,
    pub templates: RequestSlot,
    pub next_request_id: u64,
}

impl Default for RequestSlots {
    fn default() -> Self {
        Self {
            main: RequestSlot::default(),
            analysis: RequestSlot::default(),
            few_shot: RequestSlot::default(),
            qa: RequestSlot::default(),
            templates: RequestSlot::default(),
            next_request_id: 1,
        }
    }
}

impl RequestSlots {
    pub fn slot(&self, module: FormModule) -> &RequestSlot {
        match module {
            FormModule::Main => &self.main,
            FormModule::Analysis => &self.analysis,
            FormModule::FewShot => &self.few_shot,
            FormModule::Qa => &self.qa,
            FormModule::Templates => &self.templates,
        }
    }

    pub fn slot_mut(&mut self, module: FormModule) -> &mut RequestSlot {
        match module {
            FormModule::Main => &mut self.main,
            FormModule::Analysis => &mut self.analysis,
            FormModule::FewShot => &mut self.few_shot,
            FormModule::Qa => &mut self.qa,
            FormModule::Templates => &mut self.templates,
        }
    }

    pub fn allocate(&mut self) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    pub fn any_loading(&self) -> bool {
        [
            &self.main,
            &self.analysis,
            &self.few_shot,
            &self.qa,
            &self.templates,
        ]
        .into_iter()
        .any(RequestSlot::is_loading)
    }
}

/// Response envelope shared by every endpoint of the analysis API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modalities_used: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const UNKNOWN_ERROR: &str = "Unknown error";

impl RequestOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().or(self.answer.as_deref())
    }

    pub fn error_message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(UNKNOWN_ERROR)
    }

    pub fn modalities_label(&self) -> Option<String> {
        match self.modalities_used.as_ref()? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn extra_field<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<Result<T, serde_json::Error>> {
        self.extra
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct MainFormState {
    pub tactile_file: Option<FileRef>,
    pub visual_file: Option<FileRef>,
    pub textual_input: String,
    pub prompt_type: PromptType,
    pub prompt_text: String,
    pub add_contextual_info: bool,
    pub auto_optimize: bool,
    pub optimization_strategy: OptimizationStrategy,
    pub optimization_version: Arc<str>,
    pub is_optimized: bool,
    pub is_optimizing: bool,
    /// Bumped on every input change that invalidates the displayed prompt.
    pub generation: u64,
    /// Generation of the optimization pass whose result is still wanted.
    pub in_flight: Option<u64>,
    pub history: PromptHistory,
    pub response: Option<RequestOutcome>,
}

impl Default for MainFormState {
    fn default() -> Self {
        Self {
            tactile_file: None,
            visual_file: None,
            textual_input: String::new(),
            prompt_type: PromptType::default(),
            prompt_text: EMPTY_PROMPT_PLACEHOLDER.to_string(),
            add_contextual_info: false,
            auto_optimize: true,
            optimization_strategy: OptimizationStrategy::default(),
            optimization_version: "v2".into(),
            is_optimized: false,
            is_optimizing: false,
            generation: 0,
            in_flight: None,
            history: PromptHistory::default(),
            response: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    #[default]
    TactileText,
    VisionText,
    Complete,
}

impl AnalysisMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::TactileText => "Tactile + Text",
            Self::VisionText => "Vision + Text",
            Self::Complete => "All Modalities",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisField {
    TactileData,
    TextDescription,
    TaskInstruction,
    CustomPrompt,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisFormState {
    pub mode: AnalysisMode,
    pub tactile_data: String,
    pub text_description: String,
    pub task_instruction: String,
    pub use_custom_prompt: bool,
    pub custom_prompt: String,
    pub image_file: Option<FileRef>,
    pub result: Option<RequestOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FewShotInputField {
    TactileData,
    TextDescription,
}

#[derive(Debug, Clone, Default)]
pub struct FewShotFormState {
    pub examples: ExampleSet,
    pub tactile_data: String,
    pub text_description: String,
    pub image_file: Option<FileRef>,
    pub result: Option<RequestOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QaMode {
    #[default]
    Single,
    Dual,
    Multi,
}

impl QaMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "Single Modality",
            Self::Dual => "Dual Modality",
            Self::Multi => "All Modalities",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalityType {
    #[default]
    Tactile,
    Vision,
    Text,
}

impl ModalityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tactile => "tactile",
            Self::Vision => "vision",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaField {
    Question,
    ModalityData,
    TactileData,
    TextData,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SingleModalityQuestions {
    #[serde(default)]
    pub tactile: Vec<String>,
    #[serde(default)]
    pub vision: Vec<String>,
    #[serde(default)]
    pub text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleQuestions {
    #[serde(default)]
    pub single_modality: SingleModalityQuestions,
    #[serde(default)]
    pub dual_modality: Vec<String>,
    #[serde(default)]
    pub multimodal: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QaFormState {
    pub mode: QaMode,
    pub question: String,
    pub modality_type: ModalityType,
    pub modality_data: String,
    pub tactile_data: String,
    pub text_data: String,
    pub image_file: Option<FileRef>,
    pub result: Option<RequestOutcome>,
    pub sample_questions: Option<SampleQuestions>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplatesState {
    pub available: Vec<String>,
    pub model_info: Option<Value>,
    pub draft: TemplateDraft,
}

#[derive(Debug, Clone)]
pub struct OptimizerSettings {
    pub delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub main: MainFormState,
    pub analysis: AnalysisFormState,
    pub few_shot: FewShotFormState,
    pub qa: QaFormState,
    pub templates: TemplatesState,
    pub requests: RequestSlots,
    pub notices: NoticeBuffer,
    pub optimizer: OptimizerSettings,
}

impl ConsoleState {
    pub fn new(config: &Config) -> Self {
        let main = MainFormState {
            auto_optimize: config.optimizer.auto_optimize,
            optimization_strategy: config.optimizer.strategy,
            optimization_version: config.optimizer.version.as_str().into(),
            ..MainFormState::default()
        };
        Self {
            main,
            analysis: AnalysisFormState::default(),
            few_shot: FewShotFormState::default(),
            qa: QaFormState::default(),
            templates: TemplatesState::default(),
            requests: RequestSlots::default(),
            notices: NoticeBuffer::new(config.notices.capacity),
            optimizer: OptimizerSettings {
                delay_ms: config.optimizer.delay_ms,
            },
        }
    }

    pub fn is_loading(&self, module: FormModule) -> bool {
        self.requests.slot(module).is_loading()
    }

    pub fn any_loading(&self) -> bool {
        self.requests.any_loading()
    }

    pub fn notify(&mut self, level: NoticeLevel, module: FormModule, message: impl Into<String>) {
        self.notices.push(level, module, message);
    }
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
