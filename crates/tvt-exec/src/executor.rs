use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::multipart::Part;
use reqwest::Client;
use serde_json::json;
use serde_json::Value;
use thiserror::Error;
use tvt_core::actions::TransportFailure;
use tvt_core::config::ApiConfig;
use tvt_core::state::RequestOutcome;
use tvt_core::submission::Operation;

use crate::contracts::FormPart;
use crate::contracts::HttpMethod;
use crate::contracts::WireBody;
use crate::contracts::WireRequest;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Configuration(String),
    #[error("{0}")]
    Transport(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response was not a valid envelope: {0}")]
    Decode(String),
    #[error("invalid form part '{name}': {message}")]
    InvalidPart { name: &'static str, message: String },
}

impl From<ClientError> for TransportFailure {
    fn from(error: ClientError) -> Self {
        TransportFailure::new(error.to_string())
    }
}

/// Seam between the runtime and whatever answers a request.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, request: WireRequest) -> Result<RequestOutcome, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpRequestExecutor {
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

impl HttpRequestExecutor {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let timeout_secs = config.timeout_secs.max(1);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| ClientError::Configuration(error.to_string()))?;
        Ok(Self {
            base_url: config.base_url.clone(),
            timeout_secs,
            client,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Transport(format!("request timed out after {}s", self.timeout_secs))
        } else {
            ClientError::Transport(error.to_string())
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }
}

fn multipart_form(parts: Vec<FormPart>) -> Result<Form, ClientError> {
    parts
        .into_iter()
        .try_fold(Form::new(), |form, part| match part {
            FormPart::Text { name, value } => Ok(form.text(name, value)),
            FormPart::File { name, file } => {
                let part = Part::bytes(file.content)
                    .file_name(file.name)
                    .mime_str(&file.mime_type)
                    .map_err(|error| ClientError::InvalidPart {
                        name,
                        message: error.to_string(),
                    })?;
                Ok(form.part(name, part))
            }
        })
}

/// Best human-readable message in an error body: `error`, then `detail`.
pub fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    ["error", "detail"].into_iter().find_map(|key| match object.get(key)? {
        Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    })
}

#[async_trait]
impl RequestExecutor for HttpRequestExecutor {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn execute(&self, request: WireRequest) -> Result<RequestOutcome, ClientError> {
        let spec = request.endpoint();
        let url = self.endpoint(spec.path);
        log::debug!(
            "{} {} {} ({})",
            request.request_id,
            spec.method.as_str(),
            url,
            request.operation.label()
        );

        let builder = match spec.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        let builder = match request.body {
            WireBody::Empty => builder,
            WireBody::Json(value) => builder.json(&value),
            WireBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| self.transport_error(error))?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message_from_body(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        serde_json::from_str(&body).map_err(|error| ClientError::Decode(error.to_string()))
    }
}

/// Answers every request locally with canned, input-derived outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedRequestExecutor;

fn simulated_model_info() -> Value {
    json!({
        "name": "simulated-tvl",
        "provider": "offline",
        "modalities": ["tactile", "vision", "text"],
    })
}

impl SimulatedRequestExecutor {
    pub fn respond(&self, request: &WireRequest) -> RequestOutcome {
        let field = |name: &str| request.text_field(name).unwrap_or_default();
        let mut outcome = RequestOutcome {
            success: true,
            ..RequestOutcome::default()
        };

        match request.operation {
            Operation::UnifiedAnalysis => {
                let mut modalities = Vec::new();
                if request.file("tactile_file").is_some() {
                    modalities.push("tactile");
                }
                if request.file("image").is_some() {
                    modalities.push("vision");
                }
                if request.text_field("text_context").is_some() {
                    modalities.push("text");
                }
                let prompt = field("prompt");
                outcome.response = Some(format!(
                    "Simulated {} analysis of {} input(s).",
                    field("prompt_type"),
                    modalities.len()
                ));
                outcome.prompt_used = Some(prompt);
                outcome.modalities_used = Some(json!(modalities));
                outcome.model_info = Some(simulated_model_info());
            }
            Operation::TactileText | Operation::VisionText | Operation::MultimodalComplete => {
                outcome.response = Some(format!(
                    "Simulated {}: {}",
                    request.operation.label(),
                    field("task_instruction")
                ));
                outcome.model_info = Some(simulated_model_info());
            }
            Operation::FewShotLearning => {
                let examples = serde_json::from_str::<Vec<Value>>(&field("examples_json"))
                    .map(|examples| examples.len())
                    .unwrap_or(0);
                outcome.response = Some(format!(
                    "Simulated prediction for '{}' from {examples} example(s).",
                    field("text_description")
                ));
            }
            Operation::SingleModalityQa | Operation::DualModalityQa | Operation::MultimodalQa => {
                let question = field("question");
                outcome.answer = Some(format!("Simulated answer to: {question}"));
                outcome.question = Some(question);
            }
            Operation::SampleQuestions => {
                outcome.extra.insert(
                    "sample_questions".to_string(),
                    json!({
                        "single_modality": {
                            "tactile": ["How rough is this surface?"],
                            "vision": ["What color is the object?"],
                            "text": ["What material is described?"],
                        },
                        "dual_modality": ["Does the texture match the appearance?"],
                        "multimodal": ["What is this object most likely used for?"],
                    }),
                );
            }
            Operation::AvailableTemplates => {
                outcome.extra.insert(
                    "templates".to_string(),
                    json!(["basic_analysis", "material_identification", "quality_inspection"]),
                );
            }
            Operation::ModelInfo => {
                outcome.model_info = Some(simulated_model_info());
            }
            Operation::CustomTemplate => {
                outcome.response = Some(format!("Template '{}' stored", field("name")));
            }
        }
        outcome
    }
}

#[async_trait]
impl RequestExecutor for SimulatedRequestExecutor {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn execute(&self, request: WireRequest) -> Result<RequestOutcome, ClientError> {
        Ok(self.respond(&request))
    }
}
