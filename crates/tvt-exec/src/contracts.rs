use serde_json::Value;
use tvt_core::state::FileRef;
use tvt_core::state::RequestId;
use tvt_core::submission::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Empty,
    Json,
    Multipart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSpec {
    pub operation: Operation,
    pub method: HttpMethod,
    pub path: &'static str,
    pub encoding: BodyEncoding,
}

pub struct EndpointRegistry;

const ENDPOINT_SPECS: [EndpointSpec; 12] = [
    EndpointSpec {
        operation: Operation::UnifiedAnalysis,
        method: HttpMethod::Post,
        path: "/api/multimodal/unified-analysis",
        encoding: BodyEncoding::Multipart,
    },
    EndpointSpec {
        operation: Operation::TactileText,
        method: HttpMethod::Post,
        path: "/api/multimodal/tactile-text",
        encoding: BodyEncoding::Json,
    },
    EndpointSpec {
        operation: Operation::VisionText,
        method: HttpMethod::Post,
        path: "/api/multimodal/vision-text",
        encoding: BodyEncoding::Multipart,
    },
    EndpointSpec {
        operation: Operation::MultimodalComplete,
        method: HttpMethod::Post,
        path: "/api/multimodal/multimodal-complete",
        encoding: BodyEncoding::Multipart,
    },
    EndpointSpec {
        operation: Operation::FewShotLearning,
        method: HttpMethod::Post,
        path: "/api/multimodal/few-shot-learning",
        encoding: BodyEncoding::Multipart,
    },
    EndpointSpec {
        operation: Operation::SingleModalityQa,
        method: HttpMethod::Post,
        path: "/api/qa/single-modality",
        encoding: BodyEncoding::Json,
    },
    EndpointSpec {
        operation: Operation::DualModalityQa,
        method: HttpMethod::Post,
        path: "/api/qa/dual-modality",
        encoding: BodyEncoding::Multipart,
    },
    EndpointSpec {
        operation: Operation::MultimodalQa,
        method: HttpMethod::Post,
        path: "/api/qa/multimodal-qa",
        encoding: BodyEncoding::Multipart,
    },
    EndpointSpec {
        operation: Operation::SampleQuestions,
        method: HttpMethod::Get,
        path: "/api/qa/sample-questions",
        encoding: BodyEncoding::Empty,
    },
    EndpointSpec {
        operation: Operation::AvailableTemplates,
        method: HttpMethod::Get,
        path: "/api/multimodal/available-templates",
        encoding: BodyEncoding::Empty,
    },
    EndpointSpec {
        operation: Operation::ModelInfo,
        method: HttpMethod::Get,
        path: "/api/multimodal/model-info",
        encoding: BodyEncoding::Empty,
    },
    EndpointSpec {
        operation: Operation::CustomTemplate,
        method: HttpMethod::Post,
        path: "/api/multimodal/custom-template",
        encoding: BodyEncoding::Multipart,
    },
];

impl EndpointRegistry {
    pub fn list() -> &'static [EndpointSpec] {
        &ENDPOINT_SPECS
    }

    pub fn get(operation: Operation) -> &'static EndpointSpec {
        match operation {
            Operation::UnifiedAnalysis => &ENDPOINT_SPECS[0],
            Operation::TactileText => &ENDPOINT_SPECS[1],
            Operation::VisionText => &ENDPOINT_SPECS[2],
            Operation::MultimodalComplete => &ENDPOINT_SPECS[3],
            Operation::FewShotLearning => &ENDPOINT_SPECS[4],
            Operation::SingleModalityQa => &ENDPOINT_SPECS[5],
            Operation::DualModalityQa => &ENDPOINT_SPECS[6],
            Operation::MultimodalQa => &ENDPOINT_SPECS[7],
            Operation::SampleQuestions => &ENDPOINT_SPECS[8],
            Operation::AvailableTemplates => &ENDPOINT_SPECS[9],
            Operation::ModelInfo => &ENDPOINT_SPECS[10],
            Operation::CustomTemplate => &ENDPOINT_SPECS[11],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: &'static str, value: String },
    File { name: &'static str, file: FileRef },
}

impl FormPart {
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Self::Text {
            name,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => *name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WireBody {
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// A request ready for the transport: endpoint plus encoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub request_id: RequestId,
    pub operation: Operation,
    pub body: WireBody,
}

impl WireRequest {
    pub fn endpoint(&self) -> &'static EndpointSpec {
        EndpointRegistry::get(self.operation)
    }

    pub fn parts(&self) -> &[FormPart] {
        match &self.body {
            WireBody::Multipart(parts) => parts.as_slice(),
            WireBody::Empty | WireBody::Json(_) => &[],
        }
    }

    /// Text field by name, from either a multipart or a JSON body.
    pub fn text_field(&self, name: &str) -> Option<String> {
        match &self.body {
            WireBody::Multipart(parts) => parts.iter().find_map(|part| match part {
                FormPart::Text { name: key, value } if *key == name => Some(value.clone()),
                _ => None,
            }),
            WireBody::Json(Value::Object(map)) => map.get(name).and_then(|value| match value {
                Value::String(text) => Some(text.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }),
            WireBody::Json(_) | WireBody::Empty => None,
        }
    }

    pub fn file(&self, name: &str) -> Option<&FileRef> {
        self.parts().iter().find_map(|part| match part {
            FormPart::File { name: key, file } if *key == name => Some(file),
            _ => None,
        })
    }

    pub fn has_file_part(&self) -> bool {
        self.parts()
            .iter()
            .any(|part| matches!(part, FormPart::File { .. }))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn registry_lookup_matches_operation() {
        for spec in EndpointRegistry::list() {
            assert_eq!(EndpointRegistry::get(spec.operation), spec);
        }
    }

    #[test]
    fn read_only_endpoints_use_get_without_body() {
        let gets: Vec<&'static str> = EndpointRegistry::list()
            .iter()
            .filter(|spec| spec.method == HttpMethod::Get)
            .map(|spec| spec.path)
            .collect();
        assert_eq!(
            gets,
            vec![
                "/api/qa/sample-questions",
                "/api/multimodal/available-templates",
                "/api/multimodal/model-info",
            ]
        );
        assert!(EndpointRegistry::list()
            .iter()
            .filter(|spec| spec.method == HttpMethod::Get)
            .all(|spec| spec.encoding == BodyEncoding::Empty));
    }
}
