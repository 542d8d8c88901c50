//! Turns a validated submission into the wire shape its endpoint expects.

use serde_json::json;
use serde_json::Value;
use tvt_core::few_shot::Example;
use tvt_core::prompt::resolve_request_prompt;
use tvt_core::state::AnalysisMode;
use tvt_core::state::FileRef;
use tvt_core::state::PromptType;
use tvt_core::state::QaMode;
use tvt_core::state::RequestId;
use tvt_core::submission::AnalysisSubmission;
use tvt_core::submission::FewShotSubmission;
use tvt_core::submission::MainSubmission;
use tvt_core::submission::QaSubmission;
use tvt_core::submission::Submission;
use tvt_core::templates::ValidatedTemplate;

use crate::contracts::FormPart;
use crate::contracts::WireBody;
use crate::contracts::WireRequest;

pub fn build_request(request_id: RequestId, submission: Submission) -> WireRequest {
    let operation = submission.operation();
    let body = match submission {
        Submission::UnifiedAnalysis(input) => unified_body(input),
        Submission::Analysis(input) => analysis_body(input),
        Submission::FewShot(input) => few_shot_body(input),
        Submission::Qa(input) => qa_body(input),
        Submission::CustomTemplate(template) => template_body(template),
        Submission::SampleQuestions | Submission::AvailableTemplates | Submission::ModelInfo => {
            WireBody::Empty
        }
    };
    WireRequest {
        request_id,
        operation,
        body,
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn push_file(parts: &mut Vec<FormPart>, name: &'static str, file: Option<FileRef>) {
    if let Some(file) = file {
        parts.push(FormPart::File { name, file });
    }
}

fn push_text_if_present(parts: &mut Vec<FormPart>, name: &'static str, value: String) {
    if !value.trim().is_empty() {
        parts.push(FormPart::Text { name, value });
    }
}

fn unified_body(input: MainSubmission) -> WireBody {
    let MainSubmission {
        prompt_type,
        prompt_text,
        textual_input,
        add_contextual_info,
        tactile_file,
        visual_file,
    } = input;
    let prompt = resolve_request_prompt(prompt_type, &prompt_text, &textual_input);
    let mut parts = Vec::new();

    if prompt_type != PromptType::TextOnly {
        push_file(&mut parts, "tactile_file", tactile_file);
        push_file(&mut parts, "image", visual_file);
    }
    push_text_if_present(&mut parts, "text_context", textual_input);
    parts.push(FormPart::text("prompt", prompt));
    parts.push(FormPart::text("prompt_type", prompt_type.label()));
    parts.push(FormPart::text(
        "add_contextual_info",
        bool_field(add_contextual_info),
    ));
    WireBody::Multipart(parts)
}

fn analysis_body(input: AnalysisSubmission) -> WireBody {
    let AnalysisSubmission {
        mode,
        tactile_data,
        text_description,
        task_instruction,
        use_custom_prompt,
        custom_prompt,
        image_file,
    } = input;

    if mode == AnalysisMode::TactileText {
        let custom_prompt = if custom_prompt.is_empty() {
            Value::Null
        } else {
            Value::String(custom_prompt)
        };
        return WireBody::Json(json!({
            "tactile_data": tactile_data,
            "task_instruction": task_instruction,
            "use_custom_prompt": use_custom_prompt,
            "custom_prompt": custom_prompt,
        }));
    }

    let mut parts = Vec::new();
    if mode == AnalysisMode::Complete {
        parts.push(FormPart::text("tactile_data", tactile_data));
    }
    parts.push(FormPart::text("text_description", text_description));
    parts.push(FormPart::text("task_instruction", task_instruction));
    push_file(&mut parts, "image", image_file);
    parts.push(FormPart::text(
        "use_custom_prompt",
        bool_field(use_custom_prompt),
    ));
    push_text_if_present(&mut parts, "custom_prompt", custom_prompt);
    WireBody::Multipart(parts)
}

fn examples_json(examples: &[Example]) -> String {
    Value::Array(
        examples
            .iter()
            .map(|example| {
                json!({
                    "tactile": example.tactile,
                    "text": example.text,
                    "output": example.output,
                })
            })
            .collect(),
    )
    .to_string()
}

fn few_shot_body(input: FewShotSubmission) -> WireBody {
    let mut parts = vec![
        FormPart::text("examples_json", examples_json(&input.examples)),
        FormPart::text("tactile_data", input.tactile_data),
        FormPart::text("text_description", input.text_description),
    ];
    push_file(&mut parts, "image", input.image_file);
    WireBody::Multipart(parts)
}

fn qa_body(input: QaSubmission) -> WireBody {
    let QaSubmission {
        mode,
        question,
        modality_type,
        modality_data,
        tactile_data,
        text_data,
        image_file,
    } = input;

    match mode {
        QaMode::Single => WireBody::Json(json!({
            "question": question,
            "modality_type": modality_type.as_str(),
            "modality_data": modality_data,
        })),
        QaMode::Dual => {
            let mut parts = vec![FormPart::text("question", question)];
            push_text_if_present(&mut parts, "tactile_data", tactile_data);
            push_text_if_present(&mut parts, "text_data", text_data);
            push_file(&mut parts, "image", image_file);
            WireBody::Multipart(parts)
        }
        QaMode::Multi => {
            let mut parts = vec![
                FormPart::text("question", question),
                FormPart::text("tactile_data", tactile_data),
                FormPart::text("text_data", text_data),
            ];
            push_file(&mut parts, "image", image_file);
            WireBody::Multipart(parts)
        }
    }
}

fn template_body(template: ValidatedTemplate) -> WireBody {
    let required_inputs = template.required_inputs_json();
    WireBody::Multipart(vec![
        FormPart::text("name", template.name),
        FormPart::text("template", template.template),
        FormPart::text("required_inputs", required_inputs),
    ])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tvt_core::state::ModalityType;
    use tvt_core::submission::Operation;

    use super::*;
    use crate::contracts::BodyEncoding;

    fn file(name: &str) -> FileRef {
        FileRef::new(name, "image/png", vec![7, 7, 7])
    }

    fn main_input(prompt_type: PromptType) -> MainSubmission {
        MainSubmission {
            prompt_type,
            prompt_text: String::new(),
            textual_input: String::new(),
            add_contextual_info: false,
            tactile_file: None,
            visual_file: None,
        }
    }

    fn part_names(request: &WireRequest) -> Vec<&'static str> {
        request.parts().iter().map(FormPart::name).collect()
    }

    #[test]
    fn text_only_never_attaches_files() {
        let request = build_request(
            RequestId(1),
            Submission::UnifiedAnalysis(MainSubmission {
                textual_input: "sandpaper".to_string(),
                tactile_file: Some(file("grip.csv")),
                visual_file: Some(file("cloth.png")),
                ..main_input(PromptType::TextOnly)
            }),
        );

        assert!(!request.has_file_part());
        assert_eq!(
            request.text_field("prompt").as_deref(),
            Some("Please analyze the following text: sandpaper")
        );
        assert_eq!(
            request.text_field("prompt_type").as_deref(),
            Some("Text Only")
        );
        assert_eq!(
            part_names(&request),
            vec!["text_context", "prompt", "prompt_type", "add_contextual_info"]
        );
    }

    #[test]
    fn combined_mode_sends_files_and_context_flag() {
        let request = build_request(
            RequestId(2),
            Submission::UnifiedAnalysis(MainSubmission {
                prompt_text: "Describe the object".to_string(),
                add_contextual_info: true,
                tactile_file: Some(file("grip.csv")),
                visual_file: Some(file("cloth.png")),
                ..main_input(PromptType::CombinedAll)
            }),
        );

        assert_eq!(request.endpoint().encoding, BodyEncoding::Multipart);
        assert_eq!(
            part_names(&request),
            vec![
                "tactile_file",
                "image",
                "prompt",
                "prompt_type",
                "add_contextual_info"
            ]
        );
        assert_eq!(request.file("image").map(|f| f.name.as_str()), Some("cloth.png"));
        assert_eq!(
            request.text_field("prompt").as_deref(),
            Some("Describe the object")
        );
        assert_eq!(
            request.text_field("add_contextual_info").as_deref(),
            Some("true")
        );
    }

    #[test]
    fn empty_prompt_without_text_uses_generic_fallback() {
        let request = build_request(
            RequestId(3),
            Submission::UnifiedAnalysis(MainSubmission {
                visual_file: Some(file("cloth.png")),
                ..main_input(PromptType::VisionText)
            }),
        );
        assert_eq!(
            request.text_field("prompt").as_deref(),
            Some("Please analyze the provided data")
        );
    }

    #[test]
    fn tactile_text_is_json_with_null_custom_prompt() {
        let request = build_request(
            RequestId(4),
            Submission::Analysis(AnalysisSubmission {
                mode: AnalysisMode::TactileText,
                tactile_data: "0.3 N".to_string(),
                text_description: String::new(),
                task_instruction: "Identify".to_string(),
                use_custom_prompt: false,
                custom_prompt: String::new(),
                image_file: None,
            }),
        );

        assert_eq!(request.operation, Operation::TactileText);
        assert_eq!(
            request.body,
            WireBody::Json(json!({
                "tactile_data": "0.3 N",
                "task_instruction": "Identify",
                "use_custom_prompt": false,
                "custom_prompt": null,
            }))
        );
    }

    #[test]
    fn complete_analysis_includes_custom_prompt_only_when_set() {
        let input = AnalysisSubmission {
            mode: AnalysisMode::Complete,
            tactile_data: "soft".to_string(),
            text_description: "blue".to_string(),
            task_instruction: "Identify".to_string(),
            use_custom_prompt: true,
            custom_prompt: "Be brief".to_string(),
            image_file: Some(file("cloth.png")),
        };
        let with_prompt = build_request(RequestId(5), Submission::Analysis(input.clone()));
        assert_eq!(
            part_names(&with_prompt),
            vec![
                "tactile_data",
                "text_description",
                "task_instruction",
                "image",
                "use_custom_prompt",
                "custom_prompt"
            ]
        );

        let without_prompt = build_request(
            RequestId(6),
            Submission::Analysis(AnalysisSubmission {
                custom_prompt: String::new(),
                ..input
            }),
        );
        assert_eq!(without_prompt.text_field("custom_prompt"), None);
    }

    #[test]
    fn few_shot_examples_are_serialised_without_ids() {
        let request = build_request(
            RequestId(7),
            Submission::FewShot(FewShotSubmission {
                examples: vec![Example {
                    id: 9,
                    tactile: "smooth".to_string(),
                    text: "plate".to_string(),
                    output: "steel".to_string(),
                }],
                tactile_data: "rough".to_string(),
                text_description: "sheet".to_string(),
                image_file: None,
            }),
        );

        let examples: Value =
            serde_json::from_str(&request.text_field("examples_json").expect("examples"))
                .expect("json");
        assert_eq!(
            examples,
            json!([{"tactile": "smooth", "text": "plate", "output": "steel"}])
        );
    }

    #[test]
    fn qa_modes_pick_their_encoding() {
        let base = QaSubmission {
            mode: QaMode::Single,
            question: "What is it?".to_string(),
            modality_type: ModalityType::Vision,
            modality_data: "red, round".to_string(),
            tactile_data: String::new(),
            text_data: "a toy".to_string(),
            image_file: None,
        };

        let single = build_request(RequestId(8), Submission::Qa(base.clone()));
        assert_eq!(single.text_field("modality_type").as_deref(), Some("vision"));

        let dual = build_request(
            RequestId(9),
            Submission::Qa(QaSubmission {
                mode: QaMode::Dual,
                ..base.clone()
            }),
        );
        assert_eq!(part_names(&dual), vec!["question", "text_data"]);

        let multi = build_request(
            RequestId(10),
            Submission::Qa(QaSubmission {
                mode: QaMode::Multi,
                ..base
            }),
        );
        assert_eq!(
            part_names(&multi),
            vec!["question", "tactile_data", "text_data"]
        );
    }

    #[test]
    fn read_only_operations_have_empty_bodies() {
        for submission in [
            Submission::SampleQuestions,
            Submission::AvailableTemplates,
            Submission::ModelInfo,
        ] {
            assert_eq!(build_request(RequestId(11), submission).body, WireBody::Empty);
        }
    }
}
