use super::*;
use crate::state::QaField;
use crate::state::QaMode;
use crate::templates::TemplateDraft;
use crate::templates::TemplateField;
use pretty_assertions::assert_eq;
use serde_json::json;

fn outcome_from(value: serde_json::Value) -> RequestOutcome {
    serde_json::from_value(value).expect("outcome")
}

#[test]
fn sample_questions_are_typed_and_usable() {
    let mut state = state();
    let job = request_job(&user(&mut state, UserAction::LoadSampleQuestions));
    assert_eq!(job.submission, Submission::SampleQuestions);
    assert_eq!(job.module, FormModule::Qa);

    settle(
        &mut state,
        &job,
        Ok(outcome_from(json!({
            "success": true,
            "sample_questions": {
                "single_modality": {"tactile": ["How rough is it?"], "vision": [], "text": []},
                "dual_modality": ["Does it look as it feels?"],
                "multimodal": []
            }
        }))),
    );

    let questions = state.qa.sample_questions.clone().expect("questions");
    assert_eq!(questions.single_modality.tactile, vec!["How rough is it?"]);
    assert_eq!(last_message(&state), "Sample questions loaded!");

    user(
        &mut state,
        UserAction::UseSampleQuestion(questions.dual_modality[0].clone()),
    );
    assert_eq!(state.qa.question, "Does it look as it feels?");
}

#[test]
fn malformed_sample_questions_fail_the_request() {
    let mut state = state();
    let job = request_job(&user(&mut state, UserAction::LoadSampleQuestions));

    settle(&mut state, &job, Ok(outcome_from(json!({"success": true}))));

    assert_eq!(state.requests.qa.phase, RequestPhase::Failed);
    assert!(state.qa.sample_questions.is_none());
    assert_eq!(
        last_message(&state),
        "Failed to load sample questions: response did not include sample questions"
    );
}

#[test]
fn dual_question_needs_some_data() {
    let mut state = state();
    user(&mut state, UserAction::SetQaMode(QaMode::Dual));
    user(
        &mut state,
        UserAction::SetQaField {
            field: QaField::Question,
            value: "What is it?".to_string(),
        },
    );

    let effects = user(&mut state, UserAction::SubmitQa);
    assert!(!sends_request(&effects));
    assert_eq!(
        last_message(&state),
        "Please provide at least one type of data"
    );

    user(
        &mut state,
        UserAction::SetQaField {
            field: QaField::TextData,
            value: "a red ball".to_string(),
        },
    );
    let job = request_job(&user(&mut state, UserAction::SubmitQa));
    settle(
        &mut state,
        &job,
        Ok(outcome_from(json!({"success": true, "answer": "a toy"}))),
    );
    assert_eq!(last_message(&state), "Question answered successfully!");
    assert_eq!(
        state.qa.result.as_ref().and_then(RequestOutcome::text),
        Some("a toy")
    );
}

#[test]
fn template_list_and_model_info_share_one_slot() {
    let mut state = state();
    let list = request_job(&user(&mut state, UserAction::LoadTemplates));

    let refused = user(&mut state, UserAction::LoadModelInfo);
    assert!(!sends_request(&refused));

    settle(
        &mut state,
        &list,
        Ok(outcome_from(
            json!({"success": true, "templates": ["basic", "detailed"]}),
        )),
    );
    assert_eq!(state.templates.available, vec!["basic", "detailed"]);
    assert_eq!(last_message(&state), "Loaded 2 templates");

    let info = request_job(&user(&mut state, UserAction::LoadModelInfo));
    settle(
        &mut state,
        &info,
        Ok(outcome_from(
            json!({"success": true, "model_info": {"name": "tvl"}}),
        )),
    );
    assert_eq!(state.templates.model_info, Some(json!({"name": "tvl"})));
    assert_eq!(last_message(&state), "Model information loaded");
}

#[test]
fn created_template_clears_draft_and_reloads_list() {
    let mut state = state();
    user(&mut state, UserAction::LoadExampleTemplate);
    assert_eq!(state.templates.draft, TemplateDraft::example());

    let create = request_job(&user(&mut state, UserAction::CreateTemplate));
    let Submission::CustomTemplate(template) = &create.submission else {
        panic!("expected custom template");
    };
    assert_eq!(template.name, "custom_material_analysis");

    let effects = settle(
        &mut state,
        &create,
        Ok(outcome_from(json!({"success": true}))),
    );

    assert!(state.templates.draft.is_empty());
    let reload = request_job(&effects);
    assert_eq!(reload.submission, Submission::AvailableTemplates);
    assert!(state.is_loading(FormModule::Templates));
    assert!(messages(&state).contains(&"Template created successfully!".to_string()));
}

#[test]
fn invalid_required_inputs_block_creation() {
    let mut state = state();
    for (field, value) in [
        (TemplateField::Name, "mine"),
        (TemplateField::Template, "{surface}"),
        (TemplateField::RequiredInputs, "surface"),
    ] {
        user(
            &mut state,
            UserAction::SetTemplateField {
                field,
                value: value.to_string(),
            },
        );
    }

    let effects = user(&mut state, UserAction::CreateTemplate);

    assert!(!sends_request(&effects));
    assert_eq!(
        last_message(&state),
        "Required inputs must be valid JSON array format"
    );
}

#[test]
fn template_transport_failure_message() {
    let mut state = state();
    let job = request_job(&user(&mut state, UserAction::LoadTemplates));

    settle(&mut state, &job, Err(TransportFailure::new("HTTP 502: bad gateway")));

    assert_eq!(
        last_message(&state),
        "Error loading templates: HTTP 502: bad gateway"
    );
}
