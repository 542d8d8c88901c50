use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use crate::actions::ConsoleAction;
pub(super) use crate::actions::OptimizationJob;
pub(super) use crate::actions::RequestJob;
pub(super) use crate::actions::RequestSettlement;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::TransportFailure;
pub(super) use crate::actions::UserAction;
pub(super) use crate::few_shot::ExampleField;
pub(super) use crate::prompt::EMPTY_PROMPT_PLACEHOLDER;
pub(super) use crate::reducer::ConsoleEffect;
pub(super) use crate::state::ConsoleState;
pub(super) use crate::state::ErrorKind;
pub(super) use crate::state::FileRef;
pub(super) use crate::state::FormModule;
pub(super) use crate::state::NoticeBuffer;
pub(super) use crate::state::NoticeLevel;
pub(super) use crate::state::PromptType;
pub(super) use crate::state::RequestOutcome;
pub(super) use crate::state::RequestPhase;
pub(super) use crate::submission::Operation;
pub(super) use crate::submission::Submission;

mod prompt_lifecycle;
mod qa_templates;

fn state() -> ConsoleState {
    ConsoleState::default()
}

fn user(state: &mut ConsoleState, action: UserAction) -> Vec<ConsoleEffect> {
    reduce(state, ConsoleAction::User(action))
}

fn runtime(state: &mut ConsoleState, action: RuntimeAction) -> Vec<ConsoleEffect> {
    reduce(state, ConsoleAction::Runtime(action))
}

fn file(name: &str) -> FileRef {
    FileRef::new(name, "application/octet-stream", name.as_bytes().to_vec())
}

fn optimization_job(effects: &[ConsoleEffect]) -> OptimizationJob {
    effects
        .iter()
        .find_map(|effect| match effect {
            ConsoleEffect::StartOptimization(job) => Some(job.clone()),
            _ => None,
        })
        .expect("optimization effect")
}

fn request_job(effects: &[ConsoleEffect]) -> RequestJob {
    effects
        .iter()
        .find_map(|effect| match effect {
            ConsoleEffect::SendRequest(job) => Some(job.clone()),
            _ => None,
        })
        .expect("request effect")
}

fn sends_request(effects: &[ConsoleEffect]) -> bool {
    effects
        .iter()
        .any(|effect| matches!(effect, ConsoleEffect::SendRequest(_)))
}

fn finish(state: &mut ConsoleState, job: OptimizationJob) -> Vec<ConsoleEffect> {
    runtime(state, RuntimeAction::OptimizationFinished(job))
}

fn settle(
    state: &mut ConsoleState,
    job: &RequestJob,
    result: Result<RequestOutcome, TransportFailure>,
) -> Vec<ConsoleEffect> {
    runtime(
        state,
        RuntimeAction::RequestSettled(RequestSettlement {
            module: job.module,
            request_id: job.request_id,
            result,
        }),
    )
}

fn success(response: &str) -> RequestOutcome {
    RequestOutcome {
        success: true,
        response: Some(response.to_string()),
        ..RequestOutcome::default()
    }
}

fn messages(state: &ConsoleState) -> Vec<String> {
    state
        .notices
        .iter()
        .map(|notice| notice.message.clone())
        .collect()
}

fn last_message(state: &ConsoleState) -> String {
    state
        .notices
        .last()
        .map(|notice| notice.message.clone())
        .unwrap_or_default()
}

#[test]
fn default_state_is_idle_and_empty() {
    let state = state();
    assert!(!state.any_loading());
    assert_eq!(state.main.prompt_type, PromptType::CombinedAll);
    assert!(state.main.auto_optimize);
    assert_eq!(&*state.main.optimization_version, "v2");
    assert!(state.notices.is_empty());
}
