use super::*;
use crate::prompt::CONTEXT_HEADER;
use pretty_assertions::assert_eq;

fn manual_state() -> ConsoleState {
    let mut state = state();
    user(&mut state, UserAction::SetAutoOptimize(false));
    state
}

#[test]
fn auto_optimize_runs_one_pass_per_change() {
    let mut state = state();

    let effects = user(&mut state, UserAction::SetTextualInput("silk".to_string()));
    let job = optimization_job(&effects);

    assert!(state.main.is_optimizing);
    assert_eq!(job.base_prompt, "Text Input: silk");
    assert_eq!(job.delay_ms, 1500);

    let effects = finish(&mut state, job.clone());

    assert_eq!(effects, vec![ConsoleEffect::RequestFrame]);
    assert!(!state.main.is_optimizing);
    assert!(state.main.is_optimized);
    assert_eq!(state.main.prompt_text, job.optimized_prompt);
    let entry = state.main.history.last().expect("history entry");
    assert_eq!(entry.prompt_snapshot, "Text Input: silk");
    assert_eq!(&*entry.version, "v2");
}

#[test]
fn optimize_then_revert_restores_base_prompt() {
    let mut state = manual_state();
    user(&mut state, UserAction::SetTextualInput("silk".to_string()));
    assert_eq!(state.main.prompt_text, "Text Input: silk");

    let job = optimization_job(&user(&mut state, UserAction::OptimizePrompt));
    finish(&mut state, job);
    assert!(state.main.is_optimized);

    user(&mut state, UserAction::RevertPrompt);

    assert_eq!(state.main.prompt_text, "Text Input: silk");
    assert!(!state.main.is_optimized);
    assert!(state.main.history.is_empty());
}

#[test]
fn revert_with_empty_history_only_notifies() {
    let mut state = manual_state();
    user(&mut state, UserAction::EditPromptText("draft".to_string()));

    user(&mut state, UserAction::RevertPrompt);

    assert_eq!(state.main.prompt_text, "draft");
    assert_eq!(
        last_message(&state),
        "No previous prompt version to revert to"
    );
}

#[test]
fn stale_completion_is_discarded() {
    let mut state = state();
    let first = optimization_job(&user(
        &mut state,
        UserAction::SetTextualInput("a".to_string()),
    ));
    let second = optimization_job(&user(
        &mut state,
        UserAction::SetTextualInput("ab".to_string()),
    ));
    assert!(second.generation > first.generation);
    let before = state.main.prompt_text.clone();

    let effects = finish(&mut state, first);

    assert!(effects.is_empty());
    assert!(state.main.is_optimizing);
    assert_eq!(state.main.prompt_text, before);
    assert!(state.main.history.is_empty());

    finish(&mut state, second.clone());
    assert_eq!(state.main.prompt_text, second.optimized_prompt);
    assert_eq!(state.main.history.len(), 1);
}

#[test]
fn manual_edit_supersedes_pending_pass() {
    let mut state = state();
    let job = optimization_job(&user(
        &mut state,
        UserAction::SetTextualInput("wool".to_string()),
    ));

    let effects = user(&mut state, UserAction::EditPromptText("mine".to_string()));

    assert!(effects.contains(&ConsoleEffect::CancelOptimization));
    assert!(!state.main.is_optimizing);
    assert!(finish(&mut state, job).is_empty());
    assert_eq!(state.main.prompt_text, "mine");
    assert!(!state.main.is_optimized);
}

#[test]
fn editing_optimized_prompt_clears_flag() {
    let mut state = state();
    let job = optimization_job(&user(
        &mut state,
        UserAction::SetTextualInput("wool".to_string()),
    ));
    finish(&mut state, job);
    assert!(state.main.is_optimized);

    let effects = user(&mut state, UserAction::EditPromptText("tweaked".to_string()));

    assert!(!effects.contains(&ConsoleEffect::CancelOptimization));
    assert!(!state.main.is_optimized);
}

#[test]
fn manual_optimize_is_refused_while_running() {
    let mut state = state();
    user(&mut state, UserAction::SetTextualInput("wool".to_string()));

    let effects = user(&mut state, UserAction::OptimizePrompt);

    assert_eq!(effects, vec![ConsoleEffect::RequestFrame]);
    assert_eq!(
        last_message(&state),
        "Prompt optimization already in progress"
    );
}

#[test]
fn disabling_auto_optimize_shows_base_prompt() {
    let mut state = state();
    user(&mut state, UserAction::SetTextualInput("wool".to_string()));
    assert!(state.main.is_optimizing);

    let effects = user(&mut state, UserAction::SetAutoOptimize(false));

    assert!(effects.contains(&ConsoleEffect::CancelOptimization));
    assert_eq!(state.main.prompt_text, "Text Input: wool");
    assert!(!state.main.is_optimizing);
    assert!(!state.main.is_optimized);
}

#[test]
fn empty_inputs_never_start_a_pass() {
    let mut state = state();
    let effects = user(&mut state, UserAction::SetAddContextualInfo(true));

    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, ConsoleEffect::StartOptimization(_))));
    assert_eq!(state.main.prompt_text, CONTEXT_HEADER);
}

#[test]
fn insert_example_appends_and_clears_flag() {
    let mut state = manual_state();
    user(&mut state, UserAction::EditPromptText("Describe.".to_string()));

    user(&mut state, UserAction::InsertExample);

    assert!(state
        .main
        .prompt_text
        .starts_with("Describe.\n\n**Example Analysis Framework:**"));
    assert!(!state.main.is_optimized);
}

#[test]
fn history_grows_per_pass_until_cleared() {
    let mut state = manual_state();
    user(&mut state, UserAction::SetTextualInput("linen".to_string()));
    for _ in 0..2 {
        let job = optimization_job(&user(&mut state, UserAction::OptimizePrompt));
        finish(&mut state, job);
    }
    assert_eq!(state.main.history.len(), 2);

    user(&mut state, UserAction::ClearPromptHistory);
    assert!(state.main.history.is_empty());
}

#[test]
fn clear_inputs_resets_prompt_and_response() {
    let mut state = manual_state();
    user(&mut state, UserAction::SetTactileFile(Some(file("grip.csv"))));
    user(&mut state, UserAction::SetTextualInput("rough".to_string()));
    state.main.response = Some(success("done"));

    user(&mut state, UserAction::ClearInputs);

    assert!(state.main.tactile_file.is_none());
    assert!(state.main.textual_input.is_empty());
    assert!(state.main.response.is_none());
    assert_eq!(state.main.prompt_text, EMPTY_PROMPT_PLACEHOLDER);
}
