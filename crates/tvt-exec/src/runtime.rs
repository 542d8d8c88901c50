use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tvt_core::actions::ConsoleAction;
use tvt_core::actions::OptimizationJob;
use tvt_core::actions::RequestJob;
use tvt_core::actions::RequestSettlement;
use tvt_core::actions::RuntimeAction;
use tvt_core::actions::TransportFailure;
use tvt_core::actions::UserAction;
use tvt_core::config::Config;
use tvt_core::reducer::reduce;
use tvt_core::reducer::ConsoleEffect;
use tvt_core::state::ConsoleState;

use crate::adapters::build_request;
use crate::executor::RequestExecutor;

/// Drives a [`ConsoleState`]: reduces actions and carries out the effects the
/// reducer asks for on the tokio runtime.
///
/// Completions are delivered back through a channel so every state change
/// still happens inside `reduce`.
pub struct ConsoleRuntime {
    state: ConsoleState,
    executor: Arc<dyn RequestExecutor>,
    tx: mpsc::UnboundedSender<RuntimeAction>,
    rx: mpsc::UnboundedReceiver<RuntimeAction>,
    optimization: Option<JoinHandle<()>>,
    outstanding: usize,
    frame_requested: bool,
}

impl ConsoleRuntime {
    pub fn new(config: &Config, executor: Arc<dyn RequestExecutor>) -> Self {
        Self::with_state(ConsoleState::new(config), executor)
    }

    pub fn with_state(state: ConsoleState, executor: Arc<dyn RequestExecutor>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state,
            executor,
            tx,
            rx,
            optimization: None,
            outstanding: 0,
            frame_requested: false,
        }
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn into_state(mut self) -> ConsoleState {
        self.abort_optimization();
        std::mem::take(&mut self.state)
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// True while a request or an optimization pass may still report back.
    pub fn is_busy(&self) -> bool {
        self.outstanding > 0 || self.state.main.in_flight.is_some()
    }

    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    pub fn dispatch(&mut self, action: UserAction) {
        let effects = reduce(&mut self.state, ConsoleAction::User(action));
        self.apply(effects);
    }

    /// Waits for the next completion and reduces it. Returns `false` when
    /// nothing is outstanding.
    pub async fn settle_next(&mut self) -> bool {
        if !self.is_busy() {
            return false;
        }
        let Some(action) = self.rx.recv().await else {
            return false;
        };
        self.complete(action);
        true
    }

    pub async fn run_until_idle(&mut self) {
        while self.settle_next().await {}
    }

    fn complete(&mut self, action: RuntimeAction) {
        match &action {
            RuntimeAction::RequestSettled(settlement) => {
                self.outstanding = self.outstanding.saturating_sub(1);
                let pending = self.state.requests.slot(settlement.module).pending;
                if pending != Some(settlement.request_id) {
                    log::debug!(
                        "discarding stale {} completion {}",
                        settlement.module.label(),
                        settlement.request_id
                    );
                }
            }
            RuntimeAction::OptimizationFinished(job) => {
                self.optimization = None;
                if self.state.main.in_flight != Some(job.generation) {
                    log::debug!("discarding superseded optimization pass {}", job.generation);
                }
            }
        }
        let effects = reduce(&mut self.state, ConsoleAction::Runtime(action));
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<ConsoleEffect>) {
        for effect in effects {
            match effect {
                ConsoleEffect::RequestFrame => self.frame_requested = true,
                ConsoleEffect::StartOptimization(job) => self.start_optimization(job),
                ConsoleEffect::CancelOptimization => self.abort_optimization(),
                ConsoleEffect::SendRequest(job) => self.send_request(job),
            }
        }
    }

    fn start_optimization(&mut self, job: OptimizationJob) {
        self.abort_optimization();
        log::debug!(
            "optimization pass {} scheduled in {}ms",
            job.generation,
            job.delay_ms
        );
        let tx = self.tx.clone();
        self.optimization = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(job.delay_ms)).await;
            let _ = tx.send(RuntimeAction::OptimizationFinished(job));
        }));
    }

    fn abort_optimization(&mut self) {
        if let Some(handle) = self.optimization.take() {
            handle.abort();
        }
    }

    fn send_request(&mut self, job: RequestJob) {
        let RequestJob {
            module,
            request_id,
            submission,
        } = job;
        let request = build_request(request_id, submission);
        log::info!(
            "{} sending {} via {}",
            request_id,
            request.operation.label(),
            self.executor.name()
        );

        self.outstanding += 1;
        let executor = Arc::clone(&self.executor);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = executor.execute(request).await.map_err(|error| {
                log::warn!("{request_id} failed: {error}");
                TransportFailure::from(error)
            });
            let _ = tx.send(RuntimeAction::RequestSettled(RequestSettlement {
                module,
                request_id,
                result,
            }));
        });
    }
}

impl Drop for ConsoleRuntime {
    fn drop(&mut self) {
        self.abort_optimization();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tvt_core::state::FormModule;
    use tvt_core::state::RequestOutcome;
    use tvt_core::state::RequestPhase;
    use tvt_core::submission::Operation;

    use super::*;
    use crate::contracts::WireRequest;
    use crate::executor::ClientError;

    type Reply = Result<RequestOutcome, String>;

    /// Replies per operation after a fixed delay and records what it saw.
    #[derive(Default)]
    struct ScriptedExecutor {
        replies: HashMap<Operation, Reply>,
        delay_ms: u64,
        seen: Mutex<Vec<WireRequest>>,
    }

    impl ScriptedExecutor {
        fn reply(mut self, operation: Operation, reply: Reply) -> Self {
            self.replies.insert(operation, reply);
            self
        }

        fn seen(&self) -> Vec<WireRequest> {
            self.seen.lock().expect("seen").clone()
        }
    }

    #[async_trait]
    impl RequestExecutor for ScriptedExecutor {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn execute(&self, request: WireRequest) -> Result<RequestOutcome, ClientError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            let reply = self.replies.get(&request.operation).cloned();
            self.seen.lock().expect("seen").push(request);
            match reply {
                Some(Ok(outcome)) => Ok(outcome),
                Some(Err(message)) => Err(ClientError::Transport(message)),
                None => Err(ClientError::Transport("no scripted reply".to_string())),
            }
        }
    }

    fn ok(response: &str) -> Reply {
        Ok(RequestOutcome {
            success: true,
            response: Some(response.to_string()),
            ..RequestOutcome::default()
        })
    }

    fn manual_config() -> Config {
        let mut config = Config::default();
        config.optimizer.auto_optimize = false;
        config
    }

    fn last_message(runtime: &ConsoleRuntime) -> String {
        runtime
            .state()
            .notices
            .last()
            .map(|notice| notice.message.clone())
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn main_submission_round_trip() {
        let executor = Arc::new(
            ScriptedExecutor::default().reply(Operation::UnifiedAnalysis, ok("a rough stone")),
        );
        let mut runtime = ConsoleRuntime::new(&manual_config(), executor.clone());

        runtime.dispatch(UserAction::SetTextualInput("grey and gritty".to_string()));
        runtime.dispatch(UserAction::SubmitMain);
        assert!(runtime.is_busy());
        assert!(runtime.state().is_loading(FormModule::Main));

        runtime.run_until_idle().await;

        assert!(!runtime.is_busy());
        assert_eq!(
            runtime.state().requests.main.phase,
            RequestPhase::Succeeded
        );
        assert_eq!(
            runtime
                .state()
                .main
                .response
                .as_ref()
                .and_then(RequestOutcome::text),
            Some("a rough stone")
        );
        assert_eq!(last_message(&runtime), "Analysis completed!");
        assert_eq!(executor.seen().len(), 1);
        assert!(runtime.take_frame_request());
        assert!(!runtime.take_frame_request());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_surfaces_as_failure_notice() {
        let executor = Arc::new(ScriptedExecutor::default().reply(
            Operation::UnifiedAnalysis,
            Err("connection refused".to_string()),
        ));
        let mut runtime = ConsoleRuntime::new(&manual_config(), executor);

        runtime.dispatch(UserAction::SetTextualInput("felt".to_string()));
        runtime.dispatch(UserAction::SubmitMain);
        runtime.run_until_idle().await;

        assert_eq!(runtime.state().requests.main.phase, RequestPhase::Failed);
        assert_eq!(last_message(&runtime), "Request failed: connection refused");
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_optimization_is_dropped() {
        let executor = Arc::new(ScriptedExecutor::default());
        let mut runtime = ConsoleRuntime::new(&Config::default(), executor);

        runtime.dispatch(UserAction::SetTextualInput("wood".to_string()));
        tokio::time::sleep(Duration::from_millis(500)).await;
        runtime.dispatch(UserAction::SetTextualInput("polished wood".to_string()));
        assert!(runtime.state().main.is_optimizing);

        runtime.run_until_idle().await;

        let main = &runtime.state().main;
        assert!(main.is_optimized);
        assert!(!main.is_optimizing);
        assert_eq!(main.history.len(), 1);
        assert!(main.prompt_text.contains("polished wood"));
        assert!(main
            .history
            .last()
            .map(|entry| entry.prompt_snapshot.contains("polished wood"))
            .unwrap_or(false));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_edit_cancels_pending_optimization() {
        let executor = Arc::new(ScriptedExecutor::default());
        let mut runtime = ConsoleRuntime::new(&Config::default(), executor);

        runtime.dispatch(UserAction::SetTextualInput("silk".to_string()));
        assert!(runtime.is_busy());
        runtime.dispatch(UserAction::EditPromptText("Describe silk.".to_string()));

        assert!(!runtime.is_busy());
        runtime.run_until_idle().await;
        assert_eq!(runtime.state().main.prompt_text, "Describe silk.");
        assert!(runtime.state().main.history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn modules_run_concurrently() {
        let executor = Arc::new(ScriptedExecutor {
            delay_ms: 200,
            ..ScriptedExecutor::default()
        }
        .reply(Operation::AvailableTemplates, {
            let mut outcome = RequestOutcome {
                success: true,
                ..RequestOutcome::default()
            };
            outcome
                .extra
                .insert("templates".to_string(), serde_json::json!(["basic"]));
            Ok(outcome)
        })
        .reply(Operation::SampleQuestions, Ok(RequestOutcome::default())));
        let mut runtime = ConsoleRuntime::new(&manual_config(), executor);

        runtime.dispatch(UserAction::LoadTemplates);
        runtime.dispatch(UserAction::LoadSampleQuestions);
        assert!(runtime.state().is_loading(FormModule::Templates));
        assert!(runtime.state().is_loading(FormModule::Qa));

        runtime.run_until_idle().await;

        assert_eq!(runtime.state().templates.available, vec!["basic"]);
        assert_eq!(runtime.state().requests.qa.phase, RequestPhase::Failed);
        assert!(!runtime.state().any_loading());
    }
}
