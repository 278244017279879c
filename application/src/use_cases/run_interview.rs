//! Run Interview use case.
//!
//! [`InterviewOrchestrator`] composes the provider port, the response
//! parser, the state model, and the recovery layer into the per-turn
//! protocol:
//!
//! 1. format the outgoing message
//! 2. `provider.send` / `provider.receive` (retry-wrapped)
//! 3. parse the response for structured markers
//! 4. append the exchange to history and advance the phase
//! 5. **checkpoint before returning**: a crash after any turn loses at
//!    most the in-flight turn, never a completed one
//!
//! The session status machine is `Init → Exploring → Questioning →
//! Generating → Complete`, with `Failed` and `Cancelled` reachable from
//! any non-terminal status. Exactly one turn is in flight at a time; a
//! second `send` while a receive is outstanding is rejected, not queued.

use crate::config::OrchestratorConfig;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::events::{InterviewEvent, InterviewEventSink};
use crate::ports::provider::{AiProvider, ProviderError, ProviderReply};
use crate::ports::state_store::StateStore;
use crate::recovery::{safe_execute, try_save_state, with_error_recovery, RetryOptions};
use prdgen_domain::{
    parse_response, ErrorCategory, InterviewError, InterviewPhase, InterviewPromptTemplate,
    InterviewState, PrdDraft, SessionStatus, StructuredQuestion,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The interview's end product, handed to the caller on completion.
#[derive(Debug, Clone)]
pub struct InterviewCompletion {
    pub prd: PrdDraft,
    /// Total question/answer turns recorded.
    pub turns: usize,
}

/// What the orchestrator returns after one send/receive cycle.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Snapshot of the state after the turn.
    pub state: InterviewState,
    /// The next question to answer, if the assistant posed one.
    pub question: Option<StructuredQuestion>,
    /// Set once the PRD has been produced and validated.
    pub completion: Option<InterviewCompletion>,
}

/// Drives one interview session against a provider CLI.
pub struct InterviewOrchestrator {
    provider: Arc<Mutex<Box<dyn AiProvider>>>,
    store: Arc<dyn StateStore>,
    state: InterviewState,
    status: SessionStatus,
    pending_question: Option<StructuredQuestion>,
    turn_in_flight: bool,
    resumed: bool,
    context_content: String,
    retry: RetryOptions,
    cancel: CancellationToken,
    sinks: Vec<Arc<dyn InterviewEventSink>>,
    logger: Arc<dyn ConversationLogger>,
}

impl std::fmt::Debug for InterviewOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterviewOrchestrator")
            .field("status", &self.status)
            .field("resumed", &self.resumed)
            .finish_non_exhaustive()
    }
}

impl InterviewOrchestrator {
    /// Create an orchestrator for a brand-new interview.
    pub fn new(
        config: OrchestratorConfig,
        provider: Box<dyn AiProvider>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let state = InterviewState::new(
            config.feature.clone(),
            config.provider,
            config.first_principles,
        )
        .with_context_files(config.context_files.clone());

        Self {
            provider: Arc::new(Mutex::new(provider)),
            store,
            state,
            status: SessionStatus::Init,
            pending_question: None,
            turn_in_flight: false,
            resumed: false,
            context_content: config.context_content,
            retry: config.retry,
            cancel: CancellationToken::new(),
            sinks: Vec::new(),
            logger: Arc::new(NoConversationLogger),
        }
    }

    /// Reconstruct an orchestrator from persisted state, at the exact
    /// persisted phase, without replaying prior turns.
    pub fn from_state(
        state: InterviewState,
        provider: Box<dyn AiProvider>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, InterviewError> {
        let issues = state.validate();
        if !issues.is_empty() {
            let detail: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
            return Err(InterviewError::state(format!(
                "persisted state rejected: {}",
                detail.join("; ")
            )));
        }

        Ok(Self {
            provider: Arc::new(Mutex::new(provider)),
            store,
            state,
            status: SessionStatus::Init,
            pending_question: None,
            turn_in_flight: false,
            resumed: true,
            context_content: String::new(),
            retry: RetryOptions::default(),
            cancel: CancellationToken::new(),
            sinks: Vec::new(),
            logger: Arc::new(NoConversationLogger),
        })
    }

    /// Preloaded reference content for the system prompt (resume path).
    pub fn with_context_content(mut self, content: String) -> Self {
        self.context_content = content;
        self
    }

    pub fn with_retry_options(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Share an externally created cancellation token (so the provider
    /// adapter and the orchestrator abort together).
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Register an event handler. Handlers run synchronously during turns.
    pub fn subscribe(&mut self, sink: Arc<dyn InterviewEventSink>) {
        self.sinks.push(sink);
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn state(&self) -> &InterviewState {
        &self.state
    }

    pub fn pending_question(&self) -> Option<&StructuredQuestion> {
        self.pending_question.as_ref()
    }

    /// Token observers can use to wire external cancellation (Ctrl-C).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start a fresh interview: spawn the provider and run the first turn.
    pub async fn start(&mut self) -> Result<TurnResult, InterviewError> {
        if self.status != SessionStatus::Init {
            return Err(self.reject(format!(
                "cannot start: session is already {}",
                self.status
            )));
        }
        if self.resumed {
            return Err(self.reject("cannot start a resumed session; call resume()"));
        }

        self.spawn_provider().await?;
        self.status = SessionStatus::Exploring;
        info!("interview started for '{}'", self.state.feature);

        let opening = InterviewPromptTemplate::opening_message(&self.state.feature);
        self.run_turn(opening, None).await
    }

    /// Resume a persisted interview: spawn the provider and re-establish
    /// its context from the saved notes before the next genuine turn. The
    /// re-priming exchange runs under the same retry/checkpoint discipline
    /// as a normal turn but records no history entry.
    pub async fn resume(&mut self) -> Result<TurnResult, InterviewError> {
        if self.status != SessionStatus::Init {
            return Err(self.reject(format!(
                "cannot resume: session is already {}",
                self.status
            )));
        }
        if !self.resumed {
            return Err(self.reject("cannot resume a fresh session; call start()"));
        }

        self.spawn_provider().await?;
        self.status = SessionStatus::from_phase(self.state.phase);
        info!(
            "interview resumed at {} with {} recorded turns",
            self.state.phase,
            self.state.history.len()
        );

        let reprime = InterviewPromptTemplate::resume_message(&self.state);
        self.run_turn(reprime, None).await
    }

    /// Answer the pending question (or just speak) and run one turn.
    pub async fn answer(&mut self, answer: &str) -> Result<TurnResult, InterviewError> {
        if self.status == SessionStatus::Init {
            return Err(self.reject("session not started"));
        }
        if self.status.is_terminal() {
            return Err(self.reject(format!("session is {}", self.status)));
        }

        let question = self.pending_question.as_ref().map(|q| q.prompt.clone());
        let outgoing = InterviewPromptTemplate::answer_message(question.as_deref(), answer);
        self.run_turn(outgoing, Some((question, answer.to_string())))
            .await
    }

    /// Cancel the session: terminal, no retry. Any pending retry backoff
    /// is aborted immediately and the provider child is terminated
    /// (gracefully, then forcibly after the adapter's grace period).
    pub async fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        info!("interview cancelled by user");
        self.status = SessionStatus::Cancelled;
        self.cancel.cancel();
        try_save_state(&*self.store, &self.state);
        self.cleanup_provider().await;
        self.logger.log(ConversationEvent::new(
            "cancelled",
            serde_json::json!({ "phase": self.state.phase.as_str() }),
        ));
        self.emit(InterviewEvent::Error {
            category: ErrorCategory::Cancelled,
            message: ErrorCategory::Cancelled.user_message().to_string(),
        });
    }

    // ==================== Internals ====================

    fn emit(&self, event: InterviewEvent) {
        for sink in &self.sinks {
            sink.on_event(&event);
        }
    }

    /// Guard-violation error (never retried, never checkpoints).
    fn reject(&self, message: impl Into<String>) -> InterviewError {
        InterviewError::provider(message)
    }

    async fn spawn_provider(&mut self) -> Result<(), InterviewError> {
        let system_prompt = InterviewPromptTemplate::system_prompt(
            &self.state.feature,
            self.state.first_principles,
            &self.context_content,
        );

        let provider = Arc::clone(&self.provider);
        let result = with_error_recovery(
            || {
                let provider = Arc::clone(&provider);
                let prompt = system_prompt.clone();
                async move {
                    let mut p = provider.lock().await;
                    p.spawn(&prompt).await.map_err(InterviewError::from)
                }
            },
            &self.state,
            &*self.store,
            &self.retry,
            &self.cancel,
        )
        .await;

        if let Err(err) = result {
            self.fail(&err);
            return Err(err);
        }
        Ok(())
    }

    /// One retry-wrapped send/receive exchange. Retries re-send the same
    /// message; the adapter resets its awaiting flag on failure so a
    /// repeated send is not rejected as busy.
    async fn exchange(&self, message: &str) -> Result<ProviderReply, InterviewError> {
        let provider = Arc::clone(&self.provider);
        let message = message.to_string();
        with_error_recovery(
            || {
                let provider = Arc::clone(&provider);
                let message = message.clone();
                async move {
                    let mut p = provider.lock().await;
                    p.send(&message).await?;
                    let reply = p.receive().await?;
                    Ok::<_, InterviewError>(reply)
                }
            },
            &self.state,
            &*self.store,
            &self.retry,
            &self.cancel,
        )
        .await
    }

    async fn run_turn(
        &mut self,
        message: String,
        record: Option<(Option<String>, String)>,
    ) -> Result<TurnResult, InterviewError> {
        if self.turn_in_flight {
            return Err(InterviewError::from(ProviderError::Busy));
        }

        self.turn_in_flight = true;
        let result = self.turn_inner(message, record).await;
        self.turn_in_flight = false;

        if let Err(err) = &result {
            self.fail(err);
        }
        result
    }

    fn fail(&mut self, err: &InterviewError) {
        self.logger.log(ConversationEvent::new(
            "error",
            serde_json::json!({
                "category": err.category.as_str(),
                "detail": err.to_string(),
                "attempts": err.attempts,
            }),
        ));
        self.emit(InterviewEvent::Error {
            category: err.category,
            message: err.user_message().to_string(),
        });
        if err.is_cancelled() {
            self.status = SessionStatus::Cancelled;
        } else if !err.is_recoverable() {
            // Recovery already failed after checkpointing; the session is lost.
            self.status = SessionStatus::Failed;
        }
    }

    async fn turn_inner(
        &mut self,
        message: String,
        record: Option<(Option<String>, String)>,
    ) -> Result<TurnResult, InterviewError> {
        let reply = self.exchange(&message).await?;
        let mut parsed = parse_response(&reply.content, self.state.phase);
        self.log_warnings(&parsed);

        if let Some((question, answer)) = record {
            self.state.record_turn(question.clone(), answer.clone());
            self.pending_question = None;
            self.logger.log(ConversationEvent::new(
                "answer",
                serde_json::json!({ "question": question, "answer": answer }),
            ));
            self.emit(InterviewEvent::AnswerRecorded { question, answer });
        }
        self.state.append_ai_context(&parsed.content);

        // A completion signal outranks a question in the same response.
        if parsed.is_complete && parsed.question.is_some() {
            warn!("response carried both a question and a completion signal; honoring completion");
            parsed.question = None;
        }

        if parsed.is_complete && self.state.phase != InterviewPhase::Generating {
            self.change_phase(InterviewPhase::Generating)?;
        }

        let mut prd = parsed.prd.take();

        // Entered generating without a PRD payload: request the document in
        // a follow-up exchange within the same turn (still one-at-a-time).
        if self.state.phase == InterviewPhase::Generating
            && prd.is_none()
            && parsed.question.is_none()
        {
            let reply = self
                .exchange(InterviewPromptTemplate::generate_prd_message())
                .await?;
            let mut follow = parse_response(&reply.content, self.state.phase);
            self.log_warnings(&follow);
            self.state.append_ai_context(&follow.content);
            prd = follow.prd.take();
        }

        let mut completion = None;
        if let Some(prd) = prd {
            let issues = prd.validate();
            if issues.is_empty() {
                completion = Some(self.complete(prd).await);
            } else {
                for issue in &issues {
                    warn!("rejecting PRD payload: {}", issue);
                }
                self.logger.log(ConversationEvent::new(
                    "prd_rejected",
                    serde_json::json!({ "issues": issues }),
                ));
            }
        }

        if completion.is_none() {
            if let Some(q) = parsed.question.take() {
                if self.state.phase == InterviewPhase::Exploring {
                    self.change_phase(InterviewPhase::Questioning)?;
                }
                self.pending_question = Some(q.clone());
                self.logger.log(ConversationEvent::new(
                    "question",
                    serde_json::json!({
                        "prompt": q.prompt,
                        "choices": q.choices,
                        "multi_select": q.multi_select,
                    }),
                ));
                self.emit(InterviewEvent::QuestionReceived(q));
            }

            // The resumability guarantee: the checkpoint is ordered after
            // this turn's history append and before the result is returned.
            self.state.touch();
            self.store.save(&self.state)?;
        }

        Ok(TurnResult {
            state: self.state.clone(),
            question: self.pending_question.clone(),
            completion,
        })
    }

    /// Finalize a validated PRD: the state file is destroyed (the rendered
    /// document is the surviving artifact) and the provider is released.
    async fn complete(&mut self, prd: PrdDraft) -> InterviewCompletion {
        self.status = SessionStatus::Complete;
        self.pending_question = None;
        if let Err(e) = self.store.delete() {
            warn!("could not remove completed state file: {}", e);
        }
        self.logger.log(ConversationEvent::new(
            "prd_ready",
            serde_json::json!({
                "turns": self.state.history.len(),
                "user_stories": prd.user_stories.len(),
            }),
        ));
        self.emit(InterviewEvent::PrdReady);
        self.cleanup_provider().await;
        InterviewCompletion {
            prd,
            turns: self.state.history.len(),
        }
    }

    fn change_phase(&mut self, next: InterviewPhase) -> Result<(), InterviewError> {
        let from = self.state.phase;
        self.state
            .advance_phase(next)
            .map_err(|issue| InterviewError::state(issue.to_string()))?;
        self.status = SessionStatus::from_phase(next);
        debug!("phase {} -> {}", from, next);
        self.emit(InterviewEvent::PhaseChanged { from, to: next });
        Ok(())
    }

    fn log_warnings(&self, parsed: &prdgen_domain::ParsedResponse) {
        for warning in &parsed.warnings {
            warn!("response anomaly: {}", warning);
            self.logger.log(ConversationEvent::new(
                "parse_warning",
                serde_json::json!({ "detail": warning.to_string() }),
            ));
        }
    }

    async fn cleanup_provider(&self) {
        let provider = Arc::clone(&self.provider);
        safe_execute(async move {
            let mut p = provider.lock().await;
            p.cleanup().await.map_err(InterviewError::from)
        })
        .await;
    }

    #[cfg(test)]
    fn set_turn_in_flight(&mut self, in_flight: bool) {
        self.turn_in_flight = in_flight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::RetryOptions;
    use async_trait::async_trait;
    use prdgen_domain::{Feature, ProviderKind};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    // ==================== Test doubles ====================

    struct MockProvider {
        replies: StdMutex<VecDeque<Result<ProviderReply, ProviderError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        system_prompts: Arc<StdMutex<Vec<String>>>,
        fail_when_exhausted: bool,
        running: bool,
    }

    impl MockProvider {
        fn new(replies: Vec<Result<ProviderReply, ProviderError>>) -> Self {
            Self {
                replies: StdMutex::new(VecDeque::from(replies)),
                sent: Arc::new(StdMutex::new(Vec::new())),
                system_prompts: Arc::new(StdMutex::new(Vec::new())),
                fail_when_exhausted: false,
                running: false,
            }
        }

        fn scripted(texts: Vec<&str>) -> Self {
            Self::new(texts.into_iter().map(|t| Ok(ProviderReply::text(t))).collect())
        }

        fn always_timing_out() -> Self {
            let mut p = Self::new(vec![]);
            p.fail_when_exhausted = true;
            p
        }

        fn sent_handle(&self) -> Arc<StdMutex<Vec<String>>> {
            Arc::clone(&self.sent)
        }

        fn prompts_handle(&self) -> Arc<StdMutex<Vec<String>>> {
            Arc::clone(&self.system_prompts)
        }
    }

    #[async_trait]
    impl AiProvider for MockProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Claude
        }

        fn is_available(&self) -> bool {
            true
        }

        fn version(&self) -> Option<String> {
            Some("0.0-test".to_string())
        }

        async fn spawn(&mut self, system_prompt: &str) -> Result<(), ProviderError> {
            self.system_prompts
                .lock()
                .unwrap()
                .push(system_prompt.to_string());
            self.running = true;
            Ok(())
        }

        async fn send(&mut self, message: &str) -> Result<(), ProviderError> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }

        async fn receive(&mut self) -> Result<ProviderReply, ProviderError> {
            match self.replies.lock().unwrap().pop_front() {
                Some(reply) => reply,
                None if self.fail_when_exhausted => {
                    Err(ProviderError::Timeout(Duration::from_secs(1)))
                }
                None => Err(ProviderError::TransportClosed),
            }
        }

        fn is_running(&self) -> bool {
            self.running
        }

        async fn cleanup(&mut self) -> Result<(), ProviderError> {
            self.running = false;
            Ok(())
        }
    }

    struct MemoryStore {
        saved: StdMutex<Option<InterviewState>>,
        saves: AtomicU32,
        deletes: AtomicU32,
    }

    impl MemoryStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                saved: StdMutex::new(None),
                saves: AtomicU32::new(0),
                deletes: AtomicU32::new(0),
            })
        }
    }

    impl StateStore for MemoryStore {
        fn load(&self) -> Result<Option<InterviewState>, crate::ports::state_store::StateStoreError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(
            &self,
            state: &InterviewState,
        ) -> Result<(), crate::ports::state_store::StateStoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.saved.lock().unwrap() = Some(state.clone());
            Ok(())
        }

        fn delete(&self) -> Result<(), crate::ports::state_store::StateStoreError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            *self.saved.lock().unwrap() = None;
            Ok(())
        }

        fn exists(&self) -> bool {
            self.saved.lock().unwrap().is_some()
        }
    }

    struct CollectingSink {
        events: StdMutex<Vec<InterviewEvent>>,
    }

    impl CollectingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: StdMutex::new(Vec::new()),
            })
        }

        fn phase_changes(&self) -> Vec<(InterviewPhase, InterviewPhase)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    InterviewEvent::PhaseChanged { from, to } => Some((*from, *to)),
                    _ => None,
                })
                .collect()
        }

        fn saw_prd_ready(&self) -> bool {
            self.events
                .lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, InterviewEvent::PrdReady))
        }
    }

    impl InterviewEventSink for CollectingSink {
        fn on_event(&self, event: &InterviewEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    // ==================== Fixtures ====================

    const Q1: &str = r#"Let's dig in.
```prdgen
{"kind": "question", "question": {"prompt": "Who are the users?"}}
```"#;

    const Q2: &str = r#"```prdgen
{"kind": "question", "question": {"prompt": "What about SSO?", "choices": ["Yes", "No"], "multi_select": false}}
```"#;

    const COMPLETE_ONLY: &str = r#"I have what I need.
```prdgen
{"kind": "complete"}
```"#;

    const PRD: &str = r#"```prdgen
{"kind": "prd", "prd": {
  "overview": "Email/password auth with optional SSO.",
  "user_stories": [
    {"title": "Sign in", "description": "Users sign in", "acceptance_criteria": ["Session issued"]}
  ],
  "technical_notes": "Argon2id hashing."
}}
```"#;

    const COMPLETE_AND_PRD: &str = r#"That covers it.
```prdgen
{"kind": "complete"}
```
```prdgen
{"kind": "prd", "prd": {
  "overview": "Email/password auth.",
  "user_stories": [
    {"title": "Sign in", "description": "Users sign in", "acceptance_criteria": ["Session issued"]}
  ],
  "technical_notes": ""
}}
```"#;

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::new(Feature::new("add user authentication"), ProviderKind::Claude)
            .with_retry(
                RetryOptions::default()
                    .with_backoff(Duration::from_millis(1))
                    .without_jitter(),
            )
    }

    fn orchestrator_with(
        provider: MockProvider,
        store: Arc<MemoryStore>,
    ) -> InterviewOrchestrator {
        InterviewOrchestrator::new(config(), Box::new(provider), store)
    }

    // ==================== Scenarios ====================

    #[tokio::test]
    async fn fresh_interview_runs_to_completion() {
        let provider = MockProvider::scripted(vec![Q1, Q2, COMPLETE_ONLY, PRD]);
        let sent = provider.sent_handle();
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, Arc::clone(&store));
        let sink = CollectingSink::new();
        orch.subscribe(sink.clone());

        // First turn: a question arrives, phase questioning, nothing answered yet.
        let result = orch.start().await.unwrap();
        assert_eq!(orch.status(), SessionStatus::Questioning);
        assert_eq!(result.state.history.len(), 0);
        assert_eq!(result.question.unwrap().prompt, "Who are the users?");
        assert!(store.exists());

        // Answering records history and yields the next question.
        let result = orch.answer("Internal staff").await.unwrap();
        assert_eq!(result.state.history.len(), 1);
        assert_eq!(result.question.unwrap().prompt, "What about SSO?");

        // Completion marker, then the PRD follow-up, finishes the session.
        let result = orch.answer("Yes").await.unwrap();
        let completion = result.completion.expect("session should complete");
        assert_eq!(completion.turns, 2);
        assert_eq!(completion.prd.user_stories.len(), 1);
        assert_eq!(orch.status(), SessionStatus::Complete);

        // State destroyed only on successful completion.
        assert!(!store.exists());
        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);

        // Four outgoing messages: opening, two answers, the PRD request.
        assert_eq!(sent.lock().unwrap().len(), 4);
        assert!(sink.saw_prd_ready());

        // Observed phase sequence is non-decreasing.
        let changes = sink.phase_changes();
        assert_eq!(
            changes,
            vec![
                (InterviewPhase::Exploring, InterviewPhase::Questioning),
                (InterviewPhase::Questioning, InterviewPhase::Generating),
            ]
        );
        for (from, to) in changes {
            assert!(from.rank() <= to.rank());
        }
    }

    #[tokio::test]
    async fn completion_and_prd_in_one_response_needs_no_follow_up() {
        let provider = MockProvider::scripted(vec![Q1, COMPLETE_AND_PRD]);
        let sent = provider.sent_handle();
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, store);

        orch.start().await.unwrap();
        let result = orch.answer("Staff").await.unwrap();

        assert!(result.completion.is_some());
        // Opening + one answer; no extra PRD request was needed.
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn checkpoint_lands_after_every_turn() {
        let provider = MockProvider::scripted(vec![Q1, Q2]);
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, Arc::clone(&store));

        orch.start().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        orch.answer("Staff").await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);

        let persisted = store.load().unwrap().unwrap();
        assert_eq!(persisted.history.len(), 1);
        assert_eq!(persisted.phase, InterviewPhase::Questioning);
    }

    #[tokio::test]
    async fn free_form_reply_keeps_exploring() {
        let provider = MockProvider::scripted(vec!["Just thinking out loud, no question yet."]);
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, store);

        let result = orch.start().await.unwrap();
        assert!(result.question.is_none());
        assert!(result.completion.is_none());
        assert_eq!(orch.status(), SessionStatus::Exploring);
        assert!(result.state.ai_context.contains("thinking out loud"));
    }

    #[tokio::test]
    async fn malformed_marker_degrades_to_free_form() {
        let raw = "Hmm.\n```prdgen\n{broken json\n```";
        let provider = MockProvider::scripted(vec![raw]);
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, Arc::clone(&store));

        let result = orch.start().await.unwrap();
        assert!(result.question.is_none());
        assert_eq!(orch.status(), SessionStatus::Exploring);
        // The turn still checkpointed.
        assert!(store.exists());
    }

    // ==================== Resume ====================

    fn questioning_state_with_two_turns() -> InterviewState {
        let mut state = InterviewState::new(
            Feature::new("add user authentication"),
            ProviderKind::Claude,
            false,
        );
        state.advance_phase(InterviewPhase::Questioning).unwrap();
        state.record_turn(Some("Who are the users?".to_string()), "Internal staff");
        state.record_turn(Some("Need SSO?".to_string()), "Yes");
        state.append_ai_context("Auth for internal staff, SSO required.");
        state
    }

    #[tokio::test]
    async fn resume_reconstructs_without_duplicate_turns() {
        let provider = MockProvider::scripted(vec![Q2]);
        let sent = provider.sent_handle();
        let prompts = provider.prompts_handle();
        let store = MemoryStore::new();

        let state = questioning_state_with_two_turns();
        let mut orch =
            InterviewOrchestrator::from_state(state, Box::new(provider), store.clone())
                .unwrap()
                .with_retry_options(RetryOptions::default().without_jitter());

        let result = orch.resume().await.unwrap();

        assert_eq!(orch.status(), SessionStatus::Questioning);
        assert_eq!(result.state.history.len(), 2);
        assert!(result.question.is_some());

        // Exactly one outgoing message: the re-priming summary.
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("resuming"));
        assert!(sent[0].contains("Do not repeat"));
        assert!(sent[0].contains("Internal staff"));

        // The provider was primed with the same deterministic system prompt.
        assert_eq!(prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn from_state_rejects_invalid_documents() {
        let mut state = questioning_state_with_two_turns();
        state.version = 99;
        let err = InterviewOrchestrator::from_state(
            state,
            Box::new(MockProvider::scripted(vec![])),
            MemoryStore::new(),
        )
        .unwrap_err();
        assert_eq!(err.category, ErrorCategory::State);
        assert!(err.message.contains("version"));
    }

    #[tokio::test]
    async fn resume_at_generating_can_complete_directly() {
        let mut state = questioning_state_with_two_turns();
        state.advance_phase(InterviewPhase::Generating).unwrap();

        let provider = MockProvider::scripted(vec![PRD]);
        let store = MemoryStore::new();
        let mut orch =
            InterviewOrchestrator::from_state(state, Box::new(provider), store.clone())
                .unwrap();

        let result = orch.resume().await.unwrap();
        assert!(result.completion.is_some());
        assert_eq!(orch.status(), SessionStatus::Complete);
        assert!(!store.exists());
    }

    // ==================== Guards & failures ====================

    #[tokio::test]
    async fn answer_before_start_is_rejected() {
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(MockProvider::scripted(vec![]), store);
        let err = orch.answer("hello").await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Provider);
    }

    #[tokio::test]
    async fn answer_after_completion_is_rejected() {
        let provider = MockProvider::scripted(vec![Q1, COMPLETE_AND_PRD]);
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, store);

        orch.start().await.unwrap();
        orch.answer("Staff").await.unwrap();
        let err = orch.answer("more?").await.unwrap_err();
        assert!(err.message.contains("complete"));
    }

    #[tokio::test]
    async fn overlapping_turn_is_rejected_not_queued() {
        let provider = MockProvider::scripted(vec![Q1, Q2]);
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, store);
        orch.start().await.unwrap();

        orch.set_turn_in_flight(true);
        let err = orch.answer("Staff").await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Provider);
        assert!(err.message.contains("outstanding"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_with_attempt_count() {
        let provider = MockProvider::always_timing_out();
        let store = MemoryStore::new();
        let mut orch = InterviewOrchestrator::new(
            config().with_retry(
                RetryOptions::default()
                    .with_max_attempts(3)
                    .with_backoff(Duration::from_millis(1))
                    .without_jitter(),
            ),
            Box::new(provider),
            store.clone(),
        );
        let sink = CollectingSink::new();
        orch.subscribe(sink.clone());

        let err = orch.start().await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Timeout);
        assert_eq!(err.attempts, 3);

        // The last good state was checkpointed before the error surfaced.
        assert!(store.exists());

        // Recoverable failures do not move the session to failed.
        assert_eq!(orch.status(), SessionStatus::Exploring);

        // An error event reached the sinks with the fixed user message.
        let events = sink.events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            InterviewEvent::Error {
                category: ErrorCategory::Timeout,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn cancel_is_terminal_and_saves_progress() {
        let provider = MockProvider::scripted(vec![Q1]);
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, Arc::clone(&store));
        orch.start().await.unwrap();

        orch.cancel().await;
        assert_eq!(orch.status(), SessionStatus::Cancelled);
        assert!(orch.cancellation_token().is_cancelled());
        assert!(store.exists());

        let err = orch.answer("too late").await.unwrap_err();
        assert!(err.message.contains("cancelled"));
    }

    #[tokio::test]
    async fn invalid_prd_payload_does_not_complete() {
        // PRD with no user stories fails validation; session stays generating.
        let bad_prd = r#"```prdgen
{"kind": "complete"}
```
```prdgen
{"kind": "prd", "prd": {"overview": "Thin", "user_stories": [], "technical_notes": ""}}
```"#;
        // The orchestrator's follow-up request then gets a valid PRD.
        let provider = MockProvider::scripted(vec![Q1, bad_prd, PRD]);
        let store = MemoryStore::new();
        let mut orch = orchestrator_with(provider, Arc::clone(&store));

        orch.start().await.unwrap();
        let result = orch.answer("Staff").await.unwrap();

        // Invalid payload was rejected; the turn checkpointed in generating.
        assert!(result.completion.is_none());
        assert_eq!(orch.status(), SessionStatus::Generating);
        assert_eq!(store.load().unwrap().unwrap().phase, InterviewPhase::Generating);

        // A plain follow-up answer can still finish the job.
        let result = orch.answer("go ahead").await.unwrap();
        assert!(result.completion.is_some());
    }
}
