//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! state for one user and drives a streamed turn through a provider.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{info, warn};

use crate::chat::render::Renderer;
use crate::config::{ConfigLoader, Configuration};
use crate::error::Result;
use crate::model_selector::ModelSelector;
use crate::observability::{SESSION_TURN_DURATION, SESSION_TURN_ERRORS, SESSION_TURNS};
use crate::provider::CompletionProvider;
use crate::request::build_request;
use crate::stream_adapter::text_fragments;
use crate::transcript::{Role, Transcript, Turn};
use crate::types::{ChatCompletionRequest, ModelId};

/// A chat session: transcript, model choice, and turn counters.
///
/// The transcript is seeded with the configured greeting when the session is
/// created and only grows afterwards.
pub struct ChatSession {
    config: Arc<Configuration>,
    transcript: Transcript,
    selector: ModelSelector,
    completed_turns: u64,
    failed_turns: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The model used for the next turn.
    pub model: ModelId,
    /// The number of turns in the transcript.
    pub turn_count: usize,
    /// Turns authored by the user.
    pub user_turns: usize,
    /// Turns authored by the assistant, including the greeting.
    pub assistant_turns: usize,
    /// Turns whose reply streamed to completion.
    pub completed_turns: u64,
    /// Turns that ended in a fault.
    pub failed_turns: u64,
}

impl ChatSession {
    /// Creates a session using the default model.
    pub fn new(config: Arc<Configuration>) -> Self {
        Self::with_model(config, ModelId::default())
    }

    /// Creates a session starting with `model`.
    pub fn with_model(config: Arc<Configuration>, model: ModelId) -> Self {
        let transcript = Transcript::seeded(config.greeting.as_str());
        Self {
            config,
            transcript,
            selector: ModelSelector::with_model(model),
            completed_turns: 0,
            failed_turns: 0,
        }
    }

    /// Loads the configuration, then builds the provider from it.
    ///
    /// A configuration failure is returned before `connect` is called, so no
    /// provider exists, and no request is made, without a resolved API key.
    pub fn start<P, F>(loader: &ConfigLoader, model: ModelId, connect: F) -> Result<(Self, P)>
    where
        F: FnOnce(&Configuration) -> Result<P>,
    {
        let config = Arc::new(loader.load()?);
        let provider = connect(&config)?;
        Ok((Self::with_model(config, model), provider))
    }

    /// The conversation so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The configuration the session was created with.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The model used for the next turn.
    pub fn model(&self) -> ModelId {
        self.selector.select()
    }

    /// Changes the model for subsequent turns; prior turns are untouched.
    pub fn set_model(&mut self, model: ModelId) {
        self.selector.choose(model);
    }

    /// The selector holding the current model and the available ones.
    pub fn model_selector(&self) -> &ModelSelector {
        &self.selector
    }

    /// The request the next turn would send if the transcript were unchanged.
    pub fn next_request(&self) -> ChatCompletionRequest {
        build_request(&self.config, &self.transcript, self.model())
    }

    /// Renders every turn in order.
    pub fn render_history(&self, renderer: &mut dyn Renderer) {
        for turn in &self.transcript {
            renderer.print_turn(turn);
        }
    }

    /// Sends one user turn and streams the reply into `renderer`.
    ///
    /// The user turn is recorded before the request is made.  On success the
    /// full reply is recorded as one assistant turn and returned.  On a fault
    /// the error is returned as-is, the user turn stays, and no assistant turn
    /// is recorded; fragments already rendered remain on screen.
    pub async fn submit<P>(
        &mut self,
        provider: &P,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<String>
    where
        P: CompletionProvider + ?Sized,
    {
        let started = Instant::now();
        self.transcript.append(Turn::user(user_input));
        let request = self.next_request();
        info!(
            model = %request.model,
            turns = self.transcript.len(),
            "submitting turn"
        );

        match Self::stream_reply(provider, request, renderer).await {
            Ok(reply) => {
                self.transcript.append(Turn::assistant(reply.as_str()));
                self.completed_turns += 1;
                SESSION_TURNS.click();
                SESSION_TURN_DURATION.add(started.elapsed().as_secs_f64());
                Ok(reply)
            }
            Err(err) => {
                self.failed_turns += 1;
                SESSION_TURN_ERRORS.click();
                warn!(error = %err, "turn failed");
                Err(err)
            }
        }
    }

    async fn stream_reply<P>(
        provider: &P,
        request: ChatCompletionRequest,
        renderer: &mut dyn Renderer,
    ) -> Result<String>
    where
        P: CompletionProvider + ?Sized,
    {
        let chunks = provider.stream_completion(request).await?;
        let mut fragments = Box::pin(text_fragments(chunks));
        let mut reply = String::new();
        renderer.start_response();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            renderer.print_text(&fragment);
            reply.push_str(&fragment);
        }
        renderer.finish_response();
        Ok(reply)
    }

    /// Returns session statistics.
    pub fn stats(&self) -> SessionStats {
        let user_turns = self
            .transcript
            .iter()
            .filter(|turn| turn.role() == Role::User)
            .count();
        SessionStats {
            model: self.model(),
            turn_count: self.transcript.len(),
            user_turns,
            assistant_turns: self.transcript.len() - user_turns,
            completed_turns: self.completed_turns,
            failed_turns: self.failed_turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::stream;

    use super::*;
    use crate::Error;
    use crate::config::{ApiKey, ConfigSource};
    use crate::provider::ChunkStream;
    use crate::types::{ChatCompletionChunk, ChatMessage};

    fn config() -> Arc<Configuration> {
        Arc::new(Configuration::new(
            ApiKey::new("key"),
            "Hi, I'm Llama.",
            "Ready when you are.",
            "Answer briefly.",
        ))
    }

    /// Replies with the given fragments and records each request.
    struct Scripted {
        fragments: Vec<Option<&'static str>>,
        fault: Option<Error>,
        requests: Mutex<Vec<ChatCompletionRequest>>,
    }

    impl Scripted {
        fn replying(fragments: &[Option<&'static str>]) -> Self {
            Self {
                fragments: fragments.to_vec(),
                fault: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn faulting(fragments: &[Option<&'static str>], fault: Error) -> Self {
            Self {
                fault: Some(fault),
                ..Self::replying(fragments)
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for Scripted {
        async fn stream_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
            self.requests.lock().unwrap().push(request);
            let mut items: Vec<Result<ChatCompletionChunk>> = self
                .fragments
                .iter()
                .map(|f| Ok(ChatCompletionChunk::with_content(*f)))
                .collect();
            if let Some(fault) = &self.fault {
                items.push(Err(fault.clone()));
            }
            Ok(Box::pin(stream::iter(items)))
        }
    }

    struct Refusing;

    #[async_trait::async_trait]
    impl CompletionProvider for Refusing {
        async fn stream_completion(&self, _: ChatCompletionRequest) -> Result<ChunkStream> {
            Err(Error::rate_limit("slow down", Some(7)))
        }
    }

    #[derive(Default)]
    struct Recorder {
        text: String,
        started: usize,
        finished: usize,
    }

    impl Renderer for Recorder {
        fn print_title(&mut self, _: &str, _: &str) {}
        fn print_turn(&mut self, _: &Turn) {}
        fn start_response(&mut self) {
            self.started += 1;
        }
        fn print_text(&mut self, text: &str) {
            self.text.push_str(text);
        }
        fn finish_response(&mut self) {
            self.finished += 1;
        }
        fn print_error(&mut self, _: &str) {}
        fn print_info(&mut self, _: &str) {}
    }

    #[test]
    fn start_builds_provider_after_config() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join(".env");
        std::fs::write(
            &env,
            "GROQ_API_KEY=gsk_start\nINITIAL_RESPONSE=Hello there\nINITIAL_MSG=Ready\nCHAT_CONTEXT=Be kind\n",
        )
        .unwrap();
        let loader = ConfigLoader::new().with_source(ConfigSource::env_file(env.to_str().unwrap()));

        let (session, key) = ChatSession::start(&loader, ModelId::Llama3x8b, |config| {
            Ok(config.api_key.expose().to_string())
        })
        .unwrap();
        assert_eq!(key, "gsk_start");
        assert_eq!(session.model(), ModelId::Llama3x8b);
        assert_eq!(session.transcript().all(), &[Turn::assistant("Hello there")]);
    }

    #[test]
    fn start_without_config_never_connects() {
        let mut connected = false;
        let result = ChatSession::start(&ConfigLoader::new(), ModelId::default(), |_| {
            connected = true;
            Ok(Refusing)
        });
        assert!(result.err().is_some_and(|err| err.is_configuration()));
        assert!(!connected);
    }

    #[tokio::test]
    async fn input_is_recorded_verbatim() {
        let provider = Scripted::replying(&[Some("ok")]);
        let mut session = ChatSession::new(config());
        session
            .submit(&provider, "  indented question \t", &mut Recorder::default())
            .await
            .unwrap();
        assert_eq!(
            session.transcript().all()[1],
            Turn::user("  indented question \t")
        );
    }

    #[test]
    fn new_session_is_seeded() {
        let session = ChatSession::new(config());
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript().all()[0], Turn::assistant("Hi, I'm Llama."));
        assert_eq!(session.model(), ModelId::Llama3x70b);
    }

    #[tokio::test]
    async fn submit_records_both_turns() {
        let provider = Scripted::replying(&[Some("Llamas "), None, Some("hum.")]);
        let mut session = ChatSession::new(config());
        let mut renderer = Recorder::default();

        let reply = session
            .submit(&provider, "What sound do llamas make?", &mut renderer)
            .await
            .unwrap();

        assert_eq!(reply, "Llamas hum.");
        assert_eq!(renderer.text, "Llamas hum.");
        assert_eq!((renderer.started, renderer.finished), (1, 1));
        let turns = session.transcript().all();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1], Turn::user("What sound do llamas make?"));
        assert_eq!(turns[2], Turn::assistant("Llamas hum."));
    }

    #[tokio::test]
    async fn request_includes_new_user_turn() {
        let provider = Scripted::replying(&[Some("ok")]);
        let mut session = ChatSession::with_model(config(), ModelId::Gemma7bIt);
        session
            .submit(&provider, "hello", &mut Recorder::default())
            .await
            .unwrap();

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, ModelId::Gemma7bIt);
        assert_eq!(
            request.messages,
            vec![
                ChatMessage::system("Answer briefly."),
                ChatMessage::assistant("Ready when you are."),
                ChatMessage::assistant("Hi, I'm Llama."),
                ChatMessage::user("hello"),
            ]
        );
    }

    #[tokio::test]
    async fn mid_stream_fault_keeps_user_turn_only() {
        let provider = Scripted::faulting(
            &[Some("partial")],
            Error::streaming("connection reset", None),
        );
        let mut session = ChatSession::new(config());
        let mut renderer = Recorder::default();

        let err = session
            .submit(&provider, "question", &mut renderer)
            .await
            .unwrap_err();

        assert!(err.is_streaming());
        assert_eq!(renderer.text, "partial");
        assert_eq!(renderer.finished, 0);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript().last(), Some(&Turn::user("question")));
        assert_eq!(session.stats().failed_turns, 1);
    }

    #[tokio::test]
    async fn open_fault_propagates_unmodified() {
        let mut session = ChatSession::new(config());
        let mut renderer = Recorder::default();
        let err = session
            .submit(&Refusing, "question", &mut renderer)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RateLimit {
                retry_after: Some(7),
                ..
            }
        ));
        assert_eq!(renderer.started, 0);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn empty_reply_is_recorded() {
        let provider = Scripted::replying(&[]);
        let mut session = ChatSession::new(config());
        let reply = session
            .submit(&provider, "say nothing", &mut Recorder::default())
            .await
            .unwrap();
        assert_eq!(reply, "");
        assert_eq!(session.transcript().last(), Some(&Turn::assistant("")));
    }

    #[tokio::test]
    async fn switching_model_leaves_turns_alone() {
        let provider = Scripted::replying(&[Some("one")]);
        let mut session = ChatSession::new(config());
        session
            .submit(&provider, "first", &mut Recorder::default())
            .await
            .unwrap();
        let before = session.transcript().clone();

        session.set_model(ModelId::Mixtral8x7b);
        assert_eq!(session.transcript(), &before);
        assert_eq!(session.next_request().model, ModelId::Mixtral8x7b);
    }

    #[tokio::test]
    async fn stats_count_turns() {
        let provider = Scripted::replying(&[Some("x")]);
        let mut session = ChatSession::new(config());
        for input in ["a", "b"] {
            session
                .submit(&provider, input, &mut Recorder::default())
                .await
                .unwrap();
        }
        assert_eq!(
            session.stats(),
            SessionStats {
                model: ModelId::Llama3x70b,
                turn_count: 5,
                user_turns: 2,
                assistant_turns: 3,
                completed_turns: 2,
                failed_turns: 0,
            }
        );
    }
}
