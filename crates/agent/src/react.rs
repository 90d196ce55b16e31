//! ReAct loop — Thought → Action → Observation, over tagged text.
//!
//! Each turn the model streams free-form reasoning followed by one call:
//!
//! ```text
//! <tool>add</tool><args>{"a": 2, "b": 3}</args>
//! ```
//!
//! The loop parses the call, runs the tool and feeds the result back as
//! `<observation>5</observation>`. A call to the finish tool ends the query.
//!
//! # States
//!
//! `AWAITING_QUERY → STREAMING → DECIDING → {DISPATCHING, FINISHED}`, with
//! `DISPATCHING → STREAMING` looping until a finish decision, the iteration
//! cap, a provider failure or cancellation.

use crate::events::{ReactEvent, deliver};
use crate::parser::{ParsedDecision, StreamParser};
use crate::prompt::PromptTemplate;
use crate::sink::JsonlTranscriptSink;
use reactor_config::AppConfig;
use reactor_core::error::{Error, Result};
use reactor_core::message::{Role, Transcript};
use reactor_core::provider::{Provider, ProviderRequest};
use reactor_core::sink::TranscriptSink;
use reactor_core::tool::{Arguments, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A ReAct agent bound to one provider, one tool set and one system prompt.
pub struct ReactAgent {
    /// LLM provider.
    provider: Arc<dyn Provider>,
    /// Model name.
    model: String,
    /// Temperature.
    temperature: f32,
    /// Max tokens per response.
    max_tokens: Option<u32>,
    /// Tool registry.
    tools: Arc<ToolRegistry>,
    /// Rendered system prompt, the first message of every query.
    system_prompt: String,
    /// Turns fragments into decisions.
    parser: StreamParser,
    /// Maximum turns per query; 0 disables the cap.
    max_iterations: u32,
    /// Append an observation when nothing could be dispatched.
    report_missing_tool: bool,
    /// Conversation for the current query.
    transcript: Transcript,
    /// Optional progress events.
    events: Option<mpsc::Sender<ReactEvent>>,
    /// Aborts the running query.
    cancel: CancellationToken,
}

/// The result of a ReAct execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactOutcome {
    /// The final answer text.
    pub answer: String,
    /// Model turns used.
    pub iterations: u32,
    /// Tools actually dispatched.
    pub tool_calls: usize,
}

impl ReactAgent {
    /// Create a new ReAct agent.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            tools,
            system_prompt: system_prompt.into(),
            parser: StreamParser::default(),
            max_iterations: 10,
            report_missing_tool: false,
            transcript: Transcript::new(),
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Build an agent from configuration.
    ///
    /// The prompt template is loaded and rendered here, so a missing
    /// template fails construction. A transcript log that cannot be opened
    /// is only a warning.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Result<Self> {
        let agent = &config.agent;

        let template = match &agent.prompt_template {
            Some(path) => PromptTemplate::load(path)?,
            None => PromptTemplate::builtin(),
        }
        .with_finish_tool(&agent.finish_tool);
        let system_prompt = template.render(&agent.input, &agent.output, &tools);

        let mut react = Self::new(provider, &config.provider.model, tools, system_prompt)
            .with_temperature(config.provider.temperature)
            .with_max_iterations(agent.max_iterations)
            .with_parser(StreamParser::from_config(agent))
            .with_missing_tool_report(agent.report_missing_tool);

        if let Some(max) = config.provider.max_tokens {
            react = react.with_max_tokens(max);
        }

        if let Some(path) = &agent.transcript_log {
            match JsonlTranscriptSink::open(path) {
                Ok(sink) => react = react.with_sink(Arc::new(sink)),
                Err(e) => warn!(path = %path.display(), error = %e, "Transcript log disabled"),
            }
        }

        Ok(react)
    }

    /// Set max iterations (0 = unbounded).
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Mirror every transcript append to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.transcript.set_sink(sink);
        self
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<ReactEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Abort queries when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_parser(mut self, parser: StreamParser) -> Self {
        self.parser = parser;
        self
    }

    /// Tell the model when its output named no registered tool.
    pub fn with_missing_tool_report(mut self, enabled: bool) -> Self {
        self.report_missing_tool = enabled;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The conversation of the most recent query.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run a query and return only the answer.
    pub async fn query(&mut self, query: &str) -> Result<String> {
        self.run(query).await.map(|outcome| outcome.answer)
    }

    /// Execute the ReAct loop for one query.
    pub async fn run(&mut self, query: &str) -> Result<ReactOutcome> {
        // ── Awaiting query ──
        self.transcript.clear();
        self.transcript.append(Role::System, self.system_prompt.clone());
        self.transcript.append(Role::User, query);

        info!(
            model = %self.model,
            tools = self.tools.len(),
            max_iter = self.max_iterations,
            "ReAct loop starting"
        );

        let mut iterations = 0u32;
        let mut tool_calls = 0usize;

        loop {
            if self.max_iterations > 0 && iterations >= self.max_iterations {
                warn!("ReAct: max iterations reached ({})", self.max_iterations);
                return Err(Error::IterationLimit {
                    limit: self.max_iterations,
                });
            }
            iterations += 1;
            debug!(iteration = iterations, "ReAct iteration");

            // ── Streaming ──
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: self.transcript.as_slice().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let mut stream = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                stream = self.provider.stream(request) => stream?,
            };
            let outcome = self
                .parser
                .consume(&mut stream, &self.cancel, self.events.as_ref())
                .await?;
            drop(stream);

            debug!(
                iteration = iterations,
                fragments = outcome.fragments,
                early_stop = outcome.early_stop,
                "Turn parsed"
            );

            // ── Deciding ──
            match outcome.decision {
                ParsedDecision::Finish { final_answer } => {
                    self.transcript.append(Role::Assistant, final_answer.clone());
                    self.emit(ReactEvent::Finished {
                        answer: final_answer.clone(),
                        iterations,
                        tool_calls,
                    })
                    .await;

                    info!(iterations, tool_calls, "ReAct loop completed");
                    return Ok(ReactOutcome {
                        answer: final_answer,
                        iterations,
                        tool_calls,
                    });
                }
                ParsedDecision::Tool { name, arguments } => {
                    self.transcript.append(Role::Assistant, outcome.raw);

                    // ── Dispatching ──
                    if self.tools.get(&name).is_some() {
                        tool_calls += 1;
                    }
                    let observation = self.dispatch(&name, &arguments, iterations).await;
                    if let Some(observation) = observation {
                        self.transcript
                            .append(Role::User, format!("<observation>{observation}</observation>"));
                    }
                }
                ParsedDecision::Malformed { raw_text } => {
                    self.transcript.append(Role::Assistant, raw_text);
                    warn!(iteration = iterations, "No observation found: no tool call in model output");
                    self.emit(ReactEvent::NoObservation {
                        iteration: iterations,
                        reason: "no tool call found".into(),
                    })
                    .await;

                    if self.report_missing_tool {
                        let hint = format!(
                            "No tool call found. Reply with <tool>NAME</tool><args>{{...}}</args> using one of: {}",
                            self.known_tools()
                        );
                        self.transcript
                            .append(Role::User, format!("<observation>{hint}</observation>"));
                    }
                }
            }
        }
    }

    /// Run the named tool. Returns the observation text to append, if any.
    async fn dispatch(&self, name: &str, arguments: &Arguments, iteration: u32) -> Option<String> {
        let Some(descriptor) = self.tools.get(name) else {
            warn!(tool = %name, "No observation found: unknown tool");
            self.emit(ReactEvent::NoObservation {
                iteration,
                reason: format!("unknown tool '{name}'"),
            })
            .await;

            return self.report_missing_tool.then(|| {
                format!(
                    "Unknown tool '{name}'. Available tools: {}",
                    self.known_tools()
                )
            });
        };

        info!(tool = %name, iteration, "Calling tool");
        self.emit(ReactEvent::ToolCall {
            iteration,
            name: name.to_string(),
            arguments: Value::Object(arguments.clone()),
        })
        .await;

        let (observation, success) = match descriptor.invoke(arguments).await {
            Ok(output) => (output, true),
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed");
                (e.to_string(), false)
            }
        };

        self.emit(ReactEvent::Observation {
            iteration,
            name: name.to_string(),
            content: observation.clone(),
            success,
        })
        .await;

        Some(observation)
    }

    fn known_tools(&self) -> String {
        let mut names = self.tools.names();
        names.push(self.parser.finish_tool());
        names.join(", ")
    }

    async fn emit(&self, event: ReactEvent) {
        if let Some(tx) = &self.events {
            deliver(tx, event, &self.cancel).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, Turn, math_tools};
    use reactor_core::error::ProviderError;
    use reactor_core::message::Message;
    use reactor_core::sink::MemorySink;
    use std::time::Duration;

    const ADD_CALL: &str = r#"I should add. <tool>add</tool><args>{"a": 2, "b": 3}</args>"#;
    const FINISH_5: &str = r#"<tool>finish</tool><args>{"final_answer": "5"}</args>"#;

    fn agent(provider: Arc<ScriptedProvider>) -> ReactAgent {
        ReactAgent::new(provider, "test-model", Arc::new(math_tools()), "SYSTEM")
    }

    fn contents(agent: &ReactAgent) -> Vec<(Role, String)> {
        agent
            .transcript()
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    #[tokio::test]
    async fn add_then_finish_scenario() {
        let provider = Arc::new(ScriptedProvider::replies(&[ADD_CALL, FINISH_5]));
        let mut react = agent(provider.clone());

        let outcome = react.run("what is 2+3?").await.unwrap();

        assert_eq!(outcome.answer, "5");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls, 1);
        assert_eq!(
            contents(&react),
            vec![
                (Role::System, "SYSTEM".to_string()),
                (Role::User, "what is 2+3?".to_string()),
                (Role::Assistant, ADD_CALL.to_string()),
                (Role::User, "<observation>5</observation>".to_string()),
                (Role::Assistant, "5".to_string()),
            ]
        );

        // The second request saw the observation.
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[1].model, "test-model");
    }

    #[tokio::test]
    async fn finish_returns_answer_immediately() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            r#"<tool>finish</tool><args>{"final_answer": "42"}</args>"#,
        ]));
        let mut react = agent(provider.clone());

        assert_eq!(react.query("meaning of life?").await.unwrap(), "42");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn raw_buffer_round_trips_through_transcript() {
        let fragmented = Turn::text(&[
            "Thinking about\nit. <to",
            "ol>add</tool><ar",
            "gs>{'a': 2, 'b': 3}</args>",
            " <observation>fake</observation>",
        ]);
        let provider = Arc::new(ScriptedProvider::new(vec![
            fragmented,
            Turn::text(&[FINISH_5]),
        ]));
        let mut react = agent(provider);
        react.run("q").await.unwrap();

        assert_eq!(
            react.transcript().as_slice()[2].content,
            "Thinking about\nit. <tool>add</tool><args>{'a': 2, 'b': 3}</args>"
        );
    }

    #[tokio::test]
    async fn unknown_tool_appends_nothing_and_streams_once_more() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            "<tool>multiply</tool><args>{'a': 2}</args>",
            FINISH_5,
        ]));
        let mut react = agent(provider.clone());

        let outcome = react.run("q").await.unwrap();

        assert_eq!(outcome.answer, "5");
        assert_eq!(outcome.tool_calls, 0);
        assert_eq!(provider.call_count(), 2);
        // system, user, assistant(call), assistant(answer): no observation.
        let roles: Vec<Role> = react.transcript().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Assistant]
        );
        assert_eq!(provider.requests()[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn unknown_tool_reported_when_enabled() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            "<tool>multiply</tool><args>{'a': 2}</args>",
            FINISH_5,
        ]));
        let mut react = agent(provider).with_missing_tool_report(true);
        react.run("q").await.unwrap();

        let observation = &react.transcript().as_slice()[3];
        assert_eq!(observation.role, Role::User);
        assert!(observation.content.starts_with("<observation>Unknown tool 'multiply'"));
        assert!(observation.content.contains("add, explode, finish"));
    }

    #[tokio::test]
    async fn malformed_output_is_kept_and_loop_continues() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            "The answer is probably 5.",
            FINISH_5,
        ]));
        let mut react = agent(provider.clone());

        assert_eq!(react.query("q").await.unwrap(), "5");
        assert_eq!(provider.call_count(), 2);
        assert_eq!(
            react.transcript().as_slice()[2],
            Message::assistant("The answer is probably 5.")
        );
        assert_eq!(react.transcript().len(), 4);
    }

    #[tokio::test]
    async fn malformed_output_reported_when_enabled() {
        let provider = Arc::new(ScriptedProvider::replies(&["no tags here", FINISH_5]));
        let mut react = agent(provider).with_missing_tool_report(true);
        react.run("q").await.unwrap();

        let hint = &react.transcript().as_slice()[3].content;
        assert!(hint.starts_with("<observation>No tool call found."));
    }

    #[tokio::test]
    async fn failing_tool_becomes_observation() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            "<tool>explode</tool><args>{}</args>",
            FINISH_5,
        ]));
        let mut react = agent(provider);

        let outcome = react.run("q").await.unwrap();
        assert_eq!(outcome.tool_calls, 1);

        let observation = &react.transcript().as_slice()[3].content;
        assert!(observation.starts_with("<observation>"));
        assert!(observation.contains("boom"), "{observation}");
    }

    #[tokio::test]
    async fn bad_arguments_become_observation() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            "<tool>add</tool><args>{'a': 2}</args>",
            FINISH_5,
        ]));
        let mut react = agent(provider);
        react.run("q").await.unwrap();

        let observation = &react.transcript().as_slice()[3].content;
        assert!(observation.contains("missing required argument 'b'"), "{observation}");
    }

    #[tokio::test]
    async fn iteration_cap_stops_confused_model() {
        let provider = Arc::new(ScriptedProvider::repeating(Turn::text(&["hmm"])));
        let mut react = agent(provider.clone()).with_max_iterations(3);

        let err = react.run("q").await.unwrap_err();
        assert!(matches!(err, Error::IterationLimit { limit: 3 }));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn provider_failure_is_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![Turn::Fail(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let mut react = agent(provider);

        let err = react.run("q").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn mid_stream_error_is_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![Turn::Stream(vec![
            Ok(reactor_core::StreamChunk::text("<tool>add")),
            Err(ProviderError::StreamInterrupted("eof".into())),
        ])]));
        let mut react = agent(provider);

        let err = react.run("q").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn cancellation_aborts_hanging_stream() {
        let provider = Arc::new(ScriptedProvider::new(vec![Turn::Hang]));
        let token = CancellationToken::new();
        let mut react = agent(provider).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = react.run("q").await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_event_consumer_yields_to_cancellation() {
        let provider = Arc::new(ScriptedProvider::replies(&[ADD_CALL, FINISH_5]));
        let token = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(1);
        let mut react = agent(provider).with_events(tx).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = tokio::time::timeout(Duration::from_secs(5), react.run("q"))
            .await
            .expect("run should stop on cancellation")
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn transcript_resets_between_queries() {
        let provider = Arc::new(ScriptedProvider::replies(&[FINISH_5, FINISH_5]));
        let mut react = agent(provider);

        react.run("first").await.unwrap();
        react.run("second").await.unwrap();

        assert_eq!(react.transcript().len(), 3);
        assert_eq!(react.transcript().as_slice()[0], Message::system("SYSTEM"));
        assert_eq!(react.transcript().as_slice()[1], Message::user("second"));
    }

    #[tokio::test]
    async fn sink_receives_every_append() {
        let provider = Arc::new(ScriptedProvider::replies(&[ADD_CALL, FINISH_5]));
        let sink = Arc::new(MemorySink::new());
        let mut react = agent(provider).with_sink(sink.clone());

        react.run("what is 2+3?").await.unwrap();

        assert_eq!(sink.messages(), react.transcript().as_slice().to_vec());
    }

    #[tokio::test]
    async fn events_trace_the_query() {
        let provider = Arc::new(ScriptedProvider::replies(&[ADD_CALL, FINISH_5]));
        let (tx, mut rx) = mpsc::channel(64);
        let mut react = agent(provider).with_events(tx);

        react.run("what is 2+3?").await.unwrap();
        drop(react);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.event_type());
        }
        assert_eq!(
            kinds,
            vec!["fragment", "tool_call", "observation", "fragment", "finished"]
        );
    }

    #[tokio::test]
    async fn from_config_renders_prompt_and_applies_settings() {
        let mut config = AppConfig::default();
        config.provider.model = "configured-model".into();
        config.agent.input = "a math question".into();
        config.agent.max_iterations = 1;

        let provider = Arc::new(ScriptedProvider::repeating(Turn::text(&["??"])));
        let mut react =
            ReactAgent::from_config(provider.clone(), Arc::new(math_tools()), &config).unwrap();

        assert!(react.system_prompt().contains("a math question"));
        assert!(react.system_prompt().contains("add(a: int, b: int)"));
        assert_eq!(react.model(), "configured-model");

        let err = react.run("q").await.unwrap_err();
        assert!(matches!(err, Error::IterationLimit { limit: 1 }));
        assert_eq!(provider.requests()[0].model, "configured-model");
    }

    #[test]
    fn from_config_fails_on_missing_template() {
        let mut config = AppConfig::default();
        config.agent.prompt_template = Some("/no/such/prompt.md".into());

        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let err = ReactAgent::from_config(provider, Arc::new(math_tools()), &config)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Template(_)));
    }

    #[tokio::test]
    async fn from_config_opens_transcript_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut config = AppConfig::default();
        config.agent.transcript_log = Some(path.clone());

        let provider = Arc::new(ScriptedProvider::replies(&[FINISH_5]));
        let mut react =
            ReactAgent::from_config(provider, Arc::new(math_tools()), &config).unwrap();
        react.run("q").await.unwrap();

        let entries = crate::sink::read_entries(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].content, "5");
    }
}
