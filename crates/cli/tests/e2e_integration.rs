//! End-to-end integration tests for the reactor agent.
//!
//! These tests exercise the full pipeline from user query to final answer:
//! config, prompt rendering, stream parsing, built-in tool execution and
//! the transcript log.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use reactor_agent::sink::read_entries;
use reactor_agent::{ReactAgent, ReactEvent};
use reactor_config::AppConfig;
use reactor_core::error::{Error, ProviderError};
use reactor_core::message::Role;
use reactor_core::provider::{Provider, ProviderRequest, ResponseStream, StreamChunk};
use reactor_tools::default_registry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Streams scripted replies fragment by fragment through a real channel,
/// counting how many fragments were actually handed to the consumer.
struct ScriptedProvider {
    replies: Mutex<Vec<Vec<String>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    sent: Arc<AtomicUsize>,
    producers: Mutex<Vec<JoinHandle<()>>>,
}

impl ScriptedProvider {
    fn new(replies: &[&[&str]]) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .rev()
                    .map(|r| r.iter().map(|f| f.to_string()).collect())
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            sent: Arc::new(AtomicUsize::new(0)),
            producers: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    /// Wait for every producer task, then report fragments sent.
    async fn fragments_sent(&self) -> usize {
        let handles: Vec<_> = self.producers.lock().unwrap().drain(..).collect();
        for handle in handles {
            handle.await.unwrap();
        }
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ResponseStream, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let Some(fragments) = self.replies.lock().unwrap().pop() else {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: "ScriptedProvider exhausted".into(),
            });
        };

        let (tx, stream) = ResponseStream::channel(1);
        let sent = Arc::clone(&self.sent);
        let producer = tokio::spawn(async move {
            for fragment in fragments {
                if tx.send(Ok(StreamChunk::text(fragment))).await.is_err() {
                    return;
                }
                sent.fetch_add(1, Ordering::SeqCst);
            }
            let _ = tx.send(Ok(StreamChunk::done(None))).await;
        });
        self.producers.lock().unwrap().push(producer);

        Ok(stream)
    }
}

fn agent_for(provider: Arc<ScriptedProvider>, config: &AppConfig) -> ReactAgent {
    ReactAgent::from_config(provider, Arc::new(default_registry()), config).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_add_then_finish() {
    let provider = Arc::new(ScriptedProvider::new(&[
        &[
            "To answer I need 2+3. ",
            "<tool>add</tool>",
            "<args>{\"a\": 2, \"b\": 3}</args>",
        ],
        &["<tool>finish</tool><args>{\"final_answer\": \"5\"}</args>"],
    ]));
    let mut agent = agent_for(provider.clone(), &AppConfig::default());

    let outcome = agent.run("what is 2+3?").await.unwrap();

    assert_eq!(outcome.answer, "5");
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.tool_calls, 1);
    assert_eq!(provider.calls(), 2);

    let second = provider.last_request();
    assert_eq!(second.messages[0].role, Role::System);
    assert!(second.messages[0].content.contains("add(a: int, b: int)"));
    assert_eq!(second.messages[3].content, "<observation>5</observation>");
}

#[tokio::test]
async fn e2e_generation_stops_at_close_marker() {
    let provider = Arc::new(ScriptedProvider::new(&[
        &[
            "<tool>calculator</tool>",
            "<args>{'expression': '(2 + 3) * 4'}",
            "</args>",
            "\n<observation>I will make this up</observation>",
            "\nmore", " and", " more", " text",
        ],
        &["<tool>finish</tool><args>{'final_answer': 20}</args>"],
    ]));
    let mut agent = agent_for(provider.clone(), &AppConfig::default());

    assert_eq!(agent.query("compute (2+3)*4").await.unwrap(), "20");

    // 3 fragments up to the marker, at most one more buffered in the
    // channel, then the producer sees the closed stream. The second reply
    // has a single fragment.
    let sent = provider.fragments_sent().await;
    assert!(sent <= 3 + 1 + 1, "sent {sent} fragments");

    let transcript = agent.transcript().as_slice();
    assert_eq!(
        transcript[2].content,
        "<tool>calculator</tool><args>{'expression': '(2 + 3) * 4'}</args>"
    );
    assert_eq!(transcript[3].content, "<observation>20</observation>");
}

#[tokio::test]
async fn e2e_recovers_from_unknown_tool_and_bad_args() {
    let provider = Arc::new(ScriptedProvider::new(&[
        &["<tool>multiply</tool><args>{'a': 2, 'b': 3}</args>"],
        &["<tool>add</tool><args>{'a': 'two', 'b': 3}</args>"],
        &["<tool>add</tool><args>{'a': 2, 'b': 3}</args>"],
        &["<tool>finish</tool><args>{'final_answer': '5'}</args>"],
    ]));
    let (tx, mut rx) = mpsc::channel(128);
    let mut agent = agent_for(provider.clone(), &AppConfig::default()).with_events(tx);

    let outcome = agent.run("what is 2+3?").await.unwrap();
    assert_eq!(outcome.answer, "5");
    assert_eq!(outcome.iterations, 4);
    assert_eq!(outcome.tool_calls, 2);

    let observations: Vec<String> = agent
        .transcript()
        .iter()
        .filter(|m| m.role == Role::User && m.content.starts_with("<observation>"))
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(observations.len(), 2);
    assert!(observations[0].contains("must be int"), "{}", observations[0]);
    assert_eq!(observations[1], "<observation>5</observation>");

    drop(agent);
    let mut no_observation = 0;
    while let Some(event) = rx.recv().await {
        if let ReactEvent::NoObservation { reason, .. } = event {
            assert!(reason.contains("multiply"));
            no_observation += 1;
        }
    }
    assert_eq!(no_observation, 1);
}

#[tokio::test]
async fn e2e_current_time_observation() {
    let provider = Arc::new(ScriptedProvider::new(&[
        &["<tool>current_time</tool><args>{'utc': True}</args>"],
        &["<tool>finish</tool><args>{'final_answer': 'done'}</args>"],
    ]));
    let mut agent = agent_for(provider, &AppConfig::default());

    agent.run("what time is it?").await.unwrap();

    let observation = &agent.transcript().as_slice()[3].content;
    assert!(observation.starts_with("<observation>"));
    assert!(observation.ends_with("+00:00</observation>"), "{observation}");
}

#[tokio::test]
async fn e2e_iteration_limit_from_config() {
    let provider = Arc::new(ScriptedProvider::new(&[
        &["I am thinking."],
        &["Still thinking."],
        &["<tool>finish</tool><args>{'final_answer': 'late'}</args>"],
    ]));
    let mut config = AppConfig::default();
    config.agent.max_iterations = 2;
    let mut agent = agent_for(provider.clone(), &config);

    let err = agent.run("q").await.unwrap_err();
    assert!(matches!(err, Error::IterationLimit { limit: 2 }));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn e2e_config_file_drives_agent() {
    let dir = tempfile::tempdir().unwrap();
    let prompt_path = dir.path().join("prompt.md");
    let log_path = dir.path().join("logs").join("transcript.jsonl");
    let config_path = dir.path().join("config.toml");

    std::fs::write(
        &prompt_path,
        "Input: {{ input }}\nTools: {{ tool_names }}\nStop with {{ finish_tool }}.",
    )
    .unwrap();
    std::fs::write(
        &config_path,
        format!(
            r#"
[provider]
model = "file-model"
temperature = 0.2

[agent]
input = "arithmetic questions"
finish_tool = "answer"
prompt_template = "{}"
transcript_log = "{}"
"#,
            prompt_path.display(),
            log_path.display()
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    let provider = Arc::new(ScriptedProvider::new(&[&[
        "<tool>answer</tool><args>{'final_answer': 'ok'}</args>",
    ]]));
    let mut agent = agent_for(provider.clone(), &config);

    assert_eq!(
        agent.system_prompt(),
        "Input: arithmetic questions\nTools: add, calculator, current_time\nStop with answer."
    );
    assert_eq!(agent.query("hi").await.unwrap(), "ok");

    let request = provider.last_request();
    assert_eq!(request.model, "file-model");
    assert!((request.temperature - 0.2).abs() < f32::EPSILON);

    let entries = read_entries(&log_path).unwrap();
    let roles: Vec<Role> = entries.iter().map(|e| e.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn e2e_provider_error_surfaces() {
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let mut agent = agent_for(provider, &AppConfig::default());

    let err = agent.run("q").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Provider(ProviderError::ApiError {
            status_code: 500,
            ..
        })
    ));
}

#[test]
fn e2e_local_provider_builds_without_key() {
    let mut config = AppConfig::default();
    config.provider.name = "ollama".into();
    config.provider.api_url = "http://localhost:11434/v1".into();

    let provider = reactor_providers::from_config(&config).unwrap();
    let agent = ReactAgent::from_config(provider, Arc::new(default_registry()), &config).unwrap();
    assert_eq!(agent.model(), config.provider.model);
}
