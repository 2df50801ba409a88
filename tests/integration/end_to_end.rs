//! Full runs: orchestrator, HTTP invoker, mock automation process, and callback listener

use mockito::Matcher;
use parking_lot::Mutex;
use sdm_invoke::config::EndpointConfig;
use sdm_invoke::context::ExecutionContext;
use sdm_invoke::correlation::{listener_port, CorrelationIdGenerator};
use sdm_invoke::error::InvokeError;
use sdm_invoke::invocation::ArgumentSet;
use sdm_invoke::invoker::{CommandInvoker, HttpCommandInvoker};
use sdm_invoke::listener::{IgnoreMessages, ListenerMessage, MessageSink};
use sdm_invoke::metadata::{CommandMetadata, MappedParameterDeclaration, ParameterDeclaration};
use sdm_invoke::orchestrator::{ExitDisposition, ListenerSettings, Orchestrator, RunState};
use sdm_invoke::port::PortAllocator;
use sdm_invoke::prompt::{NoPrompt, PromptRequest, Prompter};
use sdm_invoke::resolver::uris;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Answers prompts from a script and records which parameters were asked for.
struct Scripted {
    answers: VecDeque<String>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl Prompter for Scripted {
    fn ask(&mut self, request: &PromptRequest) -> Result<String, InvokeError> {
        self.asked.lock().push(request.name.clone());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

#[derive(Default)]
struct Collected(Mutex<Vec<String>>);

impl MessageSink for Collected {
    fn message(&self, payload: &str) {
        self.0.lock().push(payload.to_string());
    }
}

fn deploy_metadata() -> CommandMetadata {
    let mut deploy = CommandMetadata::new("deploy");
    deploy.parameters.push(
        ParameterDeclaration::new("env")
            .required()
            .with_pattern("^(dev|prod)$")
            .with_valid_input("dev or prod"),
    );
    deploy.mapped_parameters.push(MappedParameterDeclaration::new(
        "owner",
        uris::REPOSITORY_OWNER,
        true,
    ));
    deploy
}

fn orchestrator(
    base_url: &str,
    context: ExecutionContext,
    lower: u16,
    prompter: Box<dyn Prompter>,
    sink: Arc<dyn MessageSink>,
) -> Orchestrator {
    let ports = Arc::new(PortAllocator::with_range("127.0.0.1", lower, lower + 500));
    let correlation = Arc::new(CorrelationIdGenerator::new(
        "cli",
        context.pid,
        Arc::clone(&ports),
    ));
    let endpoint = EndpointConfig {
        base_url: base_url.to_string(),
        ..EndpointConfig::default()
    };
    let invoker: Arc<dyn CommandInvoker> = Arc::new(
        HttpCommandInvoker::new(endpoint, Arc::clone(&correlation), context.token.clone())
            .unwrap(),
    );
    Orchestrator::new(context, ports, correlation, invoker, prompter, sink)
        .with_listener_settings(ListenerSettings {
            grace: Duration::ZERO,
            completion_timeout: Some(Duration::from_secs(10)),
            ..ListenerSettings::default()
        })
}

#[tokio::test]
async fn test_prompted_run_waits_for_completion() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/command")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "command": "deploy", "team": { "id": "T1" } })),
            Matcher::Regex(r#"\{"name":"env","value":"dev"\}"#.to_string()),
            Matcher::Regex(r#"\{"name":"owner","value":"acme"\}"#.to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"code":0}"#)
        .create_async()
        .await;

    let asked = Arc::new(Mutex::new(Vec::new()));
    let prompter = Scripted {
        answers: VecDeque::from(vec!["dev".to_string()]),
        asked: Arc::clone(&asked),
    };
    let sink = Arc::new(Collected::default());
    let context = ExecutionContext::new("/src/acme/storefront", "T1", "acme");
    let mut orchestrator = orchestrator(
        &server.url(),
        context,
        31000,
        Box::new(prompter),
        Arc::clone(&sink) as Arc<dyn MessageSink>,
    );

    let outcome = orchestrator
        .run(&deploy_metadata(), ArgumentSet::new())
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(asked.lock().clone(), vec!["env".to_string()]);
    assert!(!outcome.can_terminate());

    let correlation_id = outcome.invocation.correlation_id.clone().unwrap();
    let port = outcome.listener_port();
    assert_eq!(listener_port(&correlation_id), Some(port));
    assert!(correlation_id.starts_with(&format!("cli-{}-storefront-", port)));

    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/message", port);
    let status = client
        .post(&url)
        .json(&ListenerMessage::message("Deploying storefront to dev"))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status.as_u16(), 202);
    client
        .post(&url)
        .json(&ListenerMessage::completed(correlation_id))
        .send()
        .await
        .unwrap();

    let disposition = outcome.finish().await.unwrap();
    assert_eq!(disposition, ExitDisposition::Immediate);
    assert_eq!(disposition.exit_code(), 0);
    assert_eq!(
        sink.0.lock().clone(),
        vec!["Deploying storefront to dev".to_string()]
    );
}

#[tokio::test]
async fn test_completion_arriving_later_is_awaited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/command")
        .with_status(200)
        .with_body(r#"{"code":0}"#)
        .create_async()
        .await;

    let context = ExecutionContext::new("/src/acme/storefront", "T1", "acme");
    let mut orchestrator = orchestrator(
        &server.url(),
        context,
        31600,
        Box::new(NoPrompt),
        Arc::new(IgnoreMessages),
    );
    let cli_args: ArgumentSet = [("env", "prod")].into_iter().collect();
    let outcome = orchestrator.run(&deploy_metadata(), cli_args).await.unwrap();

    let port = outcome.listener_port();
    let correlation_id = outcome.invocation.correlation_id.clone().unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        reqwest::Client::new()
            .post(format!("http://127.0.0.1:{}/message", port))
            .json(&ListenerMessage::completed(correlation_id))
            .send()
            .await
            .unwrap();
    });

    assert_eq!(
        outcome.finish().await.unwrap(),
        ExitDisposition::AfterCompletion
    );
}

#[tokio::test]
async fn test_unresolvable_mapping_never_reaches_the_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/command")
        .expect(0)
        .create_async()
        .await;

    let mut metadata = CommandMetadata::new("audit");
    metadata.mapped_parameters.push(MappedParameterDeclaration::new(
        "channel",
        "atomist://slack/channel",
        true,
    ));
    let context = ExecutionContext::new("/src/acme/storefront", "T1", "acme");
    let mut orchestrator = orchestrator(
        &server.url(),
        context,
        32200,
        Box::new(NoPrompt),
        Arc::new(IgnoreMessages),
    );

    let err = orchestrator
        .run(&metadata, ArgumentSet::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, InvokeError::Resolution { .. }));
    assert_eq!(orchestrator.state(), RunState::Exit);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invalid_supplied_value_without_prompting_aborts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/command")
        .expect(0)
        .create_async()
        .await;

    let context = ExecutionContext::new("/src/acme/storefront", "T1", "acme");
    let mut orchestrator = orchestrator(
        &server.url(),
        context,
        32800,
        Box::new(NoPrompt),
        Arc::new(IgnoreMessages),
    );
    let cli_args: ArgumentSet = [("env", "staging")].into_iter().collect();
    let err = orchestrator
        .run(&deploy_metadata(), cli_args)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, InvokeError::Configuration(_)));
    mock.assert_async().await;
}
