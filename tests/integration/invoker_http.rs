//! HTTP invoker against a mock automation process

use mockito::Matcher;
use sdm_invoke::config::EndpointConfig;
use sdm_invoke::correlation::CorrelationIdGenerator;
use sdm_invoke::error::InvokeError;
use sdm_invoke::invocation::{Invocation, Target};
use sdm_invoke::invoker::{CommandInvoker, HttpCommandInvoker};
use sdm_invoke::port::PortAllocator;
use serde_json::json;
use std::sync::Arc;

fn invoker(base_url: &str, token: Option<&str>) -> HttpCommandInvoker {
    let ports = Arc::new(PortAllocator::with_range("127.0.0.1", 34000, 34500));
    let correlation = Arc::new(CorrelationIdGenerator::new("cli", std::process::id(), ports));
    let endpoint = EndpointConfig {
        base_url: base_url.to_string(),
        ..EndpointConfig::default()
    };
    HttpCommandInvoker::new(endpoint, correlation, token.map(str::to_string)).unwrap()
}

fn deploy() -> Invocation {
    let mut invocation = Invocation::new(
        "deploy",
        Target {
            id: "T1".to_string(),
            name: "acme".to_string(),
        },
    );
    invocation.parameters.insert("env", "dev");
    invocation.correlation_id = Some("cli-34001-storefront-1700000000000".to_string());
    invocation
}

#[tokio::test]
async fn test_missing_endpoint_is_configuration_error() {
    let err = invoker("  ", None).invoke(&deploy()).await.unwrap_err();
    assert!(matches!(err, InvokeError::Configuration(_)));
}

#[tokio::test]
async fn test_invocation_wire_shape() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/command")
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({
                "command": "deploy",
                "correlation_id": "cli-34001-storefront-1700000000000",
                "api_version": "1",
                "team": { "id": "T1", "name": "acme" }
            })),
            Matcher::Regex(r#""parameters":\[\{"name":"env","value":"dev"\}\]"#.to_string()),
            Matcher::Regex(r#"\{"name":"slackTeam","value":"T1"\}"#.to_string()),
            Matcher::Regex(r#"\{"uri":"github://org_token","value":"tok"\}"#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":0,"message":"queued"}"#)
        .create_async()
        .await;

    let result = invoker(&server.url(), Some("tok"))
        .invoke(&deploy())
        .await
        .unwrap();
    assert!(result.is_success());
    assert_eq!(result.message.as_deref(), Some("queued"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/command")
        .with_status(200)
        .with_body(r#"{"code":0}"#)
        .create_async()
        .await;

    let base = format!("{}/", server.url());
    invoker(&base, None).invoke(&deploy()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_zero_code_is_a_result_not_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/command")
        .with_status(500)
        .with_body(r#"{"code":2,"message":"handler threw"}"#)
        .create_async()
        .await;

    let result = invoker(&server.url(), None).invoke(&deploy()).await.unwrap();
    assert!(!result.is_success());
    assert_eq!(result.code, 2);
}

#[tokio::test]
async fn test_undecodable_response_is_transport_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/command")
        .with_status(502)
        .with_body("<html>bad gateway</html>")
        .create_async()
        .await;

    let err = invoker(&server.url(), None)
        .invoke(&deploy())
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::Transport(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let err = invoker("http://127.0.0.1:9", None)
        .invoke(&deploy())
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::Transport(_)));
}

#[tokio::test]
async fn test_registration_decodes_handlers() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/registration")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "name": "@acme/sdm",
                "version": "1.2.0",
                "commands": [{
                    "name": "deploy",
                    "parameters": [{ "name": "env", "required": true, "pattern": "^(dev|prod)$" }],
                    "mapped_parameters": [{ "name": "owner", "uri": "atomist://github/repository/owner", "required": true }]
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let registration = invoker(&server.url(), None).registration().await.unwrap();
    let deploy = registration.command("deploy").unwrap();
    assert!(deploy.parameters[0].required);
    assert!(deploy.parameters[0].displayable);
    assert_eq!(deploy.mapped_parameters[0].name, "owner");
    assert!(registration.command("rollback").is_err());
}
