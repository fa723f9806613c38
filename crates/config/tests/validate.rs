//! Tests for load-time validation.

use llmgate_config::GatewayDocument;

fn doc(toml: &str) -> GatewayDocument {
    let mut doc = GatewayDocument::scaffold();
    let extra = GatewayDocument::from_toml(toml).unwrap();
    doc.models = extra.models;
    doc
}

#[test]
fn scaffold_is_valid() {
    assert!(GatewayDocument::scaffold().issues().is_empty());
}

#[test]
fn missing_default_worker_is_reported() {
    let mut doc = GatewayDocument::scaffold();
    doc.server.model_worker.clear();
    let issues = doc.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].contains("model_worker.default is missing"));
}

#[test]
fn zero_port_and_bad_timeout_are_reported() {
    let mut doc = GatewayDocument::scaffold();
    doc.server.controller.port = Some(0);
    doc.server.httpx_default_timeout = -1.0;
    let issues = doc.issues();
    assert!(issues.iter().any(|i| i.contains("controller.port must not be 0")));
    assert!(issues.iter().any(|i| i.contains("httpx_default_timeout")));
}

#[test]
fn dual_membership_is_reported() {
    let doc = doc(
        r#"
        [ModelConfig.LocalModel.shared]
        path = "/models/shared"

        [ModelConfig.OnlineModel.shared]
        provider = "QwenWorker"
        "#,
    );
    let err = doc.validate().unwrap_err().to_string();
    assert!(err.contains("'shared' is declared in both LocalModel and OnlineModel"));
}

#[test]
fn unknown_or_missing_provider_is_reported() {
    let doc = doc(
        r#"
        [ModelConfig.OnlineModel.mystery]
        provider = "MysteryWorker"

        [ModelConfig.OnlineModel.bare]
        api_key = "sk"
        "#,
    );
    let issues = doc.issues();
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().any(|i| i.contains("unknown provider 'MysteryWorker'")));
    assert!(issues.iter().any(|i| i.contains("'bare' has no provider")));
}

#[test]
fn native_entries_need_required_fields() {
    let doc = doc(
        r#"
        [ModelConfig.NativeModel.Azure-OpenAI]
        api_key = "sk"
        api_version = " "

        [ModelConfig.NativeModel.Anthropic]
        api_key = "sk-ant"

        [ModelConfig.NativeModel.Gemini]
        api_key = "g"
        "#,
    );
    let issues = doc.issues();
    assert_eq!(issues.len(), 2, "{issues:?}");
    assert!(
        issues
            .iter()
            .any(|i| i.contains("'Azure-OpenAI' is missing api_base_url, api_version, deployment_name"))
    );
    assert!(issues.iter().any(|i| i.contains("'Gemini' is not a native provider")));
}

#[test]
fn validate_lists_every_issue() {
    let mut doc = GatewayDocument::scaffold();
    doc.server.model_worker.clear();
    doc.server.openai_api.port = Some(0);
    let err = doc.validate().unwrap_err().to_string();
    assert!(err.starts_with("invalid gateway config:"));
    assert_eq!(err.matches("\n  - ").count(), 2);
}
