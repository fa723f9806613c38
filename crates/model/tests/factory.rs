//! Tests for client construction.

use gconfig::{ConfigStore, GatewayDocument, MemoryStore};
use llmgate_model::{BackendKind, ClientFactory, ClientOptions, factory::PLACEHOLDER_KEY};
use resolver::{Device, FixedProbe, NetworkDefaults, ProxyPolicy, Resolver};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

const MODELS: &str = r#"
[ModelConfig.LocalModel.chatglm3-6b]
Huggingface = "THUDM/chatglm3-6b"

[ModelConfig.OnlineModel.qwen-api]
provider = "QwenWorker"
api_key = "sk-qwen"
api_base_url = "https://dashscope.example.com/compatible-mode/v1"
openai_proxy = "http://proxy.example.com:8080"

[ModelConfig.LocalModel.shared]
Huggingface = "org/shared"

[ModelConfig.OnlineModel.shared]
provider = "QwenWorker"
api_key = "sk-shared"
api_base_url = "https://shared.example.com/v1"

[ModelConfig.OnlineModel.OpenAI]
provider = "QwenWorker"
api_base_url = "https://wrong.example.com/v1"

[ModelConfig.NativeModel.OpenAI]
api_key = "sk-openai"
model_name = "gpt-4o"

[ModelConfig.NativeModel.Anthropic]
api_key = "sk-ant"
"#;

fn doc() -> GatewayDocument {
    let mut doc = GatewayDocument::scaffold();
    doc.models = GatewayDocument::from_toml(MODELS).unwrap().models;
    doc
}

fn factory(doc: GatewayDocument) -> ClientFactory<MemoryStore, FixedProbe> {
    let resolver = Resolver::new(MemoryStore::new(doc)).with_probe(FixedProbe(Device::Cpu));
    let network = NetworkDefaults::new(ProxyPolicy::new(), Duration::from_secs(300));
    ClientFactory::new(resolver, network).unwrap()
}

#[test]
fn local_model_goes_through_gateway_api() {
    let client = factory(doc())
        .build_client("chatglm3-6b", ClientOptions::chat())
        .unwrap();
    let backend = client.backend();
    assert_eq!(backend.kind, BackendKind::OpenAICompatible);
    assert_eq!(backend.model, "chatglm3-6b");
    assert_eq!(backend.endpoint, "http://127.0.0.1:20000/v1/chat/completions");
    assert_eq!(backend.proxy, None);
}

#[test]
fn completion_mode_only_changes_the_endpoint() {
    let factory = factory(doc());
    let chat = factory.build_client("chatglm3-6b", ClientOptions::chat()).unwrap();
    let completion = factory
        .build_client("chatglm3-6b", ClientOptions::completion().echo(true))
        .unwrap();
    assert_eq!(
        completion.backend().endpoint,
        "http://127.0.0.1:20000/v1/completions"
    );
    assert_eq!(chat.backend().model, completion.backend().model);
    assert_eq!(chat.backend().kind, completion.backend().kind);
}

#[test]
fn online_model_uses_its_base_url_and_proxy() {
    let client = factory(doc())
        .build_client("qwen-api", ClientOptions::chat().temperature(0.7))
        .unwrap();
    let backend = client.backend();
    assert_eq!(backend.kind, BackendKind::OpenAICompatible);
    assert_eq!(
        backend.endpoint,
        "https://dashscope.example.com/compatible-mode/v1/chat/completions"
    );
    assert_eq!(backend.proxy.as_deref(), Some("http://proxy.example.com:8080"));
}

#[test]
fn model_in_both_catalogs_uses_its_online_settings() {
    let client = factory(doc())
        .build_client("shared", ClientOptions::chat())
        .unwrap();
    assert_eq!(
        client.backend().endpoint,
        "https://shared.example.com/v1/chat/completions"
    );
}

/// Store that counts how often it is read.
struct CountingStore {
    inner: MemoryStore,
    reads: Arc<AtomicUsize>,
}

impl ConfigStore for CountingStore {
    fn snapshot(&self) -> Arc<GatewayDocument> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.snapshot()
    }
}

#[test]
fn worker_client_reads_one_document() {
    let reads = Arc::new(AtomicUsize::new(0));
    let store = CountingStore {
        inner: MemoryStore::new(doc()),
        reads: reads.clone(),
    };
    let resolver = Resolver::new(store).with_probe(FixedProbe(Device::Cpu));
    let network = NetworkDefaults::new(ProxyPolicy::new(), Duration::from_secs(300));
    let factory = ClientFactory::new(resolver, network).unwrap();

    for name in ["chatglm3-6b", "qwen-api", "never-configured"] {
        reads.store(0, Ordering::SeqCst);
        factory.build_client(name, ClientOptions::chat()).unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1, "{name}");
    }
}

#[test]
fn unknown_model_still_builds_against_gateway() {
    let client = factory(doc())
        .build_client("never-configured", ClientOptions::default())
        .unwrap();
    assert_eq!(client.backend().model, "never-configured");
    assert_eq!(
        client.backend().endpoint,
        "http://127.0.0.1:20000/v1/chat/completions"
    );
    assert_eq!(PLACEHOLDER_KEY, "EMPTY");
}

#[test]
fn native_name_ignores_online_entry() {
    let client = factory(doc())
        .build_client("OpenAI", ClientOptions::chat())
        .unwrap();
    let backend = client.backend();
    assert_eq!(backend.kind, BackendKind::OpenAI);
    assert_eq!(backend.model, "gpt-4o");
    assert_eq!(backend.endpoint, "https://api.openai.com/v1/chat/completions");
}

#[test]
fn azure_requires_deployment_settings() {
    let mut doc = doc();
    let azure = GatewayDocument::from_toml(
        r#"
        [ModelConfig.NativeModel.Azure-OpenAI]
        api_key = "sk-azure"
        api_base_url = "https://example.openai.azure.com"
        "#,
    )
    .unwrap();
    doc.models.native.extend(azure.models.native);

    let err = factory(doc.clone())
        .build_client("Azure-OpenAI", ClientOptions::chat())
        .unwrap_err()
        .to_string();
    assert!(err.contains("api_version, deployment_name"), "{err}");

    let entry = doc.models.native.get_mut("Azure-OpenAI").unwrap();
    entry.api_version = Some("2024-02-01".into());
    entry.deployment_name = Some("gpt4-prod".into());
    let client = factory(doc)
        .build_client("Azure-OpenAI", ClientOptions::completion())
        .unwrap();
    let backend = client.backend();
    assert_eq!(backend.kind, BackendKind::AzureOpenAI);
    assert_eq!(backend.model, "gpt4-prod");
    assert_eq!(
        backend.endpoint,
        "https://example.openai.azure.com/openai/deployments/gpt4-prod/completions?api-version=2024-02-01"
    );
}

#[test]
fn anthropic_needs_only_a_key() {
    let client = factory(doc())
        .build_client("Anthropic", ClientOptions::chat())
        .unwrap();
    let backend = client.backend();
    assert_eq!(backend.kind, BackendKind::Anthropic);
    assert_eq!(backend.endpoint, "https://api.anthropic.com/v1/messages");
    assert_eq!(backend.model, llmgate_model::factory::DEFAULT_ANTHROPIC_MODEL);
}

#[test]
fn unconfigured_native_provider_is_an_error() {
    let mut doc = doc();
    doc.models.native.clear();
    let err = factory(doc)
        .build_client("Anthropic", ClientOptions::chat())
        .unwrap_err();
    assert!(err.to_string().contains("NativeModel.Anthropic"));
}

#[test]
fn missing_gateway_address_is_an_error() {
    let mut doc = doc();
    doc.server.openai_api.port = None;
    let factory = factory(doc);
    assert!(
        factory
            .build_client("chatglm3-6b", ClientOptions::chat())
            .is_err()
    );
    // An online entry with its own base URL does not need the gateway.
    assert!(factory.build_client("qwen-api", ClientOptions::chat()).is_ok());
}

#[test]
fn custom_timeout_builds_a_dedicated_client() {
    let client = factory(doc())
        .build_client(
            "chatglm3-6b",
            ClientOptions::chat().timeout(Duration::from_secs(5)),
        )
        .unwrap();
    assert_eq!(client.options().timeout, Some(Duration::from_secs(5)));
}
