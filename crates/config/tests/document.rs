//! Tests for parsing the gateway document.

use llmgate_config::{GatewayDocument, NativeProvider, WorkerClass, utils::expand_with};

const GATEWAY: &str = r#"
[ServerConfig]
default_host_ip = "0.0.0.0"

[ServerConfig.fastchat_controller]
port = 20001

[ServerConfig.fastchat_openai_api]
port = 20000

[ServerConfig.fastchat_model_worker.default]
port = 21002
vllm_enable = false

[ServerConfig.fastchat_model_worker.chatglm3-6b]
port = 21010
vllm_enable = true

[ServerConfig.vtot_model_worker]
port = 21100

[ModelConfig.LocalModel.chatglm3-6b]
path = "/models/chatglm3-6b"
Huggingface = "THUDM/chatglm3-6b"
device = "gpu"
loadbits = 8
maxmemory = 24

[ModelConfig.OnlineModel.qwen-api]
provider = "QwenWorker"
api_key = "sk-qwen"
version = "qwen-max"

[ModelConfig.OnlineModel.spark-api]
provider = "XingHuoWorker"
openai_proxy = "http://proxy:8080"
APPID = "app"

[ModelConfig.VtoTModel.whisper-large-v3]
path = "/models/whisper"
Huggingface = "openai/whisper-large-v3"
device = "cuda"
loadbits = 16

[ModelConfig.EmbeddingModel.bge-large-zh]
Huggingface = "BAAI/bge-large-zh"
"#;

#[test]
fn parse_server_config_with_legacy_role_names() {
    let doc = GatewayDocument::from_toml(GATEWAY).unwrap();
    let server = &doc.server;
    assert_eq!(server.default_host_ip.as_deref(), Some("0.0.0.0"));
    assert_eq!(server.controller.port, Some(20001));
    assert_eq!(server.openai_api.port, Some(20000));
    assert_eq!(server.vtot_model_worker.port, Some(21100));
    assert_eq!(server.httpx_default_timeout, 300.0);

    let defaults = server.worker_defaults().unwrap();
    assert_eq!(defaults.port, Some(21002));
    assert_eq!(defaults.vllm_enable, Some(false));
    assert_eq!(server.worker_override("chatglm3-6b").unwrap().port, Some(21010));
    assert!(server.worker_override("default").is_none());
}

#[test]
fn parse_catalogs() {
    let doc = GatewayDocument::from_toml(GATEWAY).unwrap();
    let local = &doc.models.local["chatglm3-6b"];
    assert_eq!(local.huggingface.as_deref(), Some("THUDM/chatglm3-6b"));
    assert_eq!(local.loadbits, Some(8));
    assert_eq!(local.maxmemory, Some(24));

    let qwen = &doc.models.online["qwen-api"];
    assert_eq!(qwen.provider.as_deref(), Some("QwenWorker"));
    assert_eq!(qwen.extra["version"], "qwen-max");

    let spark = &doc.models.online["spark-api"];
    assert_eq!(spark.api_proxy.as_deref(), Some("http://proxy:8080"));
    assert_eq!(spark.extra["APPID"], "app");

    assert_eq!(doc.models.vtot["whisper-large-v3"].loadbits, Some(16));
    assert!(doc.models.native.is_empty());
}

#[test]
fn parse_json_document() {
    let json = r#"{
        "ServerConfig": {
            "default_host_ip": "127.0.0.1",
            "fastchat_model_worker": {"default": {"port": 21002, "vllm_enable": true}}
        },
        "ModelConfig": {
            "NativeModel": {"OpenAI": {"api_key": "sk", "model_name": "gpt-4o"}}
        }
    }"#;
    let doc = GatewayDocument::from_json(json).unwrap();
    assert_eq!(doc.server.worker_defaults().unwrap().vllm_enable, Some(true));
    assert_eq!(
        doc.models.native["OpenAI"].model_name.as_deref(),
        Some("gpt-4o")
    );
}

#[test]
fn empty_document_uses_defaults() {
    let doc = GatewayDocument::from_toml("").unwrap();
    assert!(doc.server.default_host_ip.is_none());
    assert_eq!(doc.server.httpx_default_timeout, 300.0);
    assert!(doc.models.local.is_empty());
}

#[test]
fn load_picks_format_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("gateway.json");
    std::fs::write(&json_path, r#"{"ServerConfig": {"default_host_ip": "10.0.0.1"}}"#).unwrap();
    let doc = GatewayDocument::load(&json_path).unwrap();
    assert_eq!(doc.server.default_host_ip.as_deref(), Some("10.0.0.1"));

    let toml_path = dir.path().join("gateway.toml");
    std::fs::write(&toml_path, GATEWAY).unwrap();
    let doc = GatewayDocument::load(&toml_path).unwrap();
    assert_eq!(doc.models.local.len(), 1);
}

#[test]
fn load_reports_path_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[ServerConfig\n").unwrap();
    let err = GatewayDocument::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.toml"));
}

#[test]
fn scaffold_round_trips_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("gateway.toml");
    GatewayDocument::write_scaffold(&path).unwrap();
    let doc = GatewayDocument::load(&path).unwrap();
    assert_eq!(doc, GatewayDocument::scaffold());
    doc.validate().unwrap();
}

#[test]
fn listing_groups_models() {
    let doc = GatewayDocument::from_toml(GATEWAY).unwrap();
    let listing = doc.list_llm_models();
    assert_eq!(listing.local, vec!["chatglm3-6b"]);
    assert_eq!(listing.online, vec!["qwen-api", "spark-api"]);
    assert_eq!(listing.worker, vec!["chatglm3-6b"]);
    assert_eq!(doc.list_embed_models(), vec!["bge-large-zh"]);
    // Qwen serves embeddings, Spark does not.
    assert_eq!(doc.list_online_embed_models(), vec!["qwen-api"]);
}

#[test]
fn worker_class_names_round_trip() {
    for class in WorkerClass::ALL {
        assert_eq!(class.name().parse::<WorkerClass>().unwrap(), class);
    }
    let err = "NoSuchWorker".parse::<WorkerClass>().unwrap_err();
    assert!(err.to_string().contains("unknown provider 'NoSuchWorker'"));
}

#[test]
fn native_provider_matches_exact_names_only() {
    assert_eq!(
        NativeProvider::from_model_name("Azure-OpenAI"),
        Some(NativeProvider::AzureOpenAI)
    );
    assert_eq!(
        NativeProvider::from_model_name("OpenAI"),
        Some(NativeProvider::OpenAI)
    );
    assert_eq!(
        NativeProvider::from_model_name("Anthropic"),
        Some(NativeProvider::Anthropic)
    );
    assert_eq!(NativeProvider::from_model_name("openai"), None);
    assert_eq!(NativeProvider::from_model_name("gpt-4o"), None);
}

#[test]
fn expand_env_references() {
    let lookup = |name: &str| match name {
        "KEY" => Some("secret".to_owned()),
        "EMPTY" => Some(String::new()),
        _ => None,
    };
    assert_eq!(expand_with("api_key = \"${KEY}\"", lookup), "api_key = \"secret\"");
    assert_eq!(expand_with("${MISSING}", lookup), "");
    assert_eq!(expand_with("${MISSING:-fallback}", lookup), "fallback");
    assert_eq!(expand_with("${EMPTY:-fallback}", lookup), "fallback");
    assert_eq!(expand_with("a ${KEY} b ${KEY}", lookup), "a secret b secret");
    assert_eq!(expand_with("cost: $5 ${unterminated", lookup), "cost: $5 ${unterminated");
}
