//! Tests for worker and transcription config resolution.

use gconfig::{GatewayDocument, MemoryStore, WorkerClass};
use llmgate_resolver::{
    Device, DeviceProbe, FixedProbe, ModelSource, Resolver, WorkerBackend, WorkerConfig,
    device,
    worker::{resolve_transcription, resolve_worker},
};

const GATEWAY: &str = r#"
[ServerConfig]
default_host_ip = "0.0.0.0"

[ServerConfig.model_worker.default]
port = 21002
vllm_enable = false

[ServerConfig.model_worker.vicuna]
port = 21020
vllm_enable = true

[ServerConfig.vtot_model_worker]
port = 21100

[ModelConfig.LocalModel.chatglm3-6b]
path = "/definitely/not/here"
Huggingface = "THUDM/chatglm3-6b"
device = "gpu"
loadbits = 8
maxmemory = 24

[ModelConfig.LocalModel.vicuna]
device = "tpu"

[ModelConfig.LocalModel.shared]
Huggingface = "org/shared"
device = "CPU"

[ModelConfig.OnlineModel.shared]
provider = "QwenWorker"
api_key = "sk-shared"
api_base_url = "https://shared.example.com/v1"
device = "cuda"
group_id = "g-1"

[ModelConfig.OnlineModel.qwen-api]
provider = "QwenWorker"
api_key = "sk-qwen"
api_base_url = "https://dashscope.example.com/v1"
openai_proxy = "http://proxy:8080"
version = "qwen-max"

[ModelConfig.OnlineModel.mystery]
provider = "MysteryWorker"
api_key = "sk"

[ModelConfig.VtoTModel.whisper]
Huggingface = "openai/whisper-large-v3"
device = "gpu"

[ModelConfig.VtoTModel.whisper-int8]
Huggingface = "openai/whisper-large-v3"
loadbits = 8
"#;

fn doc() -> GatewayDocument {
    GatewayDocument::from_toml(GATEWAY).unwrap()
}

const CPU: FixedProbe = FixedProbe(Device::Cpu);

fn defaults() -> WorkerConfig {
    WorkerConfig {
        host: Some("0.0.0.0".into()),
        port: Some(21002),
        vllm_enable: false,
        backend: None,
    }
}

#[test]
fn empty_name_yields_server_defaults() {
    assert_eq!(resolve_worker(&doc(), "", &CPU), defaults());
}

#[test]
fn unknown_name_yields_defaults() {
    assert_eq!(resolve_worker(&doc(), "nobody", &CPU), defaults());
}

#[test]
fn local_model_settings() {
    let config = resolve_worker(&doc(), "chatglm3-6b", &CPU);
    let local = config.local().unwrap();
    // The path does not exist, so the hub id is used.
    assert_eq!(
        local.model_path,
        Some(ModelSource::Hub("THUDM/chatglm3-6b".into()))
    );
    assert_eq!(local.device, Device::Cuda);
    assert_eq!(local.load_bits, 8);
    assert!(local.load_8bit);
    assert_eq!(local.max_gpu_memory, "24GiB");
    assert!(config.online().is_none());
}

#[test]
fn local_model_defaults_and_worker_override() {
    let config = resolve_worker(&doc(), "vicuna", &FixedProbe(Device::Mps));
    assert_eq!(config.port, Some(21020));
    assert!(config.vllm_enable);

    let local = config.local().unwrap();
    assert_eq!(local.model_path, None);
    // "tpu" is not a known device, so detection decides.
    assert_eq!(local.device, Device::Mps);
    assert_eq!(local.load_bits, 16);
    assert!(!local.load_8bit);
    assert_eq!(local.max_gpu_memory, "20GiB");
}

#[test]
fn existing_directory_wins_over_hub_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = doc();
    let entry = doc.models.local.get_mut("chatglm3-6b").unwrap();
    entry.path = Some(dir.path().display().to_string());

    let config = resolve_worker(&doc, "chatglm3-6b", &CPU);
    assert_eq!(
        config.local().unwrap().model_path,
        Some(ModelSource::Local(dir.path().to_path_buf()))
    );
}

#[test]
fn online_model_settings() {
    let config = resolve_worker(&doc(), "qwen-api", &CPU);
    assert_eq!(config.port, Some(21002));
    let online = config.online().unwrap();
    assert_eq!(online.provider.as_deref(), Some("QwenWorker"));
    assert_eq!(online.worker_class, Some(WorkerClass::Qwen));
    assert_eq!(online.api_key.as_deref(), Some("sk-qwen"));
    assert_eq!(
        online.api_base_url.as_deref(),
        Some("https://dashscope.example.com/v1")
    );
    assert_eq!(online.proxy.as_deref(), Some("http://proxy:8080"));
    assert_eq!(online.extra["version"], "qwen-max");
}

#[test]
fn unknown_provider_resolves_without_worker_class() {
    let config = resolve_worker(&doc(), "mystery", &CPU);
    let online = config.online().unwrap();
    assert_eq!(online.provider.as_deref(), Some("MysteryWorker"));
    assert_eq!(online.worker_class, None);
    assert_eq!(online.api_key.as_deref(), Some("sk"));
}

#[test]
fn dual_membership_keeps_both_records() {
    let config = resolve_worker(&doc(), "shared", &CPU);
    match &config.backend {
        Some(WorkerBackend::Dual { local, online }) => {
            assert_eq!(local.device, Device::Cpu);
            assert_eq!(local.model_path, Some(ModelSource::Hub("org/shared".into())));
            assert_eq!(online.worker_class, Some(WorkerClass::Qwen));
            assert_eq!(online.api_key.as_deref(), Some("sk-shared"));
            assert_eq!(
                online.api_base_url.as_deref(),
                Some("https://shared.example.com/v1")
            );
            assert!(!online.extra.contains_key("device"));
            assert_eq!(online.extra["group_id"], "g-1");
        }
        other => panic!("expected both records, got {other:?}"),
    }
    assert!(config.local().is_some());
    assert!(config.online().is_some());
}

#[test]
fn resolution_is_idempotent() {
    let resolver = Resolver::new(MemoryStore::new(doc())).with_probe(CPU);
    for name in ["", "chatglm3-6b", "qwen-api", "mystery", "shared", "nobody"] {
        assert_eq!(resolver.worker(name), resolver.worker(name), "{name}");
    }
}

#[test]
fn resolver_sees_store_updates() {
    let store = MemoryStore::new(doc());
    let resolver = Resolver::new(store.clone()).with_probe(CPU);
    assert!(resolver.worker("late").backend.is_none());

    let qwen = doc().models.online["qwen-api"].clone();
    store.update(|doc| {
        doc.models.online.insert("late".into(), qwen);
    });
    assert!(resolver.worker("late").online().is_some());
}

#[test]
fn transcription_settings() {
    let doc = doc();
    let config = resolve_transcription(&doc, "whisper", &CPU);
    assert_eq!(config.address().unwrap().origin(), "http://127.0.0.1:21100");
    let model = config.model.unwrap();
    assert_eq!(
        model.model_path,
        Some(ModelSource::Hub("openai/whisper-large-v3".into()))
    );
    assert_eq!(model.huggingface.as_deref(), Some("openai/whisper-large-v3"));
    assert_eq!(model.device, Device::Cuda);
    assert_eq!(model.load_bits, 16);

    let int8 = resolve_transcription(&doc, "whisper-int8", &CPU).model.unwrap();
    assert_eq!(int8.load_bits, 8);
    assert_eq!(int8.device, Device::Cpu);

    let bare = resolve_transcription(&doc, "", &CPU);
    assert_eq!(bare.port, Some(21100));
    assert!(bare.model.is_none());
    assert!(resolve_transcription(&doc, "nobody", &CPU).model.is_none());
}

#[test]
fn device_normalization() {
    assert_eq!(device::normalize(Some("gpu"), &CPU), Device::Cuda);
    assert_eq!(device::normalize(Some(" MPS "), &CPU), Device::Mps);
    assert_eq!(device::normalize(Some("cpu"), &FixedProbe(Device::Cuda)), Device::Cpu);
    assert_eq!(device::normalize(Some("auto"), &FixedProbe(Device::Cuda)), Device::Cuda);
    assert_eq!(device::normalize(None, &FixedProbe(Device::Mps)), Device::Mps);
}

struct NoAccelerator;

impl DeviceProbe for NoAccelerator {
    fn cuda_available(&self) -> bool {
        false
    }

    fn mps_available(&self) -> bool {
        false
    }
}

struct Both;

impl DeviceProbe for Both {
    fn cuda_available(&self) -> bool {
        true
    }

    fn mps_available(&self) -> bool {
        true
    }
}

#[test]
fn detection_prefers_cuda_then_mps_then_cpu() {
    assert_eq!(NoAccelerator.detect(), Device::Cpu);
    assert_eq!(Both.detect(), Device::Cuda);
    assert_eq!(FixedProbe(Device::Mps).detect(), Device::Mps);
}
