//! Worker configuration resolution.
//!
//! A worker config is rebuilt from the current document on every call: the
//! `default` worker entry, layered with the model's own worker entry, plus
//! the model's catalog entry turned into an online or local backend.

use crate::{
    address::ResolvedAddress,
    device::{self, Device, DeviceProbe},
};
use gconfig::{GatewayDocument, LocalModel, OnlineModel, VtotModel, WorkerClass, WorkerEntry};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, path::PathBuf};

/// Load bit-width when a local model does not set `loadbits`.
pub const DEFAULT_LOAD_BITS: u32 = 16;

/// GPU memory cap in GiB when a local model does not set `maxmemory`.
pub const DEFAULT_MAX_GPU_MEMORY_GIB: u32 = 20;

/// Merged worker configuration for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerConfig {
    /// Worker bind host.
    pub host: Option<String>,
    /// Worker bind port.
    pub port: Option<u16>,
    /// Serve through vLLM.
    pub vllm_enable: bool,
    /// Catalog-derived backend; `None` for unknown or empty model names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<WorkerBackend>,
}

impl WorkerConfig {
    /// The online settings, if the model has an online entry.
    pub fn online(&self) -> Option<&OnlineWorker> {
        match &self.backend {
            Some(WorkerBackend::Online(online) | WorkerBackend::Dual { online, .. }) => {
                Some(online)
            }
            _ => None,
        }
    }

    /// The local settings, if the model has a local entry.
    pub fn local(&self) -> Option<&LocalWorker> {
        match &self.backend {
            Some(WorkerBackend::Local(local) | WorkerBackend::Dual { local, .. }) => Some(local),
            _ => None,
        }
    }

    /// Connectable address of the worker.
    pub fn address(&self) -> Option<ResolvedAddress> {
        ResolvedAddress::from_parts(self.host.as_deref(), self.port)
    }
}

/// Where a model is served from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkerBackend {
    /// A remote provider behind a worker class.
    Online(OnlineWorker),
    /// A local worker process.
    Local(LocalWorker),
    /// Declared in both catalogs. Both records are kept; online extra
    /// fields that name a local setting are dropped in favour of it.
    Dual {
        local: LocalWorker,
        online: OnlineWorker,
    },
}

/// Online provider settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnlineWorker {
    /// Raw `provider` value from the catalog.
    pub provider: Option<String>,
    /// Worker class `provider` names; `None` when unknown or missing.
    pub worker_class: Option<WorkerClass>,
    /// Provider API key.
    pub api_key: Option<String>,
    /// Provider API base URL.
    pub api_base_url: Option<String>,
    /// Provider API version.
    pub api_version: Option<String>,
    /// Proxy for this provider only.
    pub proxy: Option<String>,
    /// Remaining provider-specific fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OnlineWorker {
    /// Fields set by the local record that online extras must not shadow.
    const LOCAL_KEYS: [&str; 9] = [
        "path",
        "Huggingface",
        "huggingface",
        "device",
        "loadbits",
        "maxmemory",
        "model_path",
        "load_8bit",
        "max_gpu_memory",
    ];

    fn resolve(name: &str, entry: &OnlineModel) -> Self {
        let worker_class = match entry.provider.as_deref() {
            Some(provider) => match provider.parse::<WorkerClass>() {
                Ok(class) => Some(class),
                Err(e) => {
                    tracing::warn!("online model '{name}' has a provider configuration error: {e}");
                    None
                }
            },
            None => None,
        };
        Self {
            provider: entry.provider.clone(),
            worker_class,
            api_key: entry.api_key.clone(),
            api_base_url: entry.api_base_url.clone(),
            api_version: entry.api_version.clone(),
            proxy: entry.api_proxy.clone(),
            extra: entry.extra.clone(),
        }
    }
}

/// Local worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalWorker {
    /// Where the weights come from; `None` when neither source is set.
    pub model_path: Option<ModelSource>,
    /// Device the model loads onto.
    pub device: Device,
    /// Load bit-width.
    pub load_bits: u32,
    /// Load in 8-bit mode.
    pub load_8bit: bool,
    /// GPU memory cap, e.g. `20GiB`.
    pub max_gpu_memory: String,
}

impl LocalWorker {
    fn resolve(entry: &LocalModel, probe: &impl DeviceProbe) -> Self {
        let load_bits = entry.loadbits.unwrap_or(DEFAULT_LOAD_BITS);
        let memory = entry.maxmemory.unwrap_or(DEFAULT_MAX_GPU_MEMORY_GIB);
        Self {
            model_path: ModelSource::resolve(entry.path.as_deref(), entry.huggingface.as_deref()),
            device: device::normalize(entry.device.as_deref(), probe),
            load_bits,
            load_8bit: load_bits == 8,
            max_gpu_memory: format!("{memory}GiB"),
        }
    }
}

/// Source of model weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    /// An existing local directory.
    Local(PathBuf),
    /// A model hub identifier.
    Hub(String),
}

impl ModelSource {
    /// Prefer `path` when it is an existing directory, else the hub id.
    pub fn resolve(path: Option<&str>, hub: Option<&str>) -> Option<Self> {
        if let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            if path.is_dir() {
                return Some(Self::Local(path));
            }
            tracing::debug!("model path {} is not a directory", path.display());
        }
        hub.map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|h| Self::Hub(h.to_owned()))
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Hub(id) => f.write_str(id),
        }
    }
}

/// Worker bind settings for a model: its own worker entry over the
/// `default` entry, with the host falling back to `default_host_ip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkerBinding {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub vllm_enable: bool,
}

impl WorkerBinding {
    pub(crate) fn of(doc: &GatewayDocument, name: &str) -> Self {
        let server = &doc.server;
        let layers: [Option<&WorkerEntry>; 2] =
            [server.worker_override(name), server.worker_defaults()];
        let host = layers
            .into_iter()
            .flatten()
            .find_map(|entry| entry.host.as_deref().filter(|h| !h.trim().is_empty()))
            .map(str::to_owned)
            .or_else(|| server.default_host_ip.clone());
        Self {
            host,
            port: layers.into_iter().flatten().find_map(|entry| entry.port),
            vllm_enable: layers
                .into_iter()
                .flatten()
                .find_map(|entry| entry.vllm_enable)
                .unwrap_or(false),
        }
    }
}

/// Resolve the worker configuration for `name`.
///
/// An empty name yields the server defaults only. A name found in no
/// catalog yields the defaults plus any per-model worker entry. A name in
/// both catalogs keeps both records, local settings winning.
pub fn resolve_worker(doc: &GatewayDocument, name: &str, probe: &impl DeviceProbe) -> WorkerConfig {
    let WorkerBinding {
        host,
        port,
        vllm_enable,
    } = WorkerBinding::of(doc, name);
    let mut config = WorkerConfig {
        host,
        port,
        vllm_enable,
        backend: None,
    };
    if name.is_empty() {
        return config;
    }

    let local = doc.models.local.get(name);
    let online = doc.models.online.get(name);
    config.backend = match (local, online) {
        (Some(local), None) => Some(WorkerBackend::Local(LocalWorker::resolve(local, probe))),
        (Some(local), Some(online)) => {
            tracing::warn!(
                "model '{name}' is declared in both LocalModel and OnlineModel, local settings win"
            );
            let mut online = OnlineWorker::resolve(name, online);
            online
                .extra
                .retain(|key, _| !OnlineWorker::LOCAL_KEYS.contains(&key.as_str()));
            Some(WorkerBackend::Dual {
                local: LocalWorker::resolve(local, probe),
                online,
            })
        }
        (None, Some(online)) => Some(WorkerBackend::Online(OnlineWorker::resolve(name, online))),
        (None, None) => {
            tracing::debug!("model '{name}' is not in any catalog, using worker defaults");
            None
        }
    };
    config
}

/// Voice-to-text worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptionConfig {
    /// Worker bind host.
    pub host: Option<String>,
    /// Worker bind port.
    pub port: Option<u16>,
    /// Catalog entry settings; `None` for unknown or empty names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<TranscriptionModel>,
}

impl TranscriptionConfig {
    /// Connectable address of the voice-to-text worker.
    pub fn address(&self) -> Option<ResolvedAddress> {
        ResolvedAddress::from_parts(self.host.as_deref(), self.port)
    }
}

/// Voice-to-text model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptionModel {
    /// Where the weights come from.
    pub model_path: Option<ModelSource>,
    /// Hub identifier as configured.
    pub huggingface: Option<String>,
    /// Device the model loads onto.
    pub device: Device,
    /// Load bit-width.
    pub load_bits: u32,
}

impl TranscriptionModel {
    fn resolve(entry: &VtotModel, probe: &impl DeviceProbe) -> Self {
        Self {
            model_path: ModelSource::resolve(entry.path.as_deref(), entry.huggingface.as_deref()),
            huggingface: entry.huggingface.clone(),
            device: device::normalize(entry.device.as_deref(), probe),
            load_bits: entry.loadbits.unwrap_or(DEFAULT_LOAD_BITS),
        }
    }
}

/// Resolve the voice-to-text worker configuration for `name`.
pub fn resolve_transcription(
    doc: &GatewayDocument,
    name: &str,
    probe: &impl DeviceProbe,
) -> TranscriptionConfig {
    let server = &doc.server;
    let role = &server.vtot_model_worker;
    let model = if name.is_empty() {
        None
    } else {
        let entry = doc.models.vtot.get(name);
        if entry.is_none() {
            tracing::debug!("voice-to-text model '{name}' is not configured");
        }
        entry.map(|entry| TranscriptionModel::resolve(entry, probe))
    };
    TranscriptionConfig {
        host: role.host.clone().or_else(|| server.default_host_ip.clone()),
        port: role.port,
        model,
    }
}
