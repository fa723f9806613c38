//! Gateway document schema.
//!
//! Field names follow the on-disk layout (`ServerConfig`, `ModelConfig`,
//! `LocalModel`, `Huggingface`, ...) so existing gateway documents load
//! unchanged. TOML is the native format; `.json` files are accepted too.

use crate::utils::expand_env_vars;
use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Key of the worker entry every model inherits from.
pub const DEFAULT_WORKER: &str = "default";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 300.0;

/// Top-level gateway document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayDocument {
    /// Server bind and role settings.
    #[serde(rename = "ServerConfig", default)]
    pub server: ServerConfig,
    /// Model catalogs.
    #[serde(rename = "ModelConfig", default)]
    pub models: ModelCatalog,
}

/// Server settings for every network role the gateway fronts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host every role binds to unless it sets its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_host_ip: Option<String>,
    /// Request timeout forwarded into constructed HTTP clients, in seconds.
    #[serde(default = "default_timeout")]
    pub httpx_default_timeout: f64,
    /// The controller that tracks live workers.
    #[serde(default, alias = "fastchat_controller")]
    pub controller: RoleConfig,
    /// The OpenAI-compatible API shim.
    #[serde(default, alias = "fastchat_openai_api")]
    pub openai_api: RoleConfig,
    /// Worker settings keyed by model name; `default` applies to all.
    #[serde(default, alias = "fastchat_model_worker")]
    pub model_worker: BTreeMap<CompactString, WorkerEntry>,
    /// The voice-to-text worker.
    #[serde(default)]
    pub vtot_model_worker: RoleConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_host_ip: None,
            httpx_default_timeout: DEFAULT_TIMEOUT_SECS,
            controller: RoleConfig::default(),
            openai_api: RoleConfig::default(),
            model_worker: BTreeMap::new(),
            vtot_model_worker: RoleConfig::default(),
        }
    }
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl ServerConfig {
    /// The `default` worker entry, if configured.
    pub fn worker_defaults(&self) -> Option<&WorkerEntry> {
        self.model_worker.get(DEFAULT_WORKER)
    }

    /// The per-model worker override, if configured.
    pub fn worker_override(&self, model: &str) -> Option<&WorkerEntry> {
        if model == DEFAULT_WORKER {
            return None;
        }
        self.model_worker.get(model)
    }
}

/// Host and port of a singleton role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Bind host; falls back to `default_host_ip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Bind port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Worker settings, either the shared default or a per-model override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    /// Bind host; falls back to `default_host_ip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Bind port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Serve through vLLM instead of the plain worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vllm_enable: Option<bool>,
}

/// All model catalogs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    /// Models served by a local worker process.
    #[serde(rename = "LocalModel", default)]
    pub local: BTreeMap<CompactString, LocalModel>,
    /// Models served by a remote provider behind a worker.
    #[serde(rename = "OnlineModel", default)]
    pub online: BTreeMap<CompactString, OnlineModel>,
    /// Voice-to-text models.
    #[serde(rename = "VtoTModel", default)]
    pub vtot: BTreeMap<CompactString, VtotModel>,
    /// Embedding models.
    #[serde(rename = "EmbeddingModel", default)]
    pub embedding: BTreeMap<CompactString, EmbeddingModel>,
    /// Natively supported providers, keyed by their fixed model name.
    #[serde(rename = "NativeModel", default)]
    pub native: BTreeMap<CompactString, NativeModel>,
}

/// A local model catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalModel {
    /// Local weights directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Hub identifier used when `path` is not a directory.
    #[serde(rename = "Huggingface", default, skip_serializing_if = "Option::is_none")]
    pub huggingface: Option<String>,
    /// Requested device (`cuda`, `gpu`, `mps`, `cpu`, anything else = auto).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Load bit-width (default 16).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loadbits: Option<u32>,
    /// Max GPU memory in GiB (default 20).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxmemory: Option<u32>,
}

/// An online model catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnlineModel {
    /// Worker class name (e.g. `QwenWorker`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Provider API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Provider API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Provider API version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Proxy used for this provider only.
    #[serde(default, alias = "openai_proxy", skip_serializing_if = "Option::is_none")]
    pub api_proxy: Option<String>,
    /// Provider-specific fields (secret keys, group ids, versions...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A voice-to-text catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtotModel {
    /// Local weights path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Hub identifier fallback.
    #[serde(rename = "Huggingface", default, skip_serializing_if = "Option::is_none")]
    pub huggingface: Option<String>,
    /// Requested device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Load bit-width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loadbits: Option<u32>,
}

/// An embedding catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModel {
    /// Local weights path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Hub identifier fallback.
    #[serde(rename = "Huggingface", default, skip_serializing_if = "Option::is_none")]
    pub huggingface: Option<String>,
    /// Requested device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// Settings of a natively supported provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeModel {
    /// API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// API version (Azure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Deployment name (Azure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    /// Upstream model identifier sent on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Upstream model version (Azure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Proxy used for this provider only.
    #[serde(default, alias = "openai_proxy", skip_serializing_if = "Option::is_none")]
    pub api_proxy: Option<String>,
}

impl GatewayDocument {
    /// Parse a TOML document, expanding `${VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = expand_env_vars(toml_str);
        toml::from_str(&expanded).context("failed to parse gateway TOML")
    }

    /// Parse a JSON document, expanding `${VAR}` references first.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let expanded = expand_env_vars(json_str);
        serde_json::from_str(&expanded).context("failed to parse gateway JSON")
    }

    /// Load a document from disk. Files ending in `.json` are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let document = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        };
        document.with_context(|| format!("in {}", path.display()))
    }

    /// A first-run document binding every role on all interfaces with the
    /// conventional ports and empty catalogs.
    pub fn scaffold() -> Self {
        let mut model_worker = BTreeMap::new();
        model_worker.insert(
            CompactString::const_new(DEFAULT_WORKER),
            WorkerEntry {
                host: None,
                port: Some(21002),
                vllm_enable: Some(false),
            },
        );
        Self {
            server: ServerConfig {
                default_host_ip: Some("0.0.0.0".to_owned()),
                httpx_default_timeout: DEFAULT_TIMEOUT_SECS,
                controller: RoleConfig {
                    host: None,
                    port: Some(20001),
                },
                openai_api: RoleConfig {
                    host: None,
                    port: Some(20000),
                },
                model_worker,
                vtot_model_worker: RoleConfig {
                    host: None,
                    port: Some(21100),
                },
            },
            models: ModelCatalog::default(),
        }
    }

    /// Write the scaffold document to `path`, creating parent directories.
    pub fn write_scaffold(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(&Self::scaffold())
            .context("failed to serialize default config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
