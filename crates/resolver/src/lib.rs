//! Backend resolution for llmgate.
//!
//! Turns the gateway document into connectable endpoint addresses, merged
//! worker configurations and proxy policies. [`Resolver`] bundles these
//! over a [`ConfigStore`], taking a fresh snapshot on every call.

pub use address::{EndpointRole, ResolvedAddress};
pub use device::{Device, DeviceProbe, FixedProbe, SystemProbe};
pub use proxy::{
    NetworkDefaults, ProxyEnv, ProxyOverride, ProxyPattern, ProxyPolicy, ProxyPolicyBuilder, Route,
};
pub use worker::{
    LocalWorker, ModelSource, OnlineWorker, TranscriptionConfig, TranscriptionModel,
    WorkerBackend, WorkerConfig,
};

pub mod address;
pub mod device;
pub mod http;
pub mod proxy;
pub mod worker;

use anyhow::Result;
use gconfig::{ConfigStore, GatewayDocument};
use std::sync::Arc;

/// Resolution over a config store.
#[derive(Debug, Clone)]
pub struct Resolver<S, P = SystemProbe> {
    store: S,
    probe: P,
}

impl<S: ConfigStore> Resolver<S> {
    /// Resolve against `store`, probing this host for accelerators.
    pub fn new(store: S) -> Self {
        Self {
            store,
            probe: SystemProbe,
        }
    }
}

impl<S: ConfigStore, P: DeviceProbe> Resolver<S, P> {
    /// Swap the device probe.
    pub fn with_probe<Q: DeviceProbe>(self, probe: Q) -> Resolver<S, Q> {
        Resolver {
            store: self.store,
            probe,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The device probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// The current document.
    pub fn document(&self) -> Arc<GatewayDocument> {
        self.store.snapshot()
    }

    /// Address of `role`. See [`address::resolve`].
    pub fn address(&self, role: EndpointRole, model: Option<&str>) -> Option<ResolvedAddress> {
        address::resolve(&self.document(), role, model)
    }

    /// Base URL of `role`. See [`address::url`].
    pub fn url(&self, role: EndpointRole, model: Option<&str>) -> Option<String> {
        address::url(&self.document(), role, model)
    }

    /// Addresses of every locally served role.
    pub fn local_endpoints(&self) -> Vec<ResolvedAddress> {
        address::local_endpoints(&self.document())
    }

    /// Worker configuration of `name`. See [`worker::resolve_worker`].
    pub fn worker(&self, name: &str) -> WorkerConfig {
        worker::resolve_worker(&self.document(), name, &self.probe)
    }

    /// Voice-to-text configuration of `name`.
    pub fn transcription(&self, name: &str) -> TranscriptionConfig {
        worker::resolve_transcription(&self.document(), name, &self.probe)
    }

    /// Proxy policy from the process environment and `explicit`.
    pub fn proxy_policy(&self, explicit: Option<ProxyOverride>) -> Result<ProxyPolicy> {
        self.proxy_policy_with(ProxyEnv::from_process(), explicit)
    }

    /// Proxy policy from `env` and `explicit`.
    pub fn proxy_policy_with(
        &self,
        env: ProxyEnv,
        explicit: Option<ProxyOverride>,
    ) -> Result<ProxyPolicy> {
        ProxyPolicyBuilder::new(self.local_endpoints())
            .env(env)
            .explicit(explicit)
            .build()
    }

    /// Network defaults: the proxy policy and the document's request
    /// timeout.
    pub fn network_defaults(&self, explicit: Option<ProxyOverride>) -> Result<NetworkDefaults> {
        let policy = self.proxy_policy(explicit)?;
        NetworkDefaults::from_secs(policy, self.document().server.httpx_default_timeout)
    }
}
