//! Endpoint address resolution.
//!
//! Roles bind to whatever host the document says, commonly the wildcard
//! `0.0.0.0`. Callers connect to the loopback address instead, so a resolved
//! address never carries the wildcard host.

use crate::worker::WorkerBinding;
use anyhow::bail;
use gconfig::{GatewayDocument, RoleConfig};
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Loopback host substituted for the wildcard bind address.
pub const LOOPBACK: &str = "127.0.0.1";

/// Wildcard bind address.
pub const WILDCARD: &str = "0.0.0.0";

/// A network role the gateway fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// Tracks live workers.
    Controller,
    /// Serves a model.
    ModelWorker,
    /// OpenAI-compatible API shim.
    #[serde(rename = "openai_api")]
    OpenAIApi,
}

impl EndpointRole {
    /// Every role, in the order local endpoints are reported.
    pub const ALL: [Self; 3] = [Self::Controller, Self::ModelWorker, Self::OpenAIApi];

    /// The role's name as used in the document.
    pub fn name(self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::ModelWorker => "model_worker",
            Self::OpenAIApi => "openai_api",
        }
    }
}

impl FromStr for EndpointRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "controller" | "fastchat_controller" => Self::Controller,
            "model_worker" | "worker" | "fastchat_model_worker" => Self::ModelWorker,
            "openai_api" | "openai" | "fastchat_openai_api" => Self::OpenAIApi,
            _ => bail!("unknown endpoint role '{s}'"),
        })
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A connectable endpoint address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedAddress {
    /// URL scheme, always `http` for gateway roles.
    pub scheme: &'static str,
    /// Host, never the wildcard.
    pub host: String,
    /// Port.
    pub port: u16,
}

impl ResolvedAddress {
    /// Build an `http` address, rewriting the wildcard host to loopback.
    pub fn http(host: &str, port: u16) -> Self {
        Self {
            scheme: "http",
            host: connect_host(host).to_owned(),
            port,
        }
    }

    /// Build an address from optional bind settings.
    ///
    /// Absent when either part is missing or the host is blank.
    pub fn from_parts(host: Option<&str>, port: Option<u16>) -> Option<Self> {
        let host = host.map(str::trim).filter(|h| !h.is_empty())?;
        Some(Self::http(host, port?))
    }

    /// `scheme://host:port`.
    pub fn origin(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Map a bind host to the host a client should connect to.
pub fn connect_host(host: &str) -> &str {
    let host = host.trim();
    if host == WILDCARD { LOOPBACK } else { host }
}

/// Resolve the address of `role`.
///
/// Controller and OpenAI API ignore `model`. The model worker resolves the
/// worker binding for `model`, or the default worker when `model` is absent.
pub fn resolve(
    doc: &GatewayDocument,
    role: EndpointRole,
    model: Option<&str>,
) -> Option<ResolvedAddress> {
    let server = &doc.server;
    let role_address = |config: &RoleConfig| {
        let host = config.host.as_deref().or(server.default_host_ip.as_deref());
        ResolvedAddress::from_parts(host, config.port)
    };

    let address = match role {
        EndpointRole::Controller => role_address(&server.controller),
        EndpointRole::OpenAIApi => role_address(&server.openai_api),
        EndpointRole::ModelWorker => {
            let binding = WorkerBinding::of(doc, model.unwrap_or_default());
            ResolvedAddress::from_parts(binding.host.as_deref(), binding.port)
        }
    };
    if address.is_none() {
        tracing::debug!("no address configured for {role} (model: {model:?})");
    }
    address
}

/// Resolve the base URL of `role`. The OpenAI API role gets `/v1` appended.
pub fn url(doc: &GatewayDocument, role: EndpointRole, model: Option<&str>) -> Option<String> {
    let origin = resolve(doc, role, model)?.origin();
    Some(match role {
        EndpointRole::OpenAIApi => format!("{origin}/v1"),
        _ => origin,
    })
}

/// Addresses of every locally served role, skipping roles without one.
pub fn local_endpoints(doc: &GatewayDocument) -> Vec<ResolvedAddress> {
    EndpointRole::ALL
        .into_iter()
        .filter_map(|role| resolve(doc, role, None))
        .collect()
}
