//! Load-time validation of the gateway document.

use crate::{GatewayDocument, NativeProvider, WorkerClass, document::DEFAULT_WORKER};
use anyhow::bail;

impl GatewayDocument {
    /// Validate the document, failing with every problem found.
    ///
    /// Resolution tolerates all of these problems; validation exists so a
    /// misconfiguration is reported when the document is loaded instead of
    /// silently degrading per request.
    pub fn validate(&self) -> anyhow::Result<()> {
        let issues = self.issues();
        if issues.is_empty() {
            return Ok(());
        }
        bail!("invalid gateway config:\n  - {}", issues.join("\n  - "))
    }

    /// Collect validation problems without failing.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let server = &self.server;
        let models = &self.models;

        if !(server.httpx_default_timeout.is_finite() && server.httpx_default_timeout > 0.0) {
            issues.push(format!(
                "ServerConfig.httpx_default_timeout must be positive, got {}",
                server.httpx_default_timeout
            ));
        }

        let ports = [
            ("controller", server.controller.port),
            ("openai_api", server.openai_api.port),
            ("vtot_model_worker", server.vtot_model_worker.port),
        ];
        for (role, port) in ports {
            if port == Some(0) {
                issues.push(format!("ServerConfig.{role}.port must not be 0"));
            }
        }
        for (name, entry) in &server.model_worker {
            if entry.port == Some(0) {
                issues.push(format!("ServerConfig.model_worker.{name}.port must not be 0"));
            }
        }
        if server.worker_defaults().is_none() {
            issues.push(format!(
                "ServerConfig.model_worker.{DEFAULT_WORKER} is missing"
            ));
        }

        for name in models.local.keys() {
            if models.online.contains_key(name) {
                issues.push(format!(
                    "model '{name}' is declared in both LocalModel and OnlineModel"
                ));
            }
        }

        for (name, entry) in &models.online {
            match entry.provider.as_deref() {
                Some(provider) => {
                    if let Err(e) = provider.parse::<WorkerClass>() {
                        issues.push(format!("OnlineModel '{name}': {e}"));
                    }
                }
                None => issues.push(format!("OnlineModel '{name}' has no provider")),
            }
        }

        for (name, entry) in &models.native {
            let Some(provider) = NativeProvider::from_model_name(name) else {
                issues.push(format!(
                    "NativeModel '{name}' is not a native provider (expected one of {})",
                    NativeProvider::ALL.map(NativeProvider::model_name).join(", ")
                ));
                continue;
            };
            let missing = provider.missing_fields(entry);
            if !missing.is_empty() {
                issues.push(format!(
                    "NativeModel '{name}' is missing {}",
                    missing.join(", ")
                ));
            }
        }

        issues
    }
}
