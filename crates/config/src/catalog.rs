//! Catalog listing queries.

use crate::{GatewayDocument, WorkerClass, document::DEFAULT_WORKER};
use compact_str::CompactString;
use serde::Serialize;

/// Configured LLM model names grouped by where they are declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelListing {
    /// `LocalModel` names.
    pub local: Vec<CompactString>,
    /// `OnlineModel` names.
    pub online: Vec<CompactString>,
    /// Names with a per-model worker override.
    pub worker: Vec<CompactString>,
}

impl GatewayDocument {
    /// List configured LLM models by catalog.
    pub fn list_llm_models(&self) -> ModelListing {
        ModelListing {
            local: self.models.local.keys().cloned().collect(),
            online: self.models.online.keys().cloned().collect(),
            worker: self
                .server
                .model_worker
                .keys()
                .filter(|name| name.as_str() != DEFAULT_WORKER)
                .cloned()
                .collect(),
        }
    }

    /// List configured embedding model names.
    pub fn list_embed_models(&self) -> Vec<CompactString> {
        self.models.embedding.keys().cloned().collect()
    }

    /// List online models whose worker class can serve embeddings.
    pub fn list_online_embed_models(&self) -> Vec<CompactString> {
        self.models
            .online
            .iter()
            .filter(|(_, entry)| {
                entry
                    .provider
                    .as_deref()
                    .and_then(|p| p.parse::<WorkerClass>().ok())
                    .is_some_and(WorkerClass::can_embedding)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}
