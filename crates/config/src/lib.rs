//! Gateway configuration document and stores.
//!
//! The gateway document holds the server settings (bind host, role ports,
//! worker defaults) and the model catalogs (local, online, voice-to-text,
//! embedding and native-provider tables). It is consumed read-only through
//! the [`ConfigStore`] trait; [`MemoryStore`] and [`FileStore`] are the two
//! shipped implementations.

pub use document::{
    EmbeddingModel, GatewayDocument, LocalModel, ModelCatalog, NativeModel, OnlineModel,
    RoleConfig, ServerConfig, VtotModel, WorkerEntry,
};
pub use catalog::ModelListing;
pub use native::NativeProvider;
pub use store::{ConfigStore, FileStore, MemoryStore};
pub use worker::WorkerClass;

mod catalog;
pub mod document;
mod native;
pub mod store;
pub mod utils;
mod validate;
mod worker;

/// Config directory name under the platform config dir.
pub const CONFIG_DIR: &str = "llmgate";
/// Gateway document filename.
pub const CONFIG_FILE: &str = "gateway.toml";

/// Resolve the default gateway document path
/// (`~/.config/llmgate/gateway.toml` on unix).
pub fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
