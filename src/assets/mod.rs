//! Asset catalog, user bindings and resource lifecycle

pub mod catalog;
pub mod lifecycle;
pub mod registry;
pub mod store;

pub use catalog::{AssetDescriptor, Catalog};
pub use lifecycle::{AssetLifecycleManager, LoadedModel, ModelSet};
pub use registry::{AssetRegistry, AssetUpdate, PlaygroundSettings, SelectedAssetConfig};
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
