//! Asset binding registry: which assets are active and what drives them
//!
//! Every change is written to the settings store and published to
//! subscribers (the lifecycle manager reconciles on each publish).

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use super::catalog::Catalog;
use super::store::SettingsStore;
use crate::error::AssetError;
use crate::pipeline::control::ControlType;

/// One user-added asset instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAssetConfig {
    pub instance_id: String,
    pub asset_id: String,
    pub control_type: ControlType,
    pub scale: f32,
}

/// The persisted settings blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundSettings {
    pub selected_assets: Vec<SelectedAssetConfig>,
}

impl Default for PlaygroundSettings {
    fn default() -> Self {
        Self {
            selected_assets: vec![SelectedAssetConfig {
                instance_id: "default-xbot".to_string(),
                asset_id: "xbot".to_string(),
                control_type: ControlType::BothHands,
                scale: 1.0,
            }],
        }
    }
}

/// Overlay stored top-level keys on the defaults. Keys missing from storage
/// keep their default. Stored entries are repaired one by one from the
/// catalog; only entries that cannot be repaired are dropped.
pub fn merge_with_defaults(stored: Option<Value>, catalog: &Catalog) -> PlaygroundSettings {
    let defaults = PlaygroundSettings::default();

    let Some(Value::Object(stored)) = stored else {
        return defaults;
    };

    let selected_assets = match stored.get("selectedAssets") {
        None => defaults.selected_assets,
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| repair_entry(entry, catalog))
            .collect(),
        Some(other) => {
            tracing::warn!("Stored selectedAssets is not a list, using defaults: {}", other);
            defaults.selected_assets
        }
    };

    PlaygroundSettings { selected_assets }
}

/// Rebuild one stored entry, filling a missing or unrecognised control type
/// and a missing or invalid scale from the catalog descriptor.
fn repair_entry(entry: &Value, catalog: &Catalog) -> Option<SelectedAssetConfig> {
    let instance_id = entry.get("instanceId").and_then(Value::as_str);
    let asset_id = entry.get("assetId").and_then(Value::as_str);
    let (Some(instance_id), Some(asset_id)) = (instance_id, asset_id) else {
        tracing::warn!("Dropping stored asset entry without ids: {}", entry);
        return None;
    };

    let Some(descriptor) = catalog.find(asset_id) else {
        tracing::warn!(
            "Dropping stored instance {} of unknown asset {}",
            instance_id,
            asset_id
        );
        return None;
    };

    let control_type = match entry.get("controlType") {
        None => descriptor.default_control,
        Some(value) => match serde_json::from_value::<ControlType>(value.clone()) {
            Ok(control) => control,
            Err(_) => {
                tracing::warn!(
                    "Instance {} has unknown control type {}, using {:?}",
                    instance_id,
                    value,
                    descriptor.default_control
                );
                descriptor.default_control
            }
        },
    };

    let scale = entry
        .get("scale")
        .and_then(Value::as_f64)
        .map(|scale| scale as f32)
        .filter(|scale| scale.is_finite() && *scale > 0.0)
        .unwrap_or(descriptor.default_scale);

    Some(SelectedAssetConfig {
        instance_id: instance_id.to_string(),
        asset_id: descriptor.id.to_string(),
        control_type,
        scale,
    })
}

/// Partial update of an instance
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetUpdate {
    pub control_type: Option<ControlType>,
    pub scale: Option<f32>,
}

/// User-editable list of active asset instances
pub struct AssetRegistry {
    catalog: Arc<Catalog>,
    store: Arc<dyn SettingsStore>,
    key: String,
    settings: PlaygroundSettings,
    tx: watch::Sender<Vec<SelectedAssetConfig>>,
}

impl AssetRegistry {
    /// Restore from the store, merging over the defaults
    pub fn restore(catalog: Arc<Catalog>, store: Arc<dyn SettingsStore>, key: &str) -> Self {
        let mut settings = merge_with_defaults(store.get(key), &catalog);

        let mut seen = HashSet::new();
        settings
            .selected_assets
            .retain(|asset| seen.insert(asset.instance_id.clone()));

        tracing::info!(
            "Restored {} asset instance(s) from settings",
            settings.selected_assets.len()
        );

        let (tx, _) = watch::channel(settings.selected_assets.clone());
        Self {
            catalog,
            store,
            key: key.to_string(),
            settings,
            tx,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Shared handle for the lifecycle manager
    pub fn catalog_handle(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn selected(&self) -> &[SelectedAssetConfig] {
        &self.settings.selected_assets
    }

    pub fn get(&self, instance_id: &str) -> Option<&SelectedAssetConfig> {
        self.settings
            .selected_assets
            .iter()
            .find(|a| a.instance_id == instance_id)
    }

    /// Receive the configuration after every change
    pub fn subscribe(&self) -> watch::Receiver<Vec<SelectedAssetConfig>> {
        self.tx.subscribe()
    }

    /// Add an instance of a catalog asset with the catalog's defaults.
    /// Returns the new instance id.
    pub fn add(&mut self, asset_id: &str) -> Result<String, AssetError> {
        let descriptor = self
            .catalog
            .find(asset_id)
            .ok_or_else(|| AssetError::UnknownAsset(asset_id.to_string()))?;

        let instance_id = format!("{}-{}", asset_id, Uuid::new_v4().simple());
        self.settings.selected_assets.push(SelectedAssetConfig {
            instance_id: instance_id.clone(),
            asset_id: descriptor.id.to_string(),
            control_type: descriptor.default_control,
            scale: descriptor.default_scale,
        });

        tracing::info!("Added asset {} as {}", asset_id, instance_id);
        self.commit();
        Ok(instance_id)
    }

    /// Remove an instance. False if no such instance.
    pub fn remove(&mut self, instance_id: &str) -> bool {
        let before = self.settings.selected_assets.len();
        self.settings
            .selected_assets
            .retain(|a| a.instance_id != instance_id);

        if self.settings.selected_assets.len() == before {
            return false;
        }

        tracing::info!("Removed asset instance {}", instance_id);
        self.commit();
        true
    }

    /// Change an instance's control type and/or scale. False if no such instance.
    pub fn update(&mut self, instance_id: &str, update: AssetUpdate) -> bool {
        let Some(asset) = self
            .settings
            .selected_assets
            .iter_mut()
            .find(|a| a.instance_id == instance_id)
        else {
            return false;
        };

        if let Some(control_type) = update.control_type {
            asset.control_type = control_type;
        }
        if let Some(scale) = update.scale {
            asset.scale = scale;
        }

        tracing::debug!(
            "Updated {}: control={:?} scale={}",
            instance_id,
            asset.control_type,
            asset.scale
        );
        self.commit();
        true
    }

    fn commit(&mut self) {
        match serde_json::to_value(&self.settings) {
            Ok(value) => {
                if let Err(e) = self.store.set(&self.key, &value) {
                    tracing::warn!("Failed to persist asset settings: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize asset settings: {}", e),
        }

        self.tx.send_replace(self.settings.selected_assets.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::store::MemoryStore;
    use serde_json::json;

    const KEY: &str = "playground-settings";

    fn registry_with(store: Arc<MemoryStore>) -> AssetRegistry {
        AssetRegistry::restore(Arc::new(Catalog::default()), store, KEY)
    }

    #[test]
    fn test_defaults_when_store_empty() {
        let registry = registry_with(Arc::new(MemoryStore::new()));
        assert_eq!(registry.selected(), PlaygroundSettings::default().selected_assets);
    }

    #[test]
    fn test_merge_keeps_defaults_for_missing_keys() {
        let catalog = Catalog::default();
        assert_eq!(
            merge_with_defaults(Some(json!({})), &catalog),
            PlaygroundSettings::default()
        );
        assert_eq!(
            merge_with_defaults(Some(json!({"unrelated": 5})), &catalog),
            PlaygroundSettings::default()
        );

        let stored = json!({"selectedAssets": [
            {"instanceId": "duck-1", "assetId": "duck", "controlType": "mouth", "scale": 2.0}
        ]});
        let merged = merge_with_defaults(Some(stored), &catalog);
        assert_eq!(merged.selected_assets.len(), 1);
        assert_eq!(merged.selected_assets[0].instance_id, "duck-1");
        assert_eq!(merged.selected_assets[0].scale, 2.0);
    }

    #[test]
    fn test_merge_ignores_garbage() {
        let catalog = Catalog::default();
        assert_eq!(
            merge_with_defaults(Some(json!("nope")), &catalog),
            PlaygroundSettings::default()
        );
        assert_eq!(
            merge_with_defaults(Some(json!({"selectedAssets": 12})), &catalog),
            PlaygroundSettings::default()
        );
        assert!(merge_with_defaults(Some(json!({"selectedAssets": []})), &catalog)
            .selected_assets
            .is_empty());
    }

    #[test]
    fn test_entry_missing_scale_takes_catalog_scale() {
        let catalog = Catalog::default();
        let stored = json!({"selectedAssets": [
            {"instanceId": "duck-1", "assetId": "duck", "controlType": "mouth", "scale": 2.0},
            {"instanceId": "parrot-1", "assetId": "parrot", "controlType": "head"}
        ]});

        let merged = merge_with_defaults(Some(stored), &catalog);
        let ids: Vec<&str> = merged
            .selected_assets
            .iter()
            .map(|a| a.instance_id.as_str())
            .collect();
        assert_eq!(ids, vec!["duck-1", "parrot-1"]);
        assert_eq!(merged.selected_assets[0].scale, 2.0);
        assert_eq!(
            merged.selected_assets[1].scale,
            catalog.find("parrot").unwrap().default_scale
        );
        assert_eq!(merged.selected_assets[1].control_type, ControlType::Head);
    }

    #[test]
    fn test_entry_missing_ids_is_dropped_alone() {
        let stored = json!({"selectedAssets": [
            {"assetId": "duck", "controlType": "mouth", "scale": 1.0},
            {"instanceId": "duck-2", "assetId": "duck"}
        ]});

        let merged = merge_with_defaults(Some(stored), &Catalog::default());
        assert_eq!(merged.selected_assets.len(), 1);
        assert_eq!(merged.selected_assets[0].instance_id, "duck-2");
        assert_eq!(merged.selected_assets[0].control_type, ControlType::Mouth);
    }

    #[test]
    fn test_unknown_control_type_survives_next_commit() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                KEY,
                &json!({"selectedAssets": [
                    {"instanceId": "duck-1", "assetId": "duck", "controlType": "mouth", "scale": 1.0},
                    {"instanceId": "x-1", "assetId": "xbot", "controlType": "tail", "scale": 1.5}
                ]}),
            )
            .unwrap();

        let mut registry = registry_with(store.clone());
        let x = registry.get("x-1").unwrap();
        assert_eq!(x.control_type, ControlType::BothHands);
        assert_eq!(x.scale, 1.5);

        registry.add("stork").unwrap();

        let persisted = merge_with_defaults(store.get(KEY), &Catalog::default());
        let ids: Vec<&str> = persisted
            .selected_assets
            .iter()
            .map(|a| a.instance_id.as_str())
            .collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(&ids[..2], &["duck-1", "x-1"]);
        assert!(ids[2].starts_with("stork-"));
    }

    #[test]
    fn test_persist_and_restore() {
        let store = Arc::new(MemoryStore::new());
        let mut registry = registry_with(store.clone());

        let parrot = registry.add("parrot").unwrap();
        registry.update(
            &parrot,
            AssetUpdate {
                control_type: Some(ControlType::Head),
                scale: Some(0.05),
            },
        );
        let expected = registry.selected().to_vec();

        let restored = registry_with(store);
        assert_eq!(restored.selected(), expected.as_slice());
    }

    #[test]
    fn test_add_uses_catalog_defaults() {
        let mut registry = registry_with(Arc::new(MemoryStore::new()));
        let id = registry.add("robot").unwrap();

        assert!(id.starts_with("robot-"));
        let asset = registry.get(&id).unwrap();
        assert_eq!(asset.control_type, ControlType::LeftHand);
        assert_eq!(asset.scale, 0.5);

        assert!(matches!(
            registry.add("dragon"),
            Err(AssetError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_same_asset_twice_is_independent() {
        let mut registry = registry_with(Arc::new(MemoryStore::new()));
        let a = registry.add("duck").unwrap();
        let b = registry.add("duck").unwrap();
        assert_ne!(a, b);

        registry.update(
            &a,
            AssetUpdate {
                scale: Some(3.0),
                ..Default::default()
            },
        );
        assert_eq!(registry.get(&b).unwrap().scale, 1.0);

        assert!(registry.remove(&a));
        assert!(registry.get(&b).is_some());
        assert!(!registry.remove(&a));
    }

    #[test]
    fn test_changes_are_published() {
        let mut registry = registry_with(Arc::new(MemoryStore::new()));
        let mut rx = registry.subscribe();

        registry.remove("default-xbot");
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());

        assert!(!registry.update("default-xbot", AssetUpdate::default()));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_restore_drops_unknown_and_duplicate() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                KEY,
                &json!({"selectedAssets": [
                    {"instanceId": "a", "assetId": "duck", "controlType": "mouth", "scale": 1.0},
                    {"instanceId": "a", "assetId": "xbot", "controlType": "head", "scale": 1.0},
                    {"instanceId": "b", "assetId": "dragon", "controlType": "head", "scale": 1.0}
                ]}),
            )
            .unwrap();

        let registry = registry_with(store);
        assert_eq!(registry.selected().len(), 1);
        assert_eq!(registry.selected()[0].asset_id, "duck");
    }
}
