//! Configuration parsing and management for Puppet3D

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Puppet3dError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingTuning,
    pub detector: DetectorConfig,
    pub render: RenderConfig,
    pub assets: AssetsConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Puppet3dError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, Puppet3dError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, Puppet3dError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Puppet3dError> {
        check_alpha("tracking.position_alpha", self.tracking.position_alpha)?;
        check_alpha("tracking.rotation_alpha", self.tracking.rotation_alpha)?;
        check_alpha("tracking.follow_alpha", self.tracking.follow_alpha)?;
        check_alpha("tracking.turn_alpha", self.tracking.turn_alpha)?;

        if self.detector.max_hands == 0 || self.detector.max_hands > 2 {
            return Err(invalid("detector.max_hands", "Must be 1 or 2"));
        }

        for (field, value) in [
            (
                "detector.min_detection_confidence",
                self.detector.min_detection_confidence,
            ),
            (
                "detector.min_tracking_confidence",
                self.detector.min_tracking_confidence,
            ),
            (
                "detector.face_min_detection_confidence",
                self.detector.face_min_detection_confidence,
            ),
            (
                "detector.face_min_tracking_confidence",
                self.detector.face_min_tracking_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, "Confidence must be between 0.0 and 1.0"));
            }
        }

        if self.detector.auto_launch {
            let path = Path::new(&self.detector.tracker_script);
            if !path.exists() {
                tracing::warn!(
                    "Detector auto_launch enabled but tracker script not found at: {}",
                    self.detector.tracker_script
                );
            }
        }

        if self.render.target_fps == 0 || self.render.target_fps > 240 {
            return Err(invalid("render.target_fps", "Must be between 1 and 240"));
        }

        if self.assets.crossfade_secs < 0.0 {
            return Err(invalid("assets.crossfade_secs", "Must not be negative"));
        }

        if self.storage.key.is_empty() {
            return Err(invalid("storage.key", "Must not be empty"));
        }

        if self.http.port == 0 {
            return Err(invalid("http.port", "Port must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> Puppet3dError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

fn check_alpha(field: &str, alpha: f32) -> Result<(), Puppet3dError> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(invalid(field, "Smoothing factor must lie strictly between 0 and 1"))
    }
}

/// Signal mapping and smoothing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingTuning {
    // --- Image space to pipeline space ---
    pub horizontal_gain: f32,
    pub vertical_gain: f32,
    /// Raises the head anchor above the eye line
    pub head_offset: f32,
    pub top_of_head_offset: f32,

    // --- Signal smoothing ---
    pub position_alpha: f32,
    pub rotation_alpha: f32,

    // --- Per-asset follow stage ---
    pub follow_alpha: f32,
    pub follow_y_offset: f32,
    pub turn_alpha: f32,
    /// Yaw (radians) an asset leans toward while travelling sideways
    pub turn_angle: f32,
    pub turn_threshold: f32,
    pub spread_yaw_factor: f32,
}

impl Default for TrackingTuning {
    fn default() -> Self {
        Self {
            horizontal_gain: 5.0,
            vertical_gain: 4.0,
            head_offset: 1.5,
            top_of_head_offset: 2.0,
            position_alpha: 0.15,
            rotation_alpha: 0.1,
            follow_alpha: 0.15,
            follow_y_offset: -1.0,
            turn_alpha: 0.1,
            turn_angle: 0.3,
            turn_threshold: 0.01,
            spread_yaw_factor: 0.1,
        }
    }
}

/// Landmark detector helper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Listen address for the landmark UDP socket
    pub listen_address: String,
    /// UDP port the helper sends landmark packets to
    pub port: u16,
    /// Launch the Python helper as a child process
    pub auto_launch: bool,
    /// Path to the helper script
    pub tracker_script: String,
    /// Camera device index
    pub camera_device: u32,
    pub capture_width: u32,
    pub capture_height: u32,
    /// Maximum number of hands to track
    pub max_hands: u32,
    /// Hand model complexity (0 or 1)
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// Run the face landmark channel alongside hands
    pub face_enabled: bool,
    pub max_faces: u32,
    pub refine_landmarks: bool,
    pub face_min_detection_confidence: f32,
    pub face_min_tracking_confidence: f32,
    /// How long to wait for the helper to report the camera is open
    pub ready_timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            port: 12347,
            auto_launch: true,
            tracker_script: "scripts/landmark_tracker.py".to_string(),
            camera_device: 0,
            capture_width: 640,
            capture_height: 480,
            max_hands: 2,
            model_complexity: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.5,
            face_enabled: true,
            max_faces: 1,
            refine_landmarks: true,
            face_min_detection_confidence: 0.5,
            face_min_tracking_confidence: 0.5,
            ready_timeout_secs: 10,
        }
    }
}

/// Render loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frame rate of the render loop
    pub target_fps: u32,
    /// Where freshly loaded assets are attached
    pub base_offset: [f32; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            base_offset: [0.0, -2.0, 0.0],
        }
    }
}

/// Asset loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Abandon a load after this many seconds (0 waits forever)
    pub load_timeout_secs: u64,
    /// Crossfade duration when switching animation clips
    pub crossfade_secs: f32,
    /// Directory used to resolve relative asset URLs
    pub base_dir: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            load_timeout_secs: 30,
            crossfade_secs: 0.2,
            base_dir: PathBuf::from("."),
        }
    }
}

/// Durable settings store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Keep asset settings across restarts
    pub persist: bool,
    /// JSON file backing the key-value store
    pub path: PathBuf,
    /// Key the asset configuration is stored under
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: true,
            path: dirs_path().join("settings.json"),
            key: "playground-settings".to_string(),
        }
    }
}

/// Session authorization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Credits available; each session start consumes one. None = externally authorized.
    pub credits: Option<u32>,
    /// Start a session as soon as the service is up
    pub auto_start: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Enable HTTP server
    pub enabled: bool,
    /// HTTP server host
    pub host: String,
    /// HTTP server port
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("puppet3d");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/puppet3d");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/puppet3d");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("puppet3d");
        }
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracking.horizontal_gain, 5.0);
        assert_eq!(config.tracking.vertical_gain, 4.0);
        assert_eq!(config.detector.max_hands, 2);
        assert_eq!(config.render.base_offset, [0.0, -2.0, 0.0]);
        assert_eq!(config.storage.key, "playground-settings");
        assert!(config.session.credits.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.detector.auto_launch = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unstable_alpha() {
        let mut config = Config::default();
        config.detector.auto_launch = false;
        config.tracking.position_alpha = 1.0;
        assert!(config.validate().is_err());

        config.tracking.position_alpha = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_too_many_hands() {
        let mut config = Config::default();
        config.detector.auto_launch = false;
        config.detector.max_hands = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [tracking]
            horizontal_gain = 6.0

            [detector]
            port = 15000
            face_enabled = false

            [session]
            credits = 3
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.tracking.horizontal_gain, 6.0);
        // Unspecified keys keep their defaults
        assert_eq!(config.tracking.vertical_gain, 4.0);
        assert_eq!(config.detector.port, 15000);
        assert!(!config.detector.face_enabled);
        assert_eq!(config.session.credits, Some(3));
    }
}
