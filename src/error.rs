//! Error types for Puppet3D

use thiserror::Error;

/// Main error type for Puppet3D
#[derive(Error, Debug)]
pub enum Puppet3dError {
    #[error("Camera error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Web server error: {0}")]
    Web(#[from] WebError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Camera/media acquisition errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),

    #[error("Camera not found: {0}")]
    DeviceNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl AcquisitionError {
    /// Map an error code reported by the detector helper
    pub fn from_code(code: &str, message: String) -> Self {
        match code {
            "permission_denied" | "not_allowed" => Self::PermissionDenied(message),
            "device_not_found" | "not_found" => Self::DeviceNotFound(message),
            _ => Self::Other(message),
        }
    }
}

/// Landmark detector errors ("scripts failed")
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to launch tracker script: {0}")]
    ScriptLaunch(String),

    #[error("Landmark receiver error: {0}")]
    Receiver(String),

    #[error("Landmark packet parse error: {0}")]
    Parse(String),

    #[error("Tracker did not become ready: {0}")]
    NotReady(String),
}

/// 3D asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Unknown asset id: {0}")]
    UnknownAsset(String),

    #[error("Unknown asset instance: {0}")]
    UnknownInstance(String),

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Loading {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Durable settings store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read settings store: {0}")]
    Read(String),

    #[error("Failed to write settings store: {0}")]
    Write(String),

    #[error("Failed to serialize settings: {0}")]
    Serialize(String),
}

/// Session lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session denied: {0}")]
    Denied(String),

    #[error("Session already running")]
    AlreadyRunning,

    #[error("No session running")]
    NotRunning,
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Result type alias for Puppet3D operations
pub type Result<T> = std::result::Result<T, Puppet3dError>;
