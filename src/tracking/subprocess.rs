//! Landmark detector helper process
//!
//! Launches the Python helper that owns the camera and runs the hand and
//! face landmark models, with automatic cleanup on drop.

use tokio::process::{Child, Command};

use crate::config::DetectorConfig;
use crate::error::{DetectorError, Puppet3dError};

/// Manages the detector helper subprocess
pub struct TrackerSubprocess {
    child: Option<Child>,
    config: DetectorConfig,
}

impl TrackerSubprocess {
    /// Create a new subprocess manager (does not start the process)
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            child: None,
            config: config.clone(),
        }
    }

    /// Command-line arguments passed to the helper script
    pub fn args(&self) -> Vec<String> {
        let c = &self.config;
        let mut args = vec![
            c.tracker_script.clone(),
            "--ip".into(),
            c.listen_address.clone(),
            "--port".into(),
            c.port.to_string(),
            "--capture".into(),
            c.camera_device.to_string(),
            "--width".into(),
            c.capture_width.to_string(),
            "--height".into(),
            c.capture_height.to_string(),
            "--max-hands".into(),
            c.max_hands.to_string(),
            "--model-complexity".into(),
            c.model_complexity.to_string(),
            "--min-detection-confidence".into(),
            c.min_detection_confidence.to_string(),
            "--min-tracking-confidence".into(),
            c.min_tracking_confidence.to_string(),
        ];

        if c.face_enabled {
            args.extend([
                "--face".into(),
                "--max-faces".into(),
                c.max_faces.to_string(),
                "--face-min-detection-confidence".into(),
                c.face_min_detection_confidence.to_string(),
                "--face-min-tracking-confidence".into(),
                c.face_min_tracking_confidence.to_string(),
            ]);
            if c.refine_landmarks {
                args.push("--refine-landmarks".into());
            }
        }

        args
    }

    /// Launch the helper. No-op if it is already running.
    pub fn start(&mut self) -> Result<(), Puppet3dError> {
        if self.is_running() {
            return Ok(());
        }

        let child = Command::new("python3")
            .args(self.args())
            .kill_on_drop(true)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .map_err(|e| {
                DetectorError::ScriptLaunch(format!(
                    "Failed to launch tracker at '{}': {}",
                    self.config.tracker_script, e
                ))
            })?;

        tracing::info!(
            "Tracker subprocess started (pid: {:?}, camera: {}, port: {})",
            child.id(),
            self.config.camera_device,
            self.config.port,
        );

        self.child = Some(child);
        Ok(())
    }

    /// Check if the subprocess is still running (non-blocking)
    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    tracing::warn!("Tracker subprocess exited with: {}", status);
                    self.child = None;
                    false
                }
                Err(e) => {
                    tracing::error!("Failed to check tracker subprocess status: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Kill the subprocess, releasing the camera
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::info!("Stopping tracker subprocess (pid: {:?})", child.id());
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
    }
}

/// Check if the `mediapipe` Python package is available.
///
/// Runs `python3 -c "import mediapipe"` and returns true if it succeeds.
pub fn check_mediapipe_available() -> bool {
    match std::process::Command::new("python3")
        .args(["-c", "import mediapipe"])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
    {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_include_detector_options() {
        let sub = TrackerSubprocess::new(&DetectorConfig::default());
        let args = sub.args();

        let pos = args.iter().position(|a| a == "--max-hands").unwrap();
        assert_eq!(args[pos + 1], "2");
        let pos = args.iter().position(|a| a == "--min-detection-confidence").unwrap();
        assert_eq!(args[pos + 1], "0.7");
        assert!(args.contains(&"--face".to_string()));
        assert!(args.contains(&"--refine-landmarks".to_string()));
    }

    #[test]
    fn test_args_without_face() {
        let config = DetectorConfig {
            face_enabled: false,
            ..Default::default()
        };
        let args = TrackerSubprocess::new(&config).args();
        assert!(!args.contains(&"--face".to_string()));
        assert!(!args.contains(&"--max-faces".to_string()));
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut sub = TrackerSubprocess::new(&DetectorConfig::default());
        assert!(!sub.is_running());
        sub.stop().await;
    }
}
