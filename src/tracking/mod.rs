//! Tracking module
//!
//! Landmark acquisition from the detector helper and extraction of control
//! signals from landmark frames.

pub mod extract;
pub mod landmarks;
pub mod mailbox;
pub mod mediapipe;
pub mod subprocess;

use futures::future::BoxFuture;

use crate::error::Puppet3dError;
use mailbox::DetectorMailboxes;

pub use extract::SignalExtractor;
pub use landmarks::{FaceFrame, HandsFrame, Landmark};
pub use mediapipe::MediaPipeSource;

/// Pushes landmark frames into detector mailboxes.
///
/// `start` acquires the camera and fails with an acquisition error when it
/// cannot; `stop` ends the frame stream; `close` frees detector resources.
/// A source whose detector owns the camera releases it in `close`.
pub trait LandmarkSource: Send {
    fn start(&mut self, mailboxes: DetectorMailboxes) -> BoxFuture<'_, Result<(), Puppet3dError>>;
    /// Stop delivering frames without releasing the camera
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self) -> BoxFuture<'_, Result<(), Puppet3dError>>;
    fn close(&mut self) -> BoxFuture<'_, Result<(), Puppet3dError>>;
}
