//! Tracking-to-control pipeline
//!
//! Signal state, smoothing, the control-type dispatch table and the render
//! loop that ties them to loaded assets.

pub mod control;
pub mod render;
pub mod signals;
pub mod smoothing;

pub use control::ControlType;
pub use render::{FramePipeline, RenderLoop};
pub use signals::{PipelineState, SignalSet, SignalState, TrackingStatus};
