//! Output module
//!
//! The last stage of every render tick: frame snapshots and the SSE streams
//! that carry them (and tracking status) to a browser overlay.

pub mod frame;
pub mod sse;

pub use frame::{BroadcastSink, FrameSink, FrameSnapshot, NullSink};
