//! Server-Sent Events for frames and tracking status

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::StreamExt;

use super::frame::FrameSnapshot;
use crate::pipeline::signals::TrackingStatus;

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}

/// Frame events; lagged frames are skipped, the overlay only needs the latest
pub fn frame_events(
    rx: broadcast::Receiver<FrameSnapshot>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(frame) => Some(Ok(frame_to_event(&frame))),
        Err(_) => None,
    })
}

/// Status events, starting with the current status
pub fn status_events(
    rx: watch::Receiver<TrackingStatus>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    WatchStream::new(rx).map(|status| Ok(status_to_event(&status)))
}

/// SSE response streaming every drawn frame
pub fn create_frame_stream(
    rx: broadcast::Receiver<FrameSnapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(frame_events(rx)).keep_alive(keep_alive())
}

/// SSE response streaming tracking status changes
pub fn create_status_stream(
    rx: watch::Receiver<TrackingStatus>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(status_events(rx)).keep_alive(keep_alive())
}

fn frame_to_event(frame: &FrameSnapshot) -> Event {
    let data = serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string());
    Event::default().event("frame").data(data)
}

/// JSON payload for a status event
pub fn status_payload(status: &TrackingStatus) -> serde_json::Value {
    serde_json::json!({
        "status": status,
        "text": status.to_string(),
    })
}

fn status_to_event(status: &TrackingStatus) -> Event {
    Event::default()
        .event("status")
        .data(status_payload(status).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::lifecycle::ModelSet;
    use crate::pipeline::signals::PipelineState;

    fn snapshot(frame: u64) -> FrameSnapshot {
        FrameSnapshot::capture(
            frame,
            &TrackingStatus::ShowHands,
            &PipelineState::default(),
            &ModelSet::default(),
        )
    }

    #[tokio::test]
    async fn test_frame_events_skip_lagged() {
        let (tx, rx) = broadcast::channel(1);
        let mut events = Box::pin(frame_events(rx));

        // Capacity 1: the first two frames are overwritten
        tx.send(snapshot(1)).unwrap();
        tx.send(snapshot(2)).unwrap();
        tx.send(snapshot(3)).unwrap();
        drop(tx);

        assert!(events.next().await.is_some());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_status_events_follow_watch() {
        let (tx, rx) = watch::channel(TrackingStatus::Loading);
        let mut events = Box::pin(status_events(rx));

        assert!(events.next().await.is_some());
        tx.send_replace(TrackingStatus::CameraPaused);
        assert!(events.next().await.is_some());
        drop(tx);
        assert!(events.next().await.is_none());
    }

    #[test]
    fn test_status_payload() {
        let payload = status_payload(&TrackingStatus::CameraError("Camera not found: none".into()));
        assert_eq!(payload["text"], "Camera error: Camera not found: none");
        assert_eq!(payload["status"]["state"], "camera_error");
    }
}
