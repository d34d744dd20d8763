//! MediaPipe landmark source
//!
//! Receives JSON-over-UDP packets from the detector helper
//! (`scripts/landmark_tracker.py`) and posts hand and face frames into the
//! detector mailboxes. The helper owns the camera: it reports a `ready`
//! status once capture is running, or an `error` packet when the camera
//! cannot be opened.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use super::landmarks::{FaceFrame, HandsFrame};
use super::mailbox::DetectorMailboxes;
use super::subprocess::TrackerSubprocess;
use super::LandmarkSource;
use crate::config::DetectorConfig;
use crate::error::{AcquisitionError, DetectorError, Puppet3dError};

/// A single JSON packet from the detector helper
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerPacket {
    Hands(HandsFrame),
    Face(FaceFrame),
    Status { state: String },
    Error { code: String, message: String },
}

impl TrackerPacket {
    pub fn parse(bytes: &[u8]) -> Result<Self, DetectorError> {
        serde_json::from_slice(bytes)
            .map_err(|e| DetectorError::Parse(format!("JSON parse error: {}", e)))
    }
}

/// Route a packet to its mailbox. Returns true for frame packets.
fn deliver(packet: TrackerPacket, mailboxes: &DetectorMailboxes, paused: &AtomicBool) -> bool {
    match packet {
        TrackerPacket::Hands(frame) => {
            if !paused.load(Ordering::Relaxed) {
                mailboxes.hands.post(frame);
            }
            true
        }
        TrackerPacket::Face(frame) => {
            if !paused.load(Ordering::Relaxed) {
                mailboxes.face.post(frame);
            }
            true
        }
        TrackerPacket::Status { state } => {
            tracing::debug!("Tracker status: {}", state);
            false
        }
        TrackerPacket::Error { code, message } => {
            tracing::warn!("Tracker reported {}: {}", code, message);
            false
        }
    }
}

/// Landmark source backed by the MediaPipe helper process
pub struct MediaPipeSource {
    config: DetectorConfig,
    subprocess: Option<TrackerSubprocess>,
    receiver: Option<JoinHandle<()>>,
    paused: Arc<AtomicBool>,
}

impl MediaPipeSource {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            config: config.clone(),
            subprocess: None,
            receiver: None,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn bind(&self) -> Result<UdpSocket, Puppet3dError> {
        let addr = format!("{}:{}", self.config.listen_address, self.config.port);
        let socket = UdpSocket::bind(&addr).await.map_err(|e| {
            DetectorError::Receiver(format!("Failed to bind to {}: {}", addr, e))
        })?;
        tracing::info!("Landmark receiver listening on {}", addr);
        Ok(socket)
    }

    /// Read packets until the helper reports the camera state
    async fn await_ready(
        socket: &UdpSocket,
        mailboxes: &DetectorMailboxes,
        paused: &AtomicBool,
    ) -> Result<(), Puppet3dError> {
        let mut buf = vec![0u8; 65536];
        loop {
            let size = socket
                .recv(&mut buf)
                .await
                .map_err(|e| DetectorError::Receiver(format!("Receive error: {}", e)))?;

            match TrackerPacket::parse(&buf[..size]) {
                Ok(TrackerPacket::Status { state }) if state == "ready" => return Ok(()),
                Ok(TrackerPacket::Error { code, message }) => {
                    return Err(AcquisitionError::from_code(&code, message).into());
                }
                Ok(packet) => {
                    // Frames prove the camera is running
                    if deliver(packet, mailboxes, paused) {
                        return Ok(());
                    }
                }
                Err(e) => tracing::debug!("Ignoring packet: {}", e),
            }
        }
    }

    /// Wait for the helper to report the camera is open
    async fn wait_ready(
        socket: &UdpSocket,
        mailboxes: &DetectorMailboxes,
        paused: &AtomicBool,
        timeout: Duration,
    ) -> Result<(), Puppet3dError> {
        match tokio::time::timeout(timeout, Self::await_ready(socket, mailboxes, paused)).await {
            Ok(result) => result,
            Err(_) => Err(DetectorError::NotReady(format!(
                "no response from tracker within {}s",
                timeout.as_secs()
            ))
            .into()),
        }
    }

    async fn receive_loop(socket: UdpSocket, mailboxes: DetectorMailboxes, paused: Arc<AtomicBool>) {
        let mut buf = vec![0u8; 65536];
        loop {
            match socket.recv(&mut buf).await {
                Ok(size) => match TrackerPacket::parse(&buf[..size]) {
                    Ok(packet) => {
                        deliver(packet, &mailboxes, &paused);
                    }
                    Err(e) => tracing::debug!("Ignoring packet: {}", e),
                },
                Err(e) => {
                    tracing::warn!("Landmark receive error: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn start_inner(&mut self, mailboxes: DetectorMailboxes) -> Result<(), Puppet3dError> {
        if self.receiver.is_some() {
            return Ok(());
        }

        let socket = self.bind().await?;

        if self.config.auto_launch {
            let mut subprocess = TrackerSubprocess::new(&self.config);
            subprocess.start()?;
            self.subprocess = Some(subprocess);
        }

        self.paused.store(false, Ordering::Relaxed);
        let timeout = Duration::from_secs(self.config.ready_timeout_secs);
        if let Err(e) = Self::wait_ready(&socket, &mailboxes, &self.paused, timeout).await {
            if let Some(mut subprocess) = self.subprocess.take() {
                subprocess.stop().await;
            }
            return Err(e);
        }

        let paused = self.paused.clone();
        self.receiver = Some(tokio::spawn(Self::receive_loop(socket, mailboxes, paused)));
        tracing::info!("Landmark source running");
        Ok(())
    }
}

impl LandmarkSource for MediaPipeSource {
    fn start(&mut self, mailboxes: DetectorMailboxes) -> BoxFuture<'_, Result<(), Puppet3dError>> {
        self.start_inner(mailboxes).boxed()
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::Relaxed);
        tracing::info!("Landmark delivery paused");
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::Relaxed);
        tracing::info!("Landmark delivery resumed");
    }

    /// Stop the frame stream. The receiver task owns the socket, so the
    /// port is free once this returns.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), Puppet3dError>> {
        async move {
            if let Some(receiver) = self.receiver.take() {
                receiver.abort();
                let _ = receiver.await;
                tracing::info!("Landmark stream stopped");
            }
            Ok(())
        }
        .boxed()
    }

    /// Shut down the detector helper, which also releases the camera
    fn close(&mut self) -> BoxFuture<'_, Result<(), Puppet3dError>> {
        async move {
            if let Some(mut subprocess) = self.subprocess.take() {
                subprocess.stop().await;
            }
            self.paused.store(false, Ordering::Relaxed);
            tracing::debug!("Landmark source closed");
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::mailbox::detector_mailboxes;

    fn hands_json() -> String {
        serde_json::json!({
            "type": "hands",
            "hands": [{
                "handedness": "Right",
                "score": 0.93,
                "landmarks": [{"x": 0.5, "y": 0.5, "z": 0.0}]
            }]
        })
        .to_string()
    }

    #[test]
    fn test_parse_packets() {
        let packet = TrackerPacket::parse(hands_json().as_bytes()).unwrap();
        assert!(matches!(packet, TrackerPacket::Hands(ref f) if f.hands.len() == 1));

        let packet = TrackerPacket::parse(br#"{"type":"face","faces":[]}"#).unwrap();
        assert!(matches!(packet, TrackerPacket::Face(ref f) if f.faces.is_empty()));

        let packet = TrackerPacket::parse(br#"{"type":"status","state":"ready"}"#).unwrap();
        assert!(matches!(packet, TrackerPacket::Status { ref state } if state == "ready"));

        let packet = TrackerPacket::parse(
            br#"{"type":"error","code":"permission_denied","message":"Permission denied"}"#,
        )
        .unwrap();
        assert!(matches!(packet, TrackerPacket::Error { .. }));

        assert!(TrackerPacket::parse(b"{\"type\":\"pose\"}").is_err());
    }

    #[test]
    fn test_deliver_respects_pause() {
        let (mailboxes, mut readers) = detector_mailboxes();
        let paused = AtomicBool::new(true);

        let packet = TrackerPacket::parse(hands_json().as_bytes()).unwrap();
        assert!(deliver(packet.clone(), &mailboxes, &paused));
        assert!(readers.hands.take_latest().is_none());

        paused.store(false, Ordering::Relaxed);
        deliver(packet, &mailboxes, &paused);
        assert_eq!(readers.hands.take_latest().unwrap().hands.len(), 1);
    }

    async fn source_on_free_port(timeout_secs: u64) -> (MediaPipeSource, std::net::SocketAddr) {
        // Reserve a free port, then hand it to the source
        let probe = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let config = DetectorConfig {
            auto_launch: false,
            port: addr.port(),
            ready_timeout_secs: timeout_secs,
            ..Default::default()
        };
        (MediaPipeSource::new(&config), addr)
    }

    #[tokio::test]
    async fn test_camera_error_fails_start() {
        let (mut source, addr) = source_on_free_port(5).await;
        let (mailboxes, _readers) = detector_mailboxes();

        let sender = tokio::spawn(async move {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            for _ in 0..50 {
                let _ = socket
                    .send_to(
                        br#"{"type":"error","code":"device_not_found","message":"no camera"}"#,
                        addr,
                    )
                    .await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        });

        let err = source.start(mailboxes).await.unwrap_err();
        assert!(matches!(
            err,
            Puppet3dError::Acquisition(AcquisitionError::DeviceNotFound(_))
        ));
        sender.abort();
    }

    #[tokio::test]
    async fn test_frames_flow_after_ready() {
        let (mut source, addr) = source_on_free_port(5).await;
        let (mailboxes, mut readers) = detector_mailboxes();

        let sender = tokio::spawn(async move {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            loop {
                let _ = socket
                    .send_to(br#"{"type":"status","state":"ready"}"#, addr)
                    .await;
                let _ = socket.send_to(hands_json().as_bytes(), addr).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        source.start(mailboxes).await.unwrap();

        let mut received = None;
        for _ in 0..100 {
            if let Some(frame) = readers.hands.take_latest() {
                received = Some(frame);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(received.is_some());

        source.stop().await.unwrap();
        source.close().await.unwrap();
        sender.abort();
    }

    #[tokio::test]
    async fn test_stop_halts_delivery_and_frees_port() {
        let (mut source, addr) = source_on_free_port(5).await;
        let (mailboxes, mut readers) = detector_mailboxes();

        let sender = tokio::spawn(async move {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            loop {
                let _ = socket
                    .send_to(br#"{"type":"status","state":"ready"}"#, addr)
                    .await;
                let _ = socket.send_to(hands_json().as_bytes(), addr).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        source.start(mailboxes).await.unwrap();
        source.stop().await.unwrap();
        readers.hands.take_latest();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(readers.hands.take_latest().is_none());

        source.close().await.unwrap();

        // The socket went with the receiver, so a new session can bind again
        let (mailboxes, _readers) = detector_mailboxes();
        source.start(mailboxes).await.unwrap();
        source.stop().await.unwrap();
        source.close().await.unwrap();
        sender.abort();
    }

    #[tokio::test]
    async fn test_silent_tracker_times_out() {
        let (mut source, _addr) = source_on_free_port(1).await;
        let (mailboxes, _readers) = detector_mailboxes();
        let err = source.start(mailboxes).await.unwrap_err();
        assert!(matches!(err, Puppet3dError::Detector(DetectorError::NotReady(_))));
    }
}
