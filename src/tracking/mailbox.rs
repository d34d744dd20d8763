//! Single-slot, latest-value-wins mailboxes between detectors and the render loop
//!
//! A detector callback overwrites the slot; the render tick takes whatever is
//! newest. Stale frames are never queued.

use tokio::sync::watch;

use super::landmarks::{FaceFrame, HandsFrame};

/// Write side of a mailbox
#[derive(Debug)]
pub struct Mailbox<T> {
    tx: watch::Sender<Option<T>>,
}

/// Read side of a mailbox
#[derive(Debug)]
pub struct MailboxReader<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Create a connected mailbox pair
pub fn mailbox<T>() -> (Mailbox<T>, MailboxReader<T>) {
    let (tx, rx) = watch::channel(None);
    (Mailbox { tx }, MailboxReader { rx })
}

impl<T> Mailbox<T> {
    /// Replace the slot content; succeeds even with no reader attached
    pub fn post(&self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

impl<T: Clone> MailboxReader<T> {
    /// The newest value posted since the last call, if any
    pub fn take_latest(&mut self) -> Option<T> {
        match self.rx.has_changed() {
            Ok(true) => self.rx.borrow_and_update().clone(),
            _ => None,
        }
    }
}

/// Mailboxes handed to a landmark source
#[derive(Debug, Clone)]
pub struct DetectorMailboxes {
    pub hands: Mailbox<HandsFrame>,
    pub face: Mailbox<FaceFrame>,
}

/// Readers owned by the render loop
#[derive(Debug)]
pub struct DetectorReaders {
    pub hands: MailboxReader<HandsFrame>,
    pub face: MailboxReader<FaceFrame>,
}

/// One mailbox per detector channel
pub fn detector_mailboxes() -> (DetectorMailboxes, DetectorReaders) {
    let (hands_tx, hands_rx) = mailbox();
    let (face_tx, face_rx) = mailbox();
    (
        DetectorMailboxes {
            hands: hands_tx,
            face: face_tx,
        },
        DetectorReaders {
            hands: hands_rx,
            face: face_rx,
        },
    )
}
