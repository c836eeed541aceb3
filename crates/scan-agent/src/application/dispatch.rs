//! ScanDispatcher: the single consumer of the key queue.
//!
//! Every capture source writes into the same bounded queue.  The dispatcher
//! drains it on one thread, feeds each key to the [`KeystrokeClassifier`],
//! and hands every accepted barcode to a [`BarcodeConsumer`] exactly once.
//!
//! ```text
//! focused field ─┐
//!                ├─► key queue ─► ScanDispatcher ─► classifier ─► BarcodeConsumer
//! OS hook ───────┘
//! ```
//!
//! The dispatcher also resets the classifier whenever the origin of the keys
//! changes, so a partial burst from one source never merges with keys from
//! another even if the explicit reset signal was dropped on a full queue.

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use scan_core::{Barcode, ClassifierStats, KeystrokeClassifier, TimingConfig};
use tracing::{debug, info, warn};

use crate::infrastructure::input_capture::{CaptureKind, CaptureSignal};

/// A barcode accepted by the classifier, tagged with where it was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeScanned {
    pub code: Barcode,
    pub origin: CaptureKind,
}

/// Receives accepted barcodes.
///
/// `deliver` returns `false` when the consumer is gone; the dispatcher keeps
/// running so that capture sources are never blocked by a missing consumer.
pub trait BarcodeConsumer: Send {
    fn deliver(&self, scan: BarcodeScanned) -> bool;
}

impl BarcodeConsumer for tokio::sync::mpsc::UnboundedSender<BarcodeScanned> {
    fn deliver(&self, scan: BarcodeScanned) -> bool {
        self.send(scan).is_ok()
    }
}

impl BarcodeConsumer for mpsc::Sender<BarcodeScanned> {
    fn deliver(&self, scan: BarcodeScanned) -> bool {
        self.send(scan).is_ok()
    }
}

/// Drains captured keys through the classifier.
pub struct ScanDispatcher<C> {
    classifier: KeystrokeClassifier,
    consumer: C,
    last_origin: Option<CaptureKind>,
    consumer_gone: bool,
}

impl<C: BarcodeConsumer> ScanDispatcher<C> {
    pub fn new(config: TimingConfig, consumer: C) -> Self {
        Self {
            classifier: KeystrokeClassifier::new(config),
            consumer,
            last_origin: None,
            consumer_gone: false,
        }
    }

    pub fn stats(&self) -> ClassifierStats {
        self.classifier.stats()
    }

    /// Applies one queue message to the classifier.
    ///
    /// Returns the accepted barcode, if any, without delivering it.
    pub fn classify(&mut self, signal: CaptureSignal) -> Option<BarcodeScanned> {
        match signal {
            CaptureSignal::Reset => {
                self.classifier.reset();
                self.last_origin = None;
                None
            }
            CaptureSignal::Key { event, source } => {
                if self.last_origin.is_some_and(|last| last != source) {
                    debug!(from = ?self.last_origin, to = %source, "key origin changed");
                    self.classifier.reset();
                }
                self.last_origin = Some(source);
                self.classifier.on_key_event(event).map(|code| BarcodeScanned {
                    code,
                    origin: source,
                })
            }
        }
    }

    /// Classifies one message and delivers any accepted barcode.
    pub fn process(&mut self, signal: CaptureSignal) -> Option<BarcodeScanned> {
        let scan = self.classify(signal)?;
        info!(origin = %scan.origin, length = scan.code.len(), "barcode scanned");
        if !self.consumer.deliver(scan.clone()) && !self.consumer_gone {
            warn!("barcode consumer has gone away; further scans are dropped");
            self.consumer_gone = true;
        }
        Some(scan)
    }

    /// Processes messages until every sender of `rx` has been dropped.
    pub fn run(mut self, rx: Receiver<CaptureSignal>) -> ClassifierStats {
        while let Ok(signal) = rx.recv() {
            self.process(signal);
        }
        let stats = self.classifier.stats();
        debug!(?stats, "key queue closed");
        stats
    }
}

impl<C: BarcodeConsumer + 'static> ScanDispatcher<C> {
    /// Runs the dispatcher on a dedicated, named thread.
    ///
    /// The thread ends, returning the classifier counters, once every
    /// [`KeySender`](crate::infrastructure::input_capture::KeySender) is gone.
    pub fn spawn(self, rx: Receiver<CaptureSignal>) -> io::Result<JoinHandle<ClassifierStats>> {
        thread::Builder::new()
            .name("scan-dispatch".to_string())
            .spawn(move || self.run(rx))
    }
}
