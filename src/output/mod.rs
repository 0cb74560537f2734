//! # Pulse Output
//!
//! The tick publishes one complete frame of pulse widths per period. A
//! separate emitter keeps re-sending the most recent frame between ticks,
//! the way a hardware pulse generator would.
//!
//! Frames travel through a `tokio::sync::watch` channel: the transmitter is
//! the only writer and every publish replaces the whole frame, so the
//! emitter never observes a frame with some channels updated and others
//! stale.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, trace};

use crate::settings::CHANNELS;

/// Pulse widths of all channels, microseconds.
pub type PulseFrame = [u16; CHANNELS];

/// Number of emitted frames between status log messages
pub const FRAME_LOG_INTERVAL: u64 = 500;

/// Receiver of the per-tick pulse frame.
pub trait PulseOutput: Send {
    /// Replace the frame being emitted.
    fn publish(&mut self, frame: &PulseFrame);
}

/// Watch-backed pulse output.
///
/// Holds no frame until the first publish.
#[derive(Debug)]
pub struct PulseBuffer {
    tx: watch::Sender<Option<PulseFrame>>,
}

impl PulseBuffer {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// New receiver observing the published frames.
    pub fn subscribe(&self) -> watch::Receiver<Option<PulseFrame>> {
        self.tx.subscribe()
    }

    /// Most recently published frame.
    #[must_use]
    pub fn latest(&self) -> Option<PulseFrame> {
        *self.tx.borrow()
    }
}

impl Default for PulseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseOutput for PulseBuffer {
    fn publish(&mut self, frame: &PulseFrame) {
        // Works without receivers, the frame is kept for later subscribers
        self.tx.send_replace(Some(*frame));
    }
}

/// Re-emits the latest frame every `period` until the publisher is dropped.
///
/// Nothing is emitted before the first frame is published. Returns the
/// number of frames emitted.
///
/// # Arguments
///
/// * `rx` - Receiver from [`PulseBuffer::subscribe`]
/// * `period` - Frame period
/// * `emit` - Called with each frame to send
pub async fn run_emitter<F>(
    rx: watch::Receiver<Option<PulseFrame>>,
    period: Duration,
    mut emit: F,
) -> u64
where
    F: FnMut(&PulseFrame) + Send,
{
    let mut ticker = interval(period);
    let mut emitted: u64 = 0;

    loop {
        ticker.tick().await;

        let frame = *rx.borrow();
        if let Some(frame) = frame {
            emit(&frame);
            emitted += 1;
            trace!("Frame {}: {:?}", emitted, frame);

            if emitted % FRAME_LOG_INTERVAL == 0 {
                info!("Emitted {} frames, last {:?}", emitted, frame);
            }
        }

        if rx.has_changed().is_err() {
            debug!("Pulse publisher closed after {} frames", emitted);
            break;
        }
    }

    emitted
}
