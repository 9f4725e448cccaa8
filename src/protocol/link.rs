//! Serial link collaborators
//!
//! The codec only needs two things from the hardware: the DMA receive ring
//! (plus its remaining-count register) and a way to start a DMA transmit.
//! Transmit completion arrives asynchronously and clears a shared busy flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use super::frame::FrameError;

/// Transmit-path failures. Never fatal: the frame is dropped and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("transmitter busy")]
    Busy,
    #[error("peripheral refused the transfer")]
    Peripheral,
    #[error("could not encode frame: {0}")]
    Encode(#[from] FrameError),
}

/// Circular DMA receive channel
pub trait DmaReceiver {
    /// The whole ring buffer
    fn buffer(&self) -> &[u8];
    /// Remaining-count register: bytes left before the DMA wraps
    fn remaining(&self) -> usize;

    /// Index the DMA will write next
    fn write_pos(&self) -> usize {
        let len = self.buffer().len();
        if len == 0 {
            return 0;
        }
        len.saturating_sub(self.remaining()) % len
    }
}

/// DMA transmit channel
pub trait Transmitter {
    /// Start sending `frame`. Returns once the transfer is queued.
    fn start(&mut self, frame: &[u8]) -> Result<(), TxError>;
}

/// Busy flag shared between the main loop and the transmit-complete interrupt
#[derive(Debug, Clone, Default)]
pub struct TxBusy(Arc<AtomicBool>);

impl TxBusy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Claim the transmitter; false if a transfer is still in flight
    pub fn try_claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Transfer complete (called from the completion callback)
    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-memory DMA ring: `feed` plays the role of the peripheral
#[derive(Debug, Clone)]
pub struct SoftDma {
    ring: Vec<u8>,
    write: usize,
}

impl SoftDma {
    pub fn new(size: usize) -> Self {
        Self {
            ring: vec![0; size],
            write: 0,
        }
    }

    /// Write bytes at the DMA cursor, wrapping and overwriting unread data
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.ring.is_empty() {
            return;
        }
        for &b in bytes {
            self.ring[self.write] = b;
            self.write = (self.write + 1) % self.ring.len();
        }
    }
}

impl DmaReceiver for SoftDma {
    fn buffer(&self) -> &[u8] {
        &self.ring
    }

    fn remaining(&self) -> usize {
        self.ring.len() - self.write
    }
}

/// Records every transmitted frame. Completion is explicit via `complete`.
#[derive(Debug, Clone)]
pub struct CaptureUart {
    busy: TxBusy,
    pub frames: Vec<Vec<u8>>,
    /// Reject the next transfer with `TxError::Peripheral`
    pub fail_next: bool,
}

impl CaptureUart {
    pub fn new(busy: TxBusy) -> Self {
        Self {
            busy,
            frames: Vec::new(),
            fail_next: false,
        }
    }

    /// Transmit-complete interrupt
    pub fn complete(&self) {
        self.busy.release();
    }

    pub fn take_frames(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.frames)
    }
}

impl Transmitter for CaptureUart {
    fn start(&mut self, frame: &[u8]) -> Result<(), TxError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(TxError::Peripheral);
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_dma_cursor_wraps() {
        let mut dma = SoftDma::new(8);
        assert_eq!(dma.write_pos(), 0);
        dma.feed(&[1, 2, 3]);
        assert_eq!(dma.write_pos(), 3);
        assert_eq!(dma.remaining(), 5);
        dma.feed(&[4, 5, 6, 7, 8, 9]);
        assert_eq!(dma.write_pos(), 1);
        assert_eq!(dma.buffer()[0], 9);
    }

    #[test]
    fn test_busy_flag_is_single_slot() {
        let busy = TxBusy::new();
        let irq = busy.clone();
        assert!(busy.try_claim());
        assert!(!busy.try_claim());
        irq.release();
        assert!(!busy.is_busy());
        assert!(busy.try_claim());
    }

    #[test]
    fn test_capture_uart_failure_injection() {
        let mut uart = CaptureUart::new(TxBusy::new());
        uart.fail_next = true;
        assert_eq!(uart.start(&[1]), Err(TxError::Peripheral));
        assert_eq!(uart.start(&[2]), Ok(()));
        assert_eq!(uart.take_frames(), vec![vec![2]]);
    }
}
