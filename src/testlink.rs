//! Recording fake of the SPI link for unit tests.

use crate::link::{SpiQueue, TransferKind, QUEUE_DEPTH};
use std::vec::Vec;

/// One transfer as the fake peripheral saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub kind: TransferKind,
    pub bytes: Vec<u8>,
    /// true for `enqueue`, false for `transmit`.
    pub queued: bool,
}

impl Transfer {
    pub fn bits(&self) -> usize {
        self.bytes.len() * 8
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MockError {
    QueueFull,
    NothingQueued,
    Rejected,
}

#[derive(Default)]
pub struct MockLink {
    pub log: Vec<Transfer>,
    /// Reads are answered from this buffer, zero-padded.
    pub read_data: Vec<u8>,
    pub receives: Vec<(TransferKind, usize)>,
    pub in_flight: usize,
    pub drained: usize,
    /// When set, the Nth call to `enqueue` (0-based over the whole run)
    /// fails with `Rejected`.
    pub fail_enqueue_at: Option<usize>,
    enqueues: usize,
}

impl MockLink {
    /// Opcode bytes of every command transfer, in order.
    pub fn commands(&self) -> Vec<u8> {
        self.log
            .iter()
            .filter(|t| t.kind == TransferKind::Command)
            .map(|t| t.bytes[0])
            .collect()
    }
}

impl SpiQueue for MockLink {
    type Error = MockError;

    fn enqueue(&mut self, kind: TransferKind, payload: &[u8]) -> Result<(), MockError> {
        if self.fail_enqueue_at == Some(self.enqueues) {
            self.enqueues += 1;
            return Err(MockError::Rejected);
        }
        self.enqueues += 1;
        if self.in_flight >= QUEUE_DEPTH {
            return Err(MockError::QueueFull);
        }
        self.in_flight += 1;
        self.log.push(Transfer {
            kind,
            bytes: payload.to_vec(),
            queued: true,
        });
        Ok(())
    }

    fn drain_next(&mut self) -> Result<(), MockError> {
        if self.in_flight == 0 {
            return Err(MockError::NothingQueued);
        }
        self.in_flight -= 1;
        self.drained += 1;
        Ok(())
    }

    fn transmit(&mut self, kind: TransferKind, payload: &[u8]) -> Result<(), MockError> {
        self.log.push(Transfer {
            kind,
            bytes: payload.to_vec(),
            queued: false,
        });
        Ok(())
    }

    fn receive(&mut self, kind: TransferKind, buf: &mut [u8]) -> Result<(), MockError> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_data.get(i).copied().unwrap_or(0);
        }
        self.receives.push((kind, buf.len()));
        Ok(())
    }
}

/// Delay that records milliseconds instead of sleeping.
#[derive(Default)]
pub struct MockDelay {
    pub ms: Vec<u32>,
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}
