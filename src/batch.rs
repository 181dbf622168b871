//! Line Transfer Batcher.
//!
//! Painting one panel line takes a fixed six-transfer sequence: column window
//! command + range, page window command + range, memory write command, then
//! the pixel payload. [`LineBatcher::send_line`] queues all six without
//! waiting; [`LineBatcher::finish`] blocks until the peripheral has reported
//! every one done. The split lets a caller compute the next line while the
//! current one is still on the wire.
//!
//! The batcher owns the in-flight batch: a second `send_line` before `finish`
//! is rejected, so at most one batch is outstanding at any time.

use crate::link::{SpiQueue, TransferKind};

/// Column Address Set.
pub const CASET: u8 = 0x2A;
/// Page Address Set.
pub const PASET: u8 = 0x2B;
/// Memory Write.
pub const RAMWR: u8 = 0x2C;

/// Transfers queued per line.
pub const BATCH_LEN: usize = 6;

#[derive(Debug)]
pub enum BatchError<E> {
    /// The previous line has not been drained yet; call `finish` first.
    Busy,
    /// `finish` was called with no batch queued.
    NothingPending,
    /// Pixel row length does not match the panel width.
    RowLength { expected: usize, got: usize },
    /// Peripheral driver failure.
    Link(E),
}

impl<E: core::fmt::Debug> From<E> for BatchError<E> {
    fn from(e: E) -> Self {
        Self::Link(e)
    }
}

pub struct LineBatcher<Q> {
    link: Q,
    width: u16,
    pending: usize,
}

impl<Q: SpiQueue> LineBatcher<Q> {
    pub fn new(link: Q, width: u16) -> Self {
        Self {
            link,
            width,
            pending: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Transfers queued but not yet drained.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.pending
    }

    /// Direct access to the link for the synchronous command path.
    pub fn link_mut(&mut self) -> &mut Q {
        &mut self.link
    }

    /// Give the link back, e.g. to re-borrow it elsewhere after drawing.
    pub fn release(self) -> Q {
        self.link
    }

    /// Queue the six transfers that paint `pixels` (big-endian RGB565, one
    /// full row) at panel line `row`. Non-blocking; pair with [`finish`].
    ///
    /// [`finish`]: LineBatcher::finish
    pub fn send_line(&mut self, row: u16, pixels: &[u8]) -> Result<(), BatchError<Q::Error>> {
        if self.pending != 0 {
            return Err(BatchError::Busy);
        }
        let expected = self.width as usize * 2;
        if pixels.len() != expected {
            return Err(BatchError::RowLength {
                expected,
                got: pixels.len(),
            });
        }

        let last_col = self.width - 1;
        let cols = [0, 0, (last_col >> 8) as u8, (last_col & 0xFF) as u8];
        let pages = [
            (row >> 8) as u8,
            (row & 0xFF) as u8,
            (row >> 8) as u8,
            (row & 0xFF) as u8,
        ];

        self.queue(TransferKind::Command, &[CASET])?;
        self.queue(TransferKind::Data, &cols)?;
        self.queue(TransferKind::Command, &[PASET])?;
        self.queue(TransferKind::Data, &pages)?;
        self.queue(TransferKind::Command, &[RAMWR])?;
        self.queue(TransferKind::Data, pixels)?;
        Ok(())
    }

    /// Block until every transfer queued by the last `send_line` completes.
    /// Fails with [`BatchError::NothingPending`] when the batch was already
    /// drained, rather than waiting forever on completions that will never
    /// arrive.
    pub fn finish(&mut self) -> Result<(), BatchError<Q::Error>> {
        if self.pending == 0 {
            return Err(BatchError::NothingPending);
        }
        while self.pending != 0 {
            self.link.drain_next()?;
            self.pending -= 1;
        }
        Ok(())
    }

    // Keeps `pending` accurate even when the link rejects a transfer partway
    // through a batch, so a later `finish` drains exactly what was queued.
    fn queue(&mut self, kind: TransferKind, payload: &[u8]) -> Result<(), BatchError<Q::Error>> {
        self.link.enqueue(kind, payload)?;
        self.pending += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::TransferKind::{Command, Data};
    use crate::testlink::{MockError, MockLink};
    use std::vec;
    use std::vec::Vec;

    fn batcher(width: u16) -> LineBatcher<MockLink> {
        LineBatcher::new(MockLink::default(), width)
    }

    #[test]
    fn line_batch_is_six_transfers_in_protocol_order() {
        let mut b = batcher(240);
        b.send_line(17, &vec![0u8; 480]).unwrap();

        let log = &b.link_mut().log;
        let kinds: Vec<_> = log.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [Command, Data, Command, Data, Command, Data]);

        let bits: Vec<_> = log.iter().map(|t| t.bits()).collect();
        assert_eq!(bits, [8, 32, 8, 32, 8, 240 * 16]);

        assert_eq!(log[0].bytes, [CASET]);
        assert_eq!(log[2].bytes, [PASET]);
        assert_eq!(log[4].bytes, [RAMWR]);
        assert!(log.iter().all(|t| t.queued));
    }

    #[test]
    fn column_range_always_ends_at_width_minus_one() {
        for &(width, row) in &[(240u16, 0u16), (240, 319), (128, 7), (320, 100)] {
            let mut b = batcher(width);
            b.send_line(row, &vec![0u8; width as usize * 2]).unwrap();
            let cols = &b.link_mut().log[1].bytes;
            assert_eq!(cols[..2], [0, 0]);
            assert_eq!(u16::from_be_bytes([cols[2], cols[3]]), width - 1);
        }
    }

    #[test]
    fn page_range_repeats_row_big_endian() {
        for &row in &[0u16, 1, 0x013F] {
            let mut b = batcher(240);
            b.send_line(row, &vec![0u8; 480]).unwrap();
            let hi = (row >> 8) as u8;
            let lo = (row & 0xFF) as u8;
            assert_eq!(b.link_mut().log[3].bytes, [hi, lo, hi, lo]);
        }
    }

    #[test]
    fn finish_consumes_exactly_one_batch() {
        let mut b = batcher(240);
        b.send_line(0, &vec![0u8; 480]).unwrap();
        b.finish().unwrap();
        assert_eq!(b.link_mut().drained, BATCH_LEN);

        // A second finish must fail distinctly instead of blocking.
        assert!(matches!(b.finish(), Err(BatchError::NothingPending)));
        assert_eq!(b.link_mut().drained, BATCH_LEN);
    }

    #[test]
    fn second_line_must_wait_for_finish() {
        let mut b = batcher(240);
        let row = vec![0u8; 480];
        b.send_line(0, &row).unwrap();
        assert!(matches!(b.send_line(1, &row), Err(BatchError::Busy)));
        b.finish().unwrap();
        b.send_line(1, &row).unwrap();
    }

    #[test]
    fn row_length_must_match_width() {
        let mut b = batcher(240);
        match b.send_line(0, &[0u8; 10]) {
            Err(BatchError::RowLength { expected, got }) => {
                assert_eq!(expected, 480);
                assert_eq!(got, 10);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(b.in_flight(), 0);
    }

    #[test]
    fn link_failure_keeps_pending_count_accurate() {
        let mut link = MockLink::default();
        link.fail_enqueue_at = Some(2); // third transfer is rejected
        let mut b = LineBatcher::new(link, 240);

        match b.send_line(0, &vec![0u8; 480]) {
            Err(BatchError::Link(MockError::Rejected)) => {}
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(b.in_flight(), 2);

        // The two transfers that did go out are still drainable.
        b.finish().unwrap();
        assert_eq!(b.in_flight(), 0);
    }

    #[test]
    fn full_screen_issues_1920_transfers_and_drains_clean() {
        let mut b = batcher(240);
        let row = vec![0x07u8; 480];
        for y in 0..320u16 {
            b.send_line(y, &row).unwrap();
            b.finish().unwrap();
        }
        let link = b.release();
        assert_eq!(link.log.len(), 320 * BATCH_LEN);
        assert_eq!(link.in_flight, 0);
        assert_eq!(link.drained, 1920);
    }
}
