//! Seam between the panel code and the SPI peripheral driver.
//!
//! The ILI9341 shares one SPI bus for commands and pixel data and tells them
//! apart with the D/C control line. Every transfer therefore carries a
//! [`TransferKind`] tag; the backend sets the D/C level from the tag in its
//! pre-transfer hook, right before chip select asserts.

/// How many transfers a backend may hold in flight at once.
pub const QUEUE_DEPTH: usize = 7;

/// What a transfer is, from the panel's point of view. Decides the D/C level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Command opcode byte(s); D/C driven low.
    Command,
    /// Parameter or pixel payload; D/C driven high.
    Data,
}

/// Write-mostly SPI link with a small completion queue.
///
/// `enqueue` must not wait for the transfer to finish on the wire; the caller
/// collects completions through `drain_next`, one per queued transfer, in
/// order. `transmit` and `receive` are the synchronous path used during panel
/// bring-up, where queuing buys nothing.
pub trait SpiQueue {
    type Error: core::fmt::Debug;

    /// Queue one transfer. Fails when the queue is full ([`QUEUE_DEPTH`]).
    fn enqueue(&mut self, kind: TransferKind, payload: &[u8]) -> Result<(), Self::Error>;

    /// Block until the oldest queued transfer completes and report its
    /// result. Fails when nothing is queued.
    fn drain_next(&mut self) -> Result<(), Self::Error>;

    /// Synchronous write, bypassing the queue.
    fn transmit(&mut self, kind: TransferKind, payload: &[u8]) -> Result<(), Self::Error>;

    /// Synchronous read of `buf.len()` bytes, bypassing the queue.
    fn receive(&mut self, kind: TransferKind, buf: &mut [u8]) -> Result<(), Self::Error>;
}
