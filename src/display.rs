//! ESP32 SPI backend and panel setup.
//
// - `EspSpiQueue` implements the link seam over esp-hal SPI + the D/C pin.
// - `setup_panel` wires SPI2 at 26 MHz mode 0, hard-resets the panel, walks
//   the init sequence and turns the backlight on.

use esp_backtrace as _;

use esp_hal::{
    gpio::Output,
    spi::master::{Config, Spi},
    spi::Mode,
    time::Rate,
    Blocking,
};

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_hal_bus::spi::{DeviceError, ExclusiveDevice, NoDelay};

use crate::ili9341::Ili9341;
use crate::link::{SpiQueue, TransferKind, QUEUE_DEPTH};

// A tiny busy-wait delay that satisfies embedded-hal 1.0 DelayNs.
pub struct SpinDelay;
impl embedded_hal::delay::DelayNs for SpinDelay {
    #[inline]
    fn delay_ns(&mut self, ns: u32) {
        let mut n = ns / 50 + 1;
        while n != 0 {
            core::hint::spin_loop();
            n -= 1;
        }
    }
    #[inline]
    fn delay_us(&mut self, us: u32) {
        for _ in 0..us {
            self.delay_ns(1_000);
        }
    }
    #[inline]
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }
}

// This matches the wiring: Spi<Blocking> + CS pin + NoDelay
pub type SpiDev<'a> = ExclusiveDevice<Spi<'a, Blocking>, Output<'a>, NoDelay>;

type SpiDevError = DeviceError<esp_hal::spi::Error, core::convert::Infallible>;

#[derive(Debug)]
pub enum EspLinkError {
    Spi(SpiDevError),
    QueueFull,
    NothingQueued,
}

/// SPI link with a D/C pre-transfer hook.
///
/// The transfer runs to completion inside `enqueue` (the bus is blocking) and
/// only the completion report is deferred to `drain_next`; the queue contract
/// the batcher relies on is unchanged, there is just never more than the
/// bookkeeping in flight.
pub struct EspSpiQueue<'a> {
    dev: SpiDev<'a>,
    dc: Output<'a>,
    in_flight: usize,
}

impl<'a> EspSpiQueue<'a> {
    pub fn new(dev: SpiDev<'a>, dc: Output<'a>) -> Self {
        Self {
            dev,
            dc,
            in_flight: 0,
        }
    }

    // Pre-transfer hook: the D/C line tracks the transfer tag.
    fn select(&mut self, kind: TransferKind) {
        match kind {
            TransferKind::Command => self.dc.set_low(),
            TransferKind::Data => self.dc.set_high(),
        }
    }
}

impl<'a> SpiQueue for EspSpiQueue<'a> {
    type Error = EspLinkError;

    fn enqueue(&mut self, kind: TransferKind, payload: &[u8]) -> Result<(), EspLinkError> {
        if self.in_flight >= QUEUE_DEPTH {
            return Err(EspLinkError::QueueFull);
        }
        self.select(kind);
        self.dev.write(payload).map_err(EspLinkError::Spi)?;
        self.in_flight += 1;
        Ok(())
    }

    fn drain_next(&mut self) -> Result<(), EspLinkError> {
        if self.in_flight == 0 {
            return Err(EspLinkError::NothingQueued);
        }
        self.in_flight -= 1;
        Ok(())
    }

    fn transmit(&mut self, kind: TransferKind, payload: &[u8]) -> Result<(), EspLinkError> {
        self.select(kind);
        self.dev.write(payload).map_err(EspLinkError::Spi)
    }

    fn receive(&mut self, kind: TransferKind, buf: &mut [u8]) -> Result<(), EspLinkError> {
        self.select(kind);
        self.dev.read(buf).map_err(EspLinkError::Spi)
    }
}

// Expose a ready-to-use panel type (shares the SPI lifetime).
pub type PanelType<'a> = Ili9341<EspSpiQueue<'a>>;

pub fn setup_panel(pins: crate::wiring::LcdPins<'static>) -> PanelType<'static> {
    let crate::wiring::LcdPins {
        spi2,
        sclk,
        mosi,
        miso,
        cs,
        dc,
        mut rst,
        mut backlight,
    } = pins;

    let mut delay = SpinDelay;

    // SPI @ 26 MHz, Mode 0
    let spi = Spi::new(
        spi2,
        Config::default()
            .with_frequency(Rate::from_hz(26_000_000))
            .with_mode(Mode::_0),
    )
    .unwrap()
    .with_sck(sclk)
    .with_mosi(mosi)
    .with_miso(miso);

    let dev = ExclusiveDevice::new(spi, cs, NoDelay).unwrap();

    // Hard reset, then give the controller time to come back.
    rst.set_low();
    delay.delay_ms(100);
    rst.set_high();
    delay.delay_ms(100);

    let mut panel = Ili9341::new(EspSpiQueue::new(dev, dc));
    panel.init(&mut delay).expect("ILI9341 init failed");

    // Backlight is active low on this board.
    backlight.set_low();

    panel
}
