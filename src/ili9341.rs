//! ILI9341 panel driver (SPI, D/C pin, RGB565).
//!
//! The panel is write-mostly: bring-up walks a fixed command sequence over the
//! synchronous link path, bulk pixel traffic goes through the
//! [`LineBatcher`](crate::batch::LineBatcher), and the small drawing helpers
//! (pixel, circle, glyph) use blocking window writes.

use crate::batch::{BatchError, LineBatcher, CASET, PASET, RAMWR};
use crate::link::{SpiQueue, TransferKind};

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use embedded_hal::delay::DelayNs;

pub const ILI9341_WIDTH: u16 = 240;
pub const ILI9341_HEIGHT: u16 = 320;

/// Bytes per full panel line (RGB565).
pub const LINE_BYTES: usize = ILI9341_WIDTH as usize * 2;

/// Read Display Identification Information.
const RDDID: u8 = 0x04;

/// Settle time after the entries flagged `post_delay`.
const POST_DELAY_MS: u32 = 100;

/// One step of the power-up sequence.
pub struct InitCommand {
    pub opcode: u8,
    pub payload: &'static [u8],
    /// Sleep [`POST_DELAY_MS`] after sending, for commands the controller
    /// needs time to apply (Sleep Out, Display On).
    pub post_delay: bool,
}

const fn step(opcode: u8, payload: &'static [u8]) -> InitCommand {
    InitCommand {
        opcode,
        payload,
        post_delay: false,
    }
}

const fn step_delayed(opcode: u8, payload: &'static [u8]) -> InitCommand {
    InitCommand {
        opcode,
        payload,
        post_delay: true,
    }
}

/// Power-up sequence for the ILI9341, sent in order at init.
pub static INIT_SEQUENCE: &[InitCommand] = &[
    // Power control B, power control = 0, DC_ENA = 1
    step(0xCF, &[0x00, 0x83, 0x30]),
    // Power on sequence control
    step(0xED, &[0x64, 0x03, 0x12, 0x81]),
    // Driver timing control A
    step(0xE8, &[0x85, 0x01, 0x79]),
    // Power control A, Vcore = 1.6V, DDVDH = 5.6V
    step(0xCB, &[0x39, 0x2C, 0x00, 0x34, 0x02]),
    // Pump ratio control, DDVDH = 2xVCl
    step(0xF7, &[0x20]),
    // Driver timing control, all = 0 unit
    step(0xEA, &[0x00, 0x00]),
    // Power control 1, GVDD = 4.75V
    step(0xC0, &[0x26]),
    // Power control 2, DDVDH = VCl*2, VGH = VCl*7, VGL = -VCl*3
    step(0xC1, &[0x11]),
    // VCOM control 1, VCOMH = 4.025V, VCOML = -0.950V
    step(0xC5, &[0x35, 0x3E]),
    // VCOM control 2, VCOMH = VMH-2, VCOML = VML-2
    step(0xC7, &[0xBE]),
    // Memory access control, MV = 1, BGR = 1
    step(0x36, &[0x68]),
    // Pixel format, 16 bits/pixel
    step(0x3A, &[0x55]),
    // Frame rate control, f = fosc, 70Hz
    step(0xB1, &[0x00, 0x1B]),
    // Enable 3G, disabled
    step(0xF2, &[0x08]),
    // Gamma set, curve 1
    step(0x26, &[0x01]),
    // Positive gamma correction
    step(
        0xE0,
        &[
            0x1F, 0x1A, 0x18, 0x0A, 0x0F, 0x06, 0x45, 0x87, 0x32, 0x0A, 0x07, 0x02, 0x07, 0x05,
            0x00,
        ],
    ),
    // Negative gamma correction
    step(
        0xE1,
        &[
            0x00, 0x25, 0x27, 0x05, 0x10, 0x09, 0x3A, 0x78, 0x4D, 0x05, 0x18, 0x0D, 0x38, 0x3A,
            0x1F,
        ],
    ),
    // Column address set, SC = 0, EC = 0xEF
    step(0x2A, &[0x00, 0x00, 0x00, 0xEF]),
    // Page address set, SP = 0, EP = 0x013F
    step(0x2B, &[0x00, 0x00, 0x01, 0x3F]),
    // Memory write
    step(0x2C, &[]),
    // Entry mode set, low vol detect disabled, normal display
    step(0xB7, &[0x07]),
    // Display function control
    step(0xB6, &[0x0A, 0x82, 0x27, 0x00]),
    // Sleep out
    step_delayed(0x11, &[]),
    // Display on
    step_delayed(0x29, &[]),
];

#[derive(Debug)]
pub enum PanelError<E> {
    /// SPI link failure.
    Link(E),
    /// Line batching misuse (double send, missing finish, bad row length).
    Batch(BatchError<E>),
    /// Coordinates outside the panel.
    OutOfBounds,
    /// Panel wider than the built-in line buffer ([`ILI9341_WIDTH`]).
    TooWide,
}

impl<E> From<BatchError<E>> for PanelError<E> {
    fn from(e: BatchError<E>) -> Self {
        match e {
            BatchError::Link(e) => Self::Link(e),
            other => Self::Batch(other),
        }
    }
}

pub struct Ili9341<Q> {
    batch: LineBatcher<Q>,
    width: u16,
    height: u16,
}

impl<Q: SpiQueue> Ili9341<Q> {
    pub fn new(link: Q) -> Self {
        Self::with_size(link, ILI9341_WIDTH, ILI9341_HEIGHT)
    }

    pub fn with_size(link: Q, width: u16, height: u16) -> Self {
        Self {
            batch: LineBatcher::new(link, width),
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Walk the power-up command sequence. The panel must have been hardware
    /// reset beforehand. The controller ID is logged, never checked: clone
    /// panels report all kinds of values here and init works regardless.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), PanelError<Q::Error>> {
        let id = self.read_id()?;
        log::info!("LCD ID: {:08x}", id);
        log::info!("LCD ILI9341 initialization");

        for cmd in INIT_SEQUENCE {
            self.cmd(cmd.opcode)?;
            self.data(cmd.payload)?;
            if cmd.post_delay {
                delay.delay_ms(POST_DELAY_MS);
            }
        }
        Ok(())
    }

    /// Read the 24-bit display identification into the low bytes of a `u32`.
    pub fn read_id(&mut self) -> Result<u32, PanelError<Q::Error>> {
        self.cmd(RDDID)?;
        let mut id = [0u8; 3];
        self.link()
            .receive(TransferKind::Data, &mut id)
            .map_err(PanelError::Link)?;
        Ok(u32::from_be_bytes([0, id[0], id[1], id[2]]))
    }

    /// Queue one pixel row (big-endian RGB565, `width * 2` bytes) for panel
    /// line `row`. Non-blocking; pair with [`finish`](Ili9341::finish).
    pub fn send_line(&mut self, row: u16, pixels: &[u8]) -> Result<(), PanelError<Q::Error>> {
        if row >= self.height {
            return Err(PanelError::OutOfBounds);
        }
        self.batch.send_line(row, pixels)?;
        Ok(())
    }

    /// Wait for the last queued line to land on the panel.
    pub fn finish(&mut self) -> Result<(), PanelError<Q::Error>> {
        self.batch.finish()?;
        Ok(())
    }

    /// Paint the whole panel one solid line at a time.
    ///
    /// The line buffer is sized for [`ILI9341_WIDTH`]; a
    /// [`with_size`](Ili9341::with_size) panel wider than that gets
    /// [`PanelError::TooWide`].
    pub fn clear_screen(&mut self, color: Rgb565) -> Result<(), PanelError<Q::Error>> {
        let mut row: heapless::Vec<u8, LINE_BYTES> = heapless::Vec::new();
        let be = color.into_storage().to_be_bytes();
        for _ in 0..self.width {
            row.extend_from_slice(&be).map_err(|_| PanelError::TooWide)?;
        }
        for y in 0..self.height {
            self.batch.send_line(y, &row)?;
            self.batch.finish()?;
        }
        Ok(())
    }

    /// Blocking single-pixel write.
    pub fn draw_pixel(
        &mut self,
        x: u16,
        y: u16,
        color: Rgb565,
    ) -> Result<(), PanelError<Q::Error>> {
        self.set_window(x, y, x, y)?;
        self.cmd(RAMWR)?;
        self.data(&color.into_storage().to_be_bytes())
    }

    /// Integer midpoint circle outline. Points falling off the panel are
    /// skipped.
    pub fn draw_circle(
        &mut self,
        cx: u16,
        cy: u16,
        r: u16,
        color: Rgb565,
    ) -> Result<(), PanelError<Q::Error>> {
        let (cx, cy) = (cx as i32, cy as i32);
        let mut x = 0i32;
        let mut y = r as i32;
        let mut d = 3 - 2 * r as i32;
        while x <= y {
            for &(px, py) in &[
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx + x, cy - y),
                (cx - x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx + y, cy - x),
                (cx - y, cy - x),
            ] {
                self.plot(px, py, color)?;
            }
            if d < 0 {
                d += 4 * x + 6;
            } else {
                d += 4 * (x - y) + 10;
                y -= 1;
            }
            x += 1;
        }
        Ok(())
    }

    /// Draw a 16x16 monochrome glyph (32 bytes, row-major, MSB first) with a
    /// transparent background.
    pub fn draw_glyph_16(
        &mut self,
        x: u16,
        y: u16,
        glyph: &[u8; 32],
        color: Rgb565,
    ) -> Result<(), PanelError<Q::Error>> {
        for row in 0..16u16 {
            let i = row as usize * 2;
            let bits = u16::from_be_bytes([glyph[i], glyph[i + 1]]);
            for col in 0..16u16 {
                if bits & (0x8000 >> col) != 0 {
                    self.plot((x + col) as i32, (y + row) as i32, color)?;
                }
            }
        }
        Ok(())
    }

    // ---- Low-level helpers ----

    pub(crate) fn link(&mut self) -> &mut Q {
        self.batch.link_mut()
    }

    fn cmd(&mut self, opcode: u8) -> Result<(), PanelError<Q::Error>> {
        self.link()
            .transmit(TransferKind::Command, &[opcode])
            .map_err(PanelError::Link)
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), PanelError<Q::Error>> {
        // No transfer for parameterless commands.
        if bytes.is_empty() {
            return Ok(());
        }
        self.link()
            .transmit(TransferKind::Data, bytes)
            .map_err(PanelError::Link)
    }

    fn set_window(
        &mut self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), PanelError<Q::Error>> {
        if x0 > x1 || y0 > y1 || x1 >= self.width || y1 >= self.height {
            return Err(PanelError::OutOfBounds);
        }
        let ca = [(x0 >> 8) as u8, (x0 & 0xFF) as u8, (x1 >> 8) as u8, (x1 & 0xFF) as u8];
        let pa = [(y0 >> 8) as u8, (y0 & 0xFF) as u8, (y1 >> 8) as u8, (y1 & 0xFF) as u8];
        self.cmd(CASET)?;
        self.data(&ca)?;
        self.cmd(PASET)?;
        self.data(&pa)?;
        Ok(())
    }

    fn plot(&mut self, x: i32, y: i32, color: Rgb565) -> Result<(), PanelError<Q::Error>> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return Ok(());
        }
        self.draw_pixel(x as u16, y as u16, color)
    }
}

// -------------------- embedded-graphics integration --------------------

impl<Q: SpiQueue> OriginDimensions for Ili9341<Q> {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl<Q: SpiQueue> DrawTarget for Ili9341<Q> {
    type Color = Rgb565;
    type Error = PanelError<Q::Error>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Rgb565>>,
    {
        for Pixel(p, c) in pixels {
            self.plot(p.x, p.y, c)?;
        }
        Ok(())
    }

    fn clear(&mut self, color: Rgb565) -> Result<(), Self::Error> {
        self.clear_screen(color)
    }
}
