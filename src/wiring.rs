// This module handles the board-specific pin mapping for the ESP32 devkit
// with an ILI9341 module on the HSPI pins.
//! The following wiring is assumed:
//! - MISO => GPIO25
//! - MOSI => GPIO23
//! - CLK  => GPIO19
//! - CS   => GPIO22
//! - D/C  => GPIO21
//! - RST  => GPIO18
//! - BCKL => GPIO5 (active low)
//! - GND => GND
//! - 3.3V => 3.3V

use esp_backtrace as _;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::peripherals::{Peripherals, GPIO19, GPIO23, GPIO25, SPI2};

pub struct LcdPins<'a> {
    pub spi2: SPI2<'a>,
    pub sclk: GPIO19<'a>,
    pub mosi: GPIO23<'a>,
    pub miso: GPIO25<'a>,
    pub cs: Output<'a>,
    pub dc: Output<'a>,
    pub rst: Output<'a>,
    pub backlight: Output<'a>,
}

pub fn init_board_pins<'a>(p: Peripherals) -> LcdPins<'a> {
    // LCD control pins. The SPI routing pins (GPIO19/23/25) are handed over
    // raw; Spi::new claims them in display.rs.
    let cs = Output::new(p.GPIO22, Level::High, OutputConfig::default());
    let dc = Output::new(p.GPIO21, Level::Low, OutputConfig::default());
    let rst = Output::new(p.GPIO18, Level::High, OutputConfig::default());
    let backlight = Output::new(p.GPIO5, Level::High, OutputConfig::default());

    LcdPins {
        spi2: p.SPI2,
        sclk: p.GPIO19,
        mosi: p.GPIO23,
        miso: p.GPIO25,
        cs,
        dc,
        rst,
        backlight,
    }
}
