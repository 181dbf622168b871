//! ILI9341 SPI LCD demo
//! ========================================
//! Clears the screen, draws a circle, then streams a 240x320 RGB565 bitmap
//! to the panel one line at a time through the transaction batcher.

//% CHIPS: esp32
//% FEATURES: esp-hal/unstable

#![no_std]
#![no_main]

// Define the application description, which is placed in a special section of
// the binary and checked by the bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

use esp32_lcd_demo::{
    display::setup_panel,
    ili9341::{ILI9341_HEIGHT, LINE_BYTES},
    storage::{SliceStorage, Storage},
    wiring::init_board_pins,
};

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use esp_backtrace as _;
use esp_hal::{main, Config};

// Assets baked into flash; the original board pulled these off an SD card.
static FILES: &[(&str, &[u8])] = &[("android1.bin", include_bytes!("../../assets/android1.bin"))];

#[main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(Config::default());
    let pins = init_board_pins(peripherals);

    let mut panel = setup_panel(pins);

    panel.clear_screen(Rgb565::WHITE).expect("clear failed");
    panel
        .draw_circle(100, 100, 30, Rgb565::RED)
        .expect("circle failed");

    let mut store = SliceStorage::new(FILES);
    store.mount().expect("mount failed");

    let mut bmp = store.open("android1.bin").expect("no bitmap file");
    let mut line = [0u8; LINE_BYTES];
    for y in 0..ILI9341_HEIGHT {
        store
            .seek(&mut bmp, y as u64 * LINE_BYTES as u64)
            .expect("seek failed");
        let n = store.read(&mut bmp, &mut line).expect("read failed");
        if n < LINE_BYTES {
            log::warn!("bitmap truncated at line {}", y);
            break;
        }
        panel.send_line(y, &line).expect("send_line failed");
        panel.finish().expect("finish failed");
    }

    store.unmount().expect("unmount failed");
    log::info!("demo done");

    loop {
        core::hint::spin_loop();
    }
}
