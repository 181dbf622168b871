#![no_std]

#[cfg(test)]
extern crate std;

pub mod batch;
pub mod font;
pub mod ili9341;
pub mod link;
pub mod storage;

#[cfg(test)]
pub mod testlink;

#[cfg(feature = "esp32")]
pub mod display;
#[cfg(feature = "esp32")]
pub mod wiring;
