//! Text rendering from an external glyph file.
//!
//! The font file holds 16x16 monochrome glyphs, 32 bytes each, indexed by the
//! 16-bit Unicode code point: glyph for code `c` lives at byte offset
//! `c * 32`. Text lays out on a fixed grid, 16 glyphs per row.

use crate::ili9341::{Ili9341, PanelError};
use crate::link::SpiQueue;
use crate::storage::Storage;

use embedded_graphics::pixelcolor::Rgb565;

/// Bytes per glyph in the font file.
pub const GLYPH_BYTES: usize = 32;
/// Glyph cell edge in pixels.
pub const GLYPH_SIZE: u16 = 16;
/// Glyphs per layout row.
pub const GLYPHS_PER_ROW: u16 = 16;

const REPLACEMENT: u16 = b'?' as u16;

/// Decode the first scalar of `bytes` into a 16-bit code point, returning the
/// code and how many bytes were consumed.
///
/// Handles 1-, 2- and 3-byte sequences (the BMP, which is all the font file
/// can index). Anything else maps to `?` and still consumes a byte, so a
/// caller walking a string always makes progress.
pub fn utf8_to_unicode(bytes: &[u8]) -> (u16, usize) {
    let b0 = match bytes.first() {
        Some(&b) => b,
        None => return (REPLACEMENT, 0),
    };
    if b0 & 0x80 == 0 {
        (b0 as u16, 1)
    } else if b0 & 0xE0 == 0xC0 && bytes.len() >= 2 && is_cont(bytes[1]) {
        let code = (((b0 & 0x1F) as u16) << 6) | (bytes[1] & 0x3F) as u16;
        (code, 2)
    } else if b0 & 0xF0 == 0xE0 && bytes.len() >= 3 && is_cont(bytes[1]) && is_cont(bytes[2]) {
        let code = (((b0 & 0x0F) as u16) << 12)
            | (((bytes[1] & 0x3F) as u16) << 6)
            | (bytes[2] & 0x3F) as u16;
        (code, 3)
    } else {
        (REPLACEMENT, 1)
    }
}

#[inline]
fn is_cont(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Byte offset of a glyph in the font file.
#[inline]
pub fn glyph_offset(code: u16) -> u64 {
    code as u64 * GLYPH_BYTES as u64
}

#[derive(Debug)]
pub enum TextError<PE, SE> {
    Panel(PE),
    Storage(SE),
}

/// Draw `text` starting at `(start_x, start_y)`, 16 glyphs per row, looking
/// glyphs up in an open font file. Code points whose glyph record is missing
/// (short read past the end of the file) are skipped but keep their grid
/// cell.
pub fn show_text<Q, S>(
    panel: &mut Ili9341<Q>,
    store: &mut S,
    font: &mut S::Handle,
    start_x: u16,
    start_y: u16,
    text: &str,
    color: Rgb565,
) -> Result<(), TextError<PanelError<Q::Error>, S::Error>>
where
    Q: SpiQueue,
    S: Storage,
{
    let mut rest = text.as_bytes();
    let mut index: u16 = 0;
    let mut glyph = [0u8; GLYPH_BYTES];

    while !rest.is_empty() {
        let (code, used) = utf8_to_unicode(rest);
        rest = &rest[used..];

        store
            .seek(font, glyph_offset(code))
            .map_err(TextError::Storage)?;
        let n = store.read(font, &mut glyph).map_err(TextError::Storage)?;
        if n == GLYPH_BYTES {
            let x = start_x + (index % GLYPHS_PER_ROW) * GLYPH_SIZE;
            let y = start_y + (index / GLYPHS_PER_ROW) * GLYPH_SIZE;
            panel
                .draw_glyph_16(x, y, &glyph, color)
                .map_err(TextError::Panel)?;
        }
        index += 1;
    }
    Ok(())
}
