//! Save icons: 16x16 pixels, 4 bits per pixel, indexing a 16-colour palette.

use crate::layout::{ICON_FRAME_SIZE, ICON_HEIGHT, ICON_WIDTH, PALETTE_LEN};

#[derive(Debug, Clone, Copy)]
pub struct Icon<'a> {
    flags: u8,
    palette: [u16; PALETTE_LEN],
    /// Save bytes from the first icon frame onwards.
    frames: &'a [u8],
}

impl<'a> Icon<'a> {
    pub fn new(flags: u8, palette: [u16; PALETTE_LEN], frames: &'a [u8]) -> Self {
        Self {
            flags,
            palette,
            frames,
        }
    }

    /// Animation frames announced by the icon flags (0x11, 0x12, 0x13).
    pub fn frame_count(&self) -> usize {
        match self.flags {
            0x12 => 2,
            0x13 => 3,
            _ => 1,
        }
    }

    pub fn frame(&self, index: usize) -> Option<&'a [u8]> {
        if index >= self.frame_count() {
            return None;
        }
        let start = index * ICON_FRAME_SIZE;
        self.frames.get(start..start + ICON_FRAME_SIZE)
    }

    /// Every announced frame that is present in the save.
    pub fn frames(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.frame_count()).filter_map(|index| self.frame(index))
    }

    pub fn palette_rgba(&self) -> [[u8; 4]; PALETTE_LEN] {
        self.palette.map(bgr555_to_rgba)
    }

    /// Frame `index` expanded to RGBA, row-major, 16x16.
    pub fn frame_rgba(&self, index: usize) -> Option<Vec<u8>> {
        let frame = self.frame(index)?;
        let palette = self.palette_rgba();
        let mut out = Vec::with_capacity(ICON_WIDTH * ICON_HEIGHT * 4);
        for byte in frame {
            // Low nibble is the left pixel.
            out.extend_from_slice(&palette[usize::from(byte & 0x0F)]);
            out.extend_from_slice(&palette[usize::from(byte >> 4)]);
        }
        Some(out)
    }
}

/// Expand a 15-bit BGR colour to 8-bit RGBA. Colour 0 is transparent.
pub fn bgr555_to_rgba(color: u16) -> [u8; 4] {
    let expand = |value: u16| {
        let value = (value & 0x1F) as u8;
        (value << 3) | (value >> 2)
    };
    let alpha = if color == 0 { 0 } else { 0xFF };
    [expand(color), expand(color >> 5), expand(color >> 10), alpha]
}
