//! Fixed offsets and sizes of the raw 128KB card image.

/// Size of one allocation unit, and of the header block.
pub const BLOCK_SIZE: usize = 8192;

/// Number of data blocks a card can hand out to saves.
pub const BLOCK_COUNT: usize = 15;

/// Header block followed by the data blocks.
pub const CARD_SIZE: usize = BLOCK_SIZE * (BLOCK_COUNT + 1);

pub const FRAME_SIZE: usize = 128;
pub const RESERVED_FRAME_COUNT: usize = 20;

pub const HEADER_MAGIC: &[u8; 2] = b"MC";
/// Written into byte 127 of a freshly formatted header. Never checked on load.
pub const HEADER_XOR: u8 = 0x0E;

pub const FRAMES_OFFSET: usize = FRAME_SIZE;
pub const RESERVED_FRAMES_OFFSET: usize = FRAMES_OFFSET + FRAME_SIZE * BLOCK_COUNT;
pub const FILLER_OFFSET: usize = RESERVED_FRAMES_OFFSET + FRAME_SIZE * RESERVED_FRAME_COUNT;
pub const FILLER_SIZE: usize = 3456;
pub const TRAILER_OFFSET: usize = FILLER_OFFSET + FILLER_SIZE;
pub const TRAILER_SIZE: usize = FRAME_SIZE;

/// `next_block` value terminating a chain.
pub const END_OF_CHAIN: u8 = 0xFF;

pub const SAVE_MAGIC: &[u8; 2] = b"SC";
pub const TITLE_SIZE: usize = 64;
pub const PALETTE_OFFSET: usize = 0x60;
pub const PALETTE_LEN: usize = 16;
pub const ICON_OFFSET: usize = 0x80;
pub const ICON_FRAME_SIZE: usize = 128;
pub const ICON_WIDTH: usize = 16;
pub const ICON_HEIGHT: usize = 16;

pub const COUNTRY_CODE_LEN: usize = 2;
pub const PRODUCT_CODE_LEN: usize = 10;
pub const IDENTIFIER_LEN: usize = 8;
pub const FILENAME_MAX_LEN: usize = COUNTRY_CODE_LEN + PRODUCT_CODE_LEN + IDENTIFIER_LEN;

/// Byte offset of data block `index` within the raw image.
pub const fn block_offset(index: usize) -> usize {
    BLOCK_SIZE * (index + 1)
}

const _: () = assert!(TRAILER_OFFSET + TRAILER_SIZE == BLOCK_SIZE);
const _: () = assert!(ICON_OFFSET == PALETTE_OFFSET + PALETTE_LEN * 2);
