use byteorder::{ByteOrder, LittleEndian};

use crate::checksum;
use crate::layout::{
    COUNTRY_CODE_LEN, END_OF_CHAIN, FILENAME_MAX_LEN, FRAME_SIZE, IDENTIFIER_LEN,
    PRODUCT_CODE_LEN,
};

const PADDING_LEN: usize = 97;

/// Allocation state of the block a frame describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    Available,
    Unusable,
    First,
    Middle,
    Last,
    /// Any other state byte (e.g. the 0xA1-0xA3 "deleted" markers some
    /// consoles leave behind). Kept verbatim and never allocated over.
    Unknown(u8),
}

impl BlockState {
    pub const AVAILABLE: u8 = 0xA0;
    pub const UNUSABLE: u8 = 0xFF;
    pub const FIRST: u8 = 0x51;
    pub const MIDDLE: u8 = 0x52;
    pub const LAST: u8 = 0x53;

    pub fn from_byte(value: u8) -> Self {
        match value {
            Self::AVAILABLE => BlockState::Available,
            Self::UNUSABLE => BlockState::Unusable,
            Self::FIRST => BlockState::First,
            Self::MIDDLE => BlockState::Middle,
            Self::LAST => BlockState::Last,
            other => BlockState::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            BlockState::Available => Self::AVAILABLE,
            BlockState::Unusable => Self::UNUSABLE,
            BlockState::First => Self::FIRST,
            BlockState::Middle => Self::MIDDLE,
            BlockState::Last => Self::LAST,
            BlockState::Unknown(value) => value,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockState::Available => "free",
            BlockState::Unusable => "unusable",
            BlockState::First => "first",
            BlockState::Middle => "middle",
            BlockState::Last => "last",
            BlockState::Unknown(_) => "unknown",
        }
    }
}

/// One 128-byte directory entry.
///
/// Fields the card format leaves unspecified (`reserved`, `padding`) are kept
/// so a loaded frame serializes back to the exact bytes it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFrame {
    pub block_state: BlockState,
    pub reserved: [u8; 3],
    /// Total save size in bytes; only meaningful on a [`BlockState::First`] frame.
    pub save_length: i32,
    pub next_block: u8,
    pub next_frame: u8,
    pub country_code: [u8; COUNTRY_CODE_LEN],
    pub product_code: [u8; PRODUCT_CODE_LEN],
    pub identifier: [u8; IDENTIFIER_LEN],
    pub padding: [u8; PADDING_LEN],
    pub xor: u8,
}

impl DirectoryFrame {
    /// All-zero frame. Not a valid state on its own.
    pub fn zeroed() -> Self {
        Self::from_bytes(&[0u8; FRAME_SIZE])
    }

    /// Free frame with a correct checksum.
    pub fn available() -> Self {
        let mut frame = Self::zeroed();
        frame.block_state = BlockState::Available;
        frame.fix_checksum();
        frame
    }

    /// Reserved (non-allocatable) frame as written by a fresh format.
    pub fn unusable() -> Self {
        let mut frame = Self::zeroed();
        frame.block_state = BlockState::Unusable;
        frame.reserved = [0xFF; 3];
        frame.next_block = END_OF_CHAIN;
        frame.next_frame = END_OF_CHAIN;
        frame.fix_checksum();
        frame
    }

    pub fn from_bytes(bytes: &[u8; FRAME_SIZE]) -> Self {
        let mut frame = Self {
            block_state: BlockState::from_byte(bytes[0]),
            reserved: [0; 3],
            save_length: LittleEndian::read_i32(&bytes[4..8]),
            next_block: bytes[8],
            next_frame: bytes[9],
            country_code: [0; COUNTRY_CODE_LEN],
            product_code: [0; PRODUCT_CODE_LEN],
            identifier: [0; IDENTIFIER_LEN],
            padding: [0; PADDING_LEN],
            xor: bytes[FRAME_SIZE - 1],
        };
        frame.reserved.copy_from_slice(&bytes[1..4]);
        frame.country_code.copy_from_slice(&bytes[10..12]);
        frame.product_code.copy_from_slice(&bytes[12..22]);
        frame.identifier.copy_from_slice(&bytes[22..30]);
        frame.padding.copy_from_slice(&bytes[30..127]);
        frame
    }

    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[0] = self.block_state.to_byte();
        bytes[1..4].copy_from_slice(&self.reserved);
        LittleEndian::write_i32(&mut bytes[4..8], self.save_length);
        bytes[8] = self.next_block;
        bytes[9] = self.next_frame;
        bytes[10..12].copy_from_slice(&self.country_code);
        bytes[12..22].copy_from_slice(&self.product_code);
        bytes[22..30].copy_from_slice(&self.identifier);
        bytes[30..127].copy_from_slice(&self.padding);
        bytes[FRAME_SIZE - 1] = self.xor;
        bytes
    }

    pub fn checksum_ok(&self) -> bool {
        checksum::verify(&self.to_bytes())
    }

    pub fn fix_checksum(&mut self) {
        let bytes = self.to_bytes();
        self.xor = checksum::compute(&bytes[..FRAME_SIZE - 1]);
    }

    /// Zero every field and mark the frame free again.
    pub fn reset(&mut self) {
        *self = Self::available();
    }

    /// Index of the following block, or `None` at the end of a chain.
    pub fn next(&self) -> Option<usize> {
        match self.next_block {
            END_OF_CHAIN => None,
            index => Some(usize::from(index)),
        }
    }

    /// Country code, product code and identifier joined together.
    pub fn filename(&self) -> String {
        let mut filename = String::with_capacity(FILENAME_MAX_LEN);
        for field in [&self.country_code[..], &self.product_code[..], &self.identifier[..]] {
            filename.push_str(&nul_terminated(field));
        }
        filename
    }
}

fn nul_terminated(field: &[u8]) -> std::borrow::Cow<'_, str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end])
}

impl std::fmt::Display for DirectoryFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.block_state {
            BlockState::Available | BlockState::Unusable => {
                write!(f, "<DirectoryFrame: type={}>", self.block_state.name())
            }
            state => write!(
                f,
                "<DirectoryFrame: type={} filename=\"{}\">",
                state.name(),
                self.filename()
            ),
        }
    }
}
