use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("File format not recognized")]
    UnrecognizedFormat,

    #[error("Card image truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Corrupt block chain starting at slot {start}: bad link to block {index}")]
    CorruptChain { start: usize, index: usize },

    #[error("Wrong save magic bytes: {0:02X?}")]
    InvalidSaveMagic([u8; 2]),

    #[error("Odd size of save data ({0} bytes); not a multiple of 8192")]
    InvalidSaveSize(usize),

    #[error("Block count wrong in metadata: declares {declared}, data holds {actual}")]
    BlockCountMismatch { declared: usize, actual: usize },

    #[error("Not enough free blocks: need {needed}, {available} available")]
    InsufficientSpace { needed: usize, available: usize },

    #[error("Save not found: {0}")]
    SaveNotFound(String),

    #[error("Invalid slot: {0} (must be 0-14)")]
    InvalidSlot(usize),

    #[error("Invalid save filename {filename:?}: {reason}")]
    InvalidFilename { filename: String, reason: String },

    #[error("Title cannot be encoded as Shift-JIS: {0:?}")]
    TitleEncoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
