//! Detection of the file wrapper around a raw card image.
//!
//! Emulators and dumping hardware store the same 128KB image behind different
//! prefixes. The prefix is identified by a signature at the start of the file
//! and tells us where the raw image begins.

use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::CARD_SIZE;

const PSP_SIGNATURE: &[u8; 3] = b"PMV";
const DEXDRIVE_SIGNATURE: &[u8; 11] = b"123-456-STD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Bare image (`.mcr`, `.srm`, ...).
    Raw,
    /// PSP/PS3 virtual memory card (`.vmp`).
    Psp,
    /// DexDrive dump (`.gme`).
    DexDrive,
}

impl Container {
    pub const fn offset(self) -> usize {
        match self {
            Container::Raw => 0,
            Container::Psp => 0x80,
            Container::DexDrive => 0xF40,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Container::Raw => "raw",
            Container::Psp => "PSP",
            Container::DexDrive => "DexDrive",
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify `data` by its leading signature.
pub fn detect(data: &[u8]) -> Result<Container> {
    let container = if data.starts_with(b"MC") {
        Container::Raw
    } else if data.get(1..4) == Some(PSP_SIGNATURE.as_slice()) {
        Container::Psp
    } else if data.starts_with(DEXDRIVE_SIGNATURE) {
        Container::DexDrive
    } else {
        return Err(Error::UnrecognizedFormat);
    };

    debug!("Detected {container} memory card");
    Ok(container)
}

/// Detect the wrapper and return it together with the byte offset of the raw
/// image, failing when the file is too short to hold a full card after it.
pub fn detect_offset(data: &[u8]) -> Result<(Container, usize)> {
    let container = detect(data)?;
    let offset = container.offset();
    let expected = offset + CARD_SIZE;
    if data.len() < expected {
        return Err(Error::Truncated {
            expected,
            actual: data.len(),
        });
    }
    Ok((container, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_signature_starts_at_zero() {
        assert_eq!(detect(b"MC\0\0").unwrap(), Container::Raw);
        assert_eq!(Container::Raw.offset(), 0);
    }

    #[test]
    fn psp_signature_is_found_at_byte_one() {
        assert_eq!(detect(b"\0PMV\0\0").unwrap(), Container::Psp);
        assert_eq!(Container::Psp.offset(), 0x80);
    }

    #[test]
    fn dexdrive_signature_is_recognized() {
        assert_eq!(detect(b"123-456-STD\0").unwrap(), Container::DexDrive);
        assert_eq!(Container::DexDrive.offset(), 0xF40);
    }

    #[test]
    fn unknown_and_short_inputs_are_rejected() {
        assert_eq!(detect(b""), Err(Error::UnrecognizedFormat));
        assert_eq!(detect(b"M"), Err(Error::UnrecognizedFormat));
        assert_eq!(detect(b"Sony PS2 Memory Card Format"), Err(Error::UnrecognizedFormat));
    }

    #[test]
    fn detect_offset_requires_a_full_card_after_the_prefix() {
        let mut data = vec![0u8; 0xF40 + CARD_SIZE - 1];
        data[..11].copy_from_slice(DEXDRIVE_SIGNATURE);
        assert_eq!(
            detect_offset(&data),
            Err(Error::Truncated {
                expected: 0xF40 + CARD_SIZE,
                actual: data.len(),
            })
        );

        data.push(0);
        assert_eq!(detect_offset(&data).unwrap(), (Container::DexDrive, 0xF40));
    }
}
