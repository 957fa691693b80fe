//! The header block: card magic plus the allocation directory.

use crate::error::{Error, Result};
use crate::frame::{BlockState, DirectoryFrame};
use crate::layout::{
    BLOCK_COUNT, BLOCK_SIZE, FILLER_OFFSET, FILLER_SIZE, FRAMES_OFFSET, FRAME_SIZE,
    HEADER_MAGIC, HEADER_XOR, RESERVED_FRAMES_OFFSET, RESERVED_FRAME_COUNT, TRAILER_OFFSET,
    TRAILER_SIZE,
};

/// Parsed header block.
///
/// Only the 15 live frames are reachable by index; the 20 reserved frames,
/// the filler and the trailer are carried along so they serialize unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTable {
    /// Magic, padding and the header's constant byte 127.
    prefix: [u8; FRAME_SIZE],
    frames: Vec<DirectoryFrame>,
    reserved: Vec<DirectoryFrame>,
    filler: Vec<u8>,
    trailer: [u8; TRAILER_SIZE],
}

impl DirectoryTable {
    /// Header of a blank card: every live frame free, every reserved frame unusable.
    pub fn format() -> Self {
        let mut prefix = [0u8; FRAME_SIZE];
        prefix[..2].copy_from_slice(HEADER_MAGIC);
        prefix[FRAME_SIZE - 1] = HEADER_XOR;

        Self {
            prefix,
            frames: (0..BLOCK_COUNT).map(|_| DirectoryFrame::available()).collect(),
            reserved: (0..RESERVED_FRAME_COUNT)
                .map(|_| DirectoryFrame::unusable())
                .collect(),
            filler: vec![0xFF; FILLER_SIZE],
            trailer: [0u8; TRAILER_SIZE],
        }
    }

    /// Parse the first [`BLOCK_SIZE`] bytes of a raw card image.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_SIZE {
            return Err(Error::Truncated {
                expected: BLOCK_SIZE,
                actual: bytes.len(),
            });
        }
        if !bytes.starts_with(HEADER_MAGIC) {
            return Err(Error::UnrecognizedFormat);
        }

        let mut prefix = [0u8; FRAME_SIZE];
        prefix.copy_from_slice(&bytes[..FRAME_SIZE]);
        let mut trailer = [0u8; TRAILER_SIZE];
        trailer.copy_from_slice(&bytes[TRAILER_OFFSET..TRAILER_OFFSET + TRAILER_SIZE]);

        Ok(Self {
            prefix,
            frames: (0..BLOCK_COUNT)
                .map(|i| frame_at(bytes, FRAMES_OFFSET + i * FRAME_SIZE))
                .collect(),
            reserved: (0..RESERVED_FRAME_COUNT)
                .map(|i| frame_at(bytes, RESERVED_FRAMES_OFFSET + i * FRAME_SIZE))
                .collect(),
            filler: bytes[FILLER_OFFSET..FILLER_OFFSET + FILLER_SIZE].to_vec(),
            trailer,
        })
    }

    /// Serialize the header block into `out`.
    pub fn write_to(&self, out: &mut [u8; BLOCK_SIZE]) {
        out[..FRAME_SIZE].copy_from_slice(&self.prefix);
        for (i, frame) in self.frames.iter().enumerate() {
            let offset = FRAMES_OFFSET + i * FRAME_SIZE;
            out[offset..offset + FRAME_SIZE].copy_from_slice(&frame.to_bytes());
        }
        for (i, frame) in self.reserved.iter().enumerate() {
            let offset = RESERVED_FRAMES_OFFSET + i * FRAME_SIZE;
            out[offset..offset + FRAME_SIZE].copy_from_slice(&frame.to_bytes());
        }
        out[FILLER_OFFSET..FILLER_OFFSET + FILLER_SIZE].copy_from_slice(&self.filler);
        out[TRAILER_OFFSET..TRAILER_OFFSET + TRAILER_SIZE].copy_from_slice(&self.trailer);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = [0u8; BLOCK_SIZE];
        self.write_to(&mut out);
        out.to_vec()
    }

    /// Byte 127 of the header. Carried as-is; the format does not define it
    /// as a checksum over the header.
    pub fn header_xor(&self) -> u8 {
        self.prefix[FRAME_SIZE - 1]
    }

    pub fn frame(&self, index: usize) -> Option<&DirectoryFrame> {
        self.frames.get(index)
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut DirectoryFrame> {
        self.frames.get_mut(index)
    }

    pub fn frames(&self) -> &[DirectoryFrame] {
        &self.frames
    }

    pub(crate) fn frames_mut(&mut self) -> &mut [DirectoryFrame] {
        &mut self.frames
    }

    pub fn reserved_frames(&self) -> &[DirectoryFrame] {
        &self.reserved
    }

    /// Indexes of free frames, lowest first.
    pub fn free_indices(&self) -> Vec<usize> {
        self.indices_in_state(BlockState::Available)
    }

    /// Indexes of frames starting a save, lowest first.
    pub fn first_indices(&self) -> Vec<usize> {
        self.indices_in_state(BlockState::First)
    }

    fn indices_in_state(&self, state: BlockState) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, frame)| frame.block_state == state)
            .map(|(i, _)| i)
            .collect()
    }
}

fn frame_at(bytes: &[u8], offset: usize) -> DirectoryFrame {
    let mut raw = [0u8; FRAME_SIZE];
    raw.copy_from_slice(&bytes[offset..offset + FRAME_SIZE]);
    DirectoryFrame::from_bytes(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;

    #[test]
    fn format_lays_out_header_block() {
        let bytes = DirectoryTable::format().to_bytes();
        assert_eq!(bytes.len(), BLOCK_SIZE);
        assert_eq!(&bytes[..2], b"MC");
        assert_eq!(bytes[127], 0x0E);

        for i in 0..BLOCK_COUNT {
            let offset = FRAMES_OFFSET + i * FRAME_SIZE;
            assert_eq!(bytes[offset], 0xA0, "live frame {i}");
        }
        for i in 0..RESERVED_FRAME_COUNT {
            let offset = RESERVED_FRAMES_OFFSET + i * FRAME_SIZE;
            assert_eq!(bytes[offset], 0xFF, "reserved frame {i}");
            let mut frame = [0u8; FRAME_SIZE];
            frame.copy_from_slice(&bytes[offset..offset + FRAME_SIZE]);
            assert!(checksum::verify(&frame));
        }
        assert!(bytes[FILLER_OFFSET..TRAILER_OFFSET].iter().all(|&b| b == 0xFF));
        assert!(bytes[TRAILER_OFFSET..].iter().all(|&b| b == 0));
    }

    #[test]
    fn parse_round_trips_unknown_bytes() {
        let mut bytes = DirectoryTable::format().to_bytes();
        bytes[50] = 0x42;
        bytes[TRAILER_OFFSET + 3] = 0x99;
        bytes[FRAMES_OFFSET + 40] = 0x17;

        let table = DirectoryTable::parse(&bytes).unwrap();
        assert_eq!(table.to_bytes(), bytes);
    }

    #[test]
    fn write_to_overwrites_a_whole_block() {
        let mut table = DirectoryTable::format();
        table.frame_mut(2).unwrap().block_state = BlockState::First;
        table.frame_mut(2).unwrap().fix_checksum();

        let mut out = [0x5Au8; BLOCK_SIZE];
        table.write_to(&mut out);
        assert_eq!(&out[..], &table.to_bytes()[..]);
        assert_eq!(out[FRAMES_OFFSET + 2 * FRAME_SIZE], 0x51);
    }

    #[test]
    fn parse_rejects_wrong_magic() {
        let mut bytes = DirectoryTable::format().to_bytes();
        bytes[0] = b'X';
        assert_eq!(DirectoryTable::parse(&bytes), Err(Error::UnrecognizedFormat));
    }

    #[test]
    fn header_constant_is_not_validated() {
        let mut bytes = DirectoryTable::format().to_bytes();
        bytes[127] = 0x00;
        let table = DirectoryTable::parse(&bytes).unwrap();
        assert_eq!(table.header_xor(), 0x00);
    }

    #[test]
    fn only_live_frames_are_indexable() {
        let table = DirectoryTable::format();
        assert!(table.frame(14).is_some());
        assert!(table.frame(15).is_none());
        assert_eq!(table.free_indices(), (0..15).collect::<Vec<_>>());
        assert!(table.first_indices().is_empty());
        assert_eq!(table.reserved_frames().len(), 20);
    }
}
