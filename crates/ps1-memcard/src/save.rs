//! Saves as seen by consumers: a filename plus the bytes of every block in
//! the chain, the first of which opens with a [`MetadataBlock`].

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::SHIFT_JIS;
use tracing::info;

use crate::directory::DirectoryTable;
use crate::error::{Error, Result};
use crate::frame::DirectoryFrame;
use crate::icon::Icon;
use crate::layout::{
    BLOCK_SIZE, ICON_OFFSET, PALETTE_LEN, PALETTE_OFFSET, SAVE_MAGIC, TITLE_SIZE,
};

/// Structured header at the start of a save's first block.
///
/// Only the fixed fields are parsed; the icon frames and payload that follow
/// stay in the save's byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlock {
    pub magic: [u8; 2],
    pub icon_flags: u8,
    pub save_block_count: u8,
    /// Shift-JIS, NUL padded.
    pub title: [u8; TITLE_SIZE],
    pub pocketstation_mc_icon_frame_count: u16,
    pub pocketstation_identifier: [u8; 4],
    pub pocketstation_ap_icon_frame_count: u16,
    /// 15-bit BGR colours indexed by the icon pixels.
    pub palette: [u16; PALETTE_LEN],
}

impl MetadataBlock {
    /// Bytes covered by the fixed fields.
    pub const SIZE: usize = ICON_OFFSET;

    /// Static single-frame icon.
    pub const ICON_STATIC: u8 = 0x11;

    /// Header for a new save with the given title and length in blocks.
    pub fn new(title: &str, save_block_count: u8) -> Result<Self> {
        Ok(Self {
            magic: *SAVE_MAGIC,
            icon_flags: Self::ICON_STATIC,
            save_block_count,
            title: encode_title(title)?,
            pocketstation_mc_icon_frame_count: 0,
            pocketstation_identifier: [0; 4],
            pocketstation_ap_icon_frame_count: 0,
            palette: [0; PALETTE_LEN],
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::InvalidSaveSize(bytes.len()));
        }

        let mut metadata = Self {
            magic: [bytes[0], bytes[1]],
            icon_flags: bytes[2],
            save_block_count: bytes[3],
            title: [0; TITLE_SIZE],
            pocketstation_mc_icon_frame_count: LittleEndian::read_u16(&bytes[0x50..0x52]),
            pocketstation_identifier: [0; 4],
            pocketstation_ap_icon_frame_count: LittleEndian::read_u16(&bytes[0x56..0x58]),
            palette: [0; PALETTE_LEN],
        };
        metadata.title.copy_from_slice(&bytes[4..4 + TITLE_SIZE]);
        metadata
            .pocketstation_identifier
            .copy_from_slice(&bytes[0x52..0x56]);
        LittleEndian::read_u16_into(&bytes[PALETTE_OFFSET..ICON_OFFSET], &mut metadata.palette);
        Ok(metadata)
    }

    /// Write the fixed fields into the first [`MetadataBlock::SIZE`] bytes of
    /// `out`. Padding bytes are cleared.
    pub fn write_to(&self, out: &mut [u8]) {
        let out = &mut out[..Self::SIZE];
        out.fill(0);
        out[..2].copy_from_slice(&self.magic);
        out[2] = self.icon_flags;
        out[3] = self.save_block_count;
        out[4..4 + TITLE_SIZE].copy_from_slice(&self.title);
        LittleEndian::write_u16(&mut out[0x50..0x52], self.pocketstation_mc_icon_frame_count);
        out[0x52..0x56].copy_from_slice(&self.pocketstation_identifier);
        LittleEndian::write_u16(&mut out[0x56..0x58], self.pocketstation_ap_icon_frame_count);
        LittleEndian::write_u16_into(&self.palette, &mut out[PALETTE_OFFSET..ICON_OFFSET]);
    }

    pub fn title(&self) -> String {
        let end = self
            .title
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TITLE_SIZE);
        let (title, _) = SHIFT_JIS.decode_without_bom_handling(&self.title[..end]);
        title.into_owned()
    }

    pub fn has_magic(&self) -> bool {
        &self.magic == SAVE_MAGIC
    }
}

fn encode_title(title: &str) -> Result<[u8; TITLE_SIZE]> {
    let (encoded, _, had_errors) = SHIFT_JIS.encode(title);
    if had_errors || encoded.len() > TITLE_SIZE {
        return Err(Error::TitleEncoding(title.to_string()));
    }
    let mut out = [0u8; TITLE_SIZE];
    out[..encoded.len()].copy_from_slice(&encoded);
    Ok(out)
}

/// A save's identity and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Save {
    filename: String,
    data: Vec<u8>,
    metadata: MetadataBlock,
}

impl Save {
    /// Wrap raw save bytes (metadata block included). At least one full block
    /// is needed to hold the metadata; everything else is checked by
    /// [`Save::validate`].
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        if data.len() < BLOCK_SIZE {
            return Err(Error::InvalidSaveSize(data.len()));
        }
        let metadata = MetadataBlock::parse(&data)?;
        Ok(Self {
            filename: filename.into(),
            data,
            metadata,
        })
    }

    /// Build a save from a metadata header and the bytes that follow it
    /// (icon frames first). The result is zero padded to the block count the
    /// header declares.
    pub fn compose(
        filename: impl Into<String>,
        metadata: &MetadataBlock,
        body: &[u8],
    ) -> Result<Self> {
        let length = usize::from(metadata.save_block_count) * BLOCK_SIZE;
        if length == 0 || MetadataBlock::SIZE + body.len() > length {
            return Err(Error::InvalidSaveSize(MetadataBlock::SIZE + body.len()));
        }
        let mut data = vec![0u8; length];
        metadata.write_to(&mut data);
        data[MetadataBlock::SIZE..MetadataBlock::SIZE + body.len()].copy_from_slice(body);
        Self::new(filename, data)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn title(&self) -> String {
        self.metadata.title()
    }

    /// Block count declared in the metadata.
    pub fn blocks(&self) -> usize {
        usize::from(self.metadata.save_block_count)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn metadata(&self) -> &MetadataBlock {
        &self.metadata
    }

    pub fn icon(&self) -> Icon<'_> {
        Icon::new(
            self.metadata.icon_flags,
            self.metadata.palette,
            &self.data[ICON_OFFSET..],
        )
    }

    /// Up to `length` bytes starting at `offset`; short or empty past the end.
    pub fn read(&self, offset: usize, length: usize) -> &[u8] {
        let start = offset.min(self.data.len());
        let end = start.saturating_add(length).min(self.data.len());
        &self.data[start..end]
    }

    /// Check the save is well formed enough to be written to a card.
    pub fn validate(&self) -> Result<()> {
        if !self.metadata.has_magic() {
            info!("Wrong magic bytes: {:?}", self.metadata.magic);
            return Err(Error::InvalidSaveMagic(self.metadata.magic));
        }
        let length = self.data.len();
        if length % BLOCK_SIZE != 0 {
            info!("Odd size of data; not a multiple of {BLOCK_SIZE}");
            return Err(Error::InvalidSaveSize(length));
        }
        let actual = length / BLOCK_SIZE;
        if actual != self.blocks() {
            info!("Block count wrong in metadata");
            return Err(Error::BlockCountMismatch {
                declared: self.blocks(),
                actual,
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl std::fmt::Display for Save {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "<Save: filename=\"{}\" blocks={}>",
            self.filename,
            self.blocks()
        )
    }
}

/// Assemble the save stored in `chain`, reading block bytes from `blocks`
/// (the card's data area) and the filename from the chain's first frame.
pub fn decode(directory: &DirectoryTable, blocks: &[u8], chain: &[usize]) -> Result<Save> {
    let Some(&first) = chain.first() else {
        return Err(Error::SaveNotFound("empty chain".to_string()));
    };
    let filename = directory
        .frame(first)
        .map(DirectoryFrame::filename)
        .ok_or(Error::InvalidSlot(first))?;

    let mut data = Vec::with_capacity(chain.len() * BLOCK_SIZE);
    for &index in chain {
        let block = blocks
            .get(index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE)
            .ok_or(Error::InvalidSlot(index))?;
        data.extend_from_slice(block);
    }
    Save::new(filename, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_save(blocks: u8, length: usize) -> Vec<u8> {
        let mut data = vec![0u8; length];
        data[..2].copy_from_slice(b"SC");
        data[2] = 0x11;
        data[3] = blocks;
        data
    }

    #[test]
    fn one_block_save_with_magic_is_valid() {
        let save = Save::new("BASLUS-00001TEST", raw_save(1, 8192)).unwrap();
        assert!(save.is_valid());
        assert_eq!(save.blocks(), 1);
    }

    #[test]
    fn extra_block_without_header_update_is_a_mismatch() {
        let save = Save::new("BASLUS-00001TEST", raw_save(1, 16384)).unwrap();
        assert_eq!(
            save.validate(),
            Err(Error::BlockCountMismatch {
                declared: 1,
                actual: 2,
            })
        );
        assert!(!save.is_valid());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut data = raw_save(1, 8192);
        data[0] = b'X';
        let save = Save::new("BASLUS-00001TEST", data).unwrap();
        assert_eq!(save.validate(), Err(Error::InvalidSaveMagic(*b"XC")));
    }

    #[test]
    fn ragged_length_is_rejected() {
        let save = Save::new("BASLUS-00001TEST", raw_save(1, 8200)).unwrap();
        assert_eq!(save.validate(), Err(Error::InvalidSaveSize(8200)));
    }

    #[test]
    fn shorter_than_a_block_cannot_be_wrapped() {
        assert_eq!(
            Save::new("BASLUS-00001TEST", raw_save(1, 100)),
            Err(Error::InvalidSaveSize(100))
        );
    }

    #[test]
    fn validation_is_repeatable() {
        let save = Save::new("BASLUS-00001TEST", raw_save(2, 8192)).unwrap();
        let before = save.clone();
        let first = save.validate();
        assert_eq!(save.validate(), first);
        assert_eq!(save, before);
    }

    #[test]
    fn title_decodes_shift_jis() {
        let metadata = MetadataBlock::new("セーブデータ", 1).unwrap();
        let save = Save::compose("BISLPS-00001SAVE", &metadata, &[]).unwrap();
        assert_eq!(save.title(), "セーブデータ");
        assert_eq!(save.data().len(), BLOCK_SIZE);
        assert!(save.is_valid());
    }

    #[test]
    fn full_width_title_is_stored_as_two_byte_codes() {
        let metadata = MetadataBlock::new("ＡＢ", 1).unwrap();
        assert_eq!(&metadata.title[..4], &[0x82, 0x60, 0x82, 0x61]);
        assert_eq!(metadata.title[4], 0);
    }

    #[test]
    fn overlong_title_is_rejected() {
        let title = "x".repeat(TITLE_SIZE + 1);
        assert_eq!(
            MetadataBlock::new(&title, 1),
            Err(Error::TitleEncoding(title.clone()))
        );
    }

    #[test]
    fn metadata_fields_round_trip_through_bytes() {
        let mut metadata = MetadataBlock::new("TEST", 3).unwrap();
        metadata.palette[0] = 0x7FFF;
        metadata.palette[15] = 0x001F;
        metadata.pocketstation_identifier = *b"MCX0";
        metadata.pocketstation_mc_icon_frame_count = 2;

        let mut bytes = [0u8; MetadataBlock::SIZE];
        metadata.write_to(&mut bytes);
        assert_eq!(&bytes[0x60..0x62], &[0xFF, 0x7F]);
        assert_eq!(MetadataBlock::parse(&bytes).unwrap(), metadata);
    }

    #[test]
    fn read_clamps_like_a_file() {
        let save = Save::new("BASLUS-00001TEST", raw_save(1, 8192)).unwrap();
        assert_eq!(save.read(0, 2), b"SC");
        assert_eq!(save.read(8190, 100).len(), 2);
        assert!(save.read(9000, 10).is_empty());
        assert_eq!(save.read(0, usize::MAX).len(), 8192);
    }

    #[test]
    fn compose_rejects_body_that_does_not_fit() {
        let metadata = MetadataBlock::new("TEST", 1).unwrap();
        let body = vec![0u8; BLOCK_SIZE];
        assert!(matches!(
            Save::compose("BASLUS-00001TEST", &metadata, &body),
            Err(Error::InvalidSaveSize(_))
        ));
    }
}
