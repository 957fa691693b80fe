use crate::save::MetadataBlock;

/// One data block, typed by the role its directory frame gives it.
///
/// Only the first block of a chain carries a metadata header; every other
/// block is opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataBlock<'a> {
    Metadata {
        metadata: MetadataBlock,
        bytes: &'a [u8],
    },
    Raw(&'a [u8]),
}

impl<'a> DataBlock<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        match self {
            DataBlock::Metadata { bytes, .. } => bytes,
            DataBlock::Raw(bytes) => bytes,
        }
    }

    pub fn metadata(&self) -> Option<&MetadataBlock> {
        match self {
            DataBlock::Metadata { metadata, .. } => Some(metadata),
            DataBlock::Raw(_) => None,
        }
    }
}
