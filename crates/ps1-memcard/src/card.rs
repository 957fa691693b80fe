use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alloc::Allocator;
use crate::block::DataBlock;
use crate::chain;
use crate::check::CardReport;
use crate::container::{self, Container};
use crate::directory::DirectoryTable;
use crate::error::{Error, Result};
use crate::filename::{FilenamePolicy, SaveFilename};
use crate::frame::BlockState;
use crate::layout::{BLOCK_COUNT, BLOCK_SIZE, CARD_SIZE};
use crate::save::{self, MetadataBlock, Save};

/// Knobs that change how a card accepts new saves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CardOptions {
    #[serde(default)]
    pub filename_policy: FilenamePolicy,
}

/// A loaded or freshly formatted memory card.
///
/// Holds the parsed header and the 15 data blocks. Any wrapper bytes the card
/// was loaded from are kept so the image can be written back in the same
/// container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCard {
    container: Container,
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    directory: DirectoryTable,
    blocks: Vec<u8>,
    options: CardOptions,
}

impl MemoryCard {
    /// Blank raw card with every block free.
    pub fn format() -> Self {
        Self {
            container: Container::Raw,
            prefix: Vec::new(),
            suffix: Vec::new(),
            directory: DirectoryTable::format(),
            blocks: vec![0u8; BLOCK_COUNT * BLOCK_SIZE],
            options: CardOptions::default(),
        }
    }

    /// Parse a card image, detecting its container from the leading bytes.
    pub fn load(data: &[u8]) -> Result<Self> {
        let (container, offset) = container::detect_offset(data)?;
        let image = &data[offset..offset + CARD_SIZE];
        let directory = DirectoryTable::parse(image)?;

        Ok(Self {
            container,
            prefix: data[..offset].to_vec(),
            suffix: data[offset + CARD_SIZE..].to_vec(),
            directory,
            blocks: image[BLOCK_SIZE..].to_vec(),
            options: CardOptions::default(),
        })
    }

    pub fn with_options(mut self, options: CardOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> CardOptions {
        self.options
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// The raw 128KB image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CARD_SIZE);
        out.extend_from_slice(&self.directory.to_bytes());
        out.extend_from_slice(&self.blocks);
        out
    }

    /// The image wrapped in the container it was loaded from.
    pub fn to_container_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.prefix.len() + CARD_SIZE + self.suffix.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&self.to_bytes());
        out.extend_from_slice(&self.suffix);
        out
    }

    pub fn directory(&self) -> &DirectoryTable {
        &self.directory
    }

    pub fn block(&self, index: usize) -> Option<&[u8]> {
        self.blocks.get(index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE)
    }

    /// Block `index` typed by its frame: metadata only when it starts a chain.
    pub fn data_block(&self, index: usize) -> Option<DataBlock<'_>> {
        let bytes = self.block(index)?;
        let frame = self.directory.frame(index)?;
        if frame.block_state == BlockState::First {
            if let Ok(metadata) = MetadataBlock::parse(bytes) {
                return Some(DataBlock::Metadata { metadata, bytes });
            }
        }
        Some(DataBlock::Raw(bytes))
    }

    pub fn chain(&self, slot: usize) -> Result<Vec<usize>> {
        chain::walk(&self.directory, slot)
    }

    /// The save whose chain starts at `slot`.
    pub fn get_save_at(&self, slot: usize) -> Result<Save> {
        let frame = self.directory.frame(slot).ok_or(Error::InvalidSlot(slot))?;
        if frame.block_state != BlockState::First {
            return Err(Error::SaveNotFound(format!("slot {slot}")));
        }
        let chain = self.chain(slot)?;
        save::decode(&self.directory, &self.blocks, &chain)
    }

    /// Every slot holding the start of a save, with its decode result.
    pub fn scan(&self) -> Vec<(usize, Result<Save>)> {
        self.directory
            .first_indices()
            .into_iter()
            .map(|slot| (slot, self.get_save_at(slot)))
            .collect()
    }

    /// Saves in slot order. Saves that fail to decode are logged and skipped.
    pub fn get_saves(&self) -> Vec<Save> {
        self.get_slot_saves().into_values().collect()
    }

    /// Saves keyed by the slot of their first block.
    pub fn get_slot_saves(&self) -> BTreeMap<usize, Save> {
        self.scan()
            .into_iter()
            .filter_map(|(slot, result)| match result {
                Ok(save) => Some((slot, save)),
                Err(err) => {
                    warn!("Skipping save at slot {slot}: {err}");
                    None
                }
            })
            .collect()
    }

    /// Slot of the first save called `filename`.
    pub fn find_slot(&self, filename: &str) -> Option<usize> {
        self.directory
            .first_indices()
            .into_iter()
            .find(|&slot| self.directory.frames()[slot].filename() == filename)
    }

    /// Slot of the last save called `filename`.
    pub fn find_last_slot(&self, filename: &str) -> Option<usize> {
        self.directory
            .first_indices()
            .into_iter()
            .rev()
            .find(|&slot| self.directory.frames()[slot].filename() == filename)
    }

    pub fn free_blocks(&self) -> usize {
        self.directory.free_indices().len()
    }

    /// Write `save` into free blocks. Returns its slot.
    pub fn add(&mut self, save: &Save) -> Result<usize> {
        let name = SaveFilename::parse(save.filename(), self.options.filename_policy)?;
        Allocator::new(&mut self.directory, &mut self.blocks).allocate(save, &name)
    }

    /// Validate raw save bytes and add them under `filename`.
    pub fn add_save(&mut self, filename: &str, data: Vec<u8>) -> Result<usize> {
        let save = Save::new(filename, data)?;
        self.add(&save)
    }

    /// Delete the save with the same filename as `save`; see [`Self::delete_named`].
    pub fn delete_save(&mut self, save: &Save) -> Result<()> {
        self.delete_named(save.filename())
    }

    /// Delete the save called `filename`. When several share the name, the
    /// one in the highest slot goes.
    pub fn delete_named(&mut self, filename: &str) -> Result<()> {
        let slot = self
            .find_last_slot(filename)
            .ok_or_else(|| Error::SaveNotFound(filename.to_string()))?;
        self.delete_save_at(slot)
    }

    pub fn delete_save_at(&mut self, slot: usize) -> Result<()> {
        let freed = Allocator::new(&mut self.directory, &mut self.blocks).release(slot)?;
        debug!("Deleted save at slot {slot} ({} blocks)", freed.len());
        Ok(())
    }

    /// Audit the directory without changing anything.
    pub fn check(&self) -> CardReport {
        CardReport::collect(&self.directory)
    }
}

impl Default for MemoryCard {
    fn default() -> Self {
        Self::format()
    }
}
