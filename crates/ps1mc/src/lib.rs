use std::path::{Path, PathBuf};

use colored::Colorize;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use ps1_memcard::layout::{BLOCK_COUNT, ICON_HEIGHT, ICON_WIDTH};
use ps1_memcard::tree::{NodeAttr, NodeKind};
use ps1_memcard::{CardOptions, CardReport, MemoryCard, Save, SaveTree, TreeError};
use serde::Serialize;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

pub mod config;

pub use config::{load_config, Config, IconConfig, CONFIG_FILE_NAME};

/// One row of `ps1mc list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub slot: usize,
    pub filename: String,
    pub title: String,
    pub blocks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardListing {
    pub container: String,
    pub saves: Vec<SaveSummary>,
    pub free_blocks: usize,
}

/// One row of `ps1mc ls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeListing {
    pub name: String,
    pub attr: NodeAttr,
}

pub fn open_card(path: &Path, options: CardOptions) -> Result<MemoryCard, Error> {
    let data = std::fs::read(path)?;
    let card = MemoryCard::load(&data)?.with_options(options);
    debug!("Loaded {} card from {}", card.container(), path.display());
    Ok(card)
}

/// Write `card` in the container it was loaded from.
pub fn write_card(card: &MemoryCard, path: &Path) -> Result<(), Error> {
    std::fs::write(path, card.to_container_bytes())?;
    Ok(())
}

/// Slot of `target`: a slot number, or the filename of a save on the card.
pub fn resolve_target(card: &MemoryCard, target: &str) -> Result<usize, Error> {
    resolve_with(card, target, MemoryCard::find_slot)
}

fn resolve_with(
    card: &MemoryCard,
    target: &str,
    find: fn(&MemoryCard, &str) -> Option<usize>,
) -> Result<usize, Error> {
    if let Ok(slot) = target.parse::<usize>() {
        if slot < BLOCK_COUNT {
            return Ok(slot);
        }
    }
    find(card, target).ok_or_else(|| ps1_memcard::Error::SaveNotFound(target.to_string()).into())
}

/// Saves on the card in slot order. Titles are NFKC-normalized, so the
/// full-width Shift-JIS forms most games use print as plain ASCII.
pub fn list_saves(card: &MemoryCard) -> CardListing {
    CardListing {
        container: card.container().to_string(),
        saves: card
            .get_slot_saves()
            .into_iter()
            .map(|(slot, save)| SaveSummary {
                slot,
                title: save.title().nfkc().collect(),
                blocks: save.blocks(),
                filename: save.filename().to_string(),
            })
            .collect(),
        free_blocks: card.free_blocks(),
    }
}

pub fn print_listing(listing: &CardListing) {
    for save in &listing.saves {
        println!(
            "{:>2}  {:<20}  {}  {}",
            save.slot,
            save.filename.bold(),
            save.title,
            format!("({} blocks)", save.blocks).dimmed()
        );
    }
    println!("{} {}", "<FREE BLOCKS>".dimmed(), listing.free_blocks);
}

/// Write the raw bytes of `target` to `output`, or to a file named after the
/// save in the current directory.
pub fn export_save(
    card_path: &Path,
    target: &str,
    output: Option<&Path>,
    config: &Config,
) -> Result<PathBuf, Error> {
    let card = open_card(card_path, config.card)?;
    let save = card.get_save_at(resolve_target(&card, target)?)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(save.filename()));
    std::fs::write(&output, save.data())?;
    println!(
        "{} {} {} {}",
        "Exported".green(),
        save.filename().bold(),
        "to".dimmed(),
        output.display()
    );
    Ok(output)
}

/// Add the save file at `save_path` to the card. Returns the slot it landed in.
pub fn import_save(
    card_path: &Path,
    save_path: &Path,
    name: Option<&str>,
    output: Option<&Path>,
    config: &Config,
) -> Result<usize, Error> {
    let filename = match name {
        Some(name) => name.to_string(),
        None => save_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(Error::NameError)?
            .to_string(),
    };

    let mut card = open_card(card_path, config.card)?;
    let data = std::fs::read(save_path)?;
    let slot = card.add_save(&filename, data)?;
    write_card(&card, output.unwrap_or(card_path))?;
    println!(
        "{} {} {} {slot}",
        "Imported".green(),
        filename.bold(),
        "at slot".dimmed()
    );
    Ok(slot)
}

/// Remove `target` from the card. A filename shared by several saves picks
/// the one in the highest slot.
pub fn delete_save(
    card_path: &Path,
    target: &str,
    output: Option<&Path>,
    config: &Config,
) -> Result<Save, Error> {
    let mut card = open_card(card_path, config.card)?;
    let slot = resolve_with(&card, target, MemoryCard::find_last_slot)?;
    let save = card.get_save_at(slot)?;
    card.delete_save_at(slot)?;
    write_card(&card, output.unwrap_or(card_path))?;
    println!("{} {}", "Deleted".yellow(), save.filename().bold());
    Ok(save)
}

pub fn format_card(output: &Path) -> Result<(), Error> {
    write_card(&MemoryCard::format(), output)?;
    println!("{} {}", "Formatted".green(), output.display());
    Ok(())
}

pub fn check_card(card_path: &Path, config: &Config) -> Result<CardReport, Error> {
    Ok(open_card(card_path, config.card)?.check())
}

/// Pretty-printed JSON of a listing or check report.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value).map_err(Error::JsonError)
}

pub fn print_report(report: &CardReport) {
    for finding in &report.findings {
        println!("{} {finding}", "!".red().bold());
    }
    if report.is_clean() {
        println!(
            "{} {} used, {} free",
            "OK".green().bold(),
            report.used_blocks,
            report.free_blocks
        );
    }
}

/// First icon frame of `save`, scaled up by `scale` with nearest-neighbour
/// sampling.
pub fn render_icon(save: &Save, scale: u32) -> Result<RgbaImage, Error> {
    let rgba = save
        .icon()
        .frame_rgba(0)
        .ok_or_else(|| Error::IconError(format!("{} has no icon", save.filename())))?;
    let icon = RgbaImage::from_raw(ICON_WIDTH as u32, ICON_HEIGHT as u32, rgba)
        .ok_or_else(|| Error::IconError(format!("{} has a truncated icon", save.filename())))?;
    let scale = scale.max(1);
    if scale == 1 {
        return Ok(icon);
    }
    Ok(imageops::resize(
        &icon,
        ICON_WIDTH as u32 * scale,
        ICON_HEIGHT as u32 * scale,
        FilterType::Nearest,
    ))
}

pub fn export_icon(
    card_path: &Path,
    target: &str,
    output: &Path,
    scale: Option<u32>,
    config: &Config,
) -> Result<(), Error> {
    let card = open_card(card_path, config.card)?;
    let save = card.get_save_at(resolve_target(&card, target)?)?;
    render_icon(&save, scale.unwrap_or(config.icon.scale))?.save(output)?;
    println!(
        "{} {} {} {}",
        "Rendered".green(),
        save.filename().bold(),
        "icon to".dimmed(),
        output.display()
    );
    Ok(())
}

/// Entries of the save tree directory at `path`, or the single file there.
pub fn list_tree(card_path: &Path, path: &str, config: &Config) -> Result<Vec<TreeListing>, Error> {
    let tree = SaveTree::new(&open_card(card_path, config.card)?);
    let inode = tree.resolve(path)?;
    let attr = tree.attr(inode).ok_or(TreeError::NotFound)?;

    if attr.kind == NodeKind::File {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        return Ok(vec![TreeListing { name, attr }]);
    }

    tree.readdir(inode, 0)?
        .into_iter()
        .map(|entry| -> Result<TreeListing, Error> {
            let attr = tree.attr(entry.inode).ok_or(TreeError::NotFound)?;
            Ok(TreeListing {
                name: entry.name,
                attr,
            })
        })
        .collect()
}

pub fn print_tree(entries: &[TreeListing]) {
    for entry in entries {
        let name = match entry.attr.kind {
            NodeKind::Directory => format!("{}/", entry.name).blue().bold(),
            NodeKind::File => entry.name.normal(),
        };
        println!("{:o} {:>8} {name}", entry.attr.mode, entry.attr.size);
    }
}

/// Contents of the save tree file at `path`.
pub fn read_tree_file(card_path: &Path, path: &str, config: &Config) -> Result<Vec<u8>, Error> {
    let tree = SaveTree::new(&open_card(card_path, config.card)?);
    let inode = tree.resolve(path)?;
    let size = tree.attr(inode).map_or(0, |attr| attr.size as usize);
    Ok(tree.read(inode, 0, size)?.to_vec())
}

#[derive(Debug)]
pub enum Error {
    NameError,
    IOError(std::io::Error),
    ConfigError(String),
    Card(ps1_memcard::Error),
    Tree(TreeError),
    IconError(String),
    ImageError(image::ImageError),
    JsonError(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::NameError => write!(f, "Save file name must be valid UTF-8"),
            Error::IOError(err) => write!(f, "{err}"),
            Error::ConfigError(err) => write!(f, "{err}"),
            Error::Card(err) => write!(f, "{err}"),
            Error::Tree(err) => write!(f, "{err}"),
            Error::IconError(err) => write!(f, "{err}"),
            Error::ImageError(err) => write!(f, "{err}"),
            Error::JsonError(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err)
    }
}

impl From<ps1_memcard::Error> for Error {
    fn from(err: ps1_memcard::Error) -> Self {
        Error::Card(err)
    }
}

impl From<TreeError> for Error {
    fn from(err: TreeError) -> Self {
        Error::Tree(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}
