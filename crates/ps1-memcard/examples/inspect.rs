use std::env;
use std::fs;
use std::process;

use ps1_memcard::{DataBlock, MemoryCard};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example inspect -- <path-to-memcard>");
        process::exit(1);
    });

    let data = fs::read(&path)?;
    let card = MemoryCard::load(&data)?;
    eprintln!("{path}: {} image", card.container());

    for (index, frame) in card.directory().frames().iter().enumerate() {
        eprintln!("{index:2} {frame}");
        if let Some(DataBlock::Metadata { metadata, .. }) = card.data_block(index) {
            eprintln!("   title: {}", metadata.title());
        }
    }

    let report = card.check();
    for finding in &report.findings {
        eprintln!("! {finding}");
    }
    eprintln!("{} free blocks", report.free_blocks);

    Ok(())
}
