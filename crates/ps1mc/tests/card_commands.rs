use std::fs;
use std::path::Path;

use ps1_memcard::layout::BLOCK_SIZE;
use ps1_memcard::{Container, FilenamePolicy, MemoryCard, MetadataBlock, Save};
use ps1mc::{Config, Error};
use tempfile::tempdir;

fn write_save(path: &Path, blocks: u8) -> Vec<u8> {
    let metadata = MetadataBlock::new("COMMANDS", blocks).expect("metadata");
    let body = vec![0x5Au8; usize::from(blocks) * BLOCK_SIZE - MetadataBlock::SIZE];
    let data = Save::compose("unused", &metadata, &body)
        .expect("compose save")
        .into_data();
    fs::write(path, &data).expect("write save file");
    data
}

fn load(path: &Path) -> MemoryCard {
    MemoryCard::load(&fs::read(path).expect("read card")).expect("load card")
}

#[test]
fn import_export_delete_round_trip() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();
    let config = Config::default();

    let card_path = dir.join("card.mcr");
    ps1mc::format_card(&card_path).expect("format");
    assert_eq!(fs::metadata(&card_path).expect("stat").len(), 131072);

    let save_path = dir.join("BASLUS-00067CASTLEVA");
    let data = write_save(&save_path, 2);
    let slot = ps1mc::import_save(&card_path, &save_path, None, None, &config).expect("import");
    assert_eq!(slot, 0);

    let card = load(&card_path);
    let listing = ps1mc::list_saves(&card);
    assert_eq!(listing.saves.len(), 1);
    assert_eq!(listing.saves[0].filename, "BASLUS-00067CASTLEVA");
    assert_eq!(listing.saves[0].title, "COMMANDS");
    assert_eq!(listing.free_blocks, 13);

    let exported = dir.join("exported.bin");
    ps1mc::export_save(&card_path, "BASLUS-00067CASTLEVA", Some(&exported), &config)
        .expect("export");
    assert_eq!(fs::read(&exported).expect("read export"), data);

    let deleted = ps1mc::delete_save(&card_path, "0", None, &config).expect("delete");
    assert_eq!(deleted.filename(), "BASLUS-00067CASTLEVA");
    assert_eq!(
        fs::read(&card_path).expect("read card"),
        MemoryCard::format().to_bytes()
    );
}

#[test]
fn output_option_leaves_input_untouched_and_keeps_wrapper() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();

    let mut gme = vec![0u8; 0xF40];
    gme[..11].copy_from_slice(b"123-456-STD");
    gme.extend_from_slice(&MemoryCard::format().to_bytes());
    let card_path = dir.join("card.gme");
    fs::write(&card_path, &gme).expect("write gme");

    let save_path = dir.join("save.bin");
    write_save(&save_path, 1);
    let output = dir.join("out.gme");
    ps1mc::import_save(
        &card_path,
        &save_path,
        Some("BESLES-00001NAMED"),
        Some(&output),
        &Config::default(),
    )
    .expect("import");

    assert_eq!(fs::read(&card_path).expect("read input"), gme);
    let written = load(&output);
    assert_eq!(written.container(), Container::DexDrive);
    assert_eq!(written.find_slot("BESLES-00001NAMED"), Some(0));
}

#[test]
fn invalid_save_file_is_rejected_without_writing() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();
    let card_path = dir.join("card.mcr");
    ps1mc::format_card(&card_path).expect("format");

    let save_path = dir.join("BASLUS-00001BAD");
    fs::write(&save_path, vec![0u8; BLOCK_SIZE]).expect("write save");

    let result = ps1mc::import_save(&card_path, &save_path, None, None, &Config::default());
    assert!(matches!(
        result,
        Err(Error::Card(ps1_memcard::Error::InvalidSaveMagic(_)))
    ));
    assert_eq!(
        fs::read(&card_path).expect("read card"),
        MemoryCard::format().to_bytes()
    );
}

#[test]
fn strict_policy_from_config_rejects_loose_names() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();
    fs::write(
        dir.join(ps1mc::CONFIG_FILE_NAME),
        "[card]\nfilename_policy = \"strict\"\n",
    )
    .expect("write config");
    let config = ps1mc::load_config(None, dir).expect("config");
    assert_eq!(config.card.filename_policy, FilenamePolicy::Strict);

    let card_path = dir.join("card.mcr");
    ps1mc::format_card(&card_path).expect("format");
    let save_path = dir.join("save.bin");
    write_save(&save_path, 1);

    let result = ps1mc::import_save(&card_path, &save_path, None, None, &config);
    assert!(matches!(
        result,
        Err(Error::Card(ps1_memcard::Error::InvalidFilename { .. }))
    ));
}

#[test]
fn check_reports_clean_and_corrupt_cards() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();
    let card_path = dir.join("card.mcr");
    ps1mc::format_card(&card_path).expect("format");
    assert!(ps1mc::check_card(&card_path, &Config::default())
        .expect("check")
        .is_clean());

    let mut bytes = fs::read(&card_path).expect("read card");
    bytes[128 + 127] ^= 0xFF;
    fs::write(&card_path, bytes).expect("write card");
    let report = ps1mc::check_card(&card_path, &Config::default()).expect("check");
    assert!(!report.is_clean());

    let json: serde_json::Value =
        serde_json::from_str(&ps1mc::to_json(&report).expect("json")).expect("parse json");
    let findings = json["findings"].as_array().expect("findings array");
    assert!(findings
        .iter()
        .any(|finding| finding["kind"] == "bad_checksum" && finding["frame"] == 0));
    assert_eq!(json["free_blocks"], report.free_blocks);
}

#[test]
fn delete_by_shared_name_removes_highest_slot() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();
    let config = Config::default();
    let card_path = dir.join("card.mcr");
    ps1mc::format_card(&card_path).expect("format");

    let save_path = dir.join("save.bin");
    write_save(&save_path, 1);
    for expected in 0..2 {
        let slot = ps1mc::import_save(
            &card_path,
            &save_path,
            Some("BASLUS-00001SAME"),
            None,
            &config,
        )
        .expect("import");
        assert_eq!(slot, expected);
    }

    ps1mc::delete_save(&card_path, "BASLUS-00001SAME", None, &config).expect("delete");
    let card = load(&card_path);
    assert_eq!(card.get_slot_saves().keys().copied().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn tree_commands_browse_saves() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();
    let config = Config::default();
    let card_path = dir.join("card.mcr");
    ps1mc::format_card(&card_path).expect("format");
    let save_path = dir.join("BASLUS-00001TREE");
    let data = write_save(&save_path, 1);
    ps1mc::import_save(&card_path, &save_path, None, None, &config).expect("import");

    let root: Vec<_> = ps1mc::list_tree(&card_path, "/", &config)
        .expect("ls /")
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(root, vec![".", "..", "by-filename", "by-slot"]);

    let slot_dir = ps1mc::list_tree(&card_path, "/by-slot/00", &config).expect("ls slot");
    assert_eq!(slot_dir[2].name, "BASLUS-00001TREE");
    assert_eq!(slot_dir[2].attr.size, 8192);

    let bytes = ps1mc::read_tree_file(&card_path, "/by-filename/BASLUS-00001TREE", &config)
        .expect("cat");
    assert_eq!(bytes, data);

    assert!(matches!(
        ps1mc::read_tree_file(&card_path, "/by-slot", &config),
        Err(Error::Tree(ps1_memcard::TreeError::IsDirectory))
    ));
}

#[test]
fn icon_is_written_as_png() {
    let tempdir = tempdir().expect("temp dir");
    let dir = tempdir.path();
    let card_path = dir.join("card.mcr");
    ps1mc::format_card(&card_path).expect("format");
    let save_path = dir.join("BASLUS-00001ICON");
    write_save(&save_path, 1);
    ps1mc::import_save(&card_path, &save_path, None, None, &Config::default()).expect("import");

    let png = dir.join("icon.png");
    ps1mc::export_icon(&card_path, "0", &png, Some(2), &Config::default()).expect("icon");
    assert_eq!(&fs::read(&png).expect("read png")[1..4], b"PNG");
}
