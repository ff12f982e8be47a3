//! Decoding reference files encrypted outside of this crate

use dinkum_core::{
    Es3Codec, Es3Error, QuickEditFields, SaveDocument, SaveKind, decode, read_grids, serialize,
};
use serde_json::{Value, json};
use std::path::Path;

const PLAIN_ES3: &[u8] = include_bytes!("fixtures/PlayerData.es3");
const GZIP_ES3: &[u8] = include_bytes!("fixtures/PlayerData_gzip.es3");
const ENGINE_TEXT: &str = include_str!("fixtures/PlayerData.txt");

#[test]
fn test_decode_plain_fixture() {
    let text = decode(PLAIN_ES3).unwrap();
    assert_eq!(text, ENGINE_TEXT);
}

#[test]
fn test_decode_gzip_fixture() {
    let text = decode(GZIP_ES3).unwrap();
    assert_eq!(text, ENGINE_TEXT);
}

#[test]
fn test_reserialize_is_byte_identical() {
    let text = decode(PLAIN_ES3).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(serialize(&value), text);
}

#[test]
fn test_fixture_uses_engine_layout() {
    assert!(ENGINE_TEXT.contains("\t\t\t\"money\" : 15230,\r\n"));
    assert!(ENGINE_TEXT.contains("},{"));
    assert!(ENGINE_TEXT.contains("\"milestoneSave\" : [\r\n\t\t\t\t\r\n\t\t\t]"));
}

#[test]
fn test_wrong_password_rejects_fixture() {
    let err = Es3Codec::new("jamesbendon2").decode(PLAIN_ES3).unwrap_err();
    assert!(matches!(err, Es3Error::Decryption(_)));
}

#[test]
fn test_truncated_fixture_fails() {
    let err = decode(&PLAIN_ES3[..PLAIN_ES3.len() - 1]).unwrap_err();
    assert!(matches!(err, Es3Error::Decryption(_)));
}

#[test]
fn test_edit_only_touches_edited_line() {
    let mut doc = SaveDocument::from_bytes("PlayerData.es3", PLAIN_ES3).unwrap();
    assert_eq!(doc.kind(), SaveKind::Player);

    let mut fields = QuickEditFields::read(&doc).unwrap();
    assert_eq!(fields.player_name, "Sheila");
    assert_eq!(fields.permit_points, 1200);
    fields.money = 99_999;
    fields.apply(&mut doc).unwrap();

    let encrypted = doc.to_es3(false).unwrap();
    let text = decode(&encrypted).unwrap();

    let before: Vec<&str> = ENGINE_TEXT.split("\r\n").collect();
    let after: Vec<&str> = text.split("\r\n").collect();
    assert_eq!(before.len(), after.len());

    let changed: Vec<(&str, &str)> = before
        .iter()
        .zip(after.iter())
        .filter(|(a, b)| a != b)
        .map(|(a, b)| (*a, *b))
        .collect();
    assert_eq!(changed, [("\t\t\t\"money\" : 15230,", "\t\t\t\"money\" : 99999,")]);
}

#[test]
fn test_fixture_grids() {
    let doc = SaveDocument::from_bytes("PlayerData.es3", GZIP_ES3).unwrap();
    let grids = read_grids(&doc).unwrap();

    let names: Vec<&str> = grids.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["Inventory", "stash_0", "stash_1"]);
    assert_eq!(grids[0].slots.len(), 16);
    assert_eq!(grids[0].occupied(), 3);
    assert_eq!(doc.get("stash_1.value.itemId").unwrap(), &json!([7, -1, -1, -1]));
}

/// Round-trips a real save file: decode, re-serialize, encode, decode again
fn test_save_file_roundtrip(save_path: &Path) -> anyhow::Result<()> {
    let original = std::fs::read(save_path)?;
    let text = decode(&original)?;

    let value: Value = serde_json::from_str(&text)?;
    let reformatted = serialize(&value);

    let again = decode(&dinkum_core::encode(&reformatted, false)?)?;
    assert_eq!(again, reformatted, "payload changed for {}", save_path.display());

    Ok(())
}

/// Local saves are not committed; drop real files into `data/saves` to run them
#[test]
fn test_all_saves_roundtrip() {
    let saves_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("data")
        .join("saves");

    if !saves_dir.exists() {
        println!("Warning: saves directory not found at {:?}", saves_dir);
        return;
    }

    let mut failed = Vec::new();
    for entry in std::fs::read_dir(&saves_dir).expect("Failed to read saves directory") {
        let path = entry.expect("Failed to read directory entry").path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("es3") {
            continue;
        }

        if let Err(e) = test_save_file_roundtrip(&path) {
            println!("  ✗ {}: FAILED - {}", path.display(), e);
            failed.push(path);
        }
    }

    assert!(failed.is_empty(), "{} save file(s) failed round-trip test", failed.len());
}
