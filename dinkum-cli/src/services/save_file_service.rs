use anyhow::{Context, Result};
use dinkum_core::{Es3Codec, SaveDocument};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Service for reading and writing save documents on disk
#[derive(Default)]
pub struct SaveFileService {
    codec: Es3Codec,
}

impl SaveFileService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `.es3`, `.es3.bac` or `.json` file
    pub fn load(&self, path: &Path) -> Result<SaveDocument> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read save file: {}", path.display()))?;
        debug!(path = %path.display(), len = bytes.len(), "read save file");

        SaveDocument::from_bytes_with(&self.codec, &file_name(path)?, &bytes)
            .with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Decrypt a save file and return its JSON text exactly as the game wrote it
    pub fn load_text(&self, path: &Path) -> Result<String> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read save file: {}", path.display()))?;
        self.codec
            .decode(&bytes)
            .with_context(|| format!("Failed to decrypt {}", path.display()))
    }

    /// Serialize in the engine layout, encrypt and write
    pub fn save_es3(&self, doc: &SaveDocument, path: &Path, gzip: bool) -> Result<()> {
        let cipher = doc.to_es3_with(&self.codec, gzip)?;
        fs::write(path, cipher)
            .with_context(|| format!("Failed to write encrypted file: {}", path.display()))
    }

    /// Write a plain pretty-printed JSON dump
    pub fn save_json(&self, doc: &SaveDocument, path: &Path) -> Result<()> {
        fs::write(path, doc.to_json_pretty()?)
            .with_context(|| format!("Failed to write JSON file: {}", path.display()))
    }
}

pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Not a file path: {}", path.display()))
}
