//! File name conventions for Dinkum saves

use crate::error::DocumentError;

/// Which of the two save files a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Player,
    Container,
}

impl SaveKind {
    /// Classify by file name: "player" wins, then "container", else player
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("player") {
            SaveKind::Player
        } else if lower.contains("container") {
            SaveKind::Container
        } else {
            SaveKind::Player
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SaveKind::Player => "Player",
            SaveKind::Container => "Container",
        }
    }
}

/// How the bytes of an input file are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `.es3`, or the game's own `.es3.bac` backup
    Es3,
    /// Already decrypted JSON
    Json,
}

impl InputFormat {
    pub fn from_file_name(name: &str) -> Result<Self, DocumentError> {
        let lower = name.to_lowercase();
        if lower.ends_with(".es3") || lower.ends_with(".es3.bac") {
            Ok(InputFormat::Es3)
        } else if lower.ends_with(".json") {
            Ok(InputFormat::Json)
        } else {
            Err(DocumentError::UnsupportedExtension(name.to_string()))
        }
    }
}

/// `PlayerData.es3` -> `PlayerData.json`
pub fn json_file_name(name: &str) -> String {
    match strip_suffix_ci(name, ".es3.bac").or_else(|| strip_suffix_ci(name, ".es3")) {
        Some(stem) => format!("{}.json", stem),
        None if ends_with_ci(name, ".json") => name.to_string(),
        None => format!("{}.json", name),
    }
}

/// `PlayerData.json` / `PlayerData.es3` -> `PlayerData.es3`
pub fn es3_file_name(name: &str) -> String {
    match strip_suffix_ci(name, ".json")
        .or_else(|| strip_suffix_ci(name, ".es3.bac"))
        .or_else(|| strip_suffix_ci(name, ".es3"))
    {
        Some(stem) => format!("{}.es3", stem),
        None => format!("{}.es3", name),
    }
}

fn ends_with_ci(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn strip_suffix_ci<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    if ends_with_ci(name, suffix) {
        Some(&name[..name.len() - suffix.len()])
    } else {
        None
    }
}
