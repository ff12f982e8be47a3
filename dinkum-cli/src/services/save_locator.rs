use std::fs;
use std::path::{Path, PathBuf};

/// Steam app id of Dinkum, used for the Proton prefix on Linux
const STEAM_APP_ID: &str = "1062520";

/// One `SlotN` folder and the saves found in it
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInfo {
    pub index: u32,
    pub path: PathBuf,
    pub player_save: Option<PathBuf>,
    pub container_save: Option<PathBuf>,
}

/// Service for locating game save directories across platforms
pub struct SaveLocator {
    save_dir: Option<PathBuf>,
}

impl SaveLocator {
    pub fn new() -> Self {
        Self { save_dir: None }
    }

    /// Use `dir` instead of the platform default
    pub fn with_save_dir(dir: Option<PathBuf>) -> Self {
        Self { save_dir: dir }
    }

    /// Get the save directory
    ///
    /// Returns:
    /// - Windows: %USERPROFILE%\AppData\LocalLow\James Bendon\Dinkum
    /// - Linux: the same folder inside Steam's Proton prefix
    /// - macOS: ~/Library/Application Support/James Bendon/Dinkum
    pub fn get_save_directory(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.save_dir {
            return Some(dir.clone());
        }

        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()?;

        let mut path = PathBuf::from(home);

        if cfg!(target_os = "windows") {
            path.push("AppData");
            path.push("LocalLow");
        } else if cfg!(target_os = "linux") {
            path.push(".local/share/Steam/steamapps/compatdata");
            path.push(STEAM_APP_ID);
            path.push("pfx/drive_c/users/steamuser/AppData/LocalLow");
        } else if cfg!(target_os = "macos") {
            path.push("Library");
            path.push("Application Support");
        } else {
            return None;
        }

        path.push("James Bendon");
        path.push("Dinkum");

        Some(path)
    }

    /// `SlotN` folders sorted by N
    pub fn list_slots(&self) -> Vec<SlotInfo> {
        let Some(dir) = self.get_save_directory() else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut slots: Vec<SlotInfo> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter_map(|path| {
                let index = path
                    .file_name()?
                    .to_str()?
                    .strip_prefix("Slot")?
                    .parse::<u32>()
                    .ok()?;
                Some(SlotInfo {
                    index,
                    player_save: find_save(&path, "player"),
                    container_save: find_save(&path, "container"),
                    path,
                })
            })
            .collect();

        slots.sort_by_key(|s| s.index);
        slots
    }

    /// Check if the save directory exists
    pub fn save_dir_exists(&self) -> bool {
        self.get_save_directory()
            .map(|p| p.exists())
            .unwrap_or(false)
    }
}

impl Default for SaveLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// First `.es3` file in `dir` whose name contains `needle`
fn find_save(dir: &Path, needle: &str) -> Option<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|s| s.to_str())
                .map(|name| {
                    let lower = name.to_lowercase();
                    lower.ends_with(".es3") && lower.contains(needle)
                })
                .unwrap_or(false)
        })
        .collect();

    found.sort();
    found.into_iter().next()
}
