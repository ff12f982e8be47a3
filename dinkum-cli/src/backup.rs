use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use dinkum_core::decode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keeps timestamped copies of save files in a `backup` folder next to them
pub struct BackupManager {
    backup_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub filename: String,
    pub timestamp: DateTime<Local>,
    pub size: u64,
    pub is_valid: bool,
}

impl BackupManager {
    pub fn new(backup_dir: PathBuf) -> Self {
        Self { backup_dir }
    }

    /// Backups for `save_path` go to `<dir of save_path>/backup`
    pub fn for_save(save_path: &Path) -> Self {
        let dir = save_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(dir.join("backup"))
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Lists .bak files sorted by timestamp (newest first)
    ///
    /// With `file_name` set, only backups of that save are returned.
    pub fn list_backups(&self, file_name: Option<&str>) -> Result<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir).context("Failed to read backup directory")? {
            let entry = entry?;
            let path = entry.path();

            // Only process .bak files
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("bak") {
                continue;
            }

            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();

            if let Some(name) = file_name {
                if !backup_belongs_to(&filename, name) {
                    continue;
                }
            }

            let metadata = fs::metadata(&path)?;
            let timestamp: DateTime<Local> = metadata.modified()?.into();

            // Validate backup by attempting to decrypt
            let is_valid = Self::validate_backup(&path);

            backups.push(BackupInfo {
                path,
                filename,
                timestamp,
                size: metadata.len(),
                is_valid,
            });
        }

        // Newest first; the name carries the timestamp when mtimes tie
        backups.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.filename.cmp(&a.filename))
        });

        Ok(backups)
    }

    /// Validates a backup file by attempting to decrypt it
    fn validate_backup(path: &Path) -> bool {
        match fs::read(path) {
            Ok(cipher) => decode(&cipher).is_ok(),
            Err(_) => false,
        }
    }

    /// Creates a timestamped backup of the source file
    /// Format: <file name>.YYYY-MM-DD_HH-MM-SS.bak
    pub fn create_backup(&self, source_path: &Path) -> Result<PathBuf> {
        self.copy_with_prefix(source_path, "")
    }

    /// Restores `backup_path` over `target_path`
    ///
    /// The current target is saved as an emergency backup first; its path is
    /// returned when one was made.
    pub fn restore_backup(&self, backup_path: &Path, target_path: &Path) -> Result<Option<PathBuf>> {
        if !backup_path.exists() {
            bail!("Backup file does not exist: {}", backup_path.display());
        }

        let emergency = if target_path.exists() {
            Some(self.copy_with_prefix(target_path, "emergency_before_restore_")?)
        } else {
            None
        };

        fs::copy(backup_path, target_path).context("Failed to restore backup")?;
        info!(
            backup = %backup_path.display(),
            target = %target_path.display(),
            "restored backup"
        );

        Ok(emergency)
    }

    fn copy_with_prefix(&self, source_path: &Path, prefix: &str) -> Result<PathBuf> {
        if !source_path.exists() {
            bail!("Source file does not exist: {}", source_path.display());
        }

        let source_name = source_path
            .file_name()
            .and_then(|s| s.to_str())
            .context("Source path has no file name")?;

        // Ensure backup directory exists
        fs::create_dir_all(&self.backup_dir).context("Failed to create backup directory")?;

        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut backup_path = self
            .backup_dir
            .join(format!("{}{}.{}.bak", prefix, source_name, stamp));

        // Two backups within the same second get a counter
        let mut n = 1;
        while backup_path.exists() {
            backup_path = self
                .backup_dir
                .join(format!("{}{}.{}-{}.bak", prefix, source_name, stamp, n));
            n += 1;
        }

        fs::copy(source_path, &backup_path).context("Failed to create backup")?;
        debug!(backup = %backup_path.display(), "created backup");

        Ok(backup_path)
    }
}

/// `PlayerData.es3.2024-01-01_12-00-00.bak` belongs to `PlayerData.es3`
fn backup_belongs_to(backup_name: &str, file_name: &str) -> bool {
    let name = backup_name
        .strip_prefix("emergency_before_restore_")
        .unwrap_or(backup_name);
    name.strip_prefix(file_name)
        .is_some_and(|rest| rest.starts_with('.'))
}
