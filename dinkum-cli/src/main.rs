mod backup;
mod services;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dinkum_core::{
    InputFormat, MatchType, QuickEditFields, SaveDocument, clear_grid, es3_file_name,
    json_file_name, read_grids, search, set_slot, toolbar_size,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use backup::BackupManager;
use services::save_file_service::file_name;
use services::{SaveFileService, SaveLocator};

#[derive(Parser)]
#[command(name = "dinkum-cli")]
#[command(about = "Dinkum ES3 save (de|en)crypt and edit – CLI tool", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG wins if set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Dinkum save folder (contains Slot0, Slot1, ...)
    #[arg(long, env = "DINKUM_SAVE_DIR", global = true)]
    save_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where an edit is written and how
#[derive(clap::Args)]
struct WriteArgs {
    /// Write here instead of overwriting the input (a backup is made either way)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Gzip the payload before encrypting
    #[arg(long)]
    gzip: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt an .es3 save to JSON
    Decrypt {
        /// Path to the encrypted save file (.es3 or .es3.bac)
        input: PathBuf,

        /// Path to write the JSON (defaults to <name>.json next to the input)
        output: Option<PathBuf>,

        /// Write a 2-space dump instead of the game's own text layout
        #[arg(long)]
        pretty: bool,
    },

    /// Encrypt JSON (or re-encrypt an .es3) into a game-ready .es3
    Encrypt {
        /// Path to the JSON or .es3 file
        input: PathBuf,

        /// Path to write the encrypted file (defaults to <name>.es3)
        output: Option<PathBuf>,

        /// Gzip the payload before encrypting
        #[arg(long)]
        gzip: bool,
    },

    /// Show what a save contains
    Info {
        /// Save file (.es3, .es3.bac or .json)
        file: PathBuf,
    },

    /// Print the value at a dotted path, e.g. playerInfo.value.money
    Get { file: PathBuf, path: String },

    /// Replace the value at a dotted path, keeping its JSON type
    ///
    /// Strings take the text as is, numbers and booleans must parse, arrays
    /// and objects take a JSON literal.
    Set {
        file: PathBuf,
        path: String,
        value: String,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Change common player fields
    Quick {
        file: PathBuf,
        #[arg(long)]
        player_name: Option<String>,
        #[arg(long)]
        island_name: Option<String>,
        #[arg(long)]
        money: Option<i64>,
        #[arg(long)]
        bank_balance: Option<i64>,
        #[arg(long)]
        health: Option<f64>,
        #[arg(long)]
        health_max: Option<f64>,
        #[arg(long)]
        stamina: Option<f64>,
        #[arg(long)]
        stamina_max: Option<f64>,
        #[arg(long)]
        permit_points: Option<i64>,
        #[arg(long)]
        creative: Option<bool>,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Set one inventory slot (grid 0 = inventory, 1.. = stashes or chests)
    Slot {
        file: PathBuf,
        grid: usize,
        slot: usize,
        /// Item id, -1 empties the slot
        #[arg(allow_negative_numbers = true)]
        item: i64,
        stack: i64,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Empty every slot of a grid (same numbering as `slot`)
    Clear {
        file: PathBuf,
        grid: usize,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Find keys and values containing some text (case-insensitive)
    Search {
        file: PathBuf,
        query: String,
        /// Print the matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the save folder and its slots
    Locate,

    /// Manage backups made before edits
    Backups {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// List backups of a save file, newest first
    List { file: PathBuf },

    /// Copy a backup over a save file
    Restore { backup: PathBuf, target: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let service = SaveFileService::new();

    match cli.command {
        Commands::Decrypt {
            input,
            output,
            pretty,
        } => cmd_decrypt(&service, &input, output, pretty),
        Commands::Encrypt {
            input,
            output,
            gzip,
        } => cmd_encrypt(&service, &input, output, gzip),
        Commands::Info { file } => cmd_info(&service, &file),
        Commands::Get { file, path } => cmd_get(&service, &file, &path),
        Commands::Set {
            file,
            path,
            value,
            write,
        } => cmd_set(&service, &file, &path, &value, &write),
        Commands::Quick {
            file,
            player_name,
            island_name,
            money,
            bank_balance,
            health,
            health_max,
            stamina,
            stamina_max,
            permit_points,
            creative,
            write,
        } => {
            let mut doc = service.load(&file)?;
            let mut fields = QuickEditFields::read(&doc)?;

            if let Some(v) = player_name {
                fields.player_name = v;
            }
            if let Some(v) = island_name {
                fields.island_name = v;
            }
            fields.money = money.unwrap_or(fields.money);
            fields.bank_balance = bank_balance.unwrap_or(fields.bank_balance);
            fields.health = health.unwrap_or(fields.health);
            fields.health_max = health_max.unwrap_or(fields.health_max);
            fields.stamina = stamina.unwrap_or(fields.stamina);
            fields.stamina_max = stamina_max.unwrap_or(fields.stamina_max);
            fields.permit_points = permit_points.unwrap_or(fields.permit_points);
            if let Some(v) = creative {
                fields.is_creative = v;
                // the game flags a save once creative was ever on
                fields.has_been_creative |= v;
            }

            fields.apply(&mut doc)?;
            print_quick_fields(&fields);
            write_back(&service, &doc, &file, &write)
        }
        Commands::Slot {
            file,
            grid,
            slot,
            item,
            stack,
            write,
        } => {
            let mut doc = service.load(&file)?;
            set_slot(&mut doc, grid, slot, item, stack)?;
            println!("[info] grid {} slot {} -> item {} x{}", grid, slot, item, stack);
            write_back(&service, &doc, &file, &write)
        }
        Commands::Clear { file, grid, write } => {
            let mut doc = service.load(&file)?;
            let cleared = clear_grid(&mut doc, grid)?;
            println!("[info] grid {}: cleared {} slots", grid, cleared);
            write_back(&service, &doc, &file, &write)
        }
        Commands::Search { file, query, json } => cmd_search(&service, &file, &query, json),
        Commands::Locate => cmd_locate(SaveLocator::with_save_dir(cli.save_dir)),
        Commands::Backups { action } => match action {
            BackupAction::List { file } => cmd_backups_list(&file),
            BackupAction::Restore { backup, target } => {
                let bm = BackupManager::for_save(&target);
                match bm.restore_backup(&backup, &target)? {
                    Some(emergency) => {
                        println!("[info] previous file saved as {}", emergency.display())
                    }
                    None => println!("[info] {} did not exist before", target.display()),
                }
                println!("[ok] restored {} -> {}", backup.display(), target.display());
                Ok(())
            }
        },
    }
}

fn cmd_decrypt(
    service: &SaveFileService,
    input: &Path,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<()> {
    let output = match output {
        Some(p) => p,
        None => input.with_file_name(json_file_name(&file_name(input)?)),
    };

    if pretty {
        let doc = service.load(input)?;
        println!("[info] kind={}", doc.kind().label());
        service.save_json(&doc, &output)?;
    } else {
        let text = service.load_text(input)?;
        println!("[info] len(json)={}", text.len());
        fs::write(&output, text)
            .with_context(|| format!("Failed to write JSON file: {}", output.display()))?;
    }

    println!("[ok] wrote JSON -> {}", output.display());
    Ok(())
}

fn cmd_encrypt(
    service: &SaveFileService,
    input: &Path,
    output: Option<PathBuf>,
    gzip: bool,
) -> Result<()> {
    let doc = service.load(input)?;

    let output = match output {
        Some(p) => p,
        None => input.with_file_name(es3_file_name(&file_name(input)?)),
    };

    if output.exists() {
        let backup = BackupManager::for_save(&output).create_backup(&output)?;
        println!("[info] backup -> {}", backup.display());
    }

    service.save_es3(&doc, &output, gzip)?;
    println!("[ok] wrote encrypted save -> {}", output.display());
    Ok(())
}

fn cmd_info(service: &SaveFileService, file: &Path) -> Result<()> {
    let size = fs::metadata(file)
        .with_context(|| format!("Failed to read save file: {}", file.display()))?
        .len();
    let doc = service.load(file)?;

    println!("[info] file={}  size={} bytes", file.display(), size);
    println!("[info] kind={}", doc.kind().label());
    println!("[info] len(es3 text)={}", doc.to_es3_text().len());

    if let Some(map) = doc.root().as_object() {
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        println!("[info] top-level keys ({}): {}", keys.len(), keys.join(", "));
    }

    if let Ok(fields) = QuickEditFields::read(&doc) {
        print_quick_fields(&fields);
    }

    if let Ok(grids) = read_grids(&doc) {
        for (i, grid) in grids.iter().enumerate() {
            print!(
                "[info] grid {}: {}  {}/{} slots used",
                i,
                grid.name,
                grid.occupied(),
                grid.slots.len()
            );
            if i == 0 && grid.name == "Inventory" {
                print!("  (toolbar {})", toolbar_size(grid.slots.len()));
            }
            if let Some(location) = grid.location {
                print!("  {}", location);
            }
            println!();
        }
    }

    Ok(())
}

fn cmd_get(service: &SaveFileService, file: &Path, path: &str) -> Result<()> {
    let doc = service.load(file)?;
    let value = doc.get(path)?;
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_set(
    service: &SaveFileService,
    file: &Path,
    path: &str,
    raw: &str,
    write: &WriteArgs,
) -> Result<()> {
    let mut doc = service.load(file)?;

    let old = doc.set_from_text(path, raw)?;
    println!("[info] {}: {} -> {}", path, old, doc.get(path)?);

    write_back(service, &doc, file, write)
}

fn cmd_search(service: &SaveFileService, file: &Path, query: &str, json: bool) -> Result<()> {
    let doc = service.load(file)?;
    let matches = search(&doc, query);

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        println!("[info] no matches for {:?}", query);
    }
    for m in &matches {
        match m.match_type {
            MatchType::Key => println!("key    {}", m.path),
            MatchType::Value => println!("value  {} = {}", m.path, m.matched_text),
        }
    }
    Ok(())
}

fn cmd_locate(locator: SaveLocator) -> Result<()> {
    let Some(dir) = locator.get_save_directory() else {
        bail!("Unknown platform; pass --save-dir or set DINKUM_SAVE_DIR");
    };

    println!("[info] save folder: {}", dir.display());
    if !locator.save_dir_exists() {
        println!("[warn] folder does not exist");
        return Ok(());
    }

    let slots = locator.list_slots();
    if slots.is_empty() {
        println!("[info] no SlotN folders found");
    }
    for slot in slots {
        println!("[info] Slot{}: {}", slot.index, slot.path.display());
        for (label, save) in [("player", &slot.player_save), ("container", &slot.container_save)] {
            match save {
                Some(p) => println!("         {:<9} {}", label, p.display()),
                None => println!("         {:<9} -", label),
            }
        }
    }

    Ok(())
}

fn cmd_backups_list(file: &Path) -> Result<()> {
    let bm = BackupManager::for_save(file);
    let backups = bm.list_backups(Some(&file_name(file)?))?;

    if backups.is_empty() {
        println!("[info] no backups in {}", bm.backup_dir().display());
        return Ok(());
    }

    for b in backups {
        println!(
            "{}  {:>8} bytes  {}  {}",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.size,
            if b.is_valid { "OK     " } else { "INVALID" },
            b.path.display()
        );
    }

    Ok(())
}

fn print_quick_fields(fields: &QuickEditFields) {
    println!(
        "[info] player={:?} island={:?} money={} bank={} permitPoints={}",
        fields.player_name,
        fields.island_name,
        fields.money,
        fields.bank_balance,
        fields.permit_points
    );
    println!(
        "[info] health={}/{} stamina={}/{} creative={} hasBeenCreative={}",
        fields.health,
        fields.health_max,
        fields.stamina,
        fields.stamina_max,
        fields.is_creative,
        fields.has_been_creative
    );
}

/// Writes an edited document, backing up whatever it replaces
fn write_back(
    service: &SaveFileService,
    doc: &SaveDocument,
    input: &Path,
    write: &WriteArgs,
) -> Result<()> {
    let target = write.out.as_deref().unwrap_or(input);

    if target.exists() {
        let backup = BackupManager::for_save(target).create_backup(target)?;
        println!("[info] backup -> {}", backup.display());
    }

    match InputFormat::from_file_name(&file_name(target)?)? {
        InputFormat::Es3 => service.save_es3(doc, target, write.gzip)?,
        InputFormat::Json => service.save_json(doc, target)?,
    }

    println!("[ok] wrote {}", target.display());
    Ok(())
}
