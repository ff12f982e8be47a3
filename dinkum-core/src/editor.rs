//! Typed edits on top of a [`SaveDocument`]
//!
//! Quick-edit fields and inventory slots live at fixed places in the player
//! and container saves. Every edit writes into the existing JSON tree so
//! keys the editor does not know about survive untouched and in order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::document::SaveDocument;
use crate::error::DocumentError;
use crate::save::SaveKind;

const PLAYER_INFO: &str = "playerInfo.value";
const LICENCES: &str = "licences.value";
const CHESTS: &str = "chests.value.allChests";

/// Item id of an empty slot
pub const EMPTY_SLOT: i64 = -1;

/// Fields users most often want to change in a player save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickEditFields {
    pub player_name: String,
    pub island_name: String,
    pub money: i64,
    pub bank_balance: i64,
    pub health: f64,
    pub health_max: f64,
    pub stamina: f64,
    pub stamina_max: f64,
    pub permit_points: i64,
    pub is_creative: bool,
    pub has_been_creative: bool,
}

impl QuickEditFields {
    /// Reads the fields from a player save
    pub fn read(doc: &SaveDocument) -> Result<Self, DocumentError> {
        let info = doc
            .get(PLAYER_INFO)
            .map_err(|_| DocumentError::NotPlayerSave(PLAYER_INFO))?;

        let mut fields = serde_json::Map::new();
        for key in Self::PLAYER_KEYS {
            let v = info.get(*key).ok_or(DocumentError::NotPlayerSave(*key))?;
            fields.insert((*key).to_string(), v.clone());
        }

        let permit_points = doc
            .get(&format!("{}.permitPoints", LICENCES))
            .cloned()
            .unwrap_or(json!(0));
        fields.insert("permitPoints".to_string(), permit_points);

        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Writes the fields back in place
    pub fn apply(&self, doc: &mut SaveDocument) -> Result<(), DocumentError> {
        let new = serde_json::to_value(self)?;

        let info = doc
            .get_mut(PLAYER_INFO)
            .map_err(|_| DocumentError::NotPlayerSave(PLAYER_INFO))?;
        for key in Self::PLAYER_KEYS {
            if let (Some(slot), Some(v)) = (info.get_mut(*key), new.get(*key)) {
                *slot = keep_integer(slot, v);
            }
        }

        if let Ok(slot) = doc.get_mut(&format!("{}.permitPoints", LICENCES)) {
            *slot = json!(self.permit_points);
        }

        Ok(())
    }

    const PLAYER_KEYS: &'static [&'static str] = &[
        "playerName",
        "islandName",
        "money",
        "bankBalance",
        "health",
        "healthMax",
        "stamina",
        "staminaMax",
        "isCreative",
        "hasBeenCreative",
    ];
}

/// Health/stamina are floats in the struct but often whole numbers in the
/// file. Keep `100` as `100` when the new value has no fraction and fits.
fn keep_integer(old: &Value, new: &Value) -> Value {
    match (old, new.as_f64()) {
        (Value::Number(n), Some(f))
            if n.is_i64() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            json!(f as i64)
        }
        _ => new.clone(),
    }
}

/// One inventory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub item_id: i64,
    pub stack: i64,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.item_id == EMPTY_SLOT
    }
}

/// Where a container chest stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestLocation {
    House { x: i64, y: i64 },
    World { x: i64, y: i64 },
}

impl ChestLocation {
    /// `houseX`/`houseY` of -1 mean the chest is outside
    pub fn from_chest(chest: &Value) -> Option<Self> {
        let coord = |key: &str| chest.get(key).and_then(Value::as_i64);

        match (coord("houseX"), coord("houseY")) {
            (Some(x), Some(y)) if x != -1 && y != -1 => Some(ChestLocation::House { x, y }),
            _ => Some(ChestLocation::World {
                x: coord("xPos")?,
                y: coord("yPos")?,
            }),
        }
    }
}

impl fmt::Display for ChestLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChestLocation::House { x, y } => write!(f, "House ({}, {})", x, y),
            ChestLocation::World { x, y } => write!(f, "World ({}, {})", x, y),
        }
    }
}

/// A grid of slots: the player inventory, a stash, or a container chest
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub name: String,
    pub slots: Vec<Slot>,
    /// Only set for container chests
    pub location: Option<ChestLocation>,
}

impl Grid {
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }
}

/// Toolbar holds the first quarter of the player inventory
///
/// 8 toolbar + 24 backpack by default; every cargo licence adds 1 + 3.
pub fn toolbar_size(total_slots: usize) -> usize {
    total_slots / 4
}

/// Top-level `stash_N` keys in numeric order
pub fn stash_keys(doc: &SaveDocument) -> Vec<String> {
    let mut keys: Vec<(u64, String)> = doc
        .root()
        .as_object()
        .map(|map| {
            map.keys()
                .filter_map(|k| {
                    let n = k.strip_prefix("stash_")?.parse::<u64>().ok()?;
                    Some((n, k.clone()))
                })
                .collect()
        })
        .unwrap_or_default();

    keys.sort_by_key(|(n, _)| *n);
    keys.into_iter().map(|(_, k)| k).collect()
}

/// Where a grid's item/stack arrays live in the document
fn grid_paths(doc: &SaveDocument, grid: usize) -> Result<(String, String, String), DocumentError> {
    match doc.kind() {
        SaveKind::Player => {
            if grid == 0 {
                doc.get(&format!("{}.itemsInInvSlots", PLAYER_INFO))
                    .map_err(|_| DocumentError::NotPlayerSave("playerInfo.value.itemsInInvSlots"))?;
                return Ok((
                    "Inventory".to_string(),
                    format!("{}.itemsInInvSlots", PLAYER_INFO),
                    format!("{}.stacksInSlots", PLAYER_INFO),
                ));
            }
            let key = stash_keys(doc)
                .into_iter()
                .nth(grid - 1)
                .ok_or(DocumentError::GridNotFound(grid))?;
            Ok((
                key.clone(),
                format!("{}.value.itemId", key),
                format!("{}.value.itemStack", key),
            ))
        }
        SaveKind::Container => {
            let chests = doc
                .get(CHESTS)
                .map_err(|_| DocumentError::NotContainerSave(CHESTS))?;
            if chests.get(grid).is_none() {
                return Err(DocumentError::GridNotFound(grid));
            }
            Ok((
                format!("Chest {}", grid),
                format!("{}.{}.itemId", CHESTS, grid),
                format!("{}.{}.itemStack", CHESTS, grid),
            ))
        }
    }
}

fn int_array<'a>(doc: &'a SaveDocument, path: &str) -> Result<&'a Vec<Value>, DocumentError> {
    doc.get(path)?
        .as_array()
        .ok_or_else(|| DocumentError::PathNotFound(path.to_string()))
}

/// Reads one grid. Grid 0 of a player save is the inventory, grid `g >= 1`
/// the g-th stash; in a container save grid `g` is chest `g`.
pub fn read_grid(doc: &SaveDocument, grid: usize) -> Result<Grid, DocumentError> {
    let (name, items_path, stacks_path) = grid_paths(doc, grid)?;
    let items = int_array(doc, &items_path)?;
    let stacks = int_array(doc, &stacks_path)?;

    let slots = items
        .iter()
        .enumerate()
        .map(|(i, id)| Slot {
            item_id: id.as_i64().unwrap_or(EMPTY_SLOT),
            stack: stacks.get(i).and_then(Value::as_i64).unwrap_or(0),
        })
        .collect();

    let location = match doc.kind() {
        SaveKind::Container => doc
            .get(&format!("{}.{}", CHESTS, grid))
            .ok()
            .and_then(ChestLocation::from_chest),
        SaveKind::Player => None,
    };

    Ok(Grid {
        name,
        slots,
        location,
    })
}

/// All grids of the document in display order
pub fn read_grids(doc: &SaveDocument) -> Result<Vec<Grid>, DocumentError> {
    let count = match doc.kind() {
        SaveKind::Player => 1 + stash_keys(doc).len(),
        SaveKind::Container => doc
            .get(CHESTS)
            .map_err(|_| DocumentError::NotContainerSave(CHESTS))?
            .as_array()
            .map_or(0, Vec::len),
    };

    (0..count).map(|g| read_grid(doc, g)).collect()
}

/// Puts `item_id` x `stack` into a slot; an empty item clears the stack
pub fn set_slot(
    doc: &mut SaveDocument,
    grid: usize,
    slot: usize,
    item_id: i64,
    stack: i64,
) -> Result<(), DocumentError> {
    let (_, items_path, stacks_path) = grid_paths(doc, grid)?;
    let len = int_array(doc, &items_path)?.len();
    if slot >= len {
        return Err(DocumentError::SlotOutOfRange { grid, slot, len });
    }

    let stack = if item_id == EMPTY_SLOT { 0 } else { stack };
    doc.set(&format!("{}.{}", items_path, slot), json!(item_id))?;
    doc.set(&format!("{}.{}", stacks_path, slot), json!(stack))?;
    Ok(())
}

/// Empties every slot of a grid and returns how many held an item
pub fn clear_grid(doc: &mut SaveDocument, grid: usize) -> Result<usize, DocumentError> {
    let cleared = read_grid(doc, grid)?.occupied();
    let (_, items_path, stacks_path) = grid_paths(doc, grid)?;

    fill(doc, &items_path, EMPTY_SLOT)?;
    fill(doc, &stacks_path, 0)?;
    Ok(cleared)
}

fn fill(doc: &mut SaveDocument, path: &str, value: i64) -> Result<(), DocumentError> {
    let values = doc
        .get_mut(path)?
        .as_array_mut()
        .ok_or_else(|| DocumentError::PathNotFound(path.to_string()))?;
    for v in values.iter_mut() {
        *v = json!(value);
    }
    Ok(())
}
