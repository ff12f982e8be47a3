//! core functionality for decrypting, editing and re-encrypting
//! ES3 save files from "Dinkum"
//!
//! # Modules
//!
//! - `crypto`: PBKDF2-HMAC-SHA1 key derivation and AES-128-CBC
//! - `codec`: ES3 container encoding/decoding (IV prefix, optional gzip)
//! - `format`: JSON writer reproducing the engine's layout
//! - `document`: loaded save files and path based edits
//! - `editor`: quick-edit fields and inventory grids
//! - `search`: key/value search returning dotted paths
//! - `save`: file name conventions

pub mod codec;
pub mod crypto;
pub mod document;
pub mod editor;
pub mod error;
pub mod format;
pub mod save;
pub mod search;

// Re-export commonly used items
pub use codec::{Es3Codec, GZIP_MAGIC, decode, encode, is_gzip};
pub use crypto::{CipherKey, IV_LEN, PASSWORD, PBKDF2_ITERATIONS, derive_key};
pub use document::SaveDocument;
pub use editor::{
    ChestLocation, EMPTY_SLOT, Grid, QuickEditFields, Slot, clear_grid, read_grid, read_grids,
    set_slot, stash_keys, toolbar_size,
};
pub use error::{DocumentError, Es3Error};
pub use format::serialize;
pub use save::{InputFormat, SaveKind, es3_file_name, json_file_name};
pub use search::{MatchType, SearchMatch, search};
