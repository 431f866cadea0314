//! Name database loader and name-resolution cascade.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;

/// Flat gid -> name map, loaded once from JSON. A missing or malformed file
/// yields an empty map rather than a fatal error.
pub fn load_names_db(path: &Path) -> HashMap<String, String> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                warn!("names database at {:?} is malformed: {e}", path);
                HashMap::new()
            }
        },
        Err(e) => {
            warn!("names database at {:?} unavailable: {e}", path);
            HashMap::new()
        }
    }
}

const SPECIAL_IDS: &[(&str, &str)] = &[
    ("00000000-87654321", "sdboot2"),
    ("00000001-00000000", "IOS Superuser"),
    ("00000001-00000001", "boot1 glitch"),
    ("00000001-00000002", "System Menu"),
    ("00000001-00000100", "BC"),
    ("00000001-00000101", "MIOS"),
];

const IOS_MAJOR: &str = "00000001";

/// The closed sum of name-resolution strategies, modeled as a tagged
/// dispatch so any future branch addition has to be matched exhaustively.
/// `Database` also covers the terminal "no match anywhere -> empty string"
/// case, since that's just what a failed lookup returns, not a distinct
/// strategy.
enum NameSource {
    SpecialId,
    Ios,
    Database,
}

fn classify(title_id: &str, major: &str) -> NameSource {
    if SPECIAL_IDS.iter().any(|&(id, _)| id == title_id) {
        NameSource::SpecialId
    } else if major == IOS_MAJOR {
        NameSource::Ios
    } else {
        NameSource::Database
    }
}

/// Resolve a title's display name: special-id table, then the IOS-number
/// rule, then a gid lookup in `db` with regional fallback (a `U`-prefixed
/// gid with no hit retries with `R` substituted for the first character),
/// then the empty string.
pub fn resolve_title_name(db: &HashMap<String, String>, title_id: &str, gid: &str) -> String {
    let major = &title_id[0..8];
    let minor = &title_id[9..17.min(title_id.len())];
    match classify(title_id, major) {
        NameSource::SpecialId => SPECIAL_IDS
            .iter()
            .find(|&&(id, _)| id == title_id)
            .map(|&(_, name)| name.to_string())
            .unwrap_or_default(),
        NameSource::Ios => resolve_ios_name(minor),
        NameSource::Database => lookup_gid(db, gid),
    }
}

fn resolve_ios_name(minor_hex: &str) -> String {
    match u32::from_str_radix(minor_hex, 16) {
        Ok(n) => format!("IOS{n}"),
        Err(_) => String::new(),
    }
}

fn lookup_gid(db: &HashMap<String, String>, gid: &str) -> String {
    if let Some(name) = db.get(gid) {
        return name.clone();
    }
    if let Some(rest) = gid.strip_prefix('U') {
        let regional = format!("R{rest}");
        if let Some(name) = db.get(&regional) {
            return name.clone();
        }
    }
    String::new()
}
