//! UID.sys decoder: parses the packed array of 12-byte records into
//! canonical title identifiers, classifies each by the major-type table,
//! and produces the final per-console inventory by layering in the
//! TMD/ticket probes and name resolution.

use std::fs;
use std::path::Path;

use log::debug;

use crate::names::{load_names_db, resolve_title_name};
use crate::ordered_map::OrderedMap;
use crate::probe::{ticket_status, title_status};

const RECORD_LEN: usize = 12;

const TYPE_TABLE: &[(&str, &str)] = &[
    ("00000000", "Development title"),
    ("00000001", "System title"),
    ("00010000", "Save data"),
    ("00010001", "Installed title"),
    ("00010002", "Preinstalled channel"),
    ("00010004", "Game channel"),
    ("00010005", "DLC"),
    ("00010008", "Hidden title"),
];

/// A single decoded, non-hole UID.sys record, before TMD/ticket probing.
#[derive(Debug, Clone)]
pub struct UidEntry {
    pub title_id: String,
    pub gid: String,
    pub title_type: String,
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn to_gid(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (0x20..=0x7E).contains(&b) { b as char } else { '.' })
        .collect()
}

fn classify_type(major: &str) -> &'static str {
    TYPE_TABLE
        .iter()
        .find(|&&(id, _)| id == major)
        .map(|&(_, name)| name)
        .unwrap_or("Unknown")
}

fn decode_record(record: &[u8; RECORD_LEN]) -> Option<UidEntry> {
    if record.iter().all(|&b| b == 0) {
        return None;
    }
    let major = to_hex(&record[0..4]);
    let minor = to_hex(&record[4..8]);
    let title_id = format!("{major}-{minor}");
    let gid = to_gid(&record[4..8]);
    let title_type = classify_type(&major).to_string();
    Some(UidEntry {
        title_id,
        gid,
        title_type,
    })
}

/// Decode `sys/uid.sys` into its raw entries, skipping all-zero holes.
/// Standalone from [`build_inventory`] so a caller only interested in the
/// raw UID log (no TMD/ticket filesystem probing) can use it directly.
pub fn read_uid_entries(uid_sys_path: &Path) -> std::io::Result<Vec<UidEntry>> {
    let bytes = fs::read(uid_sys_path)?;
    let mut entries = Vec::new();
    for chunk in bytes.chunks(RECORD_LEN) {
        if chunk.len() < RECORD_LEN {
            break;
        }
        let record: [u8; RECORD_LEN] = chunk.try_into().unwrap();
        if let Some(entry) = decode_record(&record) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// One row of the final per-console inventory.
#[derive(Debug, Clone)]
pub struct InventoryEntry {
    pub gid: String,
    pub title_type: String,
    pub name: String,
    pub title_status: String,
    pub ticket_status: String,
}

/// Build the full, insertion-ordered inventory: decode `uid.sys` under
/// `output_dir`, resolve each title's name, and probe its TMD/ticket
/// presence against the rest of the extracted tree.
pub fn build_inventory(
    output_dir: &Path,
    names_db_path: &Path,
) -> std::io::Result<OrderedMap<InventoryEntry>> {
    let uid_sys_path = output_dir.join("sys").join("uid.sys");
    let mut inventory = OrderedMap::new();
    if !uid_sys_path.is_file() {
        return Ok(inventory);
    }
    let db = load_names_db(names_db_path);
    let entries = read_uid_entries(&uid_sys_path)?;
    for entry in entries {
        let (major, minor) = entry
            .title_id
            .split_once('-')
            .expect("title_id is always formatted as major-minor");
        let name = resolve_title_name(&db, &entry.title_id, &entry.gid);
        if name.is_empty() {
            debug!("no name resolved for title {}", entry.title_id);
        }
        let inventory_entry = InventoryEntry {
            gid: entry.gid.clone(),
            title_type: entry.title_type.clone(),
            name,
            title_status: title_status(output_dir, major, minor),
            ticket_status: ticket_status(output_dir, major, minor),
        };
        inventory.insert(entry.title_id.clone(), inventory_entry);
    }
    Ok(inventory)
}
