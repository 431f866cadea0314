//! Forensic reader for raw Wii NAND flash images.
//!
//! Detects NAND geometry, locates the live superblock, decrypts the
//! cluster-chained SFFS filesystem, and extracts a whitelisted subtree
//! (`title/`, `ticket/`, `sys/uid.sys`) to the host filesystem. Also
//! provides standalone TMD/ticket/UID.sys inventory decoding and settings
//! descrambling for serial recovery. Interactive drivers, HTTP upload and
//! terminal UI are out of scope — this crate is the core decoding library
//! such a tool would sit on top of.

pub mod byteorder;
pub mod cluster;
pub mod error;
pub mod extractor;
pub mod fat;
pub mod fst;
pub mod geometry;
pub mod image;
pub mod names;
pub mod ordered_map;
pub mod probe;
pub mod settings;
pub mod superblock;
pub mod uid;

use std::path::Path;

pub use error::{NandError, SettingsError};
pub use geometry::ImageClass;
pub use image::NandImage;
pub use ordered_map::OrderedMap;
pub use uid::InventoryEntry;

/// Extract the whitelisted subtree of a raw NAND image to `output_dir`.
///
/// `key_blob_path` supplies the external AES key for `NoEcc`/`Ecc` images;
/// `OldBootMii` images carry their own key and ignore it.
pub fn extract_nand(
    image_path: &Path,
    key_blob_path: Option<&Path>,
    output_dir: &Path,
) -> Result<(), NandError> {
    let mut nand = NandImage::open(image_path, key_blob_path)?;
    nand.extract(output_dir)
}

/// Recover the factory serial number from a descrambled settings file.
pub fn read_serial(settings_path: &Path) -> Result<String, SettingsError> {
    settings::read_serial(settings_path)
}

/// Build the insertion-ordered title inventory from a previously extracted
/// tree (see [`extract_nand`]), resolving names against `names_db_path`.
pub fn build_inventory(
    output_dir: &Path,
    names_db_path: &Path,
) -> Result<OrderedMap<InventoryEntry>, NandError> {
    uid::build_inventory(output_dir, names_db_path).map_err(NandError::from)
}
