//! NAND geometry detection and AES key loading.

use std::io::{Read, Seek, SeekFrom};

use log::info;

use crate::error::NandError;

/// The three known physical layouts of a raw Wii NAND dump, distinguished
/// solely by exact image byte-length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageClass {
    NoEcc,
    Ecc,
    OldBootMii,
}

const SIZE_NO_ECC: u64 = 536_870_912;
const SIZE_ECC: u64 = 553_648_128;
const SIZE_OLD_BOOTMII: u64 = 553_649_152;

const KEY_LEN: usize = 16;
const KEY_OFFSET_IN_BLOB: u64 = 0x158;
const KEY_OFFSET_IN_OLD_BOOTMII: u64 = 0x2100_0158;

impl ImageClass {
    /// Classify an image purely by its byte length. Any other size is a
    /// fatal `UnknownGeometry` error.
    pub fn detect(image_len: u64) -> Result<Self, NandError> {
        let class = match image_len {
            SIZE_NO_ECC => ImageClass::NoEcc,
            SIZE_ECC => ImageClass::Ecc,
            SIZE_OLD_BOOTMII => ImageClass::OldBootMii,
            size => return Err(NandError::UnknownGeometry { size }),
        };
        info!("detected NAND geometry {:?} from image size {}", class, image_len);
        Ok(class)
    }

    /// Physical length of one cluster on disk, including OOB bytes.
    pub fn phys_cluster_len(&self) -> u64 {
        match self {
            ImageClass::NoEcc => 0x4000,
            ImageClass::Ecc | ImageClass::OldBootMii => 0x4200,
        }
    }

    /// Physical length of one page, including OOB bytes.
    pub fn page_len(&self) -> u64 {
        match self {
            ImageClass::NoEcc => 0x800,
            ImageClass::Ecc | ImageClass::OldBootMii => 0x840,
        }
    }

    /// FAT-entry physical padding inserted every 0x400 logical entries.
    pub fn fat_pad(&self) -> u64 {
        match self {
            ImageClass::NoEcc => 0,
            ImageClass::Ecc | ImageClass::OldBootMii => 0x20,
        }
    }

    /// FST-entry physical padding (in entries) inserted every 0x40 logical entries.
    pub fn fst_pad(&self) -> u64 {
        match self {
            ImageClass::NoEcc => 0,
            ImageClass::Ecc | ImageClass::OldBootMii => 2,
        }
    }

    /// Byte length of the FAT table following a superblock's generation header.
    pub fn fat_len(&self) -> u64 {
        match self {
            ImageClass::NoEcc => 0x010000,
            ImageClass::Ecc | ImageClass::OldBootMii => 0x010800,
        }
    }

    /// `[start, end)` range and step of the superblock ring scan.
    pub fn superblock_scan_range(&self) -> (u64, u64, u64) {
        match self {
            ImageClass::NoEcc => (0x1FC0_0000, 0x2000_0000, 0x40000),
            ImageClass::Ecc | ImageClass::OldBootMii => (0x20BE_0000, 0x2100_0000, 0x42000),
        }
    }
}

/// Load the 16-byte AES key. `OldBootMii` images carry their own key at a
/// fixed offset and ignore any external key blob; other classes require an
/// external key blob read at `0x158`.
pub fn load_key<IS: Read + Seek, KS: Read + Seek>(
    class: ImageClass,
    image: &mut IS,
    key_blob: Option<&mut KS>,
) -> Result<[u8; KEY_LEN], NandError> {
    let mut key = [0u8; KEY_LEN];
    match class {
        ImageClass::OldBootMii => {
            image.seek(SeekFrom::Start(KEY_OFFSET_IN_OLD_BOOTMII))?;
            read_key_exact(image, &mut key)?;
        }
        ImageClass::NoEcc | ImageClass::Ecc => {
            let blob = key_blob.ok_or(NandError::BadKey)?;
            blob.seek(SeekFrom::Start(KEY_OFFSET_IN_BLOB))?;
            read_key_exact(blob, &mut key)?;
        }
    }
    Ok(key)
}

fn read_key_exact<R: Read>(r: &mut R, key: &mut [u8; KEY_LEN]) -> Result<(), NandError> {
    let mut n = 0;
    while n < KEY_LEN {
        let read = r.read(&mut key[n..]).map_err(NandError::Io)?;
        if read == 0 {
            return Err(NandError::BadKey);
        }
        n += read;
    }
    Ok(())
}
