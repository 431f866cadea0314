//! Superblock locator: scans the wear-levelled ring of superblock
//! candidates and returns the absolute offset of the one with the highest
//! generation counter, plus the derived FAT/FST base offsets.

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::byteorder::be32;
use crate::error::NandError;
use crate::geometry::ImageClass;

/// Absolute byte offsets of the live superblock's FAT and FST tables.
#[derive(Debug, Clone, Copy)]
pub struct SuperblockLocation {
    pub superblock_offset: u64,
    pub fat_base: u64,
    pub fst_base: u64,
}

/// Scan the ring for `class`, returning the location with the highest
/// generation counter reached before the counter next fails to increase.
///
/// The test is strict (`>`): equal generations count as a decrease. A ring
/// that never decreases (including a ring of only one element) yields
/// `NoSuperblock`, matching the source filesystem's one-writer
/// wear-levelling discipline.
pub fn locate_superblock<RS: Read + Seek>(
    image: &mut RS,
    class: ImageClass,
) -> Result<SuperblockLocation, NandError> {
    let (start, end, step) = class.superblock_scan_range();
    let mut last = 0u32;
    let mut loc = start;
    while loc < end {
        image.seek(SeekFrom::Start(loc + 4))?;
        let mut buf = [0u8; 4];
        image
            .read_exact(&mut buf)
            .map_err(|_| NandError::TruncatedImage {
                context: "superblock generation scan",
            })?;
        let current = be32(&buf);
        if current > last {
            last = current;
            loc += step;
        } else {
            let superblock_offset = loc - step;
            debug!(
                "superblock located at {:#x} with generation {}",
                superblock_offset, last
            );
            return Ok(build_location(superblock_offset, class));
        }
    }
    Err(NandError::NoSuperblock)
}

fn build_location(superblock_offset: u64, class: ImageClass) -> SuperblockLocation {
    let fat_base = superblock_offset + 0x0C;
    let fst_base = fat_base + class.fat_len();
    SuperblockLocation {
        superblock_offset,
        fat_base,
        fst_base,
    }
}
