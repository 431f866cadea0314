//! Top-level NAND image handle: wires geometry detection, key loading and
//! superblock location together over a single open stream, analogous to how
//! a disc reader aggregating header and partition info over one file
//! handle.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use log::info;

use crate::error::NandError;
use crate::extractor::extract_tree;
use crate::geometry::{self, ImageClass};
use crate::superblock::{self, SuperblockLocation};

/// An opened, geometry-resolved NAND image ready for extraction.
///
/// Generic over the stream type: callers can plug in a `File`,
/// a `BufReader<File>`, or (in tests) a `Cursor<Vec<u8>>`. Parallel
/// extraction across multiple images requires one `NandImage` per worker —
/// the struct holds no shared or interior-mutable state.
pub struct NandImage<RS: Read + Seek> {
    stream: RS,
    class: ImageClass,
    key: [u8; 16],
    location: SuperblockLocation,
}

impl<RS: Read + Seek> NandImage<RS> {
    /// Resolve geometry, load the AES key and locate the live superblock
    /// over an already-open stream plus an optional already-open key blob
    /// stream (ignored for `OldBootMii` images, which carry their own key).
    pub fn from_streams<KS: Read + Seek>(
        mut stream: RS,
        image_len: u64,
        key_blob: Option<&mut KS>,
    ) -> Result<Self, NandError> {
        let class = ImageClass::detect(image_len)?;
        let key = geometry::load_key(class, &mut stream, key_blob)?;
        let location = superblock::locate_superblock(&mut stream, class)?;
        Ok(NandImage {
            stream,
            class,
            key,
            location,
        })
    }

    pub fn class(&self) -> ImageClass {
        self.class
    }

    pub fn location(&self) -> SuperblockLocation {
        self.location
    }

    /// Extract the whitelisted subtree into `output_dir`.
    pub fn extract(&mut self, output_dir: &Path) -> Result<(), NandError> {
        info!(
            "extracting {:?} image, superblock at {:#x}",
            self.class, self.location.superblock_offset
        );
        extract_tree(
            &mut self.stream,
            self.class,
            self.key,
            self.location.fat_base,
            self.location.fst_base,
            0,
            output_dir,
        )
    }
}

impl NandImage<File> {
    /// Open a raw NAND image file on disk, plus an optional external key
    /// blob file, and resolve its geometry/superblock in one step.
    pub fn open(image_path: &Path, key_blob_path: Option<&Path>) -> Result<Self, NandError> {
        let file = File::open(image_path)?;
        let image_len = file.metadata()?.len();
        let mut key_blob_file = match key_blob_path {
            Some(p) => Some(File::open(p)?),
            None => None,
        };
        NandImage::from_streams(file, image_len, key_blob_file.as_mut())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::io::{self, Cursor, SeekFrom};

    const SIZE_NO_ECC: u64 = 536_870_912;

    /// Sparse `NoEcc`-sized fake backing, as in `superblock.rs`'s tests:
    /// real length would be >512MB, so reads return zero everywhere except
    /// the generation words a test plants.
    struct SparseImage {
        generations: HashMap<u64, u32>,
        pos: u64,
    }

    impl SparseImage {
        fn new() -> Self {
            SparseImage {
                generations: HashMap::new(),
                pos: 0,
            }
        }

        fn plant(&mut self, superblock_offset: u64, gen: u32) {
            self.generations.insert(superblock_offset + 4, gen);
        }
    }

    impl Read for SparseImage {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            buf.fill(0);
            if let Some(&gen) = self.generations.get(&self.pos) {
                if buf.len() >= 4 {
                    buf[..4].copy_from_slice(&gen.to_be_bytes());
                }
            }
            self.pos += buf.len() as u64;
            Ok(buf.len())
        }
    }

    impl Seek for SparseImage {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.pos = match pos {
                SeekFrom::Start(o) => o,
                SeekFrom::Current(o) => (self.pos as i64 + o) as u64,
                SeekFrom::End(_) => unreachable!("not used by from_streams"),
            };
            Ok(self.pos)
        }
    }

    #[test]
    fn from_streams_resolves_geometry_key_and_superblock() {
        let key = [0x5Au8; 16];
        let mut blob = vec![0u8; 0x200];
        blob[0x158..0x168].copy_from_slice(&key);
        let mut blob_cursor = Cursor::new(blob);

        let (start, _end, step) = ImageClass::NoEcc.superblock_scan_range();
        let mut image = SparseImage::new();
        image.plant(start, 1);
        image.plant(start + step, 1); // equal generation counts as a decrease

        let nand = NandImage::from_streams(image, SIZE_NO_ECC, Some(&mut blob_cursor)).unwrap();
        assert_eq!(nand.class(), ImageClass::NoEcc);
        assert_eq!(nand.location().superblock_offset, start);
    }

    #[test]
    fn from_streams_unknown_size_is_fatal() {
        let stream = Cursor::new(vec![0u8; 4]);
        let err = NandImage::from_streams::<Cursor<Vec<u8>>>(stream, 4, None).unwrap_err();
        assert!(matches!(err, NandError::UnknownGeometry { size: 4 }));
    }
}
