//! Extractor: projects the whitelisted subtree (`/title`, `/ticket`,
//! `/sys/uid.sys`) of the decoded FST onto a host filesystem, chasing FAT
//! chains and decrypting clusters for each file body.

use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::cluster::{read_cluster, CLUSTER_LEN};
use crate::error::NandError;
use crate::fat::{next_fat_entry, FAT_CHAIN_END};
use crate::fst::{Descend, FstEntry, FstMode, FstVisitor};
use crate::geometry::ImageClass;

const WHITELIST_TOP_LEVEL: [&str; 3] = ["title", "ticket", "sys"];

struct ExtractorVisitor<'o> {
    class: ImageClass,
    key: [u8; 16],
    fat_base: u64,
    output_root: &'o Path,
    path_stack: Vec<String>,
}

impl<'o> ExtractorVisitor<'o> {
    fn host_path(&self) -> PathBuf {
        let mut p = self.output_root.to_path_buf();
        for c in &self.path_stack {
            p.push(c);
        }
        p
    }

    fn relative_path(&self, filename: &str) -> String {
        if self.path_stack.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", self.path_stack.join("/"), filename)
        }
    }
}

fn reject_separators(name: &str) -> Result<(), NandError> {
    if name.contains('/') || name.contains('\\') || name == ".." {
        return Err(NandError::UnsafePath {
            path: PathBuf::from(name),
        });
    }
    Ok(())
}

/// Final defence for the "never writes outside the output root" invariant:
/// the host path must not contain a parent-directory component.
fn check_descendant(output_root: &Path, host_path: &Path) -> Result<(), NandError> {
    if !host_path.starts_with(output_root) {
        return Err(NandError::UnsafePath {
            path: host_path.to_path_buf(),
        });
    }
    Ok(())
}

impl<'o, RS: Read + Seek> FstVisitor<RS, NandError> for ExtractorVisitor<'o> {
    fn on_directory(
        &mut self,
        _image: &mut RS,
        entry: &FstEntry,
        index: u64,
    ) -> Result<Descend, NandError> {
        // The root entry is identified by its fixed index (0), not by an
        // empty path stack: the stack is also empty while visiting every
        // first-level child, since nothing is pushed until after this
        // whitelist check.
        if index == 0 {
            debug!("extracting root directory to {:?}", self.output_root);
            return Ok(Descend::Into);
        }

        reject_separators(&entry.filename)?;

        if self.path_stack.is_empty() && !WHITELIST_TOP_LEVEL.contains(&entry.filename.as_str()) {
            return Ok(Descend::Skip);
        }

        self.path_stack.push(entry.filename.clone());
        let target = self.host_path();
        check_descendant(self.output_root, &target)?;
        fs::create_dir_all(&target)?;
        Ok(Descend::Into)
    }

    fn on_directory_exit(&mut self, _image: &mut RS, _entry: &FstEntry, index: u64) {
        if index != 0 {
            self.path_stack.pop();
        }
    }

    fn on_file(&mut self, image: &mut RS, entry: &FstEntry, _index: u64) -> Result<(), NandError> {
        if !matches!(entry.mode, FstMode::File) {
            return Err(NandError::UnsupportedFstMode { mode: 1 });
        }
        let sanitized = entry.filename.replace(':', "-");
        reject_separators(&sanitized)?;

        let relative = self.relative_path(&sanitized);
        let whitelisted = relative.starts_with("title/")
            || relative.starts_with("ticket/")
            || relative == "sys/uid.sys";
        if !whitelisted {
            return Ok(());
        }

        let mut target = self.output_root.to_path_buf();
        for component in relative.split('/') {
            target.push(component);
        }
        check_descendant(self.output_root, &target)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        if entry.size == 0 {
            File::create(&target)?;
            debug!("wrote empty file {:?}", target);
            return Ok(());
        }

        let span_clusters = (entry.size as u64 / CLUSTER_LEN as u64) + 1;
        let mut data = vec![0u8; (span_clusters as usize) * CLUSTER_LEN];
        let mut cluster = entry.sub.unwrap_or(0);
        let mut slot = 0usize;
        while cluster < FAT_CHAIN_END {
            // a corrupt or cyclic chain must never run past the space
            // allocated for entry.size, the way fst::walk_rec bounds
            // against cyclic sib/sub links with a visited set.
            if slot >= span_clusters as usize {
                return Err(NandError::TruncatedImage {
                    context: "FAT chain longer than file's recorded size",
                });
            }
            let decrypted = read_cluster(image, self.class, &self.key, cluster as u64)?;
            let start = slot * CLUSTER_LEN;
            data[start..start + CLUSTER_LEN].copy_from_slice(&decrypted);
            cluster = next_fat_entry(image, self.class, self.fat_base, cluster as u64)?;
            slot += 1;
        }
        data.truncate(entry.size as usize);

        let mut f = File::create(&target)?;
        f.write_all(&data)?;
        debug!("wrote {:?} ({} bytes)", target, entry.size);
        Ok(())
    }
}

/// Extract the whitelisted subtree rooted at the live FST into
/// `output_root`. `fst_root_index` is always 0 in practice; exposed for
/// testability.
pub fn extract_tree<RS: Read + Seek>(
    image: &mut RS,
    class: ImageClass,
    key: [u8; 16],
    fat_base: u64,
    fst_base: u64,
    fst_root_index: u64,
    output_root: &Path,
) -> Result<(), NandError> {
    let mut visitor = ExtractorVisitor {
        class,
        key,
        fat_base,
        output_root,
        path_stack: Vec::new(),
    };
    crate::fst::walk_tree(image, class, fst_base, fst_root_index, true, &mut visitor)?;
    info!("extraction complete into {:?}", output_root);
    Ok(())
}
