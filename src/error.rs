use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors from the NAND geometry/SFFS extraction pipeline.
#[derive(Error, Debug)]
pub enum NandError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown NAND geometry: image size {size} matches no known layout")]
    UnknownGeometry { size: u64 },
    #[error("AES key could not be loaded (source too short or unreadable)")]
    BadKey,
    #[error("no superblock found: generation counter never decreased across the ring")]
    NoSuperblock,
    #[error("truncated image while reading {context}")]
    TruncatedImage { context: &'static str },
    #[error("unsafe path: {path:?} would escape the output root")]
    UnsafePath { path: PathBuf },
    #[error("unsupported FST mode {mode}, expected 0 (directory) or 1 (file)")]
    UnsupportedFstMode { mode: u8 },
}

/// Errors from settings-blob serial recovery. Kept separate from
/// [`NandError`] because serial recovery is reported independently of
/// extraction.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file corrupted: only {found} non-empty line(s) after descrambling, need at least 6")]
    NotEnoughLines { found: usize },
    #[error("settings line {line} has no '=' separator")]
    MissingEquals { line: usize },
}
