//! TMD / ticket probe: structural probes over an already-extracted
//! tree. Failures here are never fatal — they fold into the `"No"` status
//! string, so a partial image still
//! yields a useful report.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::byteorder::be16;

const TMD_VERSION_OFFSET: u64 = 0x01DC;
const SAVE_DATA_MAJOR: &str = "00010000";

fn tmd_path(root: &Path, major: &str, minor: &str) -> std::path::PathBuf {
    root.join("title").join(major).join(minor).join("content").join("title.tmd")
}

fn ticket_path(root: &Path, major: &str, minor: &str) -> std::path::PathBuf {
    root.join("ticket").join(major).join(format!("{minor}.tik"))
}

/// Title status: `"Yes"`/`"No"` for save data, `"v{N}"` (or `"No"`) for
/// everything else.
pub fn title_status(root: &Path, major: &str, minor: &str) -> String {
    let path = tmd_path(root, major, minor);
    if major == SAVE_DATA_MAJOR {
        return if path.is_file() { "Yes".to_string() } else { "No".to_string() };
    }
    match read_tmd_version(&path) {
        Some(v) => format!("v{v}"),
        None => "No".to_string(),
    }
}

fn read_tmd_version(path: &Path) -> Option<u16> {
    let mut f = File::open(path).ok()?;
    f.seek(SeekFrom::Start(TMD_VERSION_OFFSET)).ok()?;
    let mut buf = [0u8; 2];
    f.read_exact(&mut buf).ok()?;
    Some(be16(&buf))
}

/// Ticket status: `"N/A"` for save data (which never has a ticket),
/// `"Yes"`/`"No"` otherwise.
pub fn ticket_status(root: &Path, major: &str, minor: &str) -> String {
    if major == SAVE_DATA_MAJOR {
        return "N/A".to_string();
    }
    if ticket_path(root, major, minor).is_file() {
        "Yes".to_string()
    } else {
        "No".to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn title_status_reads_version_at_fixed_offset() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("title").join("00010001").join("00000001").join("content");
        fs::create_dir_all(&dir).unwrap();
        let mut buf = vec![0u8; 0x01DE];
        buf[0x01DC..0x01DE].copy_from_slice(&42u16.to_be_bytes());
        fs::write(dir.join("title.tmd"), &buf).unwrap();

        let status = title_status(tmp.path(), "00010001", "00000001");
        assert_eq!(status, "v42");
    }

    #[test]
    fn title_status_short_tmd_is_no() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("title").join("00010001").join("00000002").join("content");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("title.tmd"), vec![0u8; 0x01DD]).unwrap();
        assert_eq!(title_status(tmp.path(), "00010001", "00000002"), "No");
    }

    #[test]
    fn title_status_missing_tmd_is_no() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(title_status(tmp.path(), "00010001", "deadbeef"), "No");
    }

    #[test]
    fn save_data_title_status_is_presence_only() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("title").join("00010000").join("00000001").join("content");
        fs::create_dir_all(&dir).unwrap();
        let mut f = fs::File::create(dir.join("title.tmd")).unwrap();
        f.write_all(b"x").unwrap();
        assert_eq!(title_status(tmp.path(), "00010000", "00000001"), "Yes");
        assert_eq!(title_status(tmp.path(), "00010000", "nonexistent"), "No");
    }

    #[test]
    fn ticket_status_save_data_is_na() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(ticket_status(tmp.path(), "00010000", "00000001"), "N/A");
    }

    #[test]
    fn ticket_status_presence() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("ticket").join("00010001");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("00000001.tik"), b"x").unwrap();
        assert_eq!(ticket_status(tmp.path(), "00010001", "00000001"), "Yes");
        assert_eq!(ticket_status(tmp.path(), "00010001", "00000002"), "No");
    }
}
