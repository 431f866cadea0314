//! Settings descrambler and serial recovery.
//!
//! The settings file's encrypted header is not a standard cipher — it's a
//! proprietary 32-bit rotating-XOR keystream. It is implemented exactly as
//! specified rather than substituted with a library stream cipher.

use std::fs;
use std::path::Path;

use crate::error::SettingsError;

const INITIAL_KEY: u32 = 0x73B5DBFA;
const DECRYPT_BOUND: usize = 256;

#[inline]
fn rotate_left_32(value: u32) -> u32 {
    ((value << 1) & 0xFFFF_FFFF) | (value >> 31)
}

/// Apply the rotating-XOR keystream. `full_buffer` selects whether the
/// stream runs over the entire buffer (encrypt / the involution direction)
/// or is bounded to the first 256 bytes (decrypt), matching the scope the
/// settings file's header actually scrambles.
pub fn xor_crypt(data: &[u8], full_buffer: bool) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    let bound = if full_buffer {
        data.len()
    } else {
        data.len().min(DECRYPT_BOUND)
    };
    let mut out = data.to_vec();
    for byte in out.iter_mut().take(bound) {
        *byte ^= (key & 0xFF) as u8;
        key = rotate_left_32(key);
    }
    out
}

/// Recover the factory serial from a settings file: descramble (first 256
/// bytes), interpret as ASCII, split on CR/LF runs, and concatenate the
/// right-hand sides of lines 4 and 5 (0-indexed).
pub fn read_serial(settings_path: &Path) -> Result<String, SettingsError> {
    let raw = fs::read(settings_path)?;
    let decrypted = xor_crypt(&raw, false);
    serial_from_decrypted(&decrypted)
}

fn serial_from_decrypted(decrypted: &[u8]) -> Result<String, SettingsError> {
    let ascii: String = decrypted.iter().filter(|&&b| b.is_ascii()).map(|&b| b as char).collect();
    let lines: Vec<&str> = ascii
        .split(|c| c == '\r' || c == '\n')
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 6 {
        return Err(SettingsError::NotEnoughLines { found: lines.len() });
    }
    let part1 = lines[4]
        .split_once('=')
        .map(|(_, v)| v)
        .ok_or(SettingsError::MissingEquals { line: 4 })?;
    let part2 = lines[5]
        .split_once('=')
        .map(|(_, v)| v)
        .ok_or(SettingsError::MissingEquals { line: 5 })?;
    Ok(format!("{part1}{part2}"))
}
