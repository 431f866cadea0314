//! Cluster reader: reads one 16 KiB logical cluster, stripping the
//! out-of-band bytes interleaved after each physical page, then decrypts it
//! with AES-CBC under a zero IV that is reset on every call.

use std::io::{Read, Seek, SeekFrom};

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use aes::Aes128;

use crate::error::NandError;
use crate::geometry::ImageClass;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Decrypted cluster payload: always exactly 0x4000 bytes.
pub const CLUSTER_LEN: usize = 0x4000;
const PAGES_PER_CLUSTER: usize = 8;
const PAGE_DATA_LEN: usize = 0x800;

/// Read and decrypt logical cluster `index`. Reads 8 physical pages of
/// `class.page_len()` bytes each, keeps only the first 0x800 bytes of each
/// (the trailing OOB/ECC bytes are skipped, never verified), concatenates
/// to a 16 KiB buffer, then decrypts in place with a freshly-zeroed IV —
/// each cluster is an independent CBC stream, so clusters may be read in
/// any order.
pub fn read_cluster<RS: Read + Seek>(
    image: &mut RS,
    class: ImageClass,
    key: &[u8; 16],
    index: u64,
) -> Result<[u8; CLUSTER_LEN], NandError> {
    let phys_cluster_len = class.phys_cluster_len();
    let page_len = class.page_len() as usize;
    image.seek(SeekFrom::Start(index * phys_cluster_len))?;

    let mut buffer = [0u8; CLUSTER_LEN];
    let mut page = vec![0u8; page_len];
    for i in 0..PAGES_PER_CLUSTER {
        image
            .read_exact(&mut page)
            .map_err(|_| NandError::TruncatedImage {
                context: "cluster page",
            })?;
        buffer[i * PAGE_DATA_LEN..(i + 1) * PAGE_DATA_LEN].copy_from_slice(&page[..PAGE_DATA_LEN]);
    }

    let iv = [0u8; 16];
    let decryptor = Aes128CbcDec::new(key.into(), &iv.into());
    decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| NandError::TruncatedImage {
            context: "cluster decrypt",
        })?;
    // the source truncates to [:0x4000] after reading exactly 0x4000 bytes;
    // preserved here as a defensive no-op even though the buffer is already exactly CLUSTER_LEN.
    Ok(buffer)
}

#[cfg(test)]
mod test {
    use super::*;
    use aes::cipher::BlockEncryptMut;
    use std::io::Cursor;

    type Aes128CbcEnc = cbc::Encryptor<Aes128>;

    fn encrypt_cluster(key: &[u8; 16], plaintext: &[u8; CLUSTER_LEN]) -> [u8; CLUSTER_LEN] {
        let mut buf = *plaintext;
        let iv = [0u8; 16];
        Aes128CbcEnc::new(key.into(), &iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, CLUSTER_LEN)
            .unwrap();
        buf
    }

    #[test]
    fn no_ecc_cluster_roundtrips() {
        let key = [0x42u8; 16];
        let mut plaintext = [0u8; CLUSTER_LEN];
        for (i, b) in plaintext.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let ciphertext = encrypt_cluster(&key, &plaintext);
        let mut image = Cursor::new(ciphertext.to_vec());
        let decrypted = read_cluster(&mut image, ImageClass::NoEcc, &key, 0).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ecc_cluster_skips_oob_bytes() {
        let key = [0x11u8; 16];
        let mut plaintext = [0u8; CLUSTER_LEN];
        plaintext[..4].copy_from_slice(&[1, 2, 3, 4]);
        let ciphertext = encrypt_cluster(&key, &plaintext);

        // build physical image: after each 0x800 data chunk, insert 0x40 OOB bytes
        let mut physical = Vec::new();
        for page in ciphertext.chunks(0x800) {
            physical.extend_from_slice(page);
            physical.extend(std::iter::repeat(0xFFu8).take(0x40));
        }
        assert_eq!(physical.len(), 0x4200);

        let mut image = Cursor::new(physical);
        let decrypted = read_cluster(&mut image, ImageClass::Ecc, &key, 0).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn short_read_is_truncated_image() {
        let key = [0u8; 16];
        let mut image = Cursor::new(vec![0u8; 10]);
        let err = read_cluster(&mut image, ImageClass::NoEcc, &key, 0).unwrap_err();
        assert!(matches!(err, NandError::TruncatedImage { .. }));
    }
}
