use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

/// Chunk size for streaming the full content hash.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Bytes fed to the fast partial hash used as a dedup prefilter.
pub const PARTIAL_HASH_LENGTH: usize = 1024;

/// Streams the whole file through BLAKE3 in fixed-size chunks and
/// returns the hex fingerprint. Identical content yields the identical
/// fingerprint regardless of name, path or mtime; the file is never
/// loaded into memory at once.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// XxHash64 over the first 1 KiB. Cheap non-cryptographic filter that
/// eliminates most non-duplicates before the full fingerprint pass;
/// never used as the dedup verdict on its own.
pub fn partial_hash(path: &Path) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(PARTIAL_HASH_LENGTH);
    file.take(PARTIAL_HASH_LENGTH as u64)
        .read_to_end(&mut buffer)?;

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&buffer);
    Ok(hasher.finish())
}
