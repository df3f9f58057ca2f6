//! DS-015: BLAKE3 fingerprints for rendered artifacts, declarations, and keys.
//!
//! Every hash is written as `blake3:<64 hex>`.

use std::io::Read;
use std::path::Path;

const PREFIX: &str = "blake3:";
const STREAM_BUF_SIZE: usize = 65536;

/// Hash a string.
pub fn hash_string(s: &str) -> String {
    format!("{}{}", PREFIX, blake3::hash(s.as_bytes()).to_hex())
}

/// Hash a file's contents, streamed.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; STREAM_BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| format!("read error {}: {}", path.display(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{}{}", PREFIX, hasher.finalize().to_hex()))
}

/// Order-sensitive hash over several components, NUL-separated.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("{}{}", PREFIX, hasher.finalize().to_hex())
}

/// First 12 hex digits, for terminal output.
pub fn short(hash: &str) -> &str {
    let hex = hash.strip_prefix(PREFIX).unwrap_or(hash);
    hex.get(..12).unwrap_or(hex)
}
