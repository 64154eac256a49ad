//! Symbol-table caching with fingerprint support.
//!
//! Loading the same fragments on every invocation is wasted work for a tool
//! run from scripts. The loaded table can be written to a cache file and read
//! back on the next run:
//!
//! 1. **Unverified**: load the cache as-is (e.g. a table shipped to a host
//!    without fragment files).
//!
//! 2. **Verified**: compute a fingerprint from the fragment sources, reuse the
//!    cache only if it matches, rebuild and rewrite it otherwise.
//!
//! # File Format
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Header (9 or 41 bytes)                 │
//! │   magic: [u8; 4]        "MGST"         │
//! │   version: u32 LE       Schema version │
//! │   has_fingerprint: u8   0 or 1         │
//! │   fingerprint: [u8; 32] (if present)   │
//! ├────────────────────────────────────────┤
//! │ Payload (postcard-encoded TableParts)  │
//! └────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let fp = compute_fingerprint(&sources);
//! let table = match load_cache_verified(path, &fp) {
//!     Ok(table) => table,
//!     Err(_) => {
//!         let table = build_table(&sources);
//!         save_cache(&table, path, Some(fp))?;
//!         table
//!     }
//! };
//! ```

use mibget_core::model::{CorruptParts, SymbolTable, TableParts};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Current schema version. Bump on any breaking change to serialized format.
pub const SCHEMA_VERSION: u32 = 1;

/// Magic bytes identifying a mibget cache file.
const MAGIC: [u8; 4] = *b"MGST";

/// magic(4) + version(4) + has_fingerprint(1)
const HEADER_LEN: usize = 9;
const FINGERPRINT_LEN: usize = 32;

/// Cache error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// File does not start with expected magic bytes.
    #[error("invalid magic bytes (expected MGST)")]
    InvalidMagic,
    /// Schema version mismatch.
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version.
        expected: u32,
        /// Found version.
        found: u32,
    },
    /// Fingerprint does not match expected value.
    #[error("fingerprint mismatch")]
    FingerprintMismatch,
    /// Header is truncated.
    #[error("truncated header")]
    TruncatedHeader,
    /// Postcard serialization failed.
    #[error("postcard serialization failed: {0}")]
    SerializationFailed(#[source] postcard::Error),
    /// Postcard deserialization failed.
    #[error("postcard deserialization failed: {0}")]
    DeserializationFailed(#[source] postcard::Error),
    /// The payload decoded but does not describe a consistent table.
    #[error("corrupt cache payload: {0}")]
    Corrupt(#[from] CorruptParts),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Compute a fingerprint from fragment sources in load order.
///
/// The fingerprint includes the schema version so a format change
/// invalidates old caches. Order is significant: swapping two fragments can
/// change which definition a name resolves to.
///
/// # Arguments
///
/// * `sources` - Pairs of `(fragment name, content)` in load order
///
/// # Returns
///
/// A 32-byte SHA-256 fingerprint.
pub fn compute_fingerprint<S: AsRef<str>>(sources: &[(S, &[u8])]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SCHEMA_VERSION.to_le_bytes());
    for (name, content) in sources {
        let name = name.as_ref().as_bytes();
        // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
        hasher.update((name.len() as u64).to_le_bytes());
        hasher.update(name);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content);
    }

    hasher.finalize().into()
}

/// Serialize a table to cache bytes.
///
/// # Arguments
///
/// * `table` - The loaded table to serialize
/// * `fingerprint` - Optional fingerprint to embed (for later verification)
///
/// # Errors
///
/// Returns [`CacheError::SerializationFailed`] if postcard rejects the payload.
pub fn serialize_table(
    table: &SymbolTable,
    fingerprint: Option<[u8; 32]>,
) -> Result<Vec<u8>, CacheError> {
    let parts = table.clone().into_parts();
    let payload = postcard::to_allocvec(&parts).map_err(CacheError::SerializationFailed)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + FINGERPRINT_LEN + payload.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());

    if let Some(fp) = fingerprint {
        bytes.push(1);
        bytes.extend_from_slice(&fp);
    } else {
        bytes.push(0);
    }

    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Parse the header, returning the stored fingerprint and payload offset.
fn read_header(bytes: &[u8]) -> Result<(Option<[u8; 32]>, usize), CacheError> {
    if bytes.len() < HEADER_LEN {
        return Err(CacheError::TruncatedHeader);
    }

    if bytes[0..4] != MAGIC {
        return Err(CacheError::InvalidMagic);
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != SCHEMA_VERSION {
        return Err(CacheError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found: version,
        });
    }

    if bytes[8] == 0 {
        return Ok((None, HEADER_LEN));
    }

    let end = HEADER_LEN + FINGERPRINT_LEN;
    let stored = bytes
        .get(HEADER_LEN..end)
        .ok_or(CacheError::TruncatedHeader)?;
    let mut fp = [0u8; 32];
    fp.copy_from_slice(stored);
    Ok((Some(fp), end))
}

/// Deserialize a table from cache bytes.
///
/// # Arguments
///
/// * `bytes` - Cache file contents
/// * `expected_fingerprint` - If `Some`, verify the fingerprint matches; if `None`, skip verification
///
/// # Errors
///
/// Returns an error if:
/// - Magic bytes don't match
/// - Schema version doesn't match
/// - Fingerprint doesn't match, or is missing (when verification requested)
/// - Postcard deserialization fails
/// - The decoded parts reference missing entries
pub fn deserialize_table(
    bytes: &[u8],
    expected_fingerprint: Option<&[u8; 32]>,
) -> Result<SymbolTable, CacheError> {
    let (stored, payload_start) = read_header(bytes)?;

    if let Some(expected) = expected_fingerprint {
        if stored.as_ref() != Some(expected) {
            return Err(CacheError::FingerprintMismatch);
        }
    }

    let parts: TableParts = postcard::from_bytes(&bytes[payload_start..])
        .map_err(CacheError::DeserializationFailed)?;

    Ok(SymbolTable::from_parts(parts)?)
}

/// Get the fingerprint from cache bytes without deserializing the payload.
///
/// Returns `None` if the cache has no embedded fingerprint.
///
/// # Errors
///
/// Returns an error if the header is invalid.
pub fn get_fingerprint(bytes: &[u8]) -> Result<Option<[u8; 32]>, CacheError> {
    read_header(bytes).map(|(fp, _)| fp)
}

// === File-based convenience API ===

/// Save a table to a cache file.
///
/// # Errors
///
/// Returns an error if the table cannot be serialized or the file cannot be
/// written.
pub fn save_cache<P: AsRef<Path>>(
    table: &SymbolTable,
    path: P,
    fingerprint: Option<[u8; 32]>,
) -> Result<(), CacheError> {
    let bytes = serialize_table(table, fingerprint)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Load a table from a cache file without fingerprint verification.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the cache is invalid.
pub fn load_cache<P: AsRef<Path>>(path: P) -> Result<SymbolTable, CacheError> {
    let bytes = fs::read(path)?;
    deserialize_table(&bytes, None)
}

/// Load a table from a cache file with fingerprint verification.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the cache is invalid,
/// or the fingerprint doesn't match.
pub fn load_cache_verified<P: AsRef<Path>>(
    path: P,
    expected_fingerprint: &[u8; 32],
) -> Result<SymbolTable, CacheError> {
    let bytes = fs::read(path)?;
    deserialize_table(&bytes, Some(expected_fingerprint))
}

/// Check if a cache file exists and has a matching fingerprint.
///
/// Returns `false` if the cache doesn't exist, is invalid, or has
/// a different fingerprint.
pub fn is_cache_valid<P: AsRef<Path>>(path: P, expected_fingerprint: &[u8; 32]) -> bool {
    let Ok(bytes) = fs::read(path) else {
        return false;
    };

    match get_fingerprint(&bytes) {
        Ok(Some(fp)) => fp == *expected_fingerprint,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mibget_core::model::{FragmentDef, Oid, SymbolKind};
    use tempfile::NamedTempFile;

    fn table() -> SymbolTable {
        let oid = |s: &str| Oid::parse(s).unwrap();
        let mut table = SymbolTable::new();
        table
            .load(
                &FragmentDef::new("A-MIB")
                    .with("thing", oid("1.3.6.1.4.1.1"), SymbolKind::Node)
                    .with("thingCount", oid("1.3.6.1.4.1.1.1"), SymbolKind::Scalar),
            )
            .unwrap();
        table
            .load(&FragmentDef::new("B-MIB").with("thing", oid("1.3.6.1.4.1.2"), SymbolKind::Node))
            .unwrap();
        table
    }

    #[test]
    fn test_compute_fingerprint_deterministic() {
        let sources: &[(&str, &[u8])] = &[("A-MIB", b"content a"), ("B-MIB", b"content b")];

        assert_eq!(compute_fingerprint(sources), compute_fingerprint(sources));
    }

    #[test]
    fn test_compute_fingerprint_order_sensitive() {
        let ab: &[(&str, &[u8])] = &[("A-MIB", b"content a"), ("B-MIB", b"content b")];
        let ba: &[(&str, &[u8])] = &[("B-MIB", b"content b"), ("A-MIB", b"content a")];

        assert_ne!(compute_fingerprint(ab), compute_fingerprint(ba));
    }

    #[test]
    fn test_compute_fingerprint_content_sensitive() {
        let a: &[(&str, &[u8])] = &[("A-MIB", b"content a")];
        let b: &[(&str, &[u8])] = &[("A-MIB", b"content b")];
        assert_ne!(compute_fingerprint(a), compute_fingerprint(b));

        let split1: &[(&str, &[u8])] = &[("A", b"Bc")];
        let split2: &[(&str, &[u8])] = &[("AB", b"c")];
        assert_ne!(compute_fingerprint(split1), compute_fingerprint(split2));
    }

    #[test]
    fn test_round_trip_no_fingerprint() {
        let bytes = serialize_table(&SymbolTable::new(), None).unwrap();
        let restored = deserialize_table(&bytes, None).unwrap();
        assert_eq!(restored.node_count(), 0);
        assert_eq!(restored.fragment_count(), 0);
    }

    #[test]
    fn test_round_trip_keeps_first_wins() {
        let fp = [42u8; 32];
        let bytes = serialize_table(&table(), Some(fp)).unwrap();
        let restored = deserialize_table(&bytes, Some(&fp)).unwrap();

        let sym = restored.find_by_name("thing").unwrap();
        assert_eq!(sym.fragment_name(), "A-MIB");
        assert_eq!(sym.oid().to_dotted(), "1.3.6.1.4.1.1");
        let other = restored.find_by_oid(&Oid::parse("1.3.6.1.4.1.2").unwrap()).unwrap();
        assert_eq!(other.fragment_name(), "B-MIB");
    }

    #[test]
    fn test_fingerprint_mismatch() {
        let fp = [42u8; 32];
        let bytes = serialize_table(&table(), Some(fp)).unwrap();
        let result = deserialize_table(&bytes, Some(&[0u8; 32]));
        assert!(matches!(result, Err(CacheError::FingerprintMismatch)));
    }

    #[test]
    fn test_missing_fingerprint_fails_verification() {
        let bytes = serialize_table(&table(), None).unwrap();
        let result = deserialize_table(&bytes, Some(&[42u8; 32]));
        assert!(matches!(result, Err(CacheError::FingerprintMismatch)));
    }

    #[test]
    fn test_wrong_magic_and_version() {
        let mut bytes = serialize_table(&table(), None).unwrap();
        bytes[0] = b'X';
        assert!(matches!(deserialize_table(&bytes, None), Err(CacheError::InvalidMagic)));

        let mut bytes = serialize_table(&table(), None).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            get_fingerprint(&bytes),
            Err(CacheError::VersionMismatch {
                expected: SCHEMA_VERSION,
                found: 99
            })
        ));
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(get_fingerprint(b"MGS"), Err(CacheError::TruncatedHeader)));

        let bytes = serialize_table(&table(), Some([1u8; 32])).unwrap();
        assert!(matches!(
            get_fingerprint(&bytes[..20]),
            Err(CacheError::TruncatedHeader)
        ));
        assert!(matches!(
            deserialize_table(&bytes[..bytes.len() - 3], None),
            Err(CacheError::DeserializationFailed(_) | CacheError::Corrupt(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let fp = [42u8; 32];
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_owned();

        save_cache(&table(), &path, Some(fp)).unwrap();
        let restored = load_cache_verified(&path, &fp).unwrap();
        assert_eq!(restored.symbol_count(), 3);

        let unverified = load_cache(&path).unwrap();
        assert_eq!(unverified.fragment_count(), 2);
    }

    #[test]
    fn test_is_cache_valid() {
        let fp = [42u8; 32];
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_owned();

        save_cache(&table(), &path, Some(fp)).unwrap();

        assert!(is_cache_valid(&path, &fp));
        assert!(!is_cache_valid(&path, &[0u8; 32]));
        assert!(!is_cache_valid("/nonexistent/path.mgst", &fp));
    }
}
