//! The mapping routine: rotated, upstream-supplied URL obfuscation data.

use std::collections::HashMap;

use super::error::DomainError;

/// Minimum hash length the addressing scheme can shard: a 61-char prefix
/// followed by the 3 hex digits the shard derivation consumes.
pub const MIN_HASH_HEX_LEN: usize = 64;

/// Data extracted from one fetch of the upstream mapping script.
///
/// Immutable once constructed. All three members come from the fetched script
/// text; nothing here is compiled in, so a routine rotation changes behavior
/// without a redeploy. Callers hold a shared reference for the duration of one
/// request and never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRoutine {
    path_prefix: String,
    shard_map: HashMap<u32, u32>,
    shard_default: u32,
}

impl MappingRoutine {
    pub fn new(path_prefix: String, shard_map: HashMap<u32, u32>, shard_default: u32) -> Self {
        Self {
            path_prefix,
            shard_map,
            shard_default,
        }
    }

    /// Constant path segment prepended to every sharded asset path.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// The routine's integer-to-integer shard selection. Opaque data from the
    /// script's case table; absent keys fall back to the script's default.
    pub fn lookup(&self, value: u32) -> u32 {
        self.shard_map
            .get(&value)
            .copied()
            .unwrap_or(self.shard_default)
    }

    /// The routine's hash-to-subpath member: the final 3 hex digits of the
    /// hash, reinterpreted as `<final><preceding-two>` hexadecimal, rendered
    /// in decimal.
    pub fn subpath_for(&self, hash: &str) -> Result<String, DomainError> {
        Ok(shard_value(hash)?.to_string())
    }
}

/// The 3-digit shard value of a hash: final char first, then the two chars
/// preceding it, parsed as hexadecimal. The digit swap mirrors the upstream
/// addressing scheme bit-for-bit and must not be "corrected".
pub fn shard_value(hash: &str) -> Result<u32, DomainError> {
    let (two, last) = shard_digits(hash)?;
    let swapped = format!("{last}{two}");
    u32::from_str_radix(&swapped, 16)
        .map_err(|_| DomainError::malformed_hash(hash.len(), MIN_HASH_HEX_LEN))
}

/// Split off the sharding digits: the 2 chars preceding the final char, and
/// the final char itself. Fails on hashes shorter than the scheme's minimum
/// or with a non-hex tail; that is a data-integrity error, never coerced.
pub fn shard_digits(hash: &str) -> Result<(&str, &str), DomainError> {
    if hash.len() < MIN_HASH_HEX_LEN || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DomainError::malformed_hash(hash.len(), MIN_HASH_HEX_LEN));
    }
    let two = &hash[hash.len() - 3..hash.len() - 1];
    let last = &hash[hash.len() - 1..];
    Ok((two, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_ending(tail: &str) -> String {
        format!("{}{tail}", "0".repeat(MIN_HASH_HEX_LEN - tail.len()))
    }

    #[test]
    fn shard_value_swaps_digit_groups() {
        // Tail `ab1`: final `1`, preceding `ab` => 0x1ab = 427.
        assert_eq!(shard_value(&hash_ending("ab1")).expect("valid hash"), 0x1ab);
        // Tail `000` stays zero either way.
        assert_eq!(shard_value(&hash_ending("000")).expect("valid hash"), 0);
    }

    #[test]
    fn short_hash_is_rejected() {
        let err = shard_value("deadbeef").expect_err("short hash");
        assert!(matches!(err, DomainError::MalformedHash { length: 8, .. }));
    }

    #[test]
    fn non_hex_tail_is_rejected() {
        let hash = format!("{}xyz", "0".repeat(61));
        assert!(shard_value(&hash).is_err());
    }

    #[test]
    fn lookup_falls_back_to_default() {
        let routine = MappingRoutine::new(
            "1700000000/".to_string(),
            HashMap::from([(0x1ab, 1), (7, 2)]),
            0,
        );
        assert_eq!(routine.lookup(0x1ab), 1);
        assert_eq!(routine.lookup(7), 2);
        assert_eq!(routine.lookup(8), 0);
    }

    #[test]
    fn subpath_is_decimal_shard_value() {
        let routine = MappingRoutine::new("1700000000/".to_string(), HashMap::new(), 0);
        assert_eq!(
            routine.subpath_for(&hash_ending("ab1")).expect("valid hash"),
            "427"
        );
    }
}
