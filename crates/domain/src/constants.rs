//! Shared constants for source configuration and the markdown writer.

use std::time::Duration;

/// Default SQLite database path, relative to a site's root directory.
pub const DEFAULT_SQLITE_PATH: &str = "./tinkerdown.db";

/// Default per-adapter fetch timeout when a descriptor omits one.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for an `exec` adapter's child process.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on a `rest`/`graphql` response body read into memory.
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Cap on the error body captured for a non-2xx HTTP response.
pub const MAX_HTTP_ERROR_BODY: usize = 1024;

/// Background revalidation timeout for a stale-while-revalidate refresh.
pub const REVALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

/// FNV-1a 32-bit offset basis, used to derive stable content ids for
/// markdown section items that lack an explicit `<!-- id:TOKEN -->`.
pub const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 0x0100_0193;

/// Computes the 32-bit FNV-1a hash of `bytes`, rendered by the caller as
/// 8 lowercase hex characters.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_is_deterministic() {
        assert_eq!(fnv1a_32(b"Buy groceries"), fnv1a_32(b"Buy groceries"));
        assert_ne!(fnv1a_32(b"Buy groceries"), fnv1a_32(b"buy groceries"));
    }
}
