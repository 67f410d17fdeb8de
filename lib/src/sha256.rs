use core::fmt;

use crate::U256;
use serde::{Deserialize, Serialize};

/// A 256-bit hash. Stored as the number its byte-reversed hex display
/// encodes, so hashes compare numerically against targets.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(U256);

impl Hash {
    /// Double SHA-256 over raw bytes, the way block identifiers are
    /// computed.
    pub fn digest(data: &[u8]) -> Self {
        let first = hex::decode(sha256::digest(data)).expect("BUG: digest is valid hex");
        let second =
            hex::decode(sha256::digest(first.as_slice())).expect("BUG: digest is valid hex");
        Hash(U256::from_little_endian(&second))
    }

    /// Builds a hash from four little-endian 64-bit words, the same
    /// layout `U256` uses internally.
    pub const fn from_words(words: [u64; 4]) -> Self {
        Hash(U256(words))
    }

    /// For a hash to satisfy proof of work it has to be numerically no
    /// larger than the target.
    pub fn matches_target(&self, target: U256) -> bool {
        self.0 <= target
    }

    pub fn zero() -> Self {
        Hash(U256::zero())
    }

    /// Little-endian bytes, the order hashes are serialized in.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_little_endian()
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.as_bytes();
        bytes.reverse();
        write!(f, "{}", hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_sha256_of_empty_input() {
        let hash = Hash::digest(b"");
        assert_eq!(
            hash.to_string(),
            "56944c5d3f98413ef45cf54545538103cc9f298e0575820ad3591376e2e0f65d"
        );
    }

    #[test]
    fn displays_in_reversed_byte_order() {
        let hash = Hash::from_words([1, 0, 0, 0]);
        assert_eq!(
            hash.to_string(),
            "0000000000000000000000000000000000000000000000000000000000000001"
        );
        assert_eq!(hash.as_bytes()[0], 1);
    }

    #[test]
    fn compares_numerically_against_targets() {
        let hash = Hash::from_words([100, 0, 0, 0]);
        assert!(hash.matches_target(U256::from(100u64)));
        assert!(hash.matches_target(U256::from(101u64)));
        assert!(!hash.matches_target(U256::from(99u64)));
        assert!(Hash::zero().matches_target(U256::zero()));
    }
}
