use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KingError {
    /// The encoded target is negative, zero, overflowed or easier than
    /// the network's proof-of-work limit.
    #[error("bits below minimum work")]
    BitsBelowMinimumWork,
    /// The block hash does not satisfy the work its bits claim.
    #[error("hash doesn't match bits")]
    HashAboveTarget,
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

pub type Result<T> = std::result::Result<T, KingError>;
