//! Address and hash newtypes.

use derive_more::{AsRef, Display, From};
use serde::{Deserialize, Serialize};

/// A 20-byte L1 (settlement-layer) address.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, From, AsRef, Serialize, Deserialize)]
pub struct L1Address([u8; 20]);

impl L1Address {
    /// Construct from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for L1Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A 20-byte L2 (rollup-layer) address.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, From, AsRef, Serialize, Deserialize)]
pub struct L2Address([u8; 20]);

impl L2Address {
    /// Construct from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for L2Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A 32-byte field element identifying a Merkle-committed archive root.
///
/// Equality of this value across the four upstream chain-tip sources (§4.4) is the
/// synchronization predicate the eligibility gate checks before anything else runs.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, From, AsRef)]
pub struct ArchiveRoot([u8; 32]);

impl ArchiveRoot {
    /// Construct from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for ArchiveRoot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A transaction hash, as stored in the peer network's pending pool.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From, AsRef, Display)]
#[display("{_0:?}")]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Construct from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
