//! 32-byte account addresses.

use ledger_derive::BinaryCodec;
use std::fmt;

/// Address length in bytes.
pub const ADDRESS_SIZE: usize = 32;

/// Fixed-size 32-byte address identifying accounts on the ledger.
///
/// Addresses are opaque to this subsystem; equality is by value. The type is
/// `Copy` for efficient passing in lookup and whitelist operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinaryCodec)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    /// Creates the all-zero address, used as a sentinel for "no address".
    pub const fn zero() -> Address {
        Address([0u8; ADDRESS_SIZE])
    }

    /// Returns the address as a byte slice.
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_all_zero_bytes() {
        assert!(Address::zero().0.iter().all(|&b| b == 0));
    }

    #[test]
    fn display_is_lowercase_hex() {
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[0] = 0xAB;
        bytes[31] = 0x01;
        let addr = Address(bytes);
        let s = addr.to_string();
        assert_eq!(s.len(), ADDRESS_SIZE * 2);
        assert!(s.starts_with("ab"));
        assert!(s.ends_with("01"));
    }

    #[test]
    fn equality_is_by_value() {
        let a = Address([7u8; ADDRESS_SIZE]);
        let b = Address([7u8; ADDRESS_SIZE]);
        let c = Address([8u8; ADDRESS_SIZE]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
