//! Addressing and identification registers
//!
//! This module contains registers for the module's identity on the network:
//! - Module address (ADDH/ADDL)
//! - Network id
//! - Encryption key
//! - Product information
//!
//! Two modules only hear each other when address, network id, channel and air
//! data rate agree (or when the sender uses the broadcast address).

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Length of the product information block
pub const PRODUCT_INFO_LEN: usize = 7;

/// Module address register pair (address: 0x00)
///
/// ADDH at 0x00 holds the high byte, ADDL at 0x01 the low byte.
///
/// # Important Notes
/// - 0xFFFF is the broadcast and monitor address
#[register(0x00u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModuleAddress(pub u16);

impl ModuleAddress {
    /// Address that reaches every module on a channel
    pub const BROADCAST: ModuleAddress = ModuleAddress(0xFFFF);

    /// Returns true for the broadcast and monitor address.
    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

/// Network id register (address: 0x02)
#[register(0x02u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetId(pub u8);

/// Encryption key register pair (address: 0x07)
///
/// Both ends of a link must use the same key.
///
/// # Important Notes
/// - Write only; reads return zeros
#[register(0x07u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, WritableRegister)]
pub struct CryptKey(pub u16);

/// Product information block (address: 0x80)
///
/// Seven opaque bytes identifying the module model and firmware.
///
/// # Important Notes
/// - Read only
#[register(0x80u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProductInfo(pub [u8; PRODUCT_INFO_LEN]);

impl FromByteArray for ModuleAddress {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(u16::from_be_bytes(bytes)))
    }
}

impl ToByteArray for ModuleAddress {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0.to_be_bytes())
    }
}

impl FromByteArray for NetId {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes[0]))
    }
}

impl ToByteArray for NetId {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.0])
    }
}

impl ToByteArray for CryptKey {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0.to_be_bytes())
    }
}

impl FromByteArray for ProductInfo {
    type Error = Infallible;
    type Array = [u8; PRODUCT_INFO_LEN];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_big_endian() {
        assert_eq!(ModuleAddress(0x1234).to_bytes(), Ok([0x12, 0x34]));
        assert_eq!(ModuleAddress::from_bytes([0xAB, 0xCD]), Ok(ModuleAddress(0xABCD)));
        assert!(ModuleAddress(0xFFFF).is_broadcast());
        assert!(!ModuleAddress(0xFFFE).is_broadcast());
    }

    #[test]
    fn crypt_key_is_big_endian() {
        assert_eq!(CryptKey(0x0102).to_bytes(), Ok([0x01, 0x02]));
    }
}
