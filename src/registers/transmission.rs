//! Transmission control register
//!
//! REG3 selects transparent or fixed-address transmission and toggles the
//! optional link features (RSSI byte, repeater, listen-before-talk and the
//! wake-on-radio role), together with the WOR period.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

const FIXED_TRANSMISSION: u8 = 1 << 6;

bitflags! {
    /// Link feature switches of REG3
    ///
    /// The fixed-transmission bit (6) and the WOR cycle (2:0) live in
    /// [`TransmissionOptions`] and are never part of this set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransmissionFlags: u8 {
        /// Append an RSSI byte to every received message
        const RSSI_BYTE = 1 << 7;
        /// Relay packets for other networks
        const REPEATER = 1 << 5;
        /// Listen before talk
        const LBT = 1 << 4;
        /// WOR transmitter role; when clear the module is a WOR receiver
        const WOR_TRANSMITTER = 1 << 3;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransmissionFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "TransmissionFlags({=u8:#04x})", self.bits())
    }
}

/// Addressing scheme of outgoing data (REG3 bit 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmissionMode {
    /// Data is sent as is to every module on the same address and channel
    #[default]
    Transparent,
    /// The first three bytes of each write name the target address and channel
    Fixed,
}

/// Wake-on-radio period (REG3 bits 2:0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WorCycle {
    /// 500 ms
    Ms500 = 0b000,
    /// 1000 ms
    Ms1000 = 0b001,
    /// 1500 ms
    Ms1500 = 0b010,
    /// 2000 ms, the default
    #[default]
    Ms2000 = 0b011,
    /// 2500 ms
    Ms2500 = 0b100,
    /// 3000 ms
    Ms3000 = 0b101,
    /// 3500 ms
    Ms3500 = 0b110,
    /// 4000 ms
    Ms4000 = 0b111,
}

impl WorCycle {
    /// Period in milliseconds.
    pub const fn millis(self) -> u32 {
        (self as u32 + 1) * 500
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::Ms500,
            0b001 => Self::Ms1000,
            0b010 => Self::Ms1500,
            0b011 => Self::Ms2000,
            0b100 => Self::Ms2500,
            0b101 => Self::Ms3000,
            0b110 => Self::Ms3500,
            _ => Self::Ms4000,
        }
    }
}

/// REG3 (address: 0x06)
///
/// # Important Notes
/// - With `RSSI_BYTE` set every received message carries one extra byte
/// - A WOR transmitter wakes its receivers with a preamble one WOR period
///   long, so both ends must share the same `wor_cycle`
#[register(0x06u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmissionOptions {
    /// Feature switches
    pub flags: TransmissionFlags,
    /// Transparent or fixed-address transmission
    pub mode: TransmissionMode,
    /// Wake-on-radio period
    pub wor_cycle: WorCycle,
}

impl Default for TransmissionOptions {
    fn default() -> Self {
        Self {
            flags: TransmissionFlags::empty(),
            mode: TransmissionMode::Transparent,
            wor_cycle: WorCycle::Ms2000,
        }
    }
}

impl TransmissionOptions {
    /// Returns true if received messages end with an RSSI byte.
    pub fn rssi_enabled(&self) -> bool {
        self.flags.contains(TransmissionFlags::RSSI_BYTE)
    }

    pub(crate) fn from_byte(value: u8) -> Self {
        Self {
            flags: TransmissionFlags::from_bits_truncate(value),
            mode: if value & FIXED_TRANSMISSION != 0 {
                TransmissionMode::Fixed
            } else {
                TransmissionMode::Transparent
            },
            wor_cycle: WorCycle::from_bits(value),
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        let fixed = match self.mode {
            TransmissionMode::Transparent => 0,
            TransmissionMode::Fixed => FIXED_TRANSMISSION,
        };
        self.flags.bits() | fixed | (self.wor_cycle as u8)
    }
}

impl FromByteArray for TransmissionOptions {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self::from_byte(bytes[0]))
    }
}

impl ToByteArray for TransmissionOptions {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.to_byte()])
    }
}
