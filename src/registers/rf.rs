//! RF-related registers
//!
//! This module contains the registers that shape what goes on air:
//! - Sub-packet length and transmit power (REG1)
//! - Channel selection (REG2)
//!
//! It also maps channels to carrier frequencies for the two E22 bands.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::error::FormatError;

/// Highest channel number accepted by any E22 module (400 MHz band).
pub const MAX_CHANNEL: u8 = 83;

/// Maximum length of a sub-packet (REG1 bits 7:6)
///
/// Data longer than the sub-packet is split by the module into several
/// packets on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubPacketSize {
    /// 240 bytes, the default
    #[default]
    Bytes240 = 0b00,
    /// 128 bytes
    Bytes128 = 0b01,
    /// 64 bytes
    Bytes64 = 0b10,
    /// 32 bytes
    Bytes32 = 0b11,
}

impl SubPacketSize {
    /// Sub-packet length in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bytes240 => 240,
            Self::Bytes128 => 128,
            Self::Bytes64 => 64,
            Self::Bytes32 => 32,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Bytes240,
            0b01 => Self::Bytes128,
            0b10 => Self::Bytes64,
            _ => Self::Bytes32,
        }
    }
}

/// Transmit power (REG1 bits 1:0)
///
/// Levels are those of the 22 dBm models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitPower {
    /// 22 dBm, the default
    #[default]
    Dbm22 = 0b00,
    /// 17 dBm
    Dbm17 = 0b01,
    /// 13 dBm
    Dbm13 = 0b10,
    /// 10 dBm
    Dbm10 = 0b11,
}

impl TransmitPower {
    /// Selects the power level matching `dbm` exactly.
    ///
    /// # Errors
    /// * [`FormatError::InvalidPower`] - the module has no such level
    pub fn from_dbm(dbm: i8) -> Result<Self, FormatError> {
        match dbm {
            22 => Ok(Self::Dbm22),
            17 => Ok(Self::Dbm17),
            13 => Ok(Self::Dbm13),
            10 => Ok(Self::Dbm10),
            other => Err(FormatError::InvalidPower(other)),
        }
    }

    /// Output power in dBm.
    pub const fn dbm(self) -> i8 {
        match self {
            Self::Dbm22 => 22,
            Self::Dbm17 => 17,
            Self::Dbm13 => 13,
            Self::Dbm10 => 10,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Dbm22,
            0b01 => Self::Dbm17,
            0b10 => Self::Dbm13,
            _ => Self::Dbm10,
        }
    }
}

/// REG1 (address: 0x04)
///
/// # Important Notes
/// - Bits 4:2 are reserved. Their value is kept as read so writing a
///   configuration back does not disturb them
/// - With `ambient_noise` enabled the module answers RSSI queries in normal mode
#[register(0x04u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioOptions {
    /// Sub-packet length
    pub sub_packet: SubPacketSize,
    /// Enable ambient noise RSSI reporting
    pub ambient_noise: bool,
    /// Reserved bits 4:2, right-aligned
    pub reserved: u8,
    /// Transmit power
    pub power: TransmitPower,
}

impl RadioOptions {
    pub(crate) fn from_byte(value: u8) -> Self {
        Self {
            sub_packet: SubPacketSize::from_bits(value >> 6),
            ambient_noise: value & 0x20 != 0,
            reserved: (value >> 2) & 0b111,
            power: TransmitPower::from_bits(value),
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        ((self.sub_packet as u8) << 6)
            | ((self.ambient_noise as u8) << 5)
            | ((self.reserved & 0b111) << 2)
            | (self.power as u8)
    }
}

/// Frequency band of the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Band {
    /// E22-400 series, 410.125 to 493.125 MHz
    Mhz400,
    /// E22-900 series, 850.125 to 930.125 MHz
    Mhz900,
}

impl Band {
    /// Carrier frequency of channel 0 in kHz.
    pub const fn base_khz(self) -> u32 {
        match self {
            Band::Mhz400 => 410_125,
            Band::Mhz900 => 850_125,
        }
    }

    /// Highest channel inside the band.
    pub const fn max_channel(self) -> u8 {
        match self {
            Band::Mhz400 => MAX_CHANNEL,
            Band::Mhz900 => 80,
        }
    }

    /// Carrier frequency of `channel` in kHz. Channels are 1 MHz apart.
    ///
    /// # Errors
    /// * [`FormatError::ChannelOutOfBand`] - the channel lies above the band
    pub fn frequency_khz(self, channel: Channel) -> Result<u32, FormatError> {
        if channel.get() > self.max_channel() {
            return Err(FormatError::ChannelOutOfBand(channel.get()));
        }
        Ok(self.base_khz() + u32::from(channel.get()) * 1_000)
    }
}

/// REG2, channel control (address: 0x05)
///
/// Offset in MHz from the band's base frequency. Construction rejects values
/// above [`MAX_CHANNEL`] instead of clamping them.
#[register(0x05u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    /// Creates a channel.
    ///
    /// # Errors
    /// * [`FormatError::InvalidChannel`] - `channel` exceeds [`MAX_CHANNEL`]
    pub const fn new(channel: u8) -> Result<Self, FormatError> {
        if channel > MAX_CHANNEL {
            Err(FormatError::InvalidChannel(channel))
        } else {
            Ok(Self(channel))
        }
    }

    /// Channel number.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self(0x06)
    }
}

impl TryFrom<u8> for Channel {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl FromByteArray for RadioOptions {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self::from_byte(bytes[0]))
    }
}

impl ToByteArray for RadioOptions {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.to_byte()])
    }
}

impl FromByteArray for Channel {
    type Error = FormatError;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Self::new(bytes[0])
    }
}

impl ToByteArray for Channel {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bits_survive_a_round_trip() {
        for value in 0..=u8::MAX {
            assert_eq!(RadioOptions::from_byte(value).to_byte(), value);
        }
        assert_eq!(RadioOptions::from_byte(0b000_111_00).reserved, 0b111);
    }

    #[test]
    fn power_levels() {
        assert_eq!(TransmitPower::from_dbm(13), Ok(TransmitPower::Dbm13));
        assert_eq!(
            TransmitPower::from_dbm(20),
            Err(FormatError::InvalidPower(20))
        );
        assert_eq!(RadioOptions::from_byte(0x03).power, TransmitPower::Dbm10);
    }

    #[test]
    fn channel_rejects_out_of_range_values() {
        assert_eq!(Channel::new(MAX_CHANNEL).map(Channel::get), Ok(83));
        assert_eq!(Channel::new(84), Err(FormatError::InvalidChannel(84)));
        assert_eq!(
            Channel::from_bytes([0xFF]),
            Err(FormatError::InvalidChannel(0xFF))
        );
    }

    #[test]
    fn channel_frequencies() {
        let ch18 = Channel::new(18).unwrap();
        assert_eq!(Band::Mhz900.frequency_khz(ch18), Ok(868_125));
        assert_eq!(Band::Mhz400.frequency_khz(ch18), Ok(428_125));

        let ch83 = Channel::new(83).unwrap();
        assert_eq!(Band::Mhz400.frequency_khz(ch83), Ok(493_125));
        assert_eq!(
            Band::Mhz900.frequency_khz(ch83),
            Err(FormatError::ChannelOutOfBand(83))
        );
    }
}
