//! Complete configuration block
//!
//! The seven registers at 0x00..=0x06 describe everything the module needs to
//! talk on a network. [`Configuration`] reads and writes them as one block,
//! which is how the module's own configuration commands are normally used.
//!
//! ```text
//! 0x00 ADDH | 0x01 ADDL | 0x02 NETID | 0x03 REG0 | 0x04 REG1 | 0x05 REG2 | 0x06 REG3
//! ```

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use super::{
    Band, Channel, ModuleAddress, NetId, RadioOptions, SerialConfig, TransmissionMode,
    TransmissionOptions,
};
use crate::error::FormatError;

/// Length of the encoded configuration block
pub const CONFIG_LEN: usize = 7;

/// Configuration block (address: 0x00, 7 bytes)
///
/// Every field, reserved bits included, survives an encode/decode cycle so a
/// configuration read from the module can be modified and written back
/// without disturbing anything else.
#[register(0x00u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    /// Module address
    pub address: ModuleAddress,
    /// Network id
    pub net_id: NetId,
    /// UART settings and air data rate
    pub serial: SerialConfig,
    /// Sub-packet length, ambient noise reporting and transmit power
    pub radio: RadioOptions,
    /// Operating channel
    pub channel: Channel,
    /// Addressing scheme and link features
    pub transmission: TransmissionOptions,
}

impl Configuration {
    /// Packs the configuration into its register layout.
    pub fn encode(&self) -> [u8; CONFIG_LEN] {
        let [addh, addl] = self.address.0.to_be_bytes();
        [
            addh,
            addl,
            self.net_id.0,
            self.serial.to_byte(),
            self.radio.to_byte(),
            self.channel.get(),
            self.transmission.to_byte(),
        ]
    }

    /// Unpacks a configuration block.
    ///
    /// # Errors
    /// * [`FormatError::Length`] - `bytes` is not exactly [`CONFIG_LEN`] long
    /// * [`FormatError::InvalidChannel`] - REG2 holds a channel above the limit
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let block: [u8; CONFIG_LEN] = bytes.try_into().map_err(|_| FormatError::Length {
            expected: CONFIG_LEN,
            actual: bytes.len(),
        })?;

        Ok(Self {
            address: ModuleAddress(u16::from_be_bytes([block[0], block[1]])),
            net_id: NetId(block[2]),
            serial: SerialConfig::from_byte(block[3]),
            radio: RadioOptions::from_byte(block[4]),
            channel: Channel::new(block[5])?,
            transmission: TransmissionOptions::from_byte(block[6]),
        })
    }

    /// Active addressing scheme.
    pub fn transmission_mode(&self) -> TransmissionMode {
        self.transmission.mode
    }

    /// Returns true if received messages end with an RSSI byte.
    pub fn rssi_enabled(&self) -> bool {
        self.transmission.rssi_enabled()
    }

    /// Carrier frequency in kHz for a module of the given band.
    pub fn frequency_khz(&self, band: Band) -> Result<u32, FormatError> {
        band.frequency_khz(self.channel)
    }
}

impl FromByteArray for Configuration {
    type Error = FormatError;
    type Array = [u8; CONFIG_LEN];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Self::decode(&bytes)
    }
}

impl ToByteArray for Configuration {
    type Error = Infallible;
    type Array = [u8; CONFIG_LEN];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.encode())
    }
}
