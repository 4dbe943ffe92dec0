//! Module commands
//!
//! Fixed three-byte commands that act on the module as a whole rather than on
//! its registers. Both repeat their opcode three times on the wire.

use core::convert::Infallible;

use regiface::{Command, FromByteArray, NoParameters, ToByteArray};

/// Parameters of the repeated-opcode commands: the opcode twice more.
#[derive(Debug, Clone, Copy)]
pub struct RepeatedOpcode(u8);

impl ToByteArray for RepeatedOpcode {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.0, self.0])
    }
}

/// Firmware and model identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModuleVersion {
    /// Model code, encodes the frequency band
    pub model: u8,
    /// Firmware version
    pub version: u8,
    /// Feature byte; on most modules the maximum power in dBm
    pub features: u8,
}

impl ModuleVersion {
    /// Nominal frequency of the model in MHz, if the model code is known.
    pub fn frequency_mhz(&self) -> Option<u16> {
        match self.model {
            0x32 => Some(433),
            0x38 => Some(470),
            0x45 => Some(868),
            0x44 => Some(915),
            0x46 => Some(170),
            _ => None,
        }
    }
}

impl FromByteArray for ModuleVersion {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            model: bytes[0],
            version: bytes[1],
            features: bytes[2],
        })
    }
}

/// ReadVersion command (0xC3)
///
/// Returns the model code, firmware version and feature byte.
///
/// # Important Notes
/// - Configuration mode only
/// - The response repeats the opcode before the three data bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadVersion;

impl Command for ReadVersion {
    type IdType = u8;
    type CommandParameters = RepeatedOpcode;
    type ResponseParameters = ModuleVersion;

    fn id() -> Self::IdType {
        0xC3
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        RepeatedOpcode(Self::id())
    }
}

/// Reset command (0xC4)
///
/// Restarts the module firmware.
///
/// # Important Notes
/// - Configuration mode only
/// - No response bytes; AUX stays low until the restart completes
/// - Volatile (C2) register writes are lost
#[derive(Debug, Clone, Copy, Default)]
pub struct Reset;

impl Command for Reset {
    type IdType = u8;
    type CommandParameters = RepeatedOpcode;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0xC4
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        RepeatedOpcode(Self::id())
    }
}
