//! Serial and air data rate register
//!
//! REG0 packs the module's UART settings together with the over-the-air data
//! rate. The UART settings only apply in normal, wake-up and power-save
//! modes; configuration mode always runs at 9600 baud 8N1.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// UART baud rate (REG0 bits 7:5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartBaudRate {
    /// 1200 baud
    Bps1200 = 0b000,
    /// 2400 baud
    Bps2400 = 0b001,
    /// 4800 baud
    Bps4800 = 0b010,
    /// 9600 baud, factory setting
    #[default]
    Bps9600 = 0b011,
    /// 19200 baud
    Bps19200 = 0b100,
    /// 38400 baud
    Bps38400 = 0b101,
    /// 57600 baud
    Bps57600 = 0b110,
    /// 115200 baud
    Bps115200 = 0b111,
}

impl UartBaudRate {
    /// Baud rate in bits per second.
    pub const fn bps(self) -> u32 {
        match self {
            Self::Bps1200 => 1_200,
            Self::Bps2400 => 2_400,
            Self::Bps4800 => 4_800,
            Self::Bps9600 => 9_600,
            Self::Bps19200 => 19_200,
            Self::Bps38400 => 38_400,
            Self::Bps57600 => 57_600,
            Self::Bps115200 => 115_200,
        }
    }

    /// Looks up the setting for a baud rate in bits per second.
    pub const fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            1_200 => Some(Self::Bps1200),
            2_400 => Some(Self::Bps2400),
            4_800 => Some(Self::Bps4800),
            9_600 => Some(Self::Bps9600),
            19_200 => Some(Self::Bps19200),
            38_400 => Some(Self::Bps38400),
            57_600 => Some(Self::Bps57600),
            115_200 => Some(Self::Bps115200),
            _ => None,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::Bps1200,
            0b001 => Self::Bps2400,
            0b010 => Self::Bps4800,
            0b011 => Self::Bps9600,
            0b100 => Self::Bps19200,
            0b101 => Self::Bps38400,
            0b110 => Self::Bps57600,
            _ => Self::Bps115200,
        }
    }
}

/// UART frame format (REG0 bits 4:3)
///
/// The module treats `0b11` like `0b00`; both are kept apart so a value read
/// from the module is written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartParity {
    /// 8 data bits, no parity, 1 stop bit
    #[default]
    N8_1 = 0b00,
    /// 8 data bits, odd parity, 1 stop bit
    O8_1 = 0b01,
    /// 8 data bits, even parity, 1 stop bit
    E8_1 = 0b10,
    /// Second encoding of 8N1
    N8_1Alt = 0b11,
}

impl UartParity {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::N8_1,
            0b01 => Self::O8_1,
            0b10 => Self::E8_1,
            _ => Self::N8_1Alt,
        }
    }
}

/// Over-the-air data rate (REG0 bits 2:0)
///
/// Lower rates reach further. Both ends of a link must use the same rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AirDataRate {
    /// 0.3 kbps
    Kbps0_3 = 0b000,
    /// 1.2 kbps
    Kbps1_2 = 0b001,
    /// 2.4 kbps, factory setting
    #[default]
    Kbps2_4 = 0b010,
    /// 4.8 kbps
    Kbps4_8 = 0b011,
    /// 9.6 kbps
    Kbps9_6 = 0b100,
    /// 19.2 kbps
    Kbps19_2 = 0b101,
    /// 38.4 kbps
    Kbps38_4 = 0b110,
    /// 62.5 kbps
    Kbps62_5 = 0b111,
}

impl AirDataRate {
    /// Air data rate in bits per second.
    pub const fn bps(self) -> u32 {
        match self {
            Self::Kbps0_3 => 300,
            Self::Kbps1_2 => 1_200,
            Self::Kbps2_4 => 2_400,
            Self::Kbps4_8 => 4_800,
            Self::Kbps9_6 => 9_600,
            Self::Kbps19_2 => 19_200,
            Self::Kbps38_4 => 38_400,
            Self::Kbps62_5 => 62_500,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::Kbps0_3,
            0b001 => Self::Kbps1_2,
            0b010 => Self::Kbps2_4,
            0b011 => Self::Kbps4_8,
            0b100 => Self::Kbps9_6,
            0b101 => Self::Kbps19_2,
            0b110 => Self::Kbps38_4,
            _ => Self::Kbps62_5,
        }
    }
}

/// REG0 (address: 0x03)
///
/// # Important Notes
/// - The host UART must be switched to the new baud rate and parity once the
///   module leaves configuration mode
/// - Factory value is 0x62 (9600 baud, 8N1, 2.4 kbps)
#[register(0x03u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// UART baud rate in normal operation
    pub baud_rate: UartBaudRate,
    /// UART frame format in normal operation
    pub parity: UartParity,
    /// Radio data rate
    pub air_data_rate: AirDataRate,
}

impl SerialConfig {
    pub(crate) fn from_byte(value: u8) -> Self {
        Self {
            baud_rate: UartBaudRate::from_bits(value >> 5),
            parity: UartParity::from_bits(value >> 3),
            air_data_rate: AirDataRate::from_bits(value),
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        ((self.baud_rate as u8) << 5) | ((self.parity as u8) << 3) | (self.air_data_rate as u8)
    }
}

impl FromByteArray for SerialConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self::from_byte(bytes[0]))
    }
}

impl ToByteArray for SerialConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.to_byte()])
    }
}
