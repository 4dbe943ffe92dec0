#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//! EBYTE E22 LoRa Module Driver
//!
//! This crate provides a type-safe interface for the EBYTE E22 series of UART LoRa
//! modules (E22-400T22S, E22-900T22S and relatives). The modules wrap an SX1262/SX1268
//! transceiver behind a serial port, two mode-select inputs (M0/M1) and a ready
//! output (AUX).
//!
//! # Features
//! - Frequency bands: 410.125-493.125 MHz and 850.125-930.125 MHz in 1 MHz channels
//! - Air data rates from 0.3 to 62.5 kbps
//! - Output power: 10 to 22 dBm
//! - Transparent and fixed-address transmission, including broadcast and monitoring
//! - Wake-on-radio for battery powered receivers
//! - Optional RSSI byte on every received message
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Main device interface for hardware interaction
//!   - Provides the high-level API for configuration and messaging
//!   - Runs the configuration-mode command exchanges
//!
//! - [`registers`]: Register definitions for the configuration block
//!   - Addressing (address, network id, encryption key)
//!   - Serial settings and air data rate
//!   - Power, sub-packet size and channel
//!   - Transmission mode and link features
//!
//! - [`commands`]: Command frames, including over-the-air relaying, and module
//!   commands (version, reset)
//!
//! - [`mode`]: Operating mode state machine over M0/M1 and AUX
//!
//! - [`framer`]: Message layout for transparent and fixed transmission
//!
//! # Usage
//! The driver uses the `regiface` crate to provide a type-safe interface for register
//! access and command execution. The main entry point is the [`Device`] struct which
//! wraps the serial port and control lines and provides methods for interacting with
//! the module. Both blocking (`embedded-hal`/`embedded-io`) and async
//! (`embedded-hal-async`/`embedded-io-async`) peripherals are supported; async
//! methods carry an `_async` suffix.
//!
//! Configuration follows a specific sequence:
//!
//! 1. Create a new [`Device`] with the serial port, M0, M1, AUX and a delay
//! 2. Call [`Device::init`] to settle the module in normal mode and load its configuration
//! 3. Adjust the returned [`Configuration`] and write it with [`Device::write_configuration`]
//! 4. Switch the host serial port to the new baud rate and parity, if changed
//! 5. Exchange messages with [`Device::send`] and [`Device::receive`]
//!
//! # Important Notes
//! - Configuration mode always runs at 9600 baud 8N1, whatever REG0 says
//! - Fixed-mode sends need a [`Destination`]; transparent-mode sends must not have one
//! - Received messages carry no address header, only the payload and the optional RSSI byte
//! - Every bounded wait is set by [`Timeouts`]
//! - Messages are sent from normal mode; wake-up sends need the WOR transmitter role
//! - Registers of a remote module can be read and written over the air
//!
//! # Example
//! ```no_run
//! use ebyte_e22::{Channel, Configuration, Device, Error, Persistence, TransmitPower};
//! # fn demo<UART, M0, M1, AUX, D>(uart: UART, m0: M0, m1: M1, aux: AUX, delay: D) -> Result<(), Error>
//! # where
//! #     UART: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
//! #     M0: embedded_hal::digital::OutputPin,
//! #     M1: embedded_hal::digital::OutputPin,
//! #     AUX: embedded_hal::digital::InputPin,
//! #     D: embedded_hal::delay::DelayNs,
//! # {
//! let mut device = Device::new(uart, m0, m1, aux, delay);
//!
//! let mut config: Configuration = device.init()?;
//! config.channel = Channel::new(18)?;
//! config.radio.power = TransmitPower::from_dbm(17)?;
//! device.write_configuration(config, Persistence::Saved)?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod fmt;

pub mod commands;
pub mod device;
pub mod error;
pub mod framer;
pub mod mode;
pub mod poll;
pub mod registers;
pub mod timing;

#[cfg(test)]
mod mock;

pub use commands::*;
pub use device::{Device, SendOptions};
pub use error::{Error, FormatError, Result};
pub use framer::{Destination, Message, Rssi};
pub use mode::OperatingMode;
pub use registers::*;
pub use timing::Timeouts;
