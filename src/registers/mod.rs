//! Register definitions for the E22 series
//!
//! The module exposes its settings as a small byte-addressed register file:
//!
//! | Address | Register | Type |
//! |---------|----------|------|
//! | 0x00    | ADDH/ADDL | [`ModuleAddress`] |
//! | 0x02    | NETID    | [`NetId`] |
//! | 0x03    | REG0     | [`SerialConfig`] |
//! | 0x04    | REG1     | [`RadioOptions`] |
//! | 0x05    | REG2     | [`Channel`] |
//! | 0x06    | REG3     | [`TransmissionOptions`] |
//! | 0x07    | CRYPT    | [`CryptKey`] (write only) |
//! | 0x80    | PID      | [`ProductInfo`] (read only) |
//!
//! [`Configuration`] covers 0x00..=0x06 in a single block.

mod config;
mod rf;
mod system;
mod transmission;
mod uart;

pub use config::*;
pub use rf::*;
pub use system::*;
pub use transmission::*;
pub use uart::*;
