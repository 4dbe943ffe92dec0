//! E22 command implementations
//!
//! Commands are only accepted in configuration mode, which always runs the
//! UART at 9600 baud 8N1. They come in two shapes:
//!
//! # Register commands
//! - `C0 addr len data` writes registers and saves them to flash
//! - `C2 addr len data` writes registers until the next power cycle
//! - `C1 addr len` reads registers
//!
//! All three are answered with `C1 addr len data`, where `data` holds the
//! register values in effect after the command.
//!
//! # Module commands
//! - [`ReadVersion`]: `C3 C3 C3`, answered with `C3 model version features`
//! - [`Reset`]: `C4 C4 C4`, no answer
//!
//! A malformed command is answered with `FF FF FF`.
//!
//! # Wireless commands
//! Prefixing any of the above with `CF CF` relays it over the air to a remote
//! module with the same channel, network id and air data rate. The remote's
//! answer comes back through the local module with the same prefix.
//!
//! # Important Notes
//! - AUX is not a reliable end-of-response signal in configuration mode;
//!   responses are read until their known length arrives or a timeout expires

mod frame;
mod module;

pub use frame::*;
pub use module::*;
