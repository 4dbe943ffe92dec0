//! Message framing
//!
//! In normal mode everything written to the module's UART goes on air. How
//! the bytes are laid out depends on the configured [`TransmissionMode`]:
//!
//! ```text
//! transparent:  payload
//! fixed:        addr_hi addr_lo channel payload
//! ```
//!
//! In fixed mode the module consumes the three header bytes itself. Received
//! messages never carry that header, in either mode, but end with one RSSI
//! byte when [`TransmissionFlags::RSSI_BYTE`](crate::TransmissionFlags) is set.
//!
//! Frames carry no length or flag field, so parsing is purely positional and
//! relies on the caller knowing the configuration.

use heapless::Vec;

use crate::error::{Error, FormatError, Result};
use crate::registers::{Channel, ModuleAddress, TransmissionMode};

/// Largest payload accepted for a single write (the biggest sub-packet).
pub const MAX_PAYLOAD: usize = 240;

/// Length of the fixed-mode address and channel header.
pub const HEADER_LEN: usize = 3;

/// Capacity of an outgoing frame.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

/// An outgoing frame.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Target of a fixed-mode transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Destination {
    /// Address of the receiving module
    pub address: ModuleAddress,
    /// Channel the receiving module listens on
    pub channel: Channel,
}

impl Destination {
    /// A single module.
    pub const fn new(address: u16, channel: Channel) -> Self {
        Self {
            address: ModuleAddress(address),
            channel,
        }
    }

    /// Every module listening on `channel`.
    pub const fn broadcast(channel: Channel) -> Self {
        Self {
            address: ModuleAddress::BROADCAST,
            channel,
        }
    }
}

/// Received signal strength, as reported by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rssi(pub u8);

impl Rssi {
    /// Signal strength in dBm.
    pub fn dbm(self) -> i16 {
        i16::from(self.0) - 256
    }
}

/// A received message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    /// Application data
    pub payload: &'a [u8],
    /// Signal strength of the packet, if the module appends it
    pub rssi: Option<Rssi>,
}

impl<'a> Message<'a> {
    /// Verifies and strips a trailing checksum added by a sender that used
    /// [`frame`] with `checksum` set.
    ///
    /// # Errors
    /// * [`FormatError::FrameTooShort`] - no payload byte besides the checksum
    /// * [`FormatError::ChecksumMismatch`] - the checksum does not verify
    pub fn verify_checksum(self) -> core::result::Result<Self, FormatError> {
        match self.payload.split_last() {
            Some((_, data)) if !data.is_empty() => {
                if sum(self.payload) != 0 {
                    return Err(FormatError::ChecksumMismatch);
                }
                Ok(Self {
                    payload: data,
                    rssi: self.rssi,
                })
            }
            _ => Err(FormatError::FrameTooShort {
                minimum: 2,
                actual: self.payload.len(),
            }),
        }
    }
}

/// Two's complement of the byte sum: the sum of `data` and its checksum is zero.
pub fn checksum(data: &[u8]) -> u8 {
    sum(data).wrapping_neg()
}

fn sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Builds the bytes to write for `payload`.
///
/// With `checksum` set, one [`checksum`] byte is appended after the payload
/// and counts towards [`MAX_PAYLOAD`].
///
/// # Errors
/// * [`Error::ModeMismatch`] - a destination in transparent mode, or none in fixed mode
/// * [`FormatError::EmptyPayload`] - `payload` is empty
/// * [`FormatError::PayloadTooLarge`] - `payload` does not fit a sub-packet
pub fn frame(
    payload: &[u8],
    mode: TransmissionMode,
    destination: Option<Destination>,
    checksum: bool,
) -> Result<Frame> {
    if payload.is_empty() {
        return Err(FormatError::EmptyPayload.into());
    }
    if payload.len() + usize::from(checksum) > MAX_PAYLOAD {
        return Err(FormatError::PayloadTooLarge(payload.len()).into());
    }

    let mut frame = Frame::new();
    match (mode, destination) {
        (TransmissionMode::Transparent, None) => {}
        (TransmissionMode::Fixed, Some(dest)) => {
            let [hi, lo] = dest.address.0.to_be_bytes();
            push(&mut frame, &[hi, lo, dest.channel.get()])?;
        }
        (TransmissionMode::Transparent, Some(_)) | (TransmissionMode::Fixed, None) => {
            return Err(Error::ModeMismatch);
        }
    }
    push(&mut frame, payload)?;
    if checksum {
        push(&mut frame, &[self::checksum(payload)])?;
    }

    Ok(frame)
}

fn push(frame: &mut Frame, bytes: &[u8]) -> Result<()> {
    frame
        .extend_from_slice(bytes)
        .map_err(|_| FormatError::PayloadTooLarge(frame.len() + bytes.len()).into())
}

/// Splits raw received bytes into payload and RSSI.
///
/// Received frames have the same layout in both transmission modes, since a
/// receiving module strips the fixed-mode address and channel header before
/// its UART output. `_mode` names the mode the data was received in.
///
/// # Errors
/// * [`FormatError::FrameTooShort`] - less than one payload byte, plus the RSSI
///   byte when enabled
pub fn parse(
    raw: &[u8],
    _mode: TransmissionMode,
    rssi_enabled: bool,
) -> core::result::Result<Message<'_>, FormatError> {
    let minimum = 1 + usize::from(rssi_enabled);
    if raw.len() < minimum {
        return Err(FormatError::FrameTooShort {
            minimum,
            actual: raw.len(),
        });
    }

    let message = match (rssi_enabled, raw.split_last()) {
        (true, Some((&rssi, payload))) => Message {
            payload,
            rssi: Some(Rssi(rssi)),
        },
        _ => Message {
            payload: raw,
            rssi: None,
        },
    };
    Ok(message)
}
