//! Command and response frames
//!
//! Every configuration-mode exchange is one [`CommandFrame`] written to the
//! module followed by a response of a length known in advance. The frame
//! records what the response has to look like so the raw bytes can be checked
//! with [`CommandFrame::validate`].
//!
//! Any command can also be relayed over the air to a remote module with the
//! same network settings: [`CommandFrame::wireless`] prefixes it with
//! [`WIRELESS_PREFIX`], and the remote's answer comes back with the same prefix.

use core::convert::Infallible;

use heapless::Vec;
use regiface::{ByteArray, Command, FromByteArray, ToByteArray};

use crate::error::{Error, FormatError};

/// Write registers and keep the values across power cycles
pub const OPCODE_WRITE_SAVED: u8 = 0xC0;
/// Read registers; also the header of every register response
pub const OPCODE_READ: u8 = 0xC1;
/// Write registers until the next power cycle
pub const OPCODE_WRITE_VOLATILE: u8 = 0xC2;

/// Prefix of a command relayed to a remote module, and of its answer
pub const WIRELESS_PREFIX: [u8; 2] = [0xCF, 0xCF];

/// Largest register span a single command may cover
pub const MAX_REGISTER_SPAN: usize = 9;

const REGISTER_HEADER_LEN: usize = 3;

/// Capacity of a command or response frame, wireless prefix included
pub const MAX_FRAME_LEN: usize = WIRELESS_PREFIX.len() + REGISTER_HEADER_LEN + MAX_REGISTER_SPAN;

/// How a register write is stored by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Persistence {
    /// Written to flash, survives a power cycle (C0)
    #[default]
    Saved,
    /// Lost on the next power cycle (C2)
    Volatile,
}

impl Persistence {
    /// Opcode of a write with this persistence.
    pub const fn opcode(self) -> u8 {
        match self {
            Persistence::Saved => OPCODE_WRITE_SAVED,
            Persistence::Volatile => OPCODE_WRITE_VOLATILE,
        }
    }
}

/// Shape of the response a command produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// `C1 address len` followed by `len` data bytes
    Registers { address: u8, len: u8 },
    /// The opcode followed by `len` bytes
    Echo { opcode: u8, len: usize },
    /// Nothing; completion is signalled on AUX
    Nothing,
}

/// A command ready to be written to the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
    expect: Expect,
    wireless: bool,
}

impl CommandFrame {
    /// Reads `len` registers starting at `address`.
    ///
    /// # Errors
    /// * [`FormatError::RegisterSpan`] - `len` is zero or above [`MAX_REGISTER_SPAN`]
    pub fn read(address: u8, len: usize) -> Result<Self, FormatError> {
        let span = register_span(len)?;
        Ok(Self {
            bytes: Vec::from_iter([OPCODE_READ, address, span]),
            expect: Expect::Registers { address, len: span },
            wireless: false,
        })
    }

    /// Writes `data` to consecutive registers starting at `address`.
    ///
    /// The module answers a write of either persistence with a read-style
    /// response carrying the values now in effect.
    ///
    /// # Errors
    /// * [`FormatError::RegisterSpan`] - `data` is empty or above [`MAX_REGISTER_SPAN`]
    pub fn write(persistence: Persistence, address: u8, data: &[u8]) -> Result<Self, FormatError> {
        let span = register_span(data.len())?;
        let mut bytes: Vec<u8, MAX_FRAME_LEN> =
            Vec::from_iter([persistence.opcode(), address, span]);
        bytes
            .extend_from_slice(data)
            .map_err(|_| FormatError::RegisterSpan(data.len()))?;
        Ok(Self {
            bytes,
            expect: Expect::Registers { address, len: span },
            wireless: false,
        })
    }

    /// Builds the frame of a fixed-format module command.
    ///
    /// The response is expected to repeat the command id followed by the
    /// response parameters; commands without response parameters answer
    /// nothing.
    pub fn from_command<C>(command: C) -> Self
    where
        C: Command<IdType = u8>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let opcode = C::id();
        let params = match command.invoking_parameters().to_bytes() {
            Ok(params) => params,
            Err(never) => match never {},
        };

        let mut bytes: Vec<u8, MAX_FRAME_LEN> = Vec::new();
        // Fixed commands are at most three bytes, well within the capacity
        let _ = bytes.push(opcode);
        let _ = bytes.extend_from_slice(params.as_ref());

        let len = <C::ResponseParameters as FromByteArray>::Array::new()
            .as_ref()
            .len();
        let expect = if len == 0 {
            Expect::Nothing
        } else {
            Expect::Echo { opcode, len }
        };

        Self {
            bytes,
            expect,
            wireless: false,
        }
    }

    /// Relays this command over the air to a remote module.
    ///
    /// The local module must be in configuration mode as usual; the remote
    /// one answers through it with the response prefixed by
    /// [`WIRELESS_PREFIX`]. Commands without a response stay silent.
    ///
    /// # Errors
    /// * [`FormatError::Length`] - the prefixed command does not fit a frame
    pub fn wireless(self) -> Result<Self, FormatError> {
        if self.wireless {
            return Ok(self);
        }
        let mut bytes: Vec<u8, MAX_FRAME_LEN> = Vec::from_iter(WIRELESS_PREFIX);
        bytes
            .extend_from_slice(&self.bytes)
            .map_err(|_| FormatError::Length {
                expected: MAX_FRAME_LEN,
                actual: WIRELESS_PREFIX.len() + self.bytes.len(),
            })?;
        Ok(Self {
            bytes,
            expect: self.expect,
            wireless: true,
        })
    }

    /// Returns true if the command is relayed to a remote module.
    pub fn is_wireless(&self) -> bool {
        self.wireless
    }

    /// Raw bytes to write to the module.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of a complete response. Zero when the module answers nothing.
    pub fn expected_response_len(&self) -> usize {
        let prefix = if self.wireless {
            WIRELESS_PREFIX.len()
        } else {
            0
        };
        match self.expect {
            Expect::Registers { len, .. } => prefix + REGISTER_HEADER_LEN + usize::from(len),
            Expect::Echo { len, .. } => prefix + 1 + len,
            Expect::Nothing => 0,
        }
    }

    /// Checks the bytes received after this frame was sent.
    ///
    /// Bytes past the expected length are ignored.
    ///
    /// # Errors
    /// * [`Error::CommandTimeout`] - nothing was received
    /// * [`Error::ShortResponse`] - fewer bytes than expected were received
    /// * [`Error::UnexpectedEcho`] - the response header does not match this frame
    pub fn validate<'a>(&self, response: &'a [u8]) -> Result<ResponseFrame<'a>, Error> {
        let expected = self.expected_response_len();
        if expected == 0 {
            return Ok(ResponseFrame { data: &[] });
        }
        if response.is_empty() {
            return Err(Error::CommandTimeout);
        }
        if response.len() < expected {
            return Err(Error::ShortResponse {
                expected,
                received: response.len(),
            });
        }

        let mut response = &response[..expected];
        if self.wireless {
            match response.strip_prefix(&WIRELESS_PREFIX) {
                Some(rest) => response = rest,
                None => return Err(Error::UnexpectedEcho),
            }
        }
        let (echoed, header_len) = match self.expect {
            Expect::Registers { address, len } => (
                response[..REGISTER_HEADER_LEN] == [OPCODE_READ, address, len],
                REGISTER_HEADER_LEN,
            ),
            Expect::Echo { opcode, .. } => (response[0] == opcode, 1),
            Expect::Nothing => (true, 0),
        };
        if !echoed {
            return Err(Error::UnexpectedEcho);
        }

        Ok(ResponseFrame {
            data: &response[header_len..],
        })
    }
}

/// A validated response, borrowed from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame<'a> {
    data: &'a [u8],
}

impl<'a> ResponseFrame<'a> {
    /// Response bytes following the echoed header.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Parses the data into a fixed-size value.
    ///
    /// # Errors
    /// * [`FormatError::Length`] - the data does not fill `T`'s byte array
    /// * any error of `T`'s own decoder
    pub fn parse<T>(&self) -> Result<T, Error>
    where
        T: FromByteArray,
        T::Error: Into<Error>,
    {
        let mut raw = T::Array::new();
        let target = raw.as_mut();
        if target.len() != self.data.len() {
            return Err(FormatError::Length {
                expected: target.len(),
                actual: self.data.len(),
            }
            .into());
        }
        target.copy_from_slice(self.data);
        T::from_bytes(raw).map_err(Into::into)
    }
}

fn register_span(len: usize) -> Result<u8, FormatError> {
    if len == 0 || len > MAX_REGISTER_SPAN {
        return Err(FormatError::RegisterSpan(len));
    }
    // MAX_REGISTER_SPAN fits in a byte
    Ok(len as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ModuleVersion, ReadVersion, Reset};
    use crate::registers::Configuration;

    #[test]
    fn read_frame_layout() {
        let frame = CommandFrame::read(0x00, 7).unwrap();
        assert_eq!(frame.as_bytes(), &[0xC1, 0x00, 0x07]);
        assert_eq!(frame.expected_response_len(), 10);
    }

    #[test]
    fn write_frame_layout() {
        let frame = CommandFrame::write(Persistence::Volatile, 0x05, &[0x12]).unwrap();
        assert_eq!(frame.as_bytes(), &[0xC2, 0x05, 0x01, 0x12]);
        assert_eq!(frame.expected_response_len(), 4);

        let frame = CommandFrame::write(Persistence::Saved, 0x05, &[0x12]).unwrap();
        assert_eq!(frame.as_bytes()[0], 0xC0);
    }

    #[test]
    fn rejects_bad_spans() {
        assert_eq!(CommandFrame::read(0x00, 0), Err(FormatError::RegisterSpan(0)));
        assert_eq!(
            CommandFrame::write(Persistence::Saved, 0x00, &[0u8; 10]),
            Err(FormatError::RegisterSpan(10))
        );
    }

    #[test]
    fn version_and_reset_frames() {
        let version = CommandFrame::from_command(ReadVersion);
        assert_eq!(version.as_bytes(), &[0xC3, 0xC3, 0xC3]);
        assert_eq!(version.expected_response_len(), 4);

        let reset = CommandFrame::from_command(Reset);
        assert_eq!(reset.as_bytes(), &[0xC4, 0xC4, 0xC4]);
        assert_eq!(reset.expected_response_len(), 0);
        assert_eq!(reset.validate(&[]).map(|r| r.data().len()), Ok(0));
    }

    #[test]
    fn classifies_missing_and_short_responses() {
        let frame = CommandFrame::read(0x00, 7).unwrap();

        assert_eq!(frame.validate(&[]), Err(Error::CommandTimeout));
        assert_eq!(
            frame.validate(&[0xC1, 0x00, 0x07, 0x00]),
            Err(Error::ShortResponse {
                expected: 10,
                received: 4
            })
        );
    }

    #[test]
    fn rejects_a_wrong_echo() {
        let frame = CommandFrame::read(0x05, 1).unwrap();

        // Wrong address
        assert_eq!(frame.validate(&[0xC1, 0x04, 0x01, 0x06]), Err(Error::UnexpectedEcho));
        // The module's answer to a malformed command
        assert_eq!(frame.validate(&[0xFF, 0xFF, 0xFF, 0xFF]), Err(Error::UnexpectedEcho));
    }

    #[test]
    fn write_responses_use_the_read_header() {
        let frame = CommandFrame::write(Persistence::Saved, 0x05, &[0x12]).unwrap();

        let response = frame.validate(&[0xC1, 0x05, 0x01, 0x12]).unwrap();
        assert_eq!(response.data(), &[0x12]);
        assert_eq!(frame.validate(&[0xC0, 0x05, 0x01, 0x12]), Err(Error::UnexpectedEcho));
    }

    #[test]
    fn wireless_frames_carry_the_prefix_both_ways() {
        let frame = CommandFrame::write(Persistence::Saved, 0x07, &[0x12, 0x34])
            .unwrap()
            .wireless()
            .unwrap();
        assert!(frame.is_wireless());
        assert_eq!(frame.as_bytes(), &[0xCF, 0xCF, 0xC0, 0x07, 0x02, 0x12, 0x34]);
        assert_eq!(frame.expected_response_len(), 7);

        let response = frame
            .validate(&[0xCF, 0xCF, 0xC1, 0x07, 0x02, 0x12, 0x34])
            .unwrap();
        assert_eq!(response.data(), &[0x12, 0x34]);

        // The local module's own answer lacks the prefix
        assert_eq!(
            frame.validate(&[0xC1, 0x07, 0x02, 0x12, 0x34, 0x00, 0x00]),
            Err(Error::UnexpectedEcho)
        );
    }

    #[test]
    fn wireless_read_of_the_full_span_fits() {
        let frame = CommandFrame::read(0x00, MAX_REGISTER_SPAN)
            .unwrap()
            .wireless()
            .unwrap();
        assert_eq!(frame.expected_response_len(), MAX_FRAME_LEN);

        // Prefixing twice changes nothing
        let again = frame.clone().wireless().unwrap();
        assert_eq!(again, frame);
    }

    #[test]
    fn wireless_commands_without_response_stay_silent() {
        let reset = CommandFrame::from_command(Reset).wireless().unwrap();
        assert_eq!(reset.as_bytes(), &[0xCF, 0xCF, 0xC4, 0xC4, 0xC4]);
        assert_eq!(reset.expected_response_len(), 0);

        let version = CommandFrame::from_command(ReadVersion).wireless().unwrap();
        assert_eq!(version.expected_response_len(), 6);
        let parsed: ModuleVersion = version
            .validate(&[0xCF, 0xCF, 0xC3, 0x44, 0x0B, 0x16])
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(parsed.frequency_mhz(), Some(915));
    }

    #[test]
    fn parses_a_configuration_response() {
        let frame = CommandFrame::read(0x00, 7).unwrap();
        let raw = [0xC1, 0x00, 0x07, 0x00, 0x00, 0x00, 0x62, 0x00, 0x06, 0x03];

        let config: Configuration = frame.validate(&raw).unwrap().parse().unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn parses_a_version_response() {
        let frame = CommandFrame::from_command(ReadVersion);
        let version: ModuleVersion = frame
            .validate(&[0xC3, 0x45, 0x0B, 0x14])
            .unwrap()
            .parse()
            .unwrap();

        assert_eq!(version.model, 0x45);
        assert_eq!(version.frequency_mhz(), Some(868));
    }

    #[test]
    fn parse_checks_the_data_length() {
        let frame = CommandFrame::read(0x00, 2).unwrap();
        let response = frame.validate(&[0xC1, 0x00, 0x02, 0x12, 0x34]).unwrap();

        assert_eq!(
            response.parse::<Configuration>(),
            Err(Error::Format(FormatError::Length {
                expected: 7,
                actual: 2
            }))
        );
    }
}
