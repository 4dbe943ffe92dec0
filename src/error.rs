//! Driver error types
//!
//! Every failure is scoped to the operation that produced it. The module is
//! usually still alive after any of these, so the driver stays usable and the
//! caller decides whether to retry.

use core::convert::Infallible;
use core::fmt;

use crate::mode::OperatingMode;

/// Result alias used throughout the driver.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The AUX line did not report ready in time, after a mode change or a
    /// transmission.
    ModeTimeout,
    /// No response bytes arrived within the response timeout.
    CommandTimeout,
    /// Some response bytes arrived, but fewer than the command requires.
    ///
    /// Usually points at a protocol or firmware mismatch rather than a
    /// transient fault, so blind retries are not advisable.
    ShortResponse {
        /// Number of bytes the command expects back
        expected: usize,
        /// Number of bytes actually received
        received: usize,
    },
    /// The response had the right length but did not echo the command header.
    UnexpectedEcho,
    /// A configuration block or message frame is malformed.
    Format(FormatError),
    /// Send options do not fit the cached configuration: addressing against
    /// the transmission mode, or a wake-up send without the WOR transmitter role.
    ModeMismatch,
    /// The requested mode change is not an edge of the mode state machine.
    IllegalTransition {
        /// Mode the module was in
        from: OperatingMode,
        /// Mode that was requested
        to: OperatingMode,
    },
    /// The serial transport reported an error.
    Transport(embedded_io::ErrorKind),
    /// Driving M0/M1 or sampling AUX failed.
    Pin,
}

/// Reasons a configuration block or message frame is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormatError {
    /// The byte block has the wrong length for the register span.
    Length {
        /// Required length in bytes
        expected: usize,
        /// Supplied length in bytes
        actual: usize,
    },
    /// Channel outside the range supported by the module.
    InvalidChannel(u8),
    /// Channel valid for the module but beyond the band's upper edge.
    ChannelOutOfBand(u8),
    /// Transmit power not offered by the module.
    InvalidPower(i8),
    /// A received frame is shorter than the minimum for the active mode.
    FrameTooShort {
        /// Minimum frame length
        minimum: usize,
        /// Received frame length
        actual: usize,
    },
    /// A payload is empty.
    EmptyPayload,
    /// A payload does not fit in a single sub-packet.
    PayloadTooLarge(usize),
    /// The register span does not fit in a single command.
    RegisterSpan(usize),
    /// The payload checksum does not verify.
    ChecksumMismatch,
}

impl Error {
    pub(crate) fn transport<E: embedded_io::Error>(err: E) -> Self {
        Error::Transport(err.kind())
    }

    pub(crate) fn pin<E>(_: E) -> Self {
        Error::Pin
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Error::Format(err)
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;

        match self {
            ModeTimeout => write!(f, "module did not signal ready in time"),
            CommandTimeout => write!(f, "no response from the module"),
            ShortResponse { expected, received } => write!(
                f,
                "short response from the module: expected {} bytes, got {}",
                expected, received
            ),
            UnexpectedEcho => write!(f, "response does not echo the command header"),
            Format(e) => fmt::Display::fmt(e, f),
            ModeMismatch => write!(f, "send options do not match the module configuration"),
            IllegalTransition { from, to } => {
                write!(f, "illegal mode transition from {} to {}", from, to)
            }
            Transport(kind) => write!(f, "serial transport error: {:?}", kind),
            Pin => write!(f, "control pin error"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FormatError::*;

        match *self {
            Length { expected, actual } => {
                write!(f, "expected {} bytes, got {}", expected, actual)
            }
            InvalidChannel(v) => write!(f, "invalid channel {}", v),
            ChannelOutOfBand(v) => write!(f, "channel {} is outside the band", v),
            InvalidPower(v) => write!(f, "unsupported transmit power {} dBm", v),
            FrameTooShort { minimum, actual } => write!(
                f,
                "frame of {} bytes is shorter than the minimum of {}",
                actual, minimum
            ),
            EmptyPayload => write!(f, "empty payload"),
            PayloadTooLarge(len) => write!(f, "payload of {} bytes exceeds a sub-packet", len),
            RegisterSpan(len) => write!(f, "register span of {} bytes is too long", len),
            ChecksumMismatch => write!(f, "payload checksum mismatch"),
        }
    }
}

impl core::error::Error for Error {}

impl core::error::Error for FormatError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_errors_convert_into_error() {
        let err: Error = FormatError::InvalidChannel(120).into();
        assert_eq!(err, Error::Format(FormatError::InvalidChannel(120)));
    }

    #[test]
    fn transport_errors_keep_their_kind() {
        let err = Error::transport(embedded_io::ErrorKind::TimedOut);
        assert_eq!(err, Error::Transport(embedded_io::ErrorKind::TimedOut));
    }

    #[test]
    fn display_mentions_the_counts() {
        let text = std::format!(
            "{}",
            Error::ShortResponse {
                expected: 10,
                received: 3
            }
        );
        assert!(text.contains("10"));
        assert!(text.contains('3'));
    }
}
