//! Test doubles for the driver's collaborators
//!
//! M0/M1 use `embedded-hal-mock` pins; the UART, AUX line and delay are
//! simulated here because their behaviour has to follow the traffic.

use std::collections::VecDeque;
use std::vec::Vec;

use core::convert::Infallible;

use embedded_io::ErrorKind;

/// Simulated module UART
///
/// Replies are scripted per request: once the bytes written since the last
/// match equal the next scripted request, its reply becomes readable.
#[derive(Debug, Default)]
pub struct MockUart {
    rx: VecDeque<u8>,
    written: Vec<u8>,
    pending: Vec<u8>,
    script: VecDeque<(Vec<u8>, Vec<u8>)>,
    next_write_error: Option<ErrorKind>,
}

impl MockUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `request` with `reply`. An empty reply simulates a silent module.
    pub fn expect(mut self, request: &[u8], reply: &[u8]) -> Self {
        self.script.push_back((request.to_vec(), reply.to_vec()));
        self
    }

    /// Make `data` readable right away.
    pub fn queue_rx(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// Fail the next write with `kind`.
    pub fn fail_next_write(&mut self, kind: ErrorKind) {
        self.next_write_error = Some(kind);
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Bytes not yet read by the driver.
    pub fn unread(&self) -> usize {
        self.rx.len()
    }

    /// Asserts every scripted request was written.
    pub fn done(&self) {
        assert!(
            self.script.is_empty(),
            "unsent requests: {:02x?}",
            self.script
        );
    }

    fn take(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..count)) {
            *slot = byte;
        }
        count
    }

    fn put(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        if let Some(kind) = self.next_write_error.take() {
            return Err(kind);
        }
        self.written.extend_from_slice(data);
        self.pending.extend_from_slice(data);

        let matched = matches!(self.script.front(), Some((request, _)) if *request == self.pending);
        if matched {
            if let Some((_, reply)) = self.script.pop_front() {
                self.rx.extend(reply);
            }
            self.pending.clear();
        }
        Ok(data.len())
    }
}

impl embedded_io::ErrorType for MockUart {
    type Error = ErrorKind;
}

impl embedded_io::Read for MockUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.take(buf))
    }
}

impl embedded_io::ReadReady for MockUart {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl embedded_io::Write for MockUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.put(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io_async::Read for MockUart {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.take(buf))
    }
}

impl embedded_io_async::Write for MockUart {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.put(buf)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Simulated AUX output of the module
#[derive(Debug, Clone, Copy)]
pub struct AuxLine {
    busy_samples: Option<u32>,
    samples: u32,
}

impl AuxLine {
    /// Always reports ready.
    pub fn ready() -> Self {
        Self {
            busy_samples: Some(0),
            samples: 0,
        }
    }

    /// Never reports ready.
    pub fn busy() -> Self {
        Self {
            busy_samples: None,
            samples: 0,
        }
    }

    /// Reports busy for the first `samples` reads, then ready.
    pub fn ready_after(samples: u32) -> Self {
        Self {
            busy_samples: Some(samples),
            samples: 0,
        }
    }

    /// Number of times the line was sampled.
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl embedded_hal::digital::ErrorType for AuxLine {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for AuxLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.samples += 1;
        Ok(match self.busy_samples {
            Some(busy) => self.samples > busy,
            None => false,
        })
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Delay provider that only adds up the requested time
#[derive(Debug, Default)]
pub struct CountingDelay {
    elapsed_ns: u64,
}

impl CountingDelay {
    /// Total time slept, in microseconds.
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }
}

impl embedded_hal::delay::DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

impl embedded_hal_async::delay::DelayNs for CountingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, ReadReady, Write};

    #[test]
    fn scripted_reply_follows_the_request() {
        let mut uart = MockUart::new().expect(&[0xC1, 0x05, 0x01], &[0xC1, 0x05, 0x01, 0x06]);
        assert!(!uart.read_ready().unwrap());

        uart.write_all(&[0xC1, 0x05, 0x01]).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(uart.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[0xC1, 0x05, 0x01, 0x06]);
        uart.done();
    }

    #[test]
    fn aux_turns_ready_after_the_busy_samples() {
        use embedded_hal::digital::InputPin;

        let mut aux = AuxLine::ready_after(2);
        assert!(!aux.is_high().unwrap());
        assert!(!aux.is_high().unwrap());
        assert!(aux.is_high().unwrap());
        assert_eq!(aux.samples(), 3);
    }
}
