//! E22 Device Interface
//!
//! This module provides the high-level interface to an E22 module attached
//! through a UART, the two mode-select lines M0/M1 and the AUX ready line. It
//! supports both synchronous and asynchronous operations.
//!
//! The interface is built around the [`Device`] struct which provides methods
//! for:
//! - Switching operating modes
//! - Reading and writing the configuration registers
//! - Executing module commands (version, reset)
//! - Sending and receiving messages
//!
//! # Command exchanges
//! Register and module commands only work in configuration mode. Each one
//! enters it, drops stale input, writes the command, reads the response until
//! its full length arrived or [`Timeouts::response_ms`] expired, and then goes
//! back to the mode the module was in before, whatever the outcome. When both
//! the command and the return fail, the command's error is reported.
//!
//! # Messages
//! Messages only go out in normal mode, or in wake-up mode for a single
//! wake-up transmission. [`Device::send`] switches to normal mode first and
//! leaves the module there. [`Device::receive`] listens in normal, wake-up
//! and power-save mode and leaves configuration or program mode for normal
//! mode first.
//!
//! # Example
//! ```no_run
//! use ebyte_e22::{Device, Error, SendOptions};
//! # fn demo<UART, M0, M1, AUX, D>(uart: UART, m0: M0, m1: M1, aux: AUX, delay: D) -> Result<(), Error>
//! # where
//! #     UART: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
//! #     M0: embedded_hal::digital::OutputPin,
//! #     M1: embedded_hal::digital::OutputPin,
//! #     AUX: embedded_hal::digital::InputPin,
//! #     D: embedded_hal::delay::DelayNs,
//! # {
//! let mut device = Device::new(uart, m0, m1, aux, delay);
//! device.init()?;
//!
//! device.send(b"ping", &SendOptions::default())?;
//!
//! let mut buf = [0u8; 241];
//! if let Some(message) = device.receive(&mut buf)? {
//!     // message.payload, message.rssi
//! }
//! # Ok(())
//! # }
//! ```

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};
use regiface::{ByteArray, Command, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::commands::{
    CommandFrame, ModuleVersion, Persistence, ReadVersion, Reset, ResponseFrame, MAX_FRAME_LEN,
};
use crate::error::{Error, Result};
use crate::framer::{self, Destination, Message};
use crate::mode::{ModeController, OperatingMode};
use crate::poll::{poll_until, poll_until_async, PollBudget};
use crate::registers::{
    Configuration, ProductInfo, TransmissionFlags, TransmissionMode, CONFIG_LEN,
};
use crate::timing::Timeouts;

/// Upper bound on reads spent discarding stale input before a command.
const MAX_DRAIN_READS: usize = 64;

/// Options for a single transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendOptions {
    /// Target module; required in fixed mode, rejected in transparent mode
    pub destination: Option<Destination>,
    /// Send with a wake-up preamble so sleeping WOR receivers hear it.
    /// Only used in fixed mode, and only by a module configured as WOR
    /// transmitter ([`TransmissionFlags::WOR_TRANSMITTER`]).
    pub wake_up: bool,
    /// Append a checksum byte to the payload
    pub checksum: bool,
}

impl SendOptions {
    /// Fixed-mode transmission to `destination`.
    pub fn to(destination: Destination) -> Self {
        Self {
            destination: Some(destination),
            ..Self::default()
        }
    }

    /// Adds a wake-up preamble.
    pub fn with_wake_up(self) -> Self {
        Self {
            wake_up: true,
            ..self
        }
    }

    /// Adds a payload checksum.
    pub fn with_checksum(self) -> Self {
        Self {
            checksum: true,
            ..self
        }
    }
}

/// Main device interface for the E22 module.
///
/// Owns the UART, the control lines and a delay provider. The last known
/// module configuration is cached and decides how messages are framed; it
/// starts out as [`Configuration::default`] until [`init`](Device::init) or
/// [`read_configuration`](Device::read_configuration) loads the real one.
pub struct Device<UART, M0, M1, AUX, D> {
    uart: UART,
    pins: ModeController<M0, M1, AUX>,
    delay: D,
    timeouts: Timeouts,
    config: Configuration,
}

impl<UART, M0, M1, AUX, D> Device<UART, M0, M1, AUX, D> {
    /// Creates a new Device instance.
    ///
    /// The module is assumed to be in normal mode; call [`init`](Device::init)
    /// to make sure of it.
    ///
    /// # Arguments
    /// * `uart` - Serial port connected to the module's RXD/TXD
    /// * `m0`, `m1` - Mode-select outputs
    /// * `aux` - AUX input, high when the module is idle
    /// * `delay` - Delay provider used for all bounded waits
    pub fn new(uart: UART, m0: M0, m1: M1, aux: AUX, delay: D) -> Self {
        Self {
            uart,
            pins: ModeController::new(m0, m1, aux),
            delay,
            timeouts: Timeouts::default(),
            config: Configuration::default(),
        }
    }

    /// Releases the underlying peripherals.
    ///
    /// This method consumes the Device instance and returns the UART, M0, M1,
    /// AUX and delay in that order.
    pub fn release(self) -> (UART, M0, M1, AUX, D) {
        let (m0, m1, aux) = self.pins.release();
        (self.uart, m0, m1, aux, self.delay)
    }

    /// Current operating mode.
    pub fn mode(&self) -> OperatingMode {
        self.pins.mode()
    }

    /// Last configuration read from or written to the module.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Timeouts bounding every wait of the driver.
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Replaces the driver timeouts.
    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    /// Frames an outgoing message and checks the wake-up request against the
    /// cached configuration.
    fn prepare_send(&self, payload: &[u8], options: &SendOptions) -> Result<framer::Frame> {
        let frame = framer::frame(
            payload,
            self.config.transmission_mode(),
            options.destination,
            options.checksum,
        )?;
        let wor_transmitter = self
            .config
            .transmission
            .flags
            .contains(TransmissionFlags::WOR_TRANSMITTER);
        if self.uses_wake_up(options) && !wor_transmitter {
            return Err(Error::ModeMismatch);
        }
        Ok(frame)
    }

    fn uses_wake_up(&self, options: &SendOptions) -> bool {
        options.wake_up && self.config.transmission_mode() == TransmissionMode::Fixed
    }

    fn response_budget(&self, frame: &CommandFrame) -> PollBudget {
        let timeout = if frame.is_wireless() {
            self.timeouts.remote_response_ms
        } else {
            self.timeouts.response_ms
        };
        PollBudget::new(timeout, self.timeouts.poll_interval_us)
    }

    /// Applies register bytes confirmed by the module to the cached
    /// configuration. Bytes outside the configuration block are ignored.
    fn update_cache(&mut self, address: u8, data: &[u8]) -> Result<()> {
        let start = usize::from(address);
        if start >= CONFIG_LEN {
            return Ok(());
        }
        let end = (start + data.len()).min(CONFIG_LEN);

        let mut block = self.config.encode();
        block[start..end].copy_from_slice(&data[..end - start]);
        self.config = Configuration::decode(&block)?;
        Ok(())
    }
}

impl<UART, M0, M1, AUX, D> Device<UART, M0, M1, AUX, D>
where
    UART: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
    M0: OutputPin,
    M1: OutputPin,
    AUX: InputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Drives the control lines to normal mode and loads the module's
    /// configuration.
    ///
    /// # Errors
    /// * [`Error::ModeTimeout`] - the module never reported ready
    /// * any error of [`read_configuration`](Device::read_configuration)
    pub fn init(&mut self) -> Result<Configuration> {
        self.pins
            .force(OperatingMode::Normal, &mut self.delay, &self.timeouts)?;
        self.read_configuration()
    }

    /// Switches the module to `mode`.
    ///
    /// Changes between two modes other than normal pass through normal mode.
    pub fn enter_mode(&mut self, mode: OperatingMode) -> Result<()> {
        if !self.pins.mode().can_transition_to(mode) {
            self.pins
                .transition(OperatingMode::Normal, &mut self.delay, &self.timeouts)?;
        }
        self.pins.transition(mode, &mut self.delay, &self.timeouts)
    }

    /// Reads the complete configuration block and caches it.
    ///
    /// # Errors
    /// * [`Error::CommandTimeout`] - the module did not answer
    /// * [`Error::ShortResponse`] - the answer was cut short
    /// * [`Error::UnexpectedEcho`] - the answer belongs to another command
    /// * [`Error::Format`] - the block holds an invalid channel
    pub fn read_configuration(&mut self) -> Result<Configuration> {
        let config: Configuration = self.read_register()?;
        debug!("configuration read, channel {}", config.channel.get());
        Ok(config)
    }

    /// Writes the complete configuration block.
    ///
    /// Returns the configuration the module reports back, which is also
    /// cached from then on.
    pub fn write_configuration(
        &mut self,
        config: Configuration,
        persistence: Persistence,
    ) -> Result<Configuration> {
        self.write_register(config, persistence)?;
        debug!("configuration written, channel {}", self.config.channel.get());
        Ok(self.config)
    }

    /// Reads a register value from the module.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing ReadableRegister with u8 ID
    pub fn read_register<R>(&mut self) -> Result<R>
    where
        R: ReadableRegister<IdType = u8>,
        <R as FromByteArray>::Error: Into<Error>,
    {
        let frame = CommandFrame::read(R::id(), R::Array::new().as_ref().len())?;
        let mut buf = [0u8; MAX_FRAME_LEN];

        let response = self.execute(&frame, &mut buf)?;
        let value = response.parse()?;
        self.update_cache(R::id(), response.data())?;
        Ok(value)
    }

    /// Writes a value to a module register.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing WritableRegister with u8 ID
    ///
    /// # Arguments
    /// * `register` - The register value to write
    /// * `persistence` - Whether the module keeps the value across power cycles
    pub fn write_register<R>(&mut self, register: R, persistence: Persistence) -> Result<()>
    where
        R: WritableRegister<IdType = u8>,
        <R as ToByteArray>::Error: Into<Error>,
    {
        let raw_value = register.to_bytes().map_err(Into::<Error>::into)?;
        let frame = CommandFrame::write(persistence, R::id(), raw_value.as_ref())?;
        let mut buf = [0u8; MAX_FRAME_LEN];

        let response = self.execute(&frame, &mut buf)?;
        self.update_cache(R::id(), response.data())
    }

    /// Reads a register of a remote module over the air.
    ///
    /// The local module relays the command; the remote one must share its
    /// channel, network id and air data rate. The local configuration cache
    /// is left alone.
    ///
    /// # Errors
    /// * [`Error::CommandTimeout`] - no answer within [`Timeouts::remote_response_ms`]
    /// * any error of [`read_register`](Device::read_register)
    pub fn read_remote_register<R>(&mut self) -> Result<R>
    where
        R: ReadableRegister<IdType = u8>,
        <R as FromByteArray>::Error: Into<Error>,
    {
        let frame = CommandFrame::read(R::id(), R::Array::new().as_ref().len())?.wireless()?;
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute(&frame, &mut buf)?.parse()
    }

    /// Writes a register of a remote module over the air.
    ///
    /// Works like [`read_remote_register`](Device::read_remote_register),
    /// also for write-only registers such as [`CryptKey`](crate::CryptKey).
    pub fn write_remote_register<R>(&mut self, register: R, persistence: Persistence) -> Result<()>
    where
        R: WritableRegister<IdType = u8>,
        <R as ToByteArray>::Error: Into<Error>,
    {
        let raw_value = register.to_bytes().map_err(Into::<Error>::into)?;
        let frame = CommandFrame::write(persistence, R::id(), raw_value.as_ref())?.wireless()?;
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute(&frame, &mut buf)?;
        Ok(())
    }

    /// Reads the 7-byte product information block.
    pub fn read_product_info(&mut self) -> Result<ProductInfo> {
        self.read_register()
    }

    /// Reads model and firmware version.
    pub fn read_version(&mut self) -> Result<ModuleVersion> {
        self.execute_command(ReadVersion)
    }

    /// Restarts the module and waits until it reports ready again.
    pub fn reset(&mut self) -> Result<()> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute(&CommandFrame::from_command(Reset), &mut buf)?;
        Ok(())
    }

    /// Executes a command on the module.
    ///
    /// # Type Parameters
    /// * `C` - Command type implementing the Command trait with u8 ID
    ///
    /// # Returns
    /// Command response parameters on success
    pub fn execute_command<C>(&mut self, command: C) -> Result<C::ResponseParameters>
    where
        C: Command<IdType = u8>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
        <C::ResponseParameters as FromByteArray>::Error: Into<Error>,
    {
        let frame = CommandFrame::from_command(command);
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute(&frame, &mut buf)?.parse()
    }

    /// Sends one message.
    ///
    /// The frame layout follows the cached transmission mode. The module is
    /// switched to normal mode first and is in normal mode afterwards; a
    /// wake-up send passes through wake-up mode for the write. The call
    /// returns once AUX reports the module done with the data, or fails with
    /// [`Error::ModeTimeout`] after [`Timeouts::transmit_ms`].
    ///
    /// # Errors
    /// * [`Error::ModeMismatch`] - the destination does not fit the transmission
    ///   mode, or a wake-up send on a module that is not a WOR transmitter
    /// * [`Error::Format`] - the payload is empty or too large
    pub fn send(&mut self, payload: &[u8], options: &SendOptions) -> Result<()> {
        let frame = self.prepare_send(payload, options)?;
        if !self.uses_wake_up(options) {
            self.enter_mode(OperatingMode::Normal)?;
            return self.transmit(&frame);
        }

        let result = match self.enter_mode(OperatingMode::WakeUp) {
            Ok(()) => self.transmit(&frame),
            Err(e) => Err(e),
        };
        let restored = self.enter_mode(OperatingMode::Normal);
        first_error(result, restored, OperatingMode::Normal)
    }

    /// Waits for one message and reads it into `buf`.
    ///
    /// Returns `Ok(None)` if nothing arrived within [`Timeouts::receive_ms`].
    /// A message ends at the first pause longer than
    /// [`Timeouts::inter_byte_ms`] or when `buf` is full.
    ///
    /// Configuration and program mode are left for normal mode first; in
    /// the other modes the module already forwards what it receives.
    ///
    /// # Errors
    /// * [`Error::Format`] - the data is too short for the configured framing
    pub fn receive<'b>(&mut self, buf: &'b mut [u8]) -> Result<Option<Message<'b>>> {
        if !self.pins.mode().forwards_messages() {
            self.enter_mode(OperatingMode::Normal)?;
        }

        let mut budget = PollBudget::new(self.timeouts.receive_ms, self.timeouts.poll_interval_us);
        let uart = &mut self.uart;
        if !poll_until(&mut self.delay, &mut budget, || {
            uart.read_ready().map_err(Error::transport)
        })? {
            return Ok(None);
        }

        let mut received = 0;
        while received < buf.len() {
            match self.uart.read(&mut buf[received..]).map_err(Error::transport)? {
                0 => break,
                n => received += n,
            }
            let mut gap =
                PollBudget::new(self.timeouts.inter_byte_ms, self.timeouts.poll_interval_us);
            let uart = &mut self.uart;
            if !poll_until(&mut self.delay, &mut gap, || {
                uart.read_ready().map_err(Error::transport)
            })? {
                break;
            }
        }
        trace!("received {} bytes", received);

        let message = framer::parse(
            &buf[..received],
            self.config.transmission_mode(),
            self.config.rssi_enabled(),
        )?;
        Ok(Some(message))
    }

    /// Runs one command exchange in configuration mode and restores the
    /// previous mode.
    fn execute<'b>(
        &mut self,
        frame: &CommandFrame,
        buf: &'b mut [u8; MAX_FRAME_LEN],
    ) -> Result<ResponseFrame<'b>> {
        let prior = self.pins.mode();
        let result = match self.enter_mode(OperatingMode::Config) {
            Ok(()) => self.exchange(frame, buf),
            Err(e) => Err(e),
        };
        let restored = self.enter_mode(prior);
        let received = first_error(result, restored, prior)?;

        frame.validate(&buf[..received])
    }

    fn exchange(&mut self, frame: &CommandFrame, buf: &mut [u8]) -> Result<usize> {
        self.drain()?;

        trace!("command {} ({} bytes)", frame.as_bytes()[0], frame.as_bytes().len());
        self.uart
            .write_all(frame.as_bytes())
            .map_err(Error::transport)?;
        self.uart.flush().map_err(Error::transport)?;

        let expected = frame.expected_response_len();
        let mut budget = self.response_budget(frame);
        if expected == 0 {
            // Nothing comes back; the module signals completion on AUX
            self.delay.delay_ms(self.timeouts.mode_settle_ms);
            self.pins.wait_ready(&mut self.delay, &mut budget)?;
            return Ok(0);
        }

        let mut received = 0;
        while received < expected {
            let uart = &mut self.uart;
            if !poll_until(&mut self.delay, &mut budget, || {
                uart.read_ready().map_err(Error::transport)
            })? {
                break;
            }
            match self
                .uart
                .read(&mut buf[received..expected])
                .map_err(Error::transport)?
            {
                0 => break,
                n => received += n,
            }
        }
        trace!("response {} of {} bytes", received, expected);
        Ok(received)
    }

    /// Discards input left over from earlier traffic.
    fn drain(&mut self) -> Result<()> {
        let mut scratch = [0u8; 16];
        let mut dropped = 0;
        for _ in 0..MAX_DRAIN_READS {
            if !self.uart.read_ready().map_err(Error::transport)? {
                break;
            }
            match self.uart.read(&mut scratch).map_err(Error::transport)? {
                0 => break,
                n => dropped += n,
            }
        }
        if dropped > 0 {
            debug!("dropped {} stale bytes", dropped);
        }
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        debug!("sending {} bytes in {} mode", frame.len(), self.pins.mode());
        self.uart.write_all(frame).map_err(Error::transport)?;
        self.uart.flush().map_err(Error::transport)?;

        let mut budget = PollBudget::new(self.timeouts.transmit_ms, self.timeouts.poll_interval_us);
        self.pins.wait_ready(&mut self.delay, &mut budget)
    }
}

impl<UART, M0, M1, AUX, D> Device<UART, M0, M1, AUX, D>
where
    UART: embedded_io_async::Read + embedded_io_async::Write + embedded_io::ReadReady,
    M0: OutputPin,
    M1: OutputPin,
    AUX: InputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Asynchronously initializes the module.
    ///
    /// This is the async version of [`init`](Device::init).
    pub async fn init_async(&mut self) -> Result<Configuration> {
        self.pins
            .force_async(OperatingMode::Normal, &mut self.delay, &self.timeouts)
            .await?;
        self.read_configuration_async().await
    }

    /// Asynchronously switches the module to `mode`.
    ///
    /// This is the async version of [`enter_mode`](Device::enter_mode).
    pub async fn enter_mode_async(&mut self, mode: OperatingMode) -> Result<()> {
        if !self.pins.mode().can_transition_to(mode) {
            self.pins
                .transition_async(OperatingMode::Normal, &mut self.delay, &self.timeouts)
                .await?;
        }
        self.pins
            .transition_async(mode, &mut self.delay, &self.timeouts)
            .await
    }

    /// Asynchronously reads the configuration block.
    ///
    /// This is the async version of [`read_configuration`](Device::read_configuration).
    pub async fn read_configuration_async(&mut self) -> Result<Configuration> {
        let config: Configuration = self.read_register_async().await?;
        debug!("configuration read, channel {}", config.channel.get());
        Ok(config)
    }

    /// Asynchronously writes the configuration block.
    ///
    /// This is the async version of [`write_configuration`](Device::write_configuration).
    pub async fn write_configuration_async(
        &mut self,
        config: Configuration,
        persistence: Persistence,
    ) -> Result<Configuration> {
        self.write_register_async(config, persistence).await?;
        debug!("configuration written, channel {}", self.config.channel.get());
        Ok(self.config)
    }

    /// Asynchronously reads a register value from the module.
    ///
    /// This is the async version of [`read_register`](Device::read_register).
    pub async fn read_register_async<R>(&mut self) -> Result<R>
    where
        R: ReadableRegister<IdType = u8>,
        <R as FromByteArray>::Error: Into<Error>,
    {
        let frame = CommandFrame::read(R::id(), R::Array::new().as_ref().len())?;
        let mut buf = [0u8; MAX_FRAME_LEN];

        let response = self.execute_async(&frame, &mut buf).await?;
        let value = response.parse()?;
        self.update_cache(R::id(), response.data())?;
        Ok(value)
    }

    /// Asynchronously writes a value to a module register.
    ///
    /// This is the async version of [`write_register`](Device::write_register).
    pub async fn write_register_async<R>(&mut self, register: R, persistence: Persistence) -> Result<()>
    where
        R: WritableRegister<IdType = u8>,
        <R as ToByteArray>::Error: Into<Error>,
    {
        let raw_value = register.to_bytes().map_err(Into::<Error>::into)?;
        let frame = CommandFrame::write(persistence, R::id(), raw_value.as_ref())?;
        let mut buf = [0u8; MAX_FRAME_LEN];

        let response = self.execute_async(&frame, &mut buf).await?;
        self.update_cache(R::id(), response.data())
    }

    /// Asynchronously reads a register of a remote module.
    ///
    /// This is the async version of [`read_remote_register`](Device::read_remote_register).
    pub async fn read_remote_register_async<R>(&mut self) -> Result<R>
    where
        R: ReadableRegister<IdType = u8>,
        <R as FromByteArray>::Error: Into<Error>,
    {
        let frame = CommandFrame::read(R::id(), R::Array::new().as_ref().len())?.wireless()?;
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute_async(&frame, &mut buf).await?.parse()
    }

    /// Asynchronously writes a register of a remote module.
    ///
    /// This is the async version of [`write_remote_register`](Device::write_remote_register).
    pub async fn write_remote_register_async<R>(
        &mut self,
        register: R,
        persistence: Persistence,
    ) -> Result<()>
    where
        R: WritableRegister<IdType = u8>,
        <R as ToByteArray>::Error: Into<Error>,
    {
        let raw_value = register.to_bytes().map_err(Into::<Error>::into)?;
        let frame = CommandFrame::write(persistence, R::id(), raw_value.as_ref())?.wireless()?;
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute_async(&frame, &mut buf).await?;
        Ok(())
    }

    /// Asynchronously reads the product information block.
    ///
    /// This is the async version of [`read_product_info`](Device::read_product_info).
    pub async fn read_product_info_async(&mut self) -> Result<ProductInfo> {
        self.read_register_async().await
    }

    /// Asynchronously reads model and firmware version.
    ///
    /// This is the async version of [`read_version`](Device::read_version).
    pub async fn read_version_async(&mut self) -> Result<ModuleVersion> {
        self.execute_command_async(ReadVersion).await
    }

    /// Asynchronously restarts the module.
    ///
    /// This is the async version of [`reset`](Device::reset).
    pub async fn reset_async(&mut self) -> Result<()> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute_async(&CommandFrame::from_command(Reset), &mut buf)
            .await?;
        Ok(())
    }

    /// Asynchronously executes a command on the module.
    ///
    /// This is the async version of [`execute_command`](Device::execute_command).
    pub async fn execute_command_async<C>(&mut self, command: C) -> Result<C::ResponseParameters>
    where
        C: Command<IdType = u8>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
        <C::ResponseParameters as FromByteArray>::Error: Into<Error>,
    {
        let frame = CommandFrame::from_command(command);
        let mut buf = [0u8; MAX_FRAME_LEN];
        self.execute_async(&frame, &mut buf).await?.parse()
    }

    /// Asynchronously sends one message.
    ///
    /// This is the async version of [`send`](Device::send).
    pub async fn send_async(&mut self, payload: &[u8], options: &SendOptions) -> Result<()> {
        let frame = self.prepare_send(payload, options)?;
        if !self.uses_wake_up(options) {
            self.enter_mode_async(OperatingMode::Normal).await?;
            return self.transmit_async(&frame).await;
        }

        let result = match self.enter_mode_async(OperatingMode::WakeUp).await {
            Ok(()) => self.transmit_async(&frame).await,
            Err(e) => Err(e),
        };
        let restored = self.enter_mode_async(OperatingMode::Normal).await;
        first_error(result, restored, OperatingMode::Normal)
    }

    /// Asynchronously waits for one message.
    ///
    /// This is the async version of [`receive`](Device::receive).
    pub async fn receive_async<'b>(&mut self, buf: &'b mut [u8]) -> Result<Option<Message<'b>>> {
        if !self.pins.mode().forwards_messages() {
            self.enter_mode_async(OperatingMode::Normal).await?;
        }

        let mut budget = PollBudget::new(self.timeouts.receive_ms, self.timeouts.poll_interval_us);
        let uart = &mut self.uart;
        if !poll_until_async(&mut self.delay, &mut budget, || {
            uart.read_ready().map_err(Error::transport)
        })
        .await?
        {
            return Ok(None);
        }

        let mut received = 0;
        while received < buf.len() {
            match self
                .uart
                .read(&mut buf[received..])
                .await
                .map_err(Error::transport)?
            {
                0 => break,
                n => received += n,
            }
            let mut gap =
                PollBudget::new(self.timeouts.inter_byte_ms, self.timeouts.poll_interval_us);
            let uart = &mut self.uart;
            if !poll_until_async(&mut self.delay, &mut gap, || {
                uart.read_ready().map_err(Error::transport)
            })
            .await?
            {
                break;
            }
        }
        trace!("received {} bytes", received);

        let message = framer::parse(
            &buf[..received],
            self.config.transmission_mode(),
            self.config.rssi_enabled(),
        )?;
        Ok(Some(message))
    }

    async fn execute_async<'b>(
        &mut self,
        frame: &CommandFrame,
        buf: &'b mut [u8; MAX_FRAME_LEN],
    ) -> Result<ResponseFrame<'b>> {
        let prior = self.pins.mode();
        let result = match self.enter_mode_async(OperatingMode::Config).await {
            Ok(()) => self.exchange_async(frame, buf).await,
            Err(e) => Err(e),
        };
        let restored = self.enter_mode_async(prior).await;
        let received = first_error(result, restored, prior)?;

        frame.validate(&buf[..received])
    }

    async fn exchange_async(&mut self, frame: &CommandFrame, buf: &mut [u8]) -> Result<usize> {
        self.drain_async().await?;

        trace!("command {} ({} bytes)", frame.as_bytes()[0], frame.as_bytes().len());
        self.uart
            .write_all(frame.as_bytes())
            .await
            .map_err(Error::transport)?;
        self.uart.flush().await.map_err(Error::transport)?;

        let expected = frame.expected_response_len();
        let mut budget = self.response_budget(frame);
        if expected == 0 {
            self.delay.delay_ms(self.timeouts.mode_settle_ms).await;
            self.pins.wait_ready_async(&mut self.delay, &mut budget).await?;
            return Ok(0);
        }

        let mut received = 0;
        while received < expected {
            let uart = &mut self.uart;
            if !poll_until_async(&mut self.delay, &mut budget, || {
                uart.read_ready().map_err(Error::transport)
            })
            .await?
            {
                break;
            }
            match self
                .uart
                .read(&mut buf[received..expected])
                .await
                .map_err(Error::transport)?
            {
                0 => break,
                n => received += n,
            }
        }
        trace!("response {} of {} bytes", received, expected);
        Ok(received)
    }

    async fn drain_async(&mut self) -> Result<()> {
        let mut scratch = [0u8; 16];
        let mut dropped = 0;
        for _ in 0..MAX_DRAIN_READS {
            if !self.uart.read_ready().map_err(Error::transport)? {
                break;
            }
            match self
                .uart
                .read(&mut scratch)
                .await
                .map_err(Error::transport)?
            {
                0 => break,
                n => dropped += n,
            }
        }
        if dropped > 0 {
            debug!("dropped {} stale bytes", dropped);
        }
        Ok(())
    }

    async fn transmit_async(&mut self, frame: &[u8]) -> Result<()> {
        debug!("sending {} bytes in {} mode", frame.len(), self.pins.mode());
        self.uart.write_all(frame).await.map_err(Error::transport)?;
        self.uart.flush().await.map_err(Error::transport)?;

        let mut budget = PollBudget::new(self.timeouts.transmit_ms, self.timeouts.poll_interval_us);
        self.pins.wait_ready_async(&mut self.delay, &mut budget).await
    }
}

/// Combines the outcome of an operation with the outcome of restoring the
/// mode it started in. The operation's own error takes precedence.
fn first_error<T>(result: Result<T>, restored: Result<()>, prior: OperatingMode) -> Result<T> {
    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore)) => {
            warn!("could not return to {} mode: {}", prior, restore);
            Err(e)
        }
    }
}
