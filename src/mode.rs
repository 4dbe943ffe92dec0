//! Operating mode control
//!
//! The E22 selects its operating mode from the levels of the M0 and M1 inputs
//! and reports readiness on AUX (high = idle). [`ModeController`] owns those
//! three lines and walks the mode state machine:
//!
//! ```text
//!            WakeUp
//!              |
//! PowerSave -- Normal -- Config
//!              |
//!           Program
//! ```
//!
//! Every mode is reachable from `Normal` and returns to it; other changes
//! must pass through `Normal`.
//!
//! # Pin patterns
//! | Mode      | M0 | M1 |
//! |-----------|----|----|
//! | Normal    | L  | L  |
//! | WakeUp    | H  | L  |
//! | PowerSave | H  | L  |
//! | Config    | L  | H  |
//! | Program   | H  | H  |
//!
//! WakeUp and PowerSave share the WOR pin pattern; which side of a
//! wake-on-radio link the module plays is set by the WOR role bit of
//! [`TransmissionFlags`](crate::TransmissionFlags).

use core::fmt;

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::error::{Error, Result};
use crate::poll::{poll_until, poll_until_async, PollBudget};
use crate::timing::Timeouts;

/// Operating mode of the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// UART and radio open, transmissions use a normal preamble
    Normal,
    /// Transmissions use an extended preamble to wake WOR receivers
    WakeUp,
    /// Radio listens in WOR cycles, UART stays closed until data arrives
    PowerSave,
    /// Registers can be read and written over the UART
    Config,
    /// Deep sleep; the module's firmware update mode
    Program,
}

impl OperatingMode {
    /// Levels of M0 and M1 selecting this mode.
    pub const fn pins(self) -> (PinState, PinState) {
        match self {
            OperatingMode::Normal => (PinState::Low, PinState::Low),
            OperatingMode::WakeUp | OperatingMode::PowerSave => (PinState::High, PinState::Low),
            OperatingMode::Config => (PinState::Low, PinState::High),
            OperatingMode::Program => (PinState::High, PinState::High),
        }
    }

    /// Returns true if `self -> to` is an edge of the mode state machine.
    pub fn can_transition_to(self, to: OperatingMode) -> bool {
        self == to || self == OperatingMode::Normal || to == OperatingMode::Normal
    }

    /// Returns true if received messages come out of the UART in this mode.
    pub const fn forwards_messages(self) -> bool {
        matches!(
            self,
            OperatingMode::Normal | OperatingMode::WakeUp | OperatingMode::PowerSave
        )
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatingMode::Normal => "normal",
            OperatingMode::WakeUp => "wake-up",
            OperatingMode::PowerSave => "power-save",
            OperatingMode::Config => "config",
            OperatingMode::Program => "program",
        };
        f.write_str(name)
    }
}

/// Owner of the M0/M1 mode-select outputs and the AUX input.
///
/// The recorded mode always follows the levels last driven onto M0/M1, even
/// when the following ready wait times out.
pub struct ModeController<M0, M1, AUX> {
    m0: M0,
    m1: M1,
    aux: AUX,
    mode: OperatingMode,
}

impl<M0, M1, AUX> ModeController<M0, M1, AUX> {
    /// Wraps the control lines. The module is assumed to be in
    /// [`OperatingMode::Normal`], its state after power-up.
    pub fn new(m0: M0, m1: M1, aux: AUX) -> Self {
        Self {
            m0,
            m1,
            aux,
            mode: OperatingMode::Normal,
        }
    }

    /// Currently selected mode.
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Releases the control lines.
    pub fn release(self) -> (M0, M1, AUX) {
        (self.m0, self.m1, self.aux)
    }
}

impl<M0, M1, AUX> ModeController<M0, M1, AUX>
where
    M0: OutputPin,
    M1: OutputPin,
    AUX: InputPin,
{
    /// Waits for AUX to go high within `budget`.
    pub fn wait_ready<D>(&mut self, delay: &mut D, budget: &mut PollBudget) -> Result<()>
    where
        D: embedded_hal::delay::DelayNs,
    {
        let aux = &mut self.aux;
        if poll_until(delay, budget, || aux.is_high().map_err(Error::pin))? {
            Ok(())
        } else {
            Err(Error::ModeTimeout)
        }
    }

    /// Async version of [`wait_ready`](Self::wait_ready).
    pub async fn wait_ready_async<D>(&mut self, delay: &mut D, budget: &mut PollBudget) -> Result<()>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        let aux = &mut self.aux;
        if poll_until_async(delay, budget, || aux.is_high().map_err(Error::pin)).await? {
            Ok(())
        } else {
            Err(Error::ModeTimeout)
        }
    }

    /// Drives M0/M1 to `mode` regardless of the recorded state.
    ///
    /// Used to bring the lines into a known state at start-up.
    pub fn force<D>(&mut self, mode: OperatingMode, delay: &mut D, timeouts: &Timeouts) -> Result<()>
    where
        D: embedded_hal::delay::DelayNs,
    {
        self.drive(mode)?;
        let mut budget = PollBudget::new(timeouts.mode_ready_ms, timeouts.poll_interval_us);
        self.wait_ready(delay, &mut budget)?;
        delay.delay_ms(timeouts.mode_settle_ms);
        Ok(())
    }

    /// Async version of [`force`](Self::force).
    pub async fn force_async<D>(
        &mut self,
        mode: OperatingMode,
        delay: &mut D,
        timeouts: &Timeouts,
    ) -> Result<()>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        self.drive(mode)?;
        let mut budget = PollBudget::new(timeouts.mode_ready_ms, timeouts.poll_interval_us);
        self.wait_ready_async(delay, &mut budget).await?;
        delay.delay_ms(timeouts.mode_settle_ms).await;
        Ok(())
    }

    /// Moves the module along one edge of the state machine.
    ///
    /// The module should be idle before the pins change, but a busy module
    /// does not block the change: the first wait is best effort. The second
    /// wait, after the pins changed, must succeed. Both share one budget of
    /// `timeouts.mode_ready_ms`.
    ///
    /// # Errors
    /// * [`Error::IllegalTransition`] - `to` is not adjacent to the current mode
    /// * [`Error::ModeTimeout`] - AUX stayed low after the pins changed
    /// * [`Error::Pin`] - a control line could not be driven or sampled
    pub fn transition<D>(&mut self, to: OperatingMode, delay: &mut D, timeouts: &Timeouts) -> Result<()>
    where
        D: embedded_hal::delay::DelayNs,
    {
        let from = self.mode;
        if from == to {
            return Ok(());
        }
        if !from.can_transition_to(to) {
            return Err(Error::IllegalTransition { from, to });
        }

        trace!("mode {} -> {}", from, to);
        let mut budget = PollBudget::new(timeouts.mode_ready_ms, timeouts.poll_interval_us);
        match self.wait_ready(delay, &mut budget) {
            Err(Error::ModeTimeout) => warn!("module busy before leaving {} mode", from),
            other => other?,
        }

        self.drive(to)?;
        self.wait_ready(delay, &mut budget)?;
        delay.delay_ms(timeouts.mode_settle_ms);
        Ok(())
    }

    /// Async version of [`transition`](Self::transition).
    pub async fn transition_async<D>(
        &mut self,
        to: OperatingMode,
        delay: &mut D,
        timeouts: &Timeouts,
    ) -> Result<()>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        let from = self.mode;
        if from == to {
            return Ok(());
        }
        if !from.can_transition_to(to) {
            return Err(Error::IllegalTransition { from, to });
        }

        trace!("mode {} -> {}", from, to);
        let mut budget = PollBudget::new(timeouts.mode_ready_ms, timeouts.poll_interval_us);
        match self.wait_ready_async(delay, &mut budget).await {
            Err(Error::ModeTimeout) => warn!("module busy before leaving {} mode", from),
            other => other?,
        }

        self.drive(to)?;
        self.wait_ready_async(delay, &mut budget).await?;
        delay.delay_ms(timeouts.mode_settle_ms).await;
        Ok(())
    }

    fn drive(&mut self, mode: OperatingMode) -> Result<()> {
        let (m0, m1) = mode.pins();
        self.m0.set_state(m0).map_err(Error::pin)?;
        self.m1.set_state(m1).map_err(Error::pin)?;
        self.mode = mode;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{AuxLine, CountingDelay};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn controller(
        m0: &[PinTransaction],
        m1: &[PinTransaction],
        aux: AuxLine,
    ) -> ModeController<PinMock, PinMock, AuxLine> {
        ModeController::new(PinMock::new(m0), PinMock::new(m1), aux)
    }

    fn finish(ctrl: ModeController<PinMock, PinMock, AuxLine>) {
        let (mut m0, mut m1, _) = ctrl.release();
        m0.done();
        m1.done();
    }

    #[test]
    fn pin_patterns_match_the_datasheet() {
        use embedded_hal::digital::PinState::{High, Low};

        assert_eq!(OperatingMode::Normal.pins(), (Low, Low));
        assert_eq!(OperatingMode::WakeUp.pins(), (High, Low));
        assert_eq!(OperatingMode::PowerSave.pins(), (High, Low));
        assert_eq!(OperatingMode::Config.pins(), (Low, High));
        assert_eq!(OperatingMode::Program.pins(), (High, High));
    }

    #[test]
    fn only_edges_through_normal_are_legal() {
        use OperatingMode::*;

        assert!(Normal.can_transition_to(Config));
        assert!(Config.can_transition_to(Normal));
        assert!(Program.can_transition_to(Normal));
        assert!(Config.can_transition_to(Config));
        assert!(!Config.can_transition_to(Program));
        assert!(!WakeUp.can_transition_to(PowerSave));
    }

    #[test]
    fn messages_flow_outside_config_and_program() {
        use OperatingMode::*;

        assert!(Normal.forwards_messages());
        assert!(WakeUp.forwards_messages());
        assert!(PowerSave.forwards_messages());
        assert!(!Config.forwards_messages());
        assert!(!Program.forwards_messages());
    }

    #[test]
    fn enters_config_mode() {
        let mut ctrl = controller(
            &[PinTransaction::set(PinState::Low)],
            &[PinTransaction::set(PinState::High)],
            AuxLine::ready(),
        );
        let mut delay = CountingDelay::default();

        ctrl.transition(OperatingMode::Config, &mut delay, &Timeouts::default())
            .unwrap();

        assert_eq!(ctrl.mode(), OperatingMode::Config);
        // Only the settle pause was slept
        assert_eq!(delay.elapsed_us(), 50_000);
        finish(ctrl);
    }

    #[test]
    fn same_mode_is_a_no_op() {
        let mut ctrl = controller(&[], &[], AuxLine::ready());
        let mut delay = CountingDelay::default();

        ctrl.transition(OperatingMode::Normal, &mut delay, &Timeouts::default())
            .unwrap();

        assert_eq!(delay.elapsed_us(), 0);
        finish(ctrl);
    }

    #[test]
    fn rejects_transitions_that_skip_normal() {
        let mut ctrl = controller(
            &[PinTransaction::set(PinState::Low)],
            &[PinTransaction::set(PinState::High)],
            AuxLine::ready(),
        );
        let mut delay = CountingDelay::default();
        let timeouts = Timeouts::without_settle();

        ctrl.transition(OperatingMode::Config, &mut delay, &timeouts)
            .unwrap();
        let result = ctrl.transition(OperatingMode::Program, &mut delay, &timeouts);

        assert_eq!(
            result,
            Err(Error::IllegalTransition {
                from: OperatingMode::Config,
                to: OperatingMode::Program,
            })
        );
        assert_eq!(ctrl.mode(), OperatingMode::Config);
        finish(ctrl);
    }

    #[test]
    fn times_out_within_the_mode_bound_when_aux_stays_low() {
        let mut ctrl = controller(
            &[PinTransaction::set(PinState::Low)],
            &[PinTransaction::set(PinState::High)],
            AuxLine::busy(),
        );
        let mut delay = CountingDelay::default();
        let timeouts = Timeouts::default();

        let result = ctrl.transition(OperatingMode::Config, &mut delay, &timeouts);

        assert_eq!(result, Err(Error::ModeTimeout));
        assert!(delay.elapsed_us() <= u64::from(timeouts.mode_ready_ms) * 1_000);
        // The pins were driven, so the recorded mode follows them
        assert_eq!(ctrl.mode(), OperatingMode::Config);
        finish(ctrl);
    }

    #[test]
    fn waits_for_a_busy_module_to_settle() {
        let mut ctrl = controller(
            &[PinTransaction::set(PinState::High)],
            &[PinTransaction::set(PinState::High)],
            AuxLine::ready_after(5),
        );
        let mut delay = CountingDelay::default();

        ctrl.transition(OperatingMode::Program, &mut delay, &Timeouts::without_settle())
            .unwrap();

        assert_eq!(ctrl.mode(), OperatingMode::Program);
        assert_eq!(delay.elapsed_us(), 5_000);
        finish(ctrl);
    }

    #[test]
    fn async_transition_drives_the_same_pins() {
        let mut ctrl = controller(
            &[
                PinTransaction::set(PinState::High),
                PinTransaction::set(PinState::Low),
            ],
            &[
                PinTransaction::set(PinState::Low),
                PinTransaction::set(PinState::Low),
            ],
            AuxLine::ready(),
        );
        let mut delay = CountingDelay::default();
        let timeouts = Timeouts::without_settle();

        futures::executor::block_on(async {
            ctrl.transition_async(OperatingMode::WakeUp, &mut delay, &timeouts)
                .await
                .unwrap();
            ctrl.transition_async(OperatingMode::Normal, &mut delay, &timeouts)
                .await
                .unwrap();
        });

        assert_eq!(ctrl.mode(), OperatingMode::Normal);
        finish(ctrl);
    }
}
