//! Driver timing tunables
//!
//! All waits performed by the driver are bounded by one of these values.

/// Timeouts and delays used by the driver, all in milliseconds unless noted.
///
/// The defaults suit a module running at 9600 baud on its default air data
/// rate. Slow air rates with long packets keep AUX low for longer and may need
/// a larger `transmit_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeouts {
    /// Upper bound for a whole mode transition, both AUX waits included
    pub mode_ready_ms: u32,
    /// Pause after AUX reports ready before the new mode is used
    pub mode_settle_ms: u32,
    /// Time allowed for a complete configuration response
    pub response_ms: u32,
    /// Time allowed for a remote module to answer a wireless command
    pub remote_response_ms: u32,
    /// Time to wait for the first byte of an incoming message
    pub receive_ms: u32,
    /// Silence on the line that ends an incoming message
    pub inter_byte_ms: u32,
    /// Time allowed for the module to finish a transmission
    pub transmit_ms: u32,
    /// Sleep between two polls, in microseconds
    pub poll_interval_us: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            mode_ready_ms: 200,
            mode_settle_ms: 50,
            response_ms: 500,
            remote_response_ms: 3_000,
            receive_ms: 1_000,
            inter_byte_ms: 20,
            transmit_ms: 2_000,
            poll_interval_us: 1_000,
        }
    }
}

impl Timeouts {
    /// Same as the defaults but without the post-transition settle pause.
    ///
    /// Useful when the host already spaces out mode changes.
    pub fn without_settle() -> Self {
        Self {
            mode_settle_ms: 0,
            ..Self::default()
        }
    }
}
