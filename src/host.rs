//! Clock and delay for running the driver on a host with tokio, e.g. a
//! Raspberry Pi talking to the sensor through a GPIO HAL.

use std::time::{Duration, Instant};

use embedded_hal_async::delay::DelayNs;

use crate::Clock;

/// Microsecond clock backed by [`Instant`], counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    /// Start a new clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_us(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Async delay backed by [`tokio::time::sleep`]. Needs a tokio runtime with
/// the time driver enabled.
///
/// Sleeps are only as precise as the runtime's timer wheel (about a
/// millisecond), which is fine for the inter-sample interval and the echo
/// timeouts but too coarse for the trigger pulse on most hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

impl DelayNs for TokioDelay {
    async fn delay_ns(&mut self, ns: u32) {
        tokio::time::sleep(Duration::from_nanos(u64::from(ns))).await;
    }

    async fn delay_us(&mut self, us: u32) {
        tokio::time::sleep(Duration::from_micros(u64::from(us))).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        tokio::time::sleep(Duration::from_millis(u64::from(ms))).await;
    }
}
