//! Async driver for the [HC-SR04 ultrasonic ranging sensor](https://cdn.sparkfun.com/datasheets/Sensors/Proximity/HCSR04.pdf).
//!
//! The sensor is started with a 10 µs pulse on its trigger pin and answers by
//! holding its echo pin high for as long as the sound took to travel to the
//! target and back.
//!
//! ```no_run
//! # async fn demo<T, E>(trig: T, echo: E) -> Result<(), hcsr04::Error<T::Error, E::Error>>
//! # where
//! #     T: embedded_hal::digital::OutputPin,
//! #     E: embedded_hal::digital::InputPin,
//! # {
//! use hcsr04::host::{StdClock, TokioDelay};
//! use hcsr04::Hcsr04;
//!
//! let mut sensor = Hcsr04::new(trig, echo, TokioDelay, StdClock::new(), hcsr04::wait::Poll);
//! sensor.init()?;
//!
//! loop {
//!     match sensor.measure().await {
//!         Ok(reading) => println!("{reading}"),
//!         Err(e) if e.is_out_of_range() => println!("nothing in range"),
//!         Err(e) => return Err(e),
//!     }
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

mod clock;
mod error;
mod reading;
pub mod report;
mod sampler;
pub mod wait;

#[cfg(feature = "std")]
pub mod host;

pub use clock::Clock;
pub use error::Error;
pub use reading::{echo_to_cm, Reading};
pub use sampler::Sampler;

use core::time::Duration;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

#[cfg(feature = "tracing")]
use tracing::{debug, instrument, trace};

use crate::wait::WaitForEcho;

/// How long the trigger is held low before each pulse (microseconds).
pub const TRIGGER_SETTLE_US: u32 = 2;

/// Width of the trigger pulse that starts a ranging cycle (microseconds).
pub const TRIGGER_PULSE_US: u32 = 10;

/// Measurement timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How long to wait for the echo to rise after triggering, and for a
    /// previous echo to end before triggering.
    pub rise_timeout: Duration,
    /// Longest echo pulse accepted as a distance. The sensor holds the echo
    /// high for about 38 ms when nothing is in range, so the default of
    /// 25 ms (a little over 4 m) rejects those.
    pub max_pulse: Duration,
    /// Pause between two cycles of a [`Sampler`].
    pub interval: Duration,
}

impl Config {
    /// Default rise timeout.
    pub const DEFAULT_RISE_TIMEOUT: Duration = Duration::from_millis(25);
    /// Default maximum echo pulse width.
    pub const DEFAULT_MAX_PULSE: Duration = Duration::from_millis(25);
    /// Default sampling interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    pub(crate) fn rise_timeout_us(&self) -> u64 {
        duration_us(self.rise_timeout)
    }

    pub(crate) fn max_pulse_us(&self) -> u64 {
        duration_us(self.max_pulse)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rise_timeout: Self::DEFAULT_RISE_TIMEOUT,
            max_pulse: Self::DEFAULT_MAX_PULSE,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// An HC-SR04 ultrasonic range sensor.
///
/// `WAIT` picks how the echo is timed, see [`wait::Poll`] and
/// [`wait::Interrupt`].
pub struct Hcsr04<TRIG, ECHO, DELAY, CLOCK, WAIT> {
    trig: TRIG,
    echo: ECHO,
    delay: DELAY,
    clock: CLOCK,
    wait: WAIT,
    config: Config,
}

impl<TRIG, ECHO, DELAY, CLOCK, WAIT> Hcsr04<TRIG, ECHO, DELAY, CLOCK, WAIT> {
    /// Construct a new sensor with the default [`Config`], without touching
    /// the pins. Call [`Self::init`] before measuring.
    pub fn new(trig: TRIG, echo: ECHO, delay: DELAY, clock: CLOCK, wait: WAIT) -> Self {
        Self::with_config(trig, echo, delay, clock, wait, Config::default())
    }

    /// Like [`Self::new`], with explicit timing.
    pub fn with_config(
        trig: TRIG,
        echo: ECHO,
        delay: DELAY,
        clock: CLOCK,
        wait: WAIT,
        config: Config,
    ) -> Self {
        Self {
            trig,
            echo,
            delay,
            clock,
            wait,
            config,
        }
    }

    /// Current timing configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the timing configuration.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Give back the pins and timing resources.
    pub fn release(self) -> (TRIG, ECHO, DELAY, CLOCK, WAIT) {
        (self.trig, self.echo, self.delay, self.clock, self.wait)
    }
}

impl<TRIG, ECHO, DELAY, CLOCK, WAIT> Hcsr04<TRIG, ECHO, DELAY, CLOCK, WAIT>
where
    TRIG: OutputPin,
    ECHO: ErrorType,
    DELAY: DelayNs,
    CLOCK: Clock,
    WAIT: WaitForEcho<ECHO, DELAY, CLOCK>,
{
    /// Initialize the sensor by driving the trigger low.
    pub fn init(&mut self) -> Result<(), Error<TRIG::Error, ECHO::Error>> {
        #[cfg(feature = "tracing")]
        debug!(config = ?self.config, "initializing");

        self.trig.set_low().map_err(Error::Trigger)
    }

    /// Send the trigger pulse: low for [`TRIGGER_SETTLE_US`], then high for
    /// exactly [`TRIGGER_PULSE_US`], then low again.
    pub async fn trigger(&mut self) -> Result<(), Error<TRIG::Error, ECHO::Error>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("trigger");

        self.trig.set_low().map_err(Error::Trigger)?;
        self.delay.delay_us(TRIGGER_SETTLE_US).await;
        self.trig.set_high().map_err(Error::Trigger)?;
        self.delay.delay_us(TRIGGER_PULSE_US).await;
        self.trig.set_low().map_err(Error::Trigger)
    }

    /// Wait for the echo line to go idle, trigger the sensor and return the
    /// width of its echo pulse (microseconds). Use [`Self::measure`] unless
    /// you need the raw timing.
    ///
    /// Back-to-back calls are safe: an echo still high from the previous
    /// cycle delays the trigger by up to [`Config::rise_timeout`] instead of
    /// being measured.
    ///
    /// # Errors
    ///
    /// See [`WaitForEcho::wait_for_idle`] and [`WaitForEcho::pulse_width`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub async fn measure_echo(&mut self) -> Result<u32, Error<TRIG::Error, ECHO::Error>> {
        self.wait
            .wait_for_idle::<TRIG::Error>(&mut self.echo, &mut self.delay, &mut self.clock, &self.config)
            .await?;
        self.trigger().await?;

        let width = self
            .wait
            .pulse_width::<TRIG::Error>(&mut self.echo, &mut self.delay, &mut self.clock, &self.config)
            .await?;

        #[cfg(feature = "tracing")]
        trace!(width_us = width, "echo fell");
        #[cfg(feature = "defmt")]
        defmt::trace!("echo {} us", width);

        Ok(width)
    }

    /// Run one ranging cycle and convert the echo into a [`Reading`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub async fn measure(&mut self) -> Result<Reading, Error<TRIG::Error, ECHO::Error>> {
        let reading = Reading::from_echo(self.measure_echo().await?);

        #[cfg(feature = "tracing")]
        debug!(distance_cm = reading.distance_cm, "measured");

        Ok(reading)
    }

    /// Block the sensor's delay for `duration`. Used by [`Sampler`] between
    /// cycles.
    pub(crate) async fn pause(&mut self, duration: Duration) {
        wait::delay_us_long(&mut self.delay, duration_us(duration)).await;
    }
}
