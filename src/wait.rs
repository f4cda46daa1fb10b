//! The HC-SR04 answers a trigger by holding its echo line high for as long as
//! the sound took to come back. This module provides a trait for timing that
//! pulse, regardless of whether the echo pin can raise interrupts.
//!
//! Every wait is bounded: a sensor that never answers yields
//! [`Error::NoEcho`] and one that answers with an over-long pulse yields
//! [`Error::EchoTooLong`].
//!
//! The sensor ignores triggers while its echo line is still high from an
//! earlier pulse (up to about 38 ms when nothing was in range), so
//! [`crate::Hcsr04::measure`] first waits for the line to go idle with
//! [`WaitForEcho::wait_for_idle`]. Only a low to high transition seen after
//! the trigger starts a pulse.

use core::pin::pin;

use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal_async::{delay::DelayNs, digital::Wait};

use crate::{Clock, Config, Error};

#[cfg(feature = "tracing")]
use tracing::trace;

/// Delay for `us` microseconds, split into `u32` sized steps.
pub(crate) async fn delay_us_long<DELAY: DelayNs>(delay: &mut DELAY, us: u64) {
    let mut left = us;
    while left > 0 {
        let step = u32::try_from(left).unwrap_or(u32::MAX);
        delay.delay_us(step).await;
        left -= u64::from(step);
    }
}

fn pulse_width(rise: u64, fall: u64) -> u32 {
    u32::try_from(fall.saturating_sub(rise)).unwrap_or(u32::MAX)
}

/// Trait for timing the echo pulse.
pub trait WaitForEcho<ECHO, DELAY, CLOCK>
where
    ECHO: ErrorType,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Wait for the echo line to be low, so that the next trigger is not
    /// ignored and the tail of an earlier pulse is not taken for a new one.
    ///
    /// # Errors
    ///
    /// - [`Error::EchoTooLong`] if the line is still high after
    ///   [`Config::rise_timeout`].
    /// - [`Error::Echo`] if reading the pin fails.
    #[allow(async_fn_in_trait)]
    async fn wait_for_idle<TE>(
        &mut self,
        echo: &mut ECHO,
        delay: &mut DELAY,
        clock: &mut CLOCK,
        config: &Config,
    ) -> Result<(), Error<TE, ECHO::Error>>;

    /// Wait for the echo pulse that follows a trigger and return its width
    /// in microseconds. Expects the line to have been idle before the
    /// trigger.
    ///
    /// # Errors
    ///
    /// - [`Error::NoEcho`] if the echo does not rise within
    ///   [`Config::rise_timeout`].
    /// - [`Error::EchoTooLong`] if the echo stays high longer than
    ///   [`Config::max_pulse`].
    /// - [`Error::Echo`] if reading the pin fails.
    #[allow(async_fn_in_trait)]
    async fn pulse_width<TE>(
        &mut self,
        echo: &mut ECHO,
        delay: &mut DELAY,
        clock: &mut CLOCK,
        config: &Config,
    ) -> Result<u32, Error<TE, ECHO::Error>>;
}

/// Time the echo by polling the pin continuously, like Arduino's `pulseIn`.
///
/// Works with any [`InputPin`] but keeps the CPU busy for the whole pulse.
pub struct Poll;

impl<ECHO, DELAY, CLOCK> WaitForEcho<ECHO, DELAY, CLOCK> for Poll
where
    ECHO: InputPin,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    async fn wait_for_idle<TE>(
        &mut self,
        echo: &mut ECHO,
        _delay: &mut DELAY,
        clock: &mut CLOCK,
        config: &Config,
    ) -> Result<(), Error<TE, ECHO::Error>> {
        let timeout = config.rise_timeout_us();

        let start = clock.now_us();
        while echo.is_high().map_err(Error::Echo)? {
            if clock.now_us().saturating_sub(start) > timeout {
                return Err(Error::EchoTooLong);
            }
        }

        Ok(())
    }

    #[inline]
    async fn pulse_width<TE>(
        &mut self,
        echo: &mut ECHO,
        _delay: &mut DELAY,
        clock: &mut CLOCK,
        config: &Config,
    ) -> Result<u32, Error<TE, ECHO::Error>> {
        let rise_timeout = config.rise_timeout_us();
        let max_pulse = config.max_pulse_us();

        let start = clock.now_us();
        while echo.is_low().map_err(Error::Echo)? {
            if clock.now_us().saturating_sub(start) > rise_timeout {
                return Err(Error::NoEcho);
            }
        }

        let rise = clock.now_us();
        #[cfg(feature = "tracing")]
        trace!(after_us = rise.saturating_sub(start), "echo rose");

        while echo.is_high().map_err(Error::Echo)? {
            if clock.now_us().saturating_sub(rise) > max_pulse {
                return Err(Error::EchoTooLong);
            }
        }

        Ok(pulse_width(rise, clock.now_us()))
    }
}

/// Time the echo by awaiting edges on a pin that supports [`Wait`], racing
/// each edge against the delay.
pub struct Interrupt;

impl<ECHO, DELAY, CLOCK> WaitForEcho<ECHO, DELAY, CLOCK> for Interrupt
where
    ECHO: Wait,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    async fn wait_for_idle<TE>(
        &mut self,
        echo: &mut ECHO,
        delay: &mut DELAY,
        _clock: &mut CLOCK,
        config: &Config,
    ) -> Result<(), Error<TE, ECHO::Error>> {
        use futures_util::future::{select, Either};

        let timeout = config.rise_timeout_us();
        match select(pin!(echo.wait_for_low()), pin!(delay_us_long(delay, timeout))).await {
            Either::Left((Ok(()), _)) => Ok(()),
            Either::Left((Err(e), _)) => Err(Error::Echo(e)),
            Either::Right(_) => Err(Error::EchoTooLong),
        }
    }

    #[inline]
    async fn pulse_width<TE>(
        &mut self,
        echo: &mut ECHO,
        delay: &mut DELAY,
        clock: &mut CLOCK,
        config: &Config,
    ) -> Result<u32, Error<TE, ECHO::Error>> {
        use futures_util::future::{select, Either};

        let rise_timeout = config.rise_timeout_us();
        let max_pulse = config.max_pulse_us();

        match select(
            pin!(echo.wait_for_rising_edge()),
            pin!(delay_us_long(delay, rise_timeout)),
        )
        .await
        {
            Either::Left((Ok(()), _)) => {}
            Either::Left((Err(e), _)) => return Err(Error::Echo(e)),
            Either::Right(_) => return Err(Error::NoEcho),
        }
        let rise = clock.now_us();

        match select(
            pin!(echo.wait_for_falling_edge()),
            pin!(delay_us_long(delay, max_pulse)),
        )
        .await
        {
            Either::Left((Ok(()), _)) => {}
            Either::Left((Err(e), _)) => return Err(Error::Echo(e)),
            Either::Right(_) => return Err(Error::EchoTooLong),
        }

        Ok(pulse_width(rise, clock.now_us()))
    }
}
