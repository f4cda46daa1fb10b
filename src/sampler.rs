use core::{convert::Infallible, fmt};

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

#[cfg(feature = "tracing")]
use tracing::{instrument, warn};

use crate::{report, wait::WaitForEcho, Clock, Error, Hcsr04, Reading};

/// The sense, report, sleep loop: triggers the sensor, writes one
/// `Distance: <integer> cm` line per reading to `out`, then waits
/// [`crate::Config::interval`].
pub struct Sampler<TRIG, ECHO, DELAY, CLOCK, WAIT, OUT> {
    sensor: Hcsr04<TRIG, ECHO, DELAY, CLOCK, WAIT>,
    out: OUT,
}

impl<TRIG, ECHO, DELAY, CLOCK, WAIT, OUT> Sampler<TRIG, ECHO, DELAY, CLOCK, WAIT, OUT> {
    /// Wrap a sensor and the sink its reports go to.
    pub fn new(sensor: Hcsr04<TRIG, ECHO, DELAY, CLOCK, WAIT>, out: OUT) -> Self {
        Self { sensor, out }
    }

    /// The wrapped sensor.
    pub fn sensor(&mut self) -> &mut Hcsr04<TRIG, ECHO, DELAY, CLOCK, WAIT> {
        &mut self.sensor
    }

    /// Give back the sensor and the output sink.
    pub fn release(self) -> (Hcsr04<TRIG, ECHO, DELAY, CLOCK, WAIT>, OUT) {
        (self.sensor, self.out)
    }
}

impl<TRIG, ECHO, DELAY, CLOCK, WAIT, OUT> Sampler<TRIG, ECHO, DELAY, CLOCK, WAIT, OUT>
where
    TRIG: OutputPin,
    ECHO: ErrorType,
    DELAY: DelayNs,
    CLOCK: Clock,
    WAIT: WaitForEcho<ECHO, DELAY, CLOCK>,
    OUT: fmt::Write,
{
    /// One-time pin setup. See [`Hcsr04::init`].
    pub fn init(&mut self) -> Result<(), Error<TRIG::Error, ECHO::Error>> {
        self.sensor.init()
    }

    /// Run a single cycle.
    ///
    /// Returns the reading that was reported, or `None` if the sensor saw
    /// nothing in range; in that case no line is written. The interval is
    /// waited out either way.
    ///
    /// # Errors
    ///
    /// Pin failures and [`Error::Output`] if the report cannot be written.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub async fn sample_once(&mut self) -> Result<Option<Reading>, Error<TRIG::Error, ECHO::Error>> {
        let reading = match self.sensor.measure().await {
            Ok(reading) => {
                report::write_report(&mut self.out, &reading).map_err(|_| Error::Output)?;
                Some(reading)
            }
            Err(e) if e.is_out_of_range() => {
                #[cfg(feature = "tracing")]
                warn!(error = %e, "no distance this cycle");
                #[cfg(feature = "defmt")]
                defmt::warn!("no distance this cycle");
                None
            }
            Err(e) => return Err(e),
        };

        let interval = self.sensor.config().interval;
        self.sensor.pause(interval).await;

        Ok(reading)
    }

    /// Sample forever. Only returns if a pin or the output fails.
    pub async fn run(&mut self) -> Result<Infallible, Error<TRIG::Error, ECHO::Error>> {
        loop {
            self.sample_once().await?;
        }
    }
}
