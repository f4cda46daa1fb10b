use core::fmt;

/// Errors returned by the sensor and the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<TE, EE> {
    /// Driving the trigger pin failed.
    Trigger(TE),
    /// Reading the echo pin failed.
    Echo(EE),
    /// The echo line never went high within the rise timeout. Usually a
    /// disconnected sensor.
    NoEcho,
    /// The echo line stayed high for longer than the maximum pulse width,
    /// which is what the sensor does when nothing is in range.
    EchoTooLong,
    /// Writing the report line failed. Only returned by
    /// [`crate::Sampler`].
    Output,
}

impl<TE, EE> Error<TE, EE> {
    /// Whether this error means "no distance this cycle" rather than a
    /// hardware fault.
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self, Error::NoEcho | Error::EchoTooLong)
    }
}

impl<TE: fmt::Debug, EE: fmt::Debug> fmt::Display for Error<TE, EE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Trigger(e) => write!(f, "trigger pin error: {e:?}"),
            Error::Echo(e) => write!(f, "echo pin error: {e:?}"),
            Error::NoEcho => f.write_str("no echo received"),
            Error::EchoTooLong => f.write_str("echo pulse too long, target out of range"),
            Error::Output => f.write_str("failed to write report"),
        }
    }
}

#[cfg(feature = "std")]
impl<TE: fmt::Debug, EE: fmt::Debug> std::error::Error for Error<TE, EE> {}
