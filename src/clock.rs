/// A free-running microsecond clock used to time the echo pulse.
///
/// Any `FnMut() -> u64` closure is a clock, which makes hooking up a HAL's
/// timer a one-liner:
///
/// ```ignore
/// let clock = || embassy_time::Instant::now().as_micros();
/// ```
pub trait Clock {
    /// Microseconds since some fixed point. Must never go backwards.
    fn now_us(&mut self) -> u64;
}

impl<F> Clock for F
where
    F: FnMut() -> u64,
{
    #[inline]
    fn now_us(&mut self) -> u64 {
        self()
    }
}
