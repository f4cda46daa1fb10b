//! Per-cycle readings and the echo-time to distance conversion.

use core::fmt;

/// Speed of sound in dry air at 20 °C, in ten-thousandths of a centimeter
/// per microsecond (0.0343 cm/µs).
const SOUND_SPEED_CM_PER_US_E4: u64 = 343;

/// Convert the width of an echo pulse (microseconds) into the distance to the
/// target in whole centimeters, truncating.
///
/// The echo covers the way there and back, hence the division by two.
///
/// ```
/// assert_eq!(hcsr04::echo_to_cm(1000), 17);
/// assert_eq!(hcsr04::echo_to_cm(5800), 99);
/// ```
pub const fn echo_to_cm(echo_us: u32) -> u32 {
    (echo_us as u64 * SOUND_SPEED_CM_PER_US_E4 / 20_000) as u32
}

/// A single HC-SR04 measurement. Only meaningful for the cycle that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Width of the echo pulse (microseconds).
    pub echo_us: u32,
    /// Distance to the target (centimeters).
    pub distance_cm: u32,
}

impl Reading {
    /// Build a reading from a measured echo pulse width.
    #[inline]
    pub const fn from_echo(echo_us: u32) -> Self {
        Self {
            echo_us,
            distance_cm: echo_to_cm(echo_us),
        }
    }
}

/// Formats the report line without a terminator, e.g. `Distance: 17 cm`.
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Distance: {} cm", self.distance_cm)
    }
}
