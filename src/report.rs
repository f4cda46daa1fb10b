//! The textual report emitted once per cycle, `Distance: <integer> cm`, and
//! its parser for the receiving end of the serial link.

use core::fmt;

use crate::Reading;

/// Line terminator written after every report, matching a serial `println`.
pub const LINE_ENDING: &str = "\r\n";

const PREFIX: &str = "Distance:";
const SUFFIX: &str = "cm";

/// Write one report line, terminator included.
pub fn write_report<W: fmt::Write>(out: &mut W, reading: &Reading) -> fmt::Result {
    write!(out, "{reading}{LINE_ENDING}")
}

/// Why a line could not be parsed as a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseReportError {
    /// The line does not start with `Distance:`.
    MissingPrefix,
    /// The line does not end with `cm`.
    MissingUnit,
    /// The value between prefix and unit is not a non-negative integer.
    InvalidValue,
}

impl fmt::Display for ParseReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseReportError::MissingPrefix => "line does not start with \"Distance:\"",
            ParseReportError::MissingUnit => "line does not end with \"cm\"",
            ParseReportError::InvalidValue => "distance is not an integer",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseReportError {}

/// Parse a report line back into a distance in centimeters.
///
/// Surrounding whitespace and line terminators are ignored, so lines can be
/// fed straight from a serial reader.
///
/// ```
/// assert_eq!(hcsr04::report::parse_report("Distance: 17 cm\r\n"), Ok(17));
/// ```
pub fn parse_report(line: &str) -> Result<u32, ParseReportError> {
    let rest = line
        .trim()
        .strip_prefix(PREFIX)
        .ok_or(ParseReportError::MissingPrefix)?;
    let value = rest
        .strip_suffix(SUFFIX)
        .ok_or(ParseReportError::MissingUnit)?
        .trim();

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseReportError::InvalidValue);
    }
    value.parse().map_err(|_| ParseReportError::InvalidValue)
}
