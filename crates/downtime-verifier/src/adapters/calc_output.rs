//! Parser for `producer-downtime --calc-only` output.
//!
//! The tool prints free text, e.g.
//!
//! ```text
//! The command was successfully executed and returned '0'.
//! Average block time calculated: 1 seconds
//! Calculated start block: 14156
//! Calculated end block: 14216
//! ```

use crate::domain::BlockRange;
use crate::error::EstimationError;
use lazy_static::lazy_static;
use regex::Regex;

const START_LABEL: &str = "Calculated start block";
const END_LABEL: &str = "Calculated end block";

lazy_static! {
    static ref START_BLOCK: Regex =
        Regex::new(r"(?mi)Calculated start block:\s*(\d+)").expect("start block pattern");
    static ref END_BLOCK: Regex =
        Regex::new(r"(?mi)Calculated end block:\s*(\d+)").expect("end block pattern");
}

fn capture(pattern: &Regex, label: &'static str, output: &str) -> Result<u64, EstimationError> {
    let digits = pattern
        .captures(output)
        .and_then(|c| c.get(1))
        .ok_or_else(|| EstimationError::MissingField {
            field: label,
            output: output.to_string(),
        })?
        .as_str();

    digits
        .parse::<u64>()
        .map_err(|_| EstimationError::InvalidNumber {
            field: label,
            value: digits.to_string(),
        })
}

/// Extract the calculated block range from calc-only output.
pub fn parse_calc_output(output: &str) -> Result<BlockRange, EstimationError> {
    let start = capture(&START_BLOCK, START_LABEL, output)?;
    let end = capture(&END_BLOCK, END_LABEL, output)?;
    BlockRange::new(start, end).ok_or(EstimationError::InvalidRange { start, end })
}
