//! Interactive prompt for the time range

use crate::error::{Result, StemcutError};
use std::io::{BufRead, Write};

/// Ask for whichever bound is missing
///
/// Only parses integers; range checks belong to the pipeline.
pub fn resolve_time_bounds<R: BufRead, W: Write>(
    start: Option<i64>,
    end: Option<i64>,
    input: &mut R,
    output: &mut W,
) -> Result<(i64, i64)> {
    let start = match start {
        Some(value) => value,
        None => ask_seconds("Start time (in seconds): ", input, output)?,
    };
    let end = match end {
        Some(value) => value,
        None => ask_seconds("End time (in seconds): ", input, output)?,
    };
    Ok((start, end))
}

fn ask_seconds<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<i64> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(StemcutError::InvalidTimeInput {
            input: "<end of input>".to_string(),
        });
    }

    let answer = line.trim();
    answer
        .parse::<i64>()
        .map_err(|_| StemcutError::InvalidTimeInput {
            input: answer.to_string(),
        })
}
