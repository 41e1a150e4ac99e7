use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Time-axis slice `[start, end)` as given by a user. `None` selects the
/// respective end of the axis, negative values count back from the end.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Interval {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

impl Interval {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }

    pub fn full() -> Self {
        Self::default()
    }
}

impl From<(Option<i64>, Option<i64>)> for Interval {
    fn from((start, end): (Option<i64>, Option<i64>)) -> Self {
        Self { start, end }
    }
}

/// Resolves `interval` against an axis of `array_length` points.
///
/// The returned pair is `(start, end)` with `start` inclusive and `end`
/// exclusive, satisfying `0 <= start < end <= array_length`.
pub fn convert_interval(interval: Interval, array_length: usize) -> Result<(usize, usize)> {
    let len = array_length as i64;
    let resolve = |index: Option<i64>, default: i64| -> Result<i64> {
        match index {
            None => Ok(default),
            Some(i) if i < 0 => {
                if i <= -len {
                    return Err(anyhow!(
                        "Interval index {} is not in valid range for length {}",
                        i,
                        array_length
                    ));
                }
                Ok(len + i)
            }
            Some(i) => Ok(i),
        }
    };

    let start = resolve(interval.start, 0)?;
    let end = resolve(interval.end, len)?;

    if start >= end {
        return Err(anyhow!(
            "Order of indices for interval is not valid: start {} must be less than end {}",
            start,
            end
        ));
    }
    if end > len {
        return Err(anyhow!(
            "Interval end {} exceeds length {}",
            end,
            array_length
        ));
    }
    Ok((start as usize, end as usize))
}
