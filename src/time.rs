//! Time-of-day parsing for stop-time events.

use crate::error::{AtlasError, Result};

/// Converts an `HH:MM:SS` time of day into minutes since midnight.
///
/// Hours of 24 and above are kept as-is: `25:00:00` is service running after
/// midnight on the same service day and maps to `1500.0`, not `60.0`.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidTime`] unless the string splits into exactly
/// three non-negative integer fields.
pub fn time_to_minutes(time: &str) -> Result<f64> {
    let invalid = || AtlasError::InvalidTime(time.to_owned());

    let mut fields = time.trim().split(':');
    let (Some(h), Some(m), Some(s), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };

    let hours: u32 = h.trim().parse().map_err(|_| invalid())?;
    let minutes: u32 = m.trim().parse().map_err(|_| invalid())?;
    let seconds: u32 = s.trim().parse().map_err(|_| invalid())?;

    Ok(f64::from(hours) * 60.0 + f64::from(minutes) + f64::from(seconds) / 60.0)
}
