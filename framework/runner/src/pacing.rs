use std::time::Duration;

use rand::Rng;
use stampede_core::prelude::ConfigError;

/// Check that a delay range is usable, `min` must not be greater than `max`.
pub fn validate_range(min: Duration, max: Duration) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::PaceRangeInverted { min, max });
    }
    Ok(())
}

/// Pick the next think-time delay.
///
/// Equal bounds give a fixed delay, otherwise the delay is drawn uniformly from the closed range
/// `[min, max]`.
pub fn next_delay<R: Rng + ?Sized>(
    min: Duration,
    max: Duration,
    rng: &mut R,
) -> Result<Duration, ConfigError> {
    validate_range(min, max)?;
    if min == max {
        return Ok(min);
    }
    Ok(rng.gen_range(min..=max))
}
