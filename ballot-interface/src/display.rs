//! Conversion of contract integers into native integers for display.
use thiserror::Error;

use crate::U256;

/// A contract value does not fit into the native integer used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value {0} does not fit into a 64-bit integer")]
pub struct DisplayError(pub U256);

/// Converts a contract word into a `u64`, failing instead of truncating.
pub fn to_display_u64(value: U256) -> Result<u64, DisplayError> {
    if value > U256::from(u64::MAX) {
        return Err(DisplayError(value));
    }
    Ok(value.as_u64())
}
