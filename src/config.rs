//! Evaluation settings.

use crate::error::InitError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROUND: u32 = 5;
pub const DEFAULT_PRECISION: u32 = 15;
/// f64 cannot carry more significant decimal digits than this.
pub const MAX_PRECISION: u32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// Digits after the decimal point that `call` rounds results to.
    pub round_digits: u32,
    /// Significant digits every node result is normalized to before deduplication.
    pub precision: u32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { round_digits: DEFAULT_ROUND, precision: DEFAULT_PRECISION }
    }
}

impl EvalConfig {
    pub fn from_json(json: &str) -> Result<Self, InitError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| InitError::BadConfig { reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InitError> {
        if self.precision == 0 || self.precision > MAX_PRECISION {
            return Err(InitError::BadConfig {
                reason: format!("precision must be within 1..={}, got {}", MAX_PRECISION, self.precision),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EvalConfig::from_json(r#"{"round_digits": 2}"#).unwrap();
        assert_eq!(config.round_digits, 2);
        assert_eq!(config.precision, DEFAULT_PRECISION);
    }

    #[test]
    fn test_rejects_out_of_range_precision() {
        let err = EvalConfig::from_json(r#"{"precision": 40}"#).unwrap_err();
        assert!(matches!(err, InitError::BadConfig { .. }));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(EvalConfig::from_json(r#"{"rounding": 2}"#).is_err());
    }
}
