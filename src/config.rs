//! Engine configuration.
//!
//! Tuning knobs live here so callers can load them from JSON alongside the
//! rest of their application settings.

use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Configuration for temporal value operations.
///
/// All fields have sensible defaults; construct with `Config::default()` and
/// override with the `with_*` builders, or load from JSON.
///
/// # Example
///
/// ```rust
/// use tempo::Config;
///
/// let config = Config::default().with_decimal_digits(6);
///
/// let json = r#"{
///     "max_time_gap_seconds": 60.0,
///     "decimal_digits": 10
/// }"#;
/// let config = Config::from_json(json).unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum tolerated gap when bridging deleted or inserted stretches of
    /// time (None means bridge any gap)
    #[serde(default)]
    pub max_time_gap_seconds: Option<f64>,

    /// Maximum value distance tolerated when bridging (None means any)
    #[serde(default)]
    pub max_value_distance: Option<f64>,

    /// Decimal digits emitted when formatting float values (0-15, default: 12)
    #[serde(default = "Config::default_decimal_digits")]
    pub decimal_digits: usize,

    /// Initial sequence capacity of growable sequence-set buffers
    #[serde(default = "Config::default_initial_buffer_capacity")]
    pub initial_buffer_capacity: usize,
}

impl Config {
    const fn default_decimal_digits() -> usize {
        12
    }

    const fn default_initial_buffer_capacity() -> usize {
        4
    }

    pub fn with_max_time_gap_seconds(mut self, seconds: f64) -> Self {
        assert!(
            seconds.is_finite() && seconds >= 0.0,
            "Maximum time gap must be finite and non-negative"
        );
        self.max_time_gap_seconds = Some(seconds);
        self
    }

    pub fn with_max_value_distance(mut self, distance: f64) -> Self {
        assert!(
            distance.is_finite() && distance >= 0.0,
            "Maximum value distance must be finite and non-negative"
        );
        self.max_value_distance = Some(distance);
        self
    }

    pub fn with_decimal_digits(mut self, digits: usize) -> Self {
        assert!(digits <= 15, "Decimal digits must be between 0 and 15");
        self.decimal_digits = digits;
        self
    }

    pub fn with_initial_buffer_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Buffer capacity must be greater than zero");
        self.initial_buffer_capacity = capacity;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.decimal_digits > 15 {
            return Err("Decimal digits must be between 0 and 15".to_string());
        }

        if let Some(gap) = self.max_time_gap_seconds {
            if !gap.is_finite() {
                return Err("Maximum time gap must be finite (not NaN or infinity)".to_string());
            }
            if gap < 0.0 {
                return Err("Maximum time gap must be non-negative".to_string());
            }
        }

        if let Some(dist) = self.max_value_distance {
            if !dist.is_finite() {
                return Err(
                    "Maximum value distance must be finite (not NaN or infinity)".to_string(),
                );
            }
            if dist < 0.0 {
                return Err("Maximum value distance must be non-negative".to_string());
            }
        }

        if self.initial_buffer_capacity == 0 {
            return Err("Buffer capacity must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_time_gap_seconds: None,
            max_value_distance: None,
            decimal_digits: Self::default_decimal_digits(),
            initial_buffer_capacity: Self::default_initial_buffer_capacity(),
        }
    }
}
