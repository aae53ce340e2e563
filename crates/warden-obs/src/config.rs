//! Encoder constants and their validation.

use std::error::Error;
use std::fmt;

/// Physical ranges used to normalize raw observation values.
///
/// Every field is a divisor; validation requires each to be finite
/// and strictly positive so normalization can never divide by zero.
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderConfig {
    /// Half-extent of the playable area in world units. Default: 50.
    pub world_extent: f32,
    /// Maximum speed in world units per second. Default: 10.
    pub max_speed: f32,
    /// Maximum health of any observed entity. Default: 200.
    pub max_health: f32,
    /// Number of distinct hostile kinds. Default: 8.
    pub hostile_type_count: u8,
    /// Number of distinct pickup kinds. Default: 4.
    pub pickup_type_count: u8,
    /// Episode length used to normalize elapsed time (s). Default: 600.
    pub max_episode_s: f32,
    /// Horizon for "time since event" inputs (s). Default: 10.
    pub event_window_s: f32,
    /// Highest wave index expected. Default: 20.
    pub max_wave: u32,
    /// Cap applied to the team damage dealt/taken ratio. Default: 5.
    pub damage_ratio_cap: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            world_extent: 50.0,
            max_speed: 10.0,
            max_health: 200.0,
            hostile_type_count: 8,
            pickup_type_count: 4,
            max_episode_s: 600.0,
            event_window_s: 10.0,
            max_wave: 20,
            damage_ratio_cap: 5.0,
        }
    }
}

/// An encoder constant failed validation.
#[derive(Clone, Debug, PartialEq)]
pub enum EncoderConfigError {
    /// A divisor is NaN, infinite, zero, or negative.
    NonPositive {
        /// Name of the offending field.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A category count is zero.
    EmptyCategory {
        /// Name of the offending field.
        name: &'static str,
    },
}

impl fmt::Display for EncoderConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive { name, value } => {
                write!(f, "{name} must be finite and positive, got {value}")
            }
            Self::EmptyCategory { name } => write!(f, "{name} must be at least 1"),
        }
    }
}

impl Error for EncoderConfigError {}

impl EncoderConfig {
    /// Check that every divisor is usable.
    pub fn validate(&self) -> Result<(), EncoderConfigError> {
        let divisors = [
            ("world_extent", self.world_extent),
            ("max_speed", self.max_speed),
            ("max_health", self.max_health),
            ("max_episode_s", self.max_episode_s),
            ("event_window_s", self.event_window_s),
            ("damage_ratio_cap", self.damage_ratio_cap),
        ];
        for (name, value) in divisors {
            if !value.is_finite() || value <= 0.0 {
                return Err(EncoderConfigError::NonPositive {
                    name,
                    value: f64::from(value),
                });
            }
        }
        if self.hostile_type_count == 0 {
            return Err(EncoderConfigError::EmptyCategory {
                name: "hostile_type_count",
            });
        }
        if self.pickup_type_count == 0 {
            return Err(EncoderConfigError::EmptyCategory {
                name: "pickup_type_count",
            });
        }
        if self.max_wave == 0 {
            return Err(EncoderConfigError::EmptyCategory { name: "max_wave" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EncoderConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_world_extent_rejected() {
        let cfg = EncoderConfig {
            world_extent: 0.0,
            ..EncoderConfig::default()
        };
        match cfg.validate() {
            Err(EncoderConfigError::NonPositive { name, .. }) => assert_eq!(name, "world_extent"),
            other => panic!("expected NonPositive, got {other:?}"),
        }
    }

    #[test]
    fn nan_max_health_rejected() {
        let cfg = EncoderConfig {
            max_health: f32::NAN,
            ..EncoderConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(EncoderConfigError::NonPositive { name: "max_health", .. })
        ));
    }

    #[test]
    fn zero_pickup_types_rejected() {
        let cfg = EncoderConfig {
            pickup_type_count: 0,
            ..EncoderConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(EncoderConfigError::EmptyCategory {
                name: "pickup_type_count"
            })
        );
    }
}
