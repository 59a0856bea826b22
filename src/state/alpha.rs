//! Exponential decay factor.

use super::AggregationError;

/// Weight retained from the previous smoothed value on every update.
///
/// Always strictly between 0 and 1. Higher values respond more slowly to new
/// readings.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DecayAlpha(f64);

impl DecayAlpha {
    /// Default retention used by the dashboard.
    pub const DEFAULT: f64 = 0.97;

    /// Create a decay factor, rejecting values outside (0, 1).
    pub fn new(value: f64) -> Result<Self, AggregationError> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(Self(value))
        } else {
            Err(AggregationError::InvalidAlpha(value))
        }
    }

    /// The retention factor.
    pub fn get(self) -> f64 {
        self.0
    }

    /// Weight given to the new reading (`1 - alpha`).
    pub fn complement(self) -> f64 {
        1.0 - self.0
    }

    /// Smooth a single pair of values.
    pub fn blend(self, old: f64, new: f64) -> f64 {
        self.0 * old + (1.0 - self.0) * new
    }
}

impl Default for DecayAlpha {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for DecayAlpha {
    type Error = AggregationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for DecayAlpha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_open_interval() {
        assert_eq!(DecayAlpha::new(0.5).unwrap().get(), 0.5);
        assert_eq!(DecayAlpha::default().get(), 0.97);
        assert!(DecayAlpha::try_from(0.0001).is_ok());
        assert!(DecayAlpha::try_from(0.9999).is_ok());
    }

    #[test]
    fn test_rejects_bounds_and_non_finite() {
        for value in [0.0, 1.0, -0.1, 1.5, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(DecayAlpha::new(value), Err(AggregationError::InvalidAlpha(_))),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_blend() {
        let alpha = DecayAlpha::new(0.5).unwrap();
        assert_eq!(alpha.blend(10.0, 20.0), 15.0);
        assert!((DecayAlpha::new(0.9).unwrap().complement() - 0.1).abs() < 1e-12);
    }
}
