//! Rescaling of raw analog magnitudes into the canonical `[-1.0, 1.0]` domain.
use crate::config::ConfigError;

/// Value range reported by one analog control of a device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogDomain {
    max: f64,
    min: f64,
    zero: f64,
    epsilon: f64,
    /// Optional asymmetric dead zone band. When set it replaces the
    /// `zero +/- epsilon` band and its midpoint is used as the center.
    band: Option<[f64; 2]>,
}

impl AnalogDomain {
    /// Creates a new analog domain. Fails if `min <= zero <= max` does not
    /// hold or if the dead zone does not fit inside the range.
    pub fn new(max: f64, min: f64, zero: f64, epsilon: f64) -> Result<Self, ConfigError> {
        let domain = Self {
            max,
            min,
            zero,
            epsilon,
            band: None,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Returns a copy of this domain using the given asymmetric dead zone band
    pub fn with_band(self, lo: f64, hi: f64) -> Result<Self, ConfigError> {
        let domain = Self {
            band: Some([lo, hi]),
            ..self
        };
        domain.validate()?;
        Ok(domain)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidDomain(reason));
        let values = [self.max, self.min, self.zero, self.epsilon];
        if values.iter().any(|v| !v.is_finite()) {
            return invalid(format!("non-finite value in {values:?}"));
        }
        if !(self.min <= self.zero && self.zero <= self.max) {
            return invalid(format!(
                "zero {} is not within [{}, {}]",
                self.zero, self.min, self.max
            ));
        }
        if self.epsilon < 0.0 {
            return invalid(format!("negative epsilon {}", self.epsilon));
        }
        if self.epsilon >= self.half_span() {
            return invalid(format!(
                "epsilon {} is not smaller than half the range {}",
                self.epsilon,
                self.half_span()
            ));
        }
        if let Some([lo, hi]) = self.band {
            if !(lo.is_finite() && hi.is_finite() && self.min <= lo && lo <= hi && hi <= self.max)
            {
                return invalid(format!(
                    "dead zone [{lo}, {hi}] is not within [{}, {}]",
                    self.min, self.max
                ));
            }
        }
        Ok(())
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn zero(&self) -> f64 {
        self.zero
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the inclusive dead zone band
    pub fn dead_zone(&self) -> (f64, f64) {
        match self.band {
            Some([lo, hi]) => (lo, hi),
            None => (self.zero - self.epsilon, self.zero + self.epsilon),
        }
    }

    /// Returns the value that maps to 0.0
    pub fn midpoint(&self) -> f64 {
        match self.band {
            Some([lo, hi]) => (lo + hi) / 2.0,
            None => self.zero,
        }
    }

    pub fn half_span(&self) -> f64 {
        (self.max - self.min) / 2.0
    }

    /// Rescale the given raw value. Values inside the dead zone are exactly
    /// 0.0. Values outside the declared range are not clamped.
    pub fn normalize(&self, raw_value: f64) -> f64 {
        let (lo, hi) = self.dead_zone();
        if lo <= raw_value && raw_value <= hi {
            return 0.0;
        }
        (raw_value - self.midpoint()) / self.half_span()
    }
}

/// How values of an analog-kind control are converted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisClass {
    /// Stick or trigger axis rescaled through its domain
    Analog(AnalogDomain),
    /// Tri-state pad axis whose raw value is passed unchanged
    PassThrough,
}

impl AxisClass {
    pub fn convert(&self, raw_value: i16) -> f64 {
        match self {
            AxisClass::Analog(domain) => domain.normalize(raw_value as f64),
            AxisClass::PassThrough => raw_value as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_normalize_xinput_stick() -> Result<(), Box<dyn Error>> {
        let domain = AnalogDomain::new(32767.0, -32768.0, 0.0, 129.0)?;
        let value = domain.normalize(4000.0);
        assert!((value - 4000.0 / 32767.5).abs() < 1e-9, "got {value}");
        assert!((value - 0.1221).abs() < 1e-4);
        assert_eq!(domain.normalize(129.0), 0.0);
        assert_eq!(domain.normalize(-129.0), 0.0);
        assert!(domain.normalize(130.0) > 0.0);
        Ok(())
    }

    #[test]
    fn test_normalize_direct_input_dead_zone() -> Result<(), Box<dyn Error>> {
        let domain = AnalogDomain::new(255.0, 0.0, 127.5, 0.5)?;
        assert_eq!(domain.normalize(127.0), 0.0);
        assert_eq!(domain.normalize(128.0), 0.0);
        assert_eq!(domain.normalize(255.0), 1.0);
        assert_eq!(domain.normalize(0.0), -1.0);
        Ok(())
    }

    #[test]
    fn test_normalize_symmetric_extremes() -> Result<(), Box<dyn Error>> {
        let domain = AnalogDomain::new(32767.0, -32767.0, 0.0, 0.0)?;
        assert_eq!(domain.normalize(32767.0), 1.0);
        assert_eq!(domain.normalize(-32767.0), -1.0);
        assert_eq!(domain.normalize(0.0), 0.0);
        Ok(())
    }

    #[test]
    fn test_normalize_is_not_clamped() -> Result<(), Box<dyn Error>> {
        let domain = AnalogDomain::new(255.0, 0.0, 127.5, 0.5)?;
        assert!(domain.normalize(300.0) > 1.0);
        assert!(domain.normalize(-40.0) < -1.0);
        Ok(())
    }

    #[test]
    fn test_asymmetric_band() -> Result<(), Box<dyn Error>> {
        let domain = AnalogDomain::new(255.0, 0.0, 127.5, 0.5)?.with_band(120.0, 130.0)?;
        assert_eq!(domain.midpoint(), 125.0);
        assert_eq!(domain.normalize(120.0), 0.0);
        assert_eq!(domain.normalize(130.0), 0.0);
        assert_eq!(domain.normalize(252.5), 1.0);
        Ok(())
    }

    #[test]
    fn test_invalid_domains() {
        assert!(AnalogDomain::new(255.0, 0.0, 300.0, 0.5).is_err());
        assert!(AnalogDomain::new(255.0, 0.0, 127.5, -1.0).is_err());
        assert!(AnalogDomain::new(255.0, 0.0, 127.5, 127.5).is_err());
        assert!(AnalogDomain::new(f64::NAN, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_pass_through() {
        assert_eq!(AxisClass::PassThrough.convert(-1), -1.0);
        assert_eq!(AxisClass::PassThrough.convert(1), 1.0);
    }
}
