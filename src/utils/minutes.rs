use std::str::FromStr;

use anyhow::anyhow;

/// Positive amount of minutes, as typed into the timer. Fractions are allowed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Minutes(f64);

impl Minutes {
    pub fn new_opt(value: f64) -> Option<Minutes> {
        if value.is_finite() && value > 0. {
            Some(Minutes(value))
        } else {
            None
        }
    }

    /// Whole seconds covered by this amount, truncating fractions of a second.
    pub fn as_seconds(&self) -> u64 {
        (self.0 * 60.) as u64
    }
}

impl FromStr for Minutes {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "15m" reads the same as "15"
        let s = s.trim().trim_end_matches('m');
        let v = s.parse::<f64>()?;
        Minutes::new_opt(v)
            .ok_or_else(|| anyhow!("Please enter a valid positive number for minutes, got {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::Minutes;

    #[test]
    fn test_parse_minutes() {
        assert_eq!("1.5".parse::<Minutes>().unwrap().as_seconds(), 90);
        assert_eq!(" 25m ".parse::<Minutes>().unwrap().as_seconds(), 1500);
        assert_eq!("0.01".parse::<Minutes>().unwrap().as_seconds(), 0);
    }

    #[test]
    fn test_reject_non_positive() {
        assert!("0".parse::<Minutes>().is_err());
        assert!("-3".parse::<Minutes>().is_err());
        assert!("soon".parse::<Minutes>().is_err());
        assert!("NaN".parse::<Minutes>().is_err());
    }
}
