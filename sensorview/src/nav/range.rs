use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A window that cannot exist: bounds not finite or not increasing.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid time range [{start}, {end}]")]
pub struct InvalidRange {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimeRange {
    /// Trailing window ending at the current time.
    #[default]
    Live,
    /// Explicit window, `start < end`. Build through [`TimeRange::fixed`].
    Fixed { start: f64, end: f64 },
}

impl TimeRange {
    pub fn fixed(start: f64, end: f64) -> Result<Self, InvalidRange> {
        if start.is_finite() && end.is_finite() && start < end {
            Ok(TimeRange::Fixed { start, end })
        } else {
            Err(InvalidRange { start, end })
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, TimeRange::Live)
    }

    /// Concrete bounds, resolving `Live` against `now`.
    pub fn resolve(&self, now: f64, live_span: f64) -> (f64, f64) {
        match *self {
            TimeRange::Live => (now - live_span, now),
            TimeRange::Fixed { start, end } => (start, end),
        }
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        match *self {
            TimeRange::Live => None,
            TimeRange::Fixed { start, end } => Some((start, end)),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown preset {0:?}, expected one of 15m, 1h, 6h, 24h, 7d, live")]
pub struct UnknownPreset(pub String);

/// Quick-select windows ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Last15Minutes,
    LastHour,
    Last6Hours,
    Last24Hours,
    Last7Days,
    Live,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Last15Minutes,
        Preset::LastHour,
        Preset::Last6Hours,
        Preset::Last24Hours,
        Preset::Last7Days,
        Preset::Live,
    ];

    /// Window length in seconds; `None` for `Live`.
    pub fn span(&self) -> Option<f64> {
        const MINUTE: f64 = 60.0;
        const HOUR: f64 = 60.0 * MINUTE;
        match self {
            Preset::Last15Minutes => Some(15.0 * MINUTE),
            Preset::LastHour => Some(HOUR),
            Preset::Last6Hours => Some(6.0 * HOUR),
            Preset::Last24Hours => Some(24.0 * HOUR),
            Preset::Last7Days => Some(7.0 * 24.0 * HOUR),
            Preset::Live => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Preset::Last15Minutes => "15m",
            Preset::LastHour => "1h",
            Preset::Last6Hours => "6h",
            Preset::Last24Hours => "24h",
            Preset::Last7Days => "7d",
            Preset::Live => "live",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Preset::ALL
            .into_iter()
            .find(|p| p.label() == key)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_requires_ordered_finite_bounds() {
        assert!(TimeRange::fixed(1.0, 2.0).is_ok());
        assert!(TimeRange::fixed(2.0, 2.0).is_err());
        assert!(TimeRange::fixed(3.0, 2.0).is_err());
        assert!(TimeRange::fixed(f64::NAN, 2.0).is_err());
        assert!(TimeRange::fixed(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn live_resolves_against_now() {
        assert_eq!(TimeRange::Live.resolve(1000.0, 60.0), (940.0, 1000.0));
        let fixed = TimeRange::fixed(1.0, 5.0).unwrap();
        assert_eq!(fixed.resolve(1000.0, 60.0), (1.0, 5.0));
    }

    #[test]
    fn presets_parse_and_print() {
        for p in Preset::ALL {
            assert_eq!(p.to_string().parse::<Preset>().unwrap(), p);
        }
        assert_eq!("1H".parse::<Preset>().unwrap(), Preset::LastHour);
        assert!("2h".parse::<Preset>().is_err());
        assert_eq!(Preset::Last7Days.span(), Some(604_800.0));
        assert_eq!(Preset::Live.span(), None);
    }
}
