use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single value of a series at one axis position.
///
/// Text never travels past the parse step: every cell is turned into either
/// a finite number or `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Reading {
    Present(f64),
    #[default]
    Absent,
}

impl Reading {
    /// Non-finite numbers carry no plottable information and become `Absent`.
    pub fn from_f64(value: f64) -> Reading {
        if value.is_finite() {
            Reading::Present(value)
        } else {
            Reading::Absent
        }
    }

    /// Parses one text cell. Blank or malformed cells are `Absent`.
    pub fn parse(cell: &str) -> Reading {
        match cell.trim().parse::<f64>() {
            Ok(v) => Reading::from_f64(v),
            Err(_) => Reading::Absent,
        }
    }

    pub fn try_as_f64(&self) -> Option<f64> {
        match *self {
            Reading::Present(v) => Some(v),
            Reading::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Reading::Absent)
    }
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Reading::Absent, Reading::from_f64)
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::from_f64(value)
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Reading::Present(x) => write!(f, "{}", x),
            Reading::Absent => write!(f, "?"),
        }
    }
}

// On the wire a reading is `number | null`.
impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.try_as_f64().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<f64>::deserialize(deserializer).map(Reading::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the epoch, fractional allowed.
    pub time: f64,
    pub value: Reading,
}

impl Sample {
    pub fn new(time: f64, value: impl Into<Reading>) -> Sample {
        Sample {
            time,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}: {}", self.time, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub id: String,
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn new(id: impl Into<String>) -> Series {
        Series {
            id: id.into(),
            samples: vec![],
        }
    }

    pub fn with_samples(id: impl Into<String>, samples: Vec<Sample>) -> Series {
        Series {
            id: id.into(),
            samples,
        }
    }

    pub fn push(&mut self, time: f64, value: impl Into<Reading>) {
        self.samples.push(Sample::new(time, value));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cells() {
        assert_eq!(Reading::parse("1.5"), Reading::Present(1.5));
        assert_eq!(Reading::parse(" 2 "), Reading::Present(2.0));
        assert_eq!(Reading::parse("x"), Reading::Absent);
        assert_eq!(Reading::parse(""), Reading::Absent);
        assert_eq!(Reading::parse("NaN"), Reading::Absent);
        assert_eq!(Reading::parse("inf"), Reading::Absent);
    }

    #[test]
    fn wire_format_is_number_or_null() {
        let values = vec![Reading::Present(1.25), Reading::Absent];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, "[1.25,null]");
        let back: Vec<Reading> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
