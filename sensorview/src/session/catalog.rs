//! Sensor catalog and glob series filters
//!
//! The catalog maps a group name to the sensor ids in it. Filters address
//! sensors by path, `/<group>/<sensor>`, using glob syntax. A pattern naming
//! only a group, e.g. `/line_a`, matches every sensor in that group.

use glob::Pattern;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorCatalog {
    groups: IndexMap<String, Vec<String>>,
}

impl SensorCatalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, group: impl Into<String>, sensors: Vec<String>) {
        self.groups.insert(group.into(), sensors);
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups.iter().map(|(g, s)| (g.as_str(), s.as_slice()))
    }

    /// Every sensor id in catalog order. An id listed in several groups is
    /// yielded once per group.
    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.groups.values().flatten().map(String::as_str)
    }

    pub fn group_of(&self, sensor: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, sensors)| sensors.iter().any(|s| s == sensor))
            .map(|(g, _)| g.as_str())
    }

    /// Sensors whose id contains `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<&str> {
        let term = term.to_lowercase();
        self.sensors()
            .filter(|s| s.to_lowercase().contains(&term))
            .collect()
    }

    /// Sensors matched by any of `filters`, deduplicated, in catalog order.
    pub fn expand(&self, filters: &[SeriesFilter]) -> Vec<String> {
        let mut out = indexmap::IndexSet::new();
        for (group, sensors) in &self.groups {
            for sensor in sensors {
                if filters.iter().any(|f| f.matches(group, sensor)) {
                    out.insert(sensor.clone());
                }
            }
        }
        out.into_iter().collect()
    }
}

#[derive(Debug, Clone)]
pub struct SeriesFilter {
    pattern: Pattern,
}

impl SeriesFilter {
    pub fn new(pattern: &str) -> Result<Self, CatalogError> {
        let trimmed = match pattern.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        Ok(Self {
            pattern: Pattern::new(trimmed)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// True if the pattern names the sensor's path or its whole group.
    pub fn matches(&self, group: &str, sensor: &str) -> bool {
        let group_path = format!("/{group}");
        let full_path = sensor_path(group, sensor);
        self.pattern.matches(&group_path) || self.pattern.matches(&full_path)
    }
}

pub fn sensor_path(group: &str, sensor: &str) -> String {
    format!("/{group}/{sensor}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SensorCatalog {
        SensorCatalog::from_json(
            r#"{"line_a":["temp_1","temp_2","pressure"],"line_b":["vib_x","flow_in"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn catalog_keeps_order() {
        let c = catalog();
        assert_eq!(
            c.sensors().collect::<Vec<_>>(),
            vec!["temp_1", "temp_2", "pressure", "vib_x", "flow_in"]
        );
        assert_eq!(c.group_of("vib_x"), Some("line_b"));
        assert_eq!(c.search("TEMP"), vec!["temp_1", "temp_2"]);
    }

    #[test]
    fn group_pattern_matches_all_members() {
        let c = catalog();
        let filter = SeriesFilter::new("/line_b").unwrap();
        assert_eq!(c.expand(&[filter]), vec!["vib_x", "flow_in"]);
    }

    #[test]
    fn sensor_globs() {
        let c = catalog();
        let filters = [
            SeriesFilter::new("/*/temp_*").unwrap(),
            SeriesFilter::new("/line_b/flow_in").unwrap(),
        ];
        assert_eq!(c.expand(&filters), vec!["temp_1", "temp_2", "flow_in"]);
    }

    #[test]
    fn bad_pattern_and_json() {
        assert!(SeriesFilter::new("/[").is_err());
        assert!(SensorCatalog::from_json("[1,2]").is_err());
    }
}
