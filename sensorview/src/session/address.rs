//! Session address
//!
//! Query-string form of a session: `sensors=a,b&start=..&end=..`.
//! A missing `sensors` key means every sensor, `sensors=NONE` means none.
//! A missing range means live.

use url::form_urlencoded;

use super::selection::Selection;
use crate::nav::TimeRange;

/// Longer selections are written as "all sensors" to keep addresses short.
pub const MAX_ADDRESS_SELECTION: usize = 64;
pub const NONE_SENTINEL: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionAddress {
    pub selection: Selection,
    pub range: TimeRange,
}

impl SessionAddress {
    pub fn new(selection: Selection, range: TimeRange) -> Self {
        Self { selection, range }
    }

    pub fn encode(&self, selection_limit: usize) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        match &self.selection {
            Selection::All => {}
            Selection::None => {
                query.append_pair("sensors", NONE_SENTINEL);
            }
            Selection::Ids(ids) if ids.len() > selection_limit => {
                tracing::debug!(
                    count = ids.len(),
                    limit = selection_limit,
                    "selection too long for address, writing all sensors"
                );
            }
            Selection::Ids(ids) => {
                let joined = ids.iter().map(String::as_str).collect::<Vec<_>>().join(",");
                query.append_pair("sensors", &joined);
            }
        }
        if let Some((start, end)) = self.range.bounds() {
            query.append_pair("start", &start.to_string());
            query.append_pair("end", &end.to_string());
        }
        query.finish()
    }

    /// Lenient: unknown keys are ignored and an unusable range reads as live.
    pub fn decode(query: &str) -> Self {
        let mut address = SessionAddress::default();
        let mut start = None;
        let mut end = None;

        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "sensors" => address.selection = Selection::parse_list(&value),
                "start" => start = value.trim().parse::<f64>().ok(),
                "end" => end = value.trim().parse::<f64>().ok(),
                _ => {}
            }
        }

        if let (Some(start), Some(end)) = (start, end) {
            match TimeRange::fixed(start, end) {
                Ok(range) => address.range = range,
                Err(err) => tracing::debug!(%err, "ignoring range in address"),
            }
        }
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_forms() {
        let all = SessionAddress::default();
        assert_eq!(all.encode(MAX_ADDRESS_SELECTION), "");

        let none = SessionAddress::new(Selection::None, TimeRange::Live);
        assert_eq!(none.encode(MAX_ADDRESS_SELECTION), "sensors=NONE");
        assert_eq!(SessionAddress::decode("?sensors=NONE"), none);

        let some = SessionAddress::new(Selection::ids(["t1", "t2"]), TimeRange::Live);
        let encoded = some.encode(MAX_ADDRESS_SELECTION);
        assert_eq!(encoded, "sensors=t1%2Ct2");
        assert_eq!(SessionAddress::decode(&encoded), some);
        assert_eq!(SessionAddress::decode("sensors=t1,t2"), some);
    }

    #[test]
    fn reserved_id_cannot_collide_with_none() {
        let address = SessionAddress::new(Selection::ids(["NONE", "t1"]), TimeRange::Live);
        let encoded = address.encode(MAX_ADDRESS_SELECTION);
        assert_eq!(encoded, "sensors=t1");
        assert_eq!(SessionAddress::decode(&encoded), address);
    }

    #[test]
    fn long_selection_degrades_to_all() {
        let ids: Vec<String> = (0..65).map(|i| format!("s{i}")).collect();
        let address = SessionAddress::new(Selection::ids(ids), TimeRange::Live);
        assert_eq!(address.encode(MAX_ADDRESS_SELECTION), "");
        assert_eq!(SessionAddress::decode(""), SessionAddress::default());
    }

    #[test]
    fn fixed_range_round_trips() {
        let address = SessionAddress::new(Selection::All, TimeRange::fixed(100.0, 250.5).unwrap());
        let encoded = address.encode(MAX_ADDRESS_SELECTION);
        assert_eq!(encoded, "start=100&end=250.5");
        assert_eq!(SessionAddress::decode(&encoded), address);
    }

    #[test]
    fn bad_range_reads_as_live() {
        assert_eq!(SessionAddress::decode("start=5&end=1").range, TimeRange::Live);
        assert_eq!(SessionAddress::decode("start=x&end=1").range, TimeRange::Live);
        assert_eq!(SessionAddress::decode("start=1").range, TimeRange::Live);
        assert_eq!(SessionAddress::decode("sensors=").selection, Selection::All);
    }
}
