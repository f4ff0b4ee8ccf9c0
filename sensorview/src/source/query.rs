//! Data source query contract
//!
//! A request names a display width, an optional series selection and an
//! optional time range. The response is already aligned: one `time` array
//! and, per series, a `data` array of the same length holding numbers or
//! `null`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{AlignedSeriesBuffer, Reading};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("data source returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("data source error: {0}")]
    Server(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub display_width: usize,
    /// Empty means every series the source has.
    pub series_ids: Vec<String>,
    pub range_start: Option<f64>,
    pub range_end: Option<f64>,
}

impl QueryRequest {
    pub fn new(display_width: usize) -> Self {
        Self {
            display_width,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_series<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.series_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_range(mut self, start: f64, end: f64) -> Self {
        self.range_start = Some(start);
        self.range_end = Some(end);
        self
    }

    /// `width=..&ids=a,b&start=..&end=..`; absent parts are omitted.
    pub fn to_query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("width", &self.display_width.to_string());
        if !self.series_ids.is_empty() {
            query.append_pair("ids", &self.series_ids.join(","));
        }
        if let Some(start) = self.range_start {
            query.append_pair("start", &start.to_string());
        }
        if let Some(end) = self.range_end {
            query.append_pair("end", &end.to_string());
        }
        query.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesPayload {
    pub id: String,
    pub data: Vec<Reading>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub time: Vec<f64>,
    pub series: Vec<SeriesPayload>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Error { error: String },
    Data(QueryResponse),
}

impl QueryResponse {
    pub fn from_buffer(buffer: &AlignedSeriesBuffer) -> Self {
        Self {
            time: buffer.axis().to_vec(),
            series: buffer
                .iter()
                .map(|(id, values)| SeriesPayload {
                    id: id.to_string(),
                    data: values.to_vec(),
                })
                .collect(),
        }
    }

    pub fn into_buffer(self) -> Result<AlignedSeriesBuffer, FetchError> {
        AlignedSeriesBuffer::from_columns(
            self.time,
            self.series.into_iter().map(|s| (s.id, s.data)),
        )
        .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

/// Turns a raw status and body into a buffer. Failures never panic; they
/// become a `FetchError` the loader reports.
pub fn parse_response(status: u16, body: &[u8]) -> Result<AlignedSeriesBuffer, FetchError> {
    if !(200..300).contains(&status) {
        let message = match serde_json::from_slice::<ResponseBody>(body) {
            Ok(ResponseBody::Error { error }) => error,
            _ => String::from_utf8_lossy(body).into_owned(),
        };
        return Err(FetchError::Status { status, message });
    }

    match serde_json::from_slice::<ResponseBody>(body) {
        Ok(ResponseBody::Error { error }) => Err(FetchError::Server(error)),
        Ok(ResponseBody::Data(response)) => response.into_buffer(),
        Err(e) => Err(FetchError::Malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_pairs() {
        let req = QueryRequest::new(800)
            .with_series(["temp", "hum id"])
            .with_range(10.0, 20.5);
        assert_eq!(
            req.to_query_string(),
            "width=800&ids=temp%2Chum+id&start=10&end=20.5"
        );
        assert_eq!(QueryRequest::new(5).to_query_string(), "width=5");
    }

    #[test]
    fn well_formed_body() {
        let body = br#"{"time":[1,2,3],"series":[{"id":"a","data":[1.5,null,3]}]}"#;
        let buf = parse_response(200, body).unwrap();
        assert_eq!(buf.axis(), &[1.0, 2.0, 3.0]);
        assert_eq!(
            buf.series("a").unwrap(),
            &[Reading::Present(1.5), Reading::Absent, Reading::Present(3.0)]
        );
    }

    #[test]
    fn error_payload_and_status() {
        assert_eq!(
            parse_response(200, br#"{"error":"no table"}"#),
            Err(FetchError::Server("no table".into()))
        );
        assert_eq!(
            parse_response(503, br#"{"error":"busy"}"#),
            Err(FetchError::Status {
                status: 503,
                message: "busy".into()
            })
        );
        assert!(matches!(
            parse_response(404, b"not found"),
            Err(FetchError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn misshaped_payload_is_malformed() {
        let short = br#"{"time":[1,2],"series":[{"id":"a","data":[1]}]}"#;
        assert!(matches!(parse_response(200, short), Err(FetchError::Malformed(_))));
        assert!(matches!(parse_response(200, b"[]"), Err(FetchError::Malformed(_))));
        assert!(matches!(parse_response(200, b"{"), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn response_mirrors_buffer() {
        let body = br#"{"time":[1,2],"series":[{"id":"a","data":[null,2]}]}"#;
        let buf = parse_response(200, body).unwrap();
        let response = QueryResponse::from_buffer(&buf);
        assert_eq!(response.time, vec![1.0, 2.0]);
        assert_eq!(response.series[0].data, vec![Reading::Absent, Reading::Present(2.0)]);
    }
}
