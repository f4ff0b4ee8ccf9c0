use std::sync::Arc;

use super::{CancelToken, DataSource, FetchError, QueryRequest};
use crate::data::{downsample, AlignedSeriesBuffer};

/// Serves a full-resolution buffer held in memory. Every query slices,
/// selects and downsamples from the original data, so zooming in recovers
/// detail a previous wide query discarded.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    buffer: Arc<AlignedSeriesBuffer>,
}

impl MemorySource {
    pub fn new(buffer: impl Into<Arc<AlignedSeriesBuffer>>) -> Self {
        Self {
            buffer: buffer.into(),
        }
    }

    pub fn buffer(&self) -> &AlignedSeriesBuffer {
        &self.buffer
    }

    pub fn query(&self, request: &QueryRequest) -> AlignedSeriesBuffer {
        let start = request.range_start.unwrap_or(f64::NEG_INFINITY);
        let end = request.range_end.unwrap_or(f64::INFINITY);
        let mut window = self.buffer.slice_time(start, end);
        if !request.series_ids.is_empty() {
            window = window.select(request.series_ids.iter().map(String::as_str));
        }
        downsample(&window, request.display_width).into_owned()
    }
}

impl DataSource for MemorySource {
    fn fetch(
        &self,
        request: &QueryRequest,
        cancel: &CancelToken,
    ) -> Result<AlignedSeriesBuffer, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        Ok(self.query(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{align, Reading, Sample, Series};

    fn source() -> MemorySource {
        let a = Series::with_samples("a", (0..100).map(|i| Sample::new(i as f64, i as f64)).collect());
        let b = Series::with_samples("b", vec![Sample::new(50.0, 5.0)]);
        MemorySource::new(align(&[a, b]))
    }

    #[test]
    fn range_selection_and_width() {
        let src = source();
        let req = QueryRequest::new(1000).with_series(["b"]).with_range(49.0, 51.0);
        let out = src.fetch(&req, &CancelToken::new()).unwrap();
        assert_eq!(out.axis(), &[49.0, 50.0, 51.0]);
        assert_eq!(out.series_ids().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(out.series("b").unwrap()[1], Reading::Present(5.0));

        let wide = src.fetch(&QueryRequest::new(10), &CancelToken::new()).unwrap();
        assert_eq!(wide.len(), 10);
        assert_eq!(wide.series_count(), 2);
    }

    #[test]
    fn cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            source().fetch(&QueryRequest::new(10), &token),
            Err(FetchError::Cancelled)
        );
    }
}
