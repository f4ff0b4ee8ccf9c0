//! Aligned series buffer
//!
//! Holds N numeric series on one shared, strictly increasing time axis.
//! Positions where a series has no sample are `Reading::Absent`; nothing is
//! interpolated or defaulted here.
//!
//! A buffer is immutable once built. Consumers share it as
//! `Arc<AlignedSeriesBuffer>` and a newer load replaces the whole `Arc`.

use super::sample::{Reading, Series};

use indexmap::IndexMap;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("no series given to align")]
    EmptyInput,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("series {id} has {len} values but the axis has {axis_len}")]
    LengthMismatch {
        id: String,
        len: usize,
        axis_len: usize,
    },
    #[error("axis is not strictly increasing at index {index}")]
    UnorderedAxis { index: usize },
    #[error("axis value at index {index} is not finite")]
    NonFiniteTime { index: usize },
    #[error("series {0} appears more than once")]
    DuplicateSeries(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignedSeriesBuffer {
    axis: Vec<f64>,
    series: IndexMap<String, Vec<Reading>>,
}

// Folds -0.0 into 0.0 so exact-equality dedup and lookup agree.
fn axis_key(t: f64) -> f64 {
    t + 0.0
}

fn build_axis(times: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut axis: Vec<f64> = times.filter(|t| t.is_finite()).map(axis_key).collect();
    axis.sort_unstable_by(f64::total_cmp);
    axis.dedup();
    axis
}

impl AlignedSeriesBuffer {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the union axis of all series and places every sample on it.
    ///
    /// Non-finite timestamps are skipped. When a series carries several
    /// samples for the same timestamp, or the same id appears twice, the
    /// later present sample wins; an absent one never replaces a value.
    pub fn try_align(series: &[Series]) -> Result<Self, AlignError> {
        if series.is_empty() {
            return Err(AlignError::EmptyInput);
        }

        let axis = build_axis(
            series
                .iter()
                .flat_map(|s| s.samples.iter().map(|sample| sample.time)),
        );

        let mut columns: IndexMap<String, Vec<Reading>> = IndexMap::with_capacity(series.len());
        for s in series {
            let values = columns
                .entry(s.id.clone())
                .or_insert_with(|| vec![Reading::Absent; axis.len()]);
            for sample in &s.samples {
                if !sample.time.is_finite() {
                    continue;
                }
                let t = axis_key(sample.time);
                if let Ok(i) = axis.binary_search_by(|probe| probe.total_cmp(&t)) {
                    if !sample.value.is_absent() {
                        values[i] = sample.value;
                    }
                }
            }
        }

        Ok(Self {
            axis,
            series: columns,
        })
    }

    /// Axis-only buffer from unordered timestamps.
    pub fn from_times(times: impl IntoIterator<Item = f64>) -> Self {
        Self {
            axis: build_axis(times.into_iter()),
            series: IndexMap::new(),
        }
    }

    /// Wraps columns that are already aligned, e.g. a data source response.
    pub fn from_columns<I>(axis: Vec<f64>, columns: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = (String, Vec<Reading>)>,
    {
        for (index, t) in axis.iter().enumerate() {
            if !t.is_finite() {
                return Err(ShapeError::NonFiniteTime { index });
            }
        }
        if let Some(index) = axis.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ShapeError::UnorderedAxis { index: index + 1 });
        }

        let mut series = IndexMap::new();
        for (id, values) in columns {
            if values.len() != axis.len() {
                return Err(ShapeError::LengthMismatch {
                    id,
                    len: values.len(),
                    axis_len: axis.len(),
                });
            }
            if series.contains_key(&id) {
                return Err(ShapeError::DuplicateSeries(id));
            }
            series.insert(id, values);
        }

        Ok(Self { axis, series })
    }

    /// Columns built in this module that already satisfy the shape rules.
    pub(super) fn from_aligned_parts(axis: Vec<f64>, series: IndexMap<String, Vec<Reading>>) -> Self {
        debug_assert!(axis.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(series.values().all(|v| v.len() == axis.len()));
        Self { axis, series }
    }

    pub fn axis(&self) -> &[f64] {
        &self.axis
    }

    /// Number of axis positions.
    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self, id: &str) -> Option<&[Reading]> {
        self.series.get(id).map(|v| v.as_slice())
    }

    pub fn series_ids(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Reading])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// First and last axis timestamps.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        Some((*self.axis.first()?, *self.axis.last()?))
    }

    /// Axis positions with `start <= t <= end`.
    pub fn index_range(&self, start: f64, end: f64) -> Range<usize> {
        let lo = self.axis.partition_point(|&t| t < start);
        let hi = self.axis.partition_point(|&t| t <= end);
        lo..hi.max(lo)
    }

    pub fn slice_index(&self, range: Range<usize>) -> AlignedSeriesBuffer {
        let end = range.end.min(self.axis.len());
        let start = range.start.min(end);
        AlignedSeriesBuffer {
            axis: self.axis[start..end].to_vec(),
            series: self
                .series
                .iter()
                .map(|(id, values)| (id.clone(), values[start..end].to_vec()))
                .collect(),
        }
    }

    /// Copy of the inclusive time range `[start, end]`.
    pub fn slice_time(&self, start: f64, end: f64) -> AlignedSeriesBuffer {
        self.slice_index(self.index_range(start, end))
    }

    /// Copy restricted to `ids`, in the order given. Unknown ids are ignored.
    pub fn select<'a, I>(&self, ids: I) -> AlignedSeriesBuffer
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut series = IndexMap::new();
        for id in ids {
            if let Some(values) = self.series.get(id) {
                series.insert(id.to_string(), values.clone());
            }
        }
        AlignedSeriesBuffer {
            axis: self.axis.clone(),
            series,
        }
    }

    /// Same series ids with no axis positions.
    pub fn cleared(&self) -> AlignedSeriesBuffer {
        self.slice_index(0..0)
    }

    pub fn absent_count(&self) -> usize {
        self.series
            .values()
            .flat_map(|v| v.iter())
            .filter(|r| r.is_absent())
            .count()
    }

    pub fn into_shared(self) -> Arc<AlignedSeriesBuffer> {
        Arc::new(self)
    }
}

/// Aligns `series` onto a common axis. An empty list is the valid
/// "no data yet" state and yields an empty buffer.
pub fn align(series: &[Series]) -> AlignedSeriesBuffer {
    match AlignedSeriesBuffer::try_align(series) {
        Ok(buffer) => buffer,
        Err(AlignError::EmptyInput) => {
            tracing::debug!("align called without series, returning empty buffer");
            AlignedSeriesBuffer::empty()
        }
    }
}
