//! Tabular ingestion
//!
//! Converts a `Table` of raw cells into an `AlignedSeriesBuffer`:
//! one column is the time axis, every other column becomes a series.
//!
//! Cell-level failures are absorbed: a value that does not parse is
//! `Absent`, and a row whose time does not parse is skipped. Neither aborts
//! the ingestion.

use super::buffer::{align, AlignedSeriesBuffer};
use super::sample::{Reading, Series};
use super::table::Table;

/// Times above this look like epoch milliseconds rather than seconds
/// (1e12 ms is September 2001). Heuristic, kept as a named constant so it can
/// be revised.
pub const MILLISECOND_EPOCH_THRESHOLD: f64 = 1_000_000_000_000.0;

/// Rows between cancellation checks in [`ingest_until`].
pub const CANCEL_CHECK_ROWS: usize = 4096;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: usize,
    pub skipped_rows: usize,
    pub absent_cells: usize,
    pub time_column: Option<String>,
}

/// Picks the time column by a fixed, case-insensitive priority list:
/// 1. a header equal to `t`
/// 2. the first header containing `timestamp`
/// 3. the first header containing `time`
/// 4. the first header
pub fn detect_time_column<S: AsRef<str>>(headers: &[S]) -> Option<usize> {
    if headers.is_empty() {
        return None;
    }
    let lower: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect();

    lower
        .iter()
        .position(|h| h == "t")
        .or_else(|| lower.iter().position(|h| h.contains("timestamp")))
        .or_else(|| lower.iter().position(|h| h.contains("time")))
        .or(Some(0))
}

/// Seconds since the epoch for a parsed time cell. Applied to every value
/// independently.
pub fn normalize_time(t: f64) -> f64 {
    if t > MILLISECOND_EPOCH_THRESHOLD {
        t / 1000.0
    } else {
        t
    }
}

pub fn ingest(table: &Table) -> AlignedSeriesBuffer {
    ingest_with_stats(table).0
}

pub fn ingest_with_stats(table: &Table) -> (AlignedSeriesBuffer, IngestStats) {
    ingest_until(table, || false).unwrap_or_default()
}

/// Like [`ingest_with_stats`], but polls `cancelled` every
/// [`CANCEL_CHECK_ROWS`] rows and before aligning. Returns `None` once it
/// reports true.
pub fn ingest_until(
    table: &Table,
    cancelled: impl Fn() -> bool,
) -> Option<(AlignedSeriesBuffer, IngestStats)> {
    let mut stats = IngestStats::default();

    let time_idx = match detect_time_column(table.headers()) {
        Some(idx) if !table.is_empty() => idx,
        _ => {
            tracing::debug!("ingest called without rows, returning empty buffer");
            return Some((AlignedSeriesBuffer::empty(), stats));
        }
    };
    stats.time_column = Some(table.headers()[time_idx].clone());

    let value_columns: Vec<usize> = (0..table.headers().len())
        .filter(|&i| i != time_idx)
        .collect();
    let mut series: Vec<Series> = value_columns
        .iter()
        .map(|&i| {
            let mut s = Series::new(table.headers()[i].clone());
            s.samples.reserve(table.row_count());
            s
        })
        .collect();

    for row in table.rows() {
        if stats.rows % CANCEL_CHECK_ROWS == 0 && cancelled() {
            tracing::debug!(rows = stats.rows, "ingest cancelled");
            return None;
        }
        stats.rows += 1;
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");

        let time = match Reading::parse(cell(time_idx)) {
            Reading::Present(t) => normalize_time(t),
            Reading::Absent => {
                stats.skipped_rows += 1;
                tracing::trace!(row = stats.rows, "time cell did not parse, skipping row");
                continue;
            }
        };

        for (s, &col) in series.iter_mut().zip(&value_columns) {
            let value = Reading::parse(cell(col));
            if value.is_absent() {
                stats.absent_cells += 1;
            }
            s.push(time, value);
        }
    }

    if stats.skipped_rows > 0 {
        tracing::warn!(
            skipped = stats.skipped_rows,
            rows = stats.rows,
            "rows without a parseable time were skipped"
        );
    }

    if cancelled() {
        return None;
    }

    // A table with only a time column yields the axis with no series.
    let buffer = if series.is_empty() {
        AlignedSeriesBuffer::from_times(table.rows().iter().filter_map(|row| {
            let t = Reading::parse(row.get(time_idx)?).try_as_f64()?;
            Some(normalize_time(t))
        }))
    } else {
        align(&series)
    };

    tracing::debug!(
        rows = stats.rows,
        points = buffer.len(),
        series = buffer.series_count(),
        "ingested table"
    );
    Some((buffer, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_column_priority() {
        assert_eq!(detect_time_column(&["value", "T", "time"]), Some(1));
        assert_eq!(detect_time_column(&["uptime", "Timestamp_ms"]), Some(1));
        assert_eq!(detect_time_column(&["x", "Time (s)"]), Some(1));
        assert_eq!(detect_time_column(&["x", "y"]), Some(0));
        assert_eq!(detect_time_column::<&str>(&[]), None);
    }

    #[test]
    fn unparseable_cell_is_absent_not_dropped() {
        let table = Table::from_records(vec![
            vec![("t", "1700000000"), ("a", "1.5")],
            vec![("t", "1700000001"), ("a", "x")],
        ]);
        let (buf, stats) = ingest_with_stats(&table);
        assert_eq!(buf.axis(), &[1700000000.0, 1700000001.0]);
        assert_eq!(
            buf.series("a").unwrap(),
            &[Reading::Present(1.5), Reading::Absent]
        );
        assert_eq!(stats.absent_cells, 1);
        assert_eq!(stats.skipped_rows, 0);
    }

    #[test]
    fn milliseconds_are_normalized() {
        let table = Table::from_records(vec![
            vec![("timestamp", "1700000000000"), ("a", "1")],
            vec![("timestamp", "1700000001500"), ("a", "2")],
        ]);
        let buf = ingest(&table);
        assert_eq!(buf.axis(), &[1700000000.0, 1700000001.5]);
    }

    #[test]
    fn threshold_is_per_value() {
        assert_eq!(normalize_time(MILLISECOND_EPOCH_THRESHOLD), MILLISECOND_EPOCH_THRESHOLD);
        assert_eq!(normalize_time(2_000_000_000_000.0), 2_000_000_000.0);
        assert_eq!(normalize_time(12.5), 12.5);
    }

    #[test]
    fn bad_time_skips_only_that_row() {
        let table = Table::parse(b"time,a,b\n1,1,\noops,2,2\n3,3,3\n", ',').unwrap();
        let (buf, stats) = ingest_with_stats(&table);
        assert_eq!(buf.axis(), &[1.0, 3.0]);
        assert_eq!(buf.series_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(buf.series("b").unwrap(), &[Reading::Absent, Reading::Present(3.0)]);
        assert_eq!(stats.skipped_rows, 1);
        assert_eq!(stats.time_column.as_deref(), Some("time"));
    }

    #[test]
    fn malformed_duplicate_row_keeps_valid_value() {
        let table = Table::parse(b"t,a\n1,5\n1,x\n", ',').unwrap();
        let (buf, stats) = ingest_with_stats(&table);
        assert_eq!(buf.axis(), &[1.0]);
        assert_eq!(buf.series("a").unwrap(), &[Reading::Present(5.0)]);
        assert_eq!(stats.absent_cells, 1);
    }

    #[test]
    fn cancellation_is_polled_while_reading_rows() {
        use std::cell::Cell;

        let mut table = Table::new(["t", "a"]);
        for i in 0..CANCEL_CHECK_ROWS * 3 {
            table.push_row([i.to_string(), "1".to_string()]);
        }
        let polls = Cell::new(0);
        let out = ingest_until(&table, || {
            polls.set(polls.get() + 1);
            polls.get() > 2
        });
        assert!(out.is_none());
        assert_eq!(polls.get(), 3);

        let (buf, stats) = ingest_until(&table, || false).unwrap();
        assert_eq!(buf.len(), CANCEL_CHECK_ROWS * 3);
        assert_eq!(stats.rows, CANCEL_CHECK_ROWS * 3);
    }

    #[test]
    fn no_rows_is_empty_buffer() {
        let table = Table::new(["t", "a"]);
        let buf = ingest(&table);
        assert!(buf.is_empty());
        assert_eq!(buf.series_count(), 0);
    }

    #[test]
    fn time_only_table_keeps_axis() {
        let table = Table::parse(b"t\n2\n1\n", ',').unwrap();
        let buf = ingest(&table);
        assert_eq!(buf.axis(), &[1.0, 2.0]);
        assert_eq!(buf.series_count(), 0);
    }
}
