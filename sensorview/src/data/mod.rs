mod buffer;
mod downsample;
mod ingest;
mod sample;
mod table;

pub use buffer::{align, AlignError, AlignedSeriesBuffer, ShapeError};
pub use downsample::{bucket_bounds, downsample};
pub use ingest::{
    detect_time_column, ingest, ingest_until, ingest_with_stats, normalize_time, IngestStats,
    CANCEL_CHECK_ROWS, MILLISECOND_EPOCH_THRESHOLD,
};
pub use sample::{Reading, Sample, Series};
pub use table::{IngestError, Table};
