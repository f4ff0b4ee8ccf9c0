//! Data sources and background loading.

mod cancel;
mod loader;
mod memory;
mod query;

pub use cancel::CancelToken;
pub use loader::{read_shared, LoadError, LoadStatus, Loader, SharedBuffer};
pub use memory::MemorySource;
pub use query::{parse_response, FetchError, QueryRequest, QueryResponse, SeriesPayload};

use crate::data::AlignedSeriesBuffer;

/// Anything that can answer a `QueryRequest`. Called from loader worker
/// threads; implementations should check `cancel` between expensive steps.
pub trait DataSource: Send + Sync {
    fn fetch(
        &self,
        request: &QueryRequest,
        cancel: &CancelToken,
    ) -> Result<AlignedSeriesBuffer, FetchError>;
}

impl<F> DataSource for F
where
    F: Fn(&QueryRequest, &CancelToken) -> Result<AlignedSeriesBuffer, FetchError> + Send + Sync,
{
    fn fetch(
        &self,
        request: &QueryRequest,
        cancel: &CancelToken,
    ) -> Result<AlignedSeriesBuffer, FetchError> {
        self(request, cancel)
    }
}
