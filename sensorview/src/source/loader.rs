//! Background loader
//!
//! Runs fetches and file ingestion on worker threads and installs the result
//! as the current buffer. Each request carries a sequence number; issuing a
//! new request cancels the previous one and any completion that is not for
//! the newest request is dropped. The installed buffer therefore always
//! belongs to the most recent request, whatever order workers finish in.
//!
//! The current buffer lives behind `Arc<RwLock<Arc<_>>>`: the loader is the
//! only writer and swaps the inner `Arc`, readers clone it out.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use thiserror::Error;

use super::{CancelToken, DataSource, FetchError, QueryRequest};
use crate::data::{ingest_until, AlignedSeriesBuffer, IngestError, IngestStats, Table};

pub type SharedBuffer = Arc<RwLock<Arc<AlignedSeriesBuffer>>>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("failed to start worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("worker panicked before reporting")]
    WorkerLost,
}

#[derive(Debug, Clone, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading {
        seq: u64,
    },
    Ready {
        seq: u64,
    },
    /// The last good buffer stays installed.
    Failed {
        seq: u64,
        error: Arc<LoadError>,
    },
}

impl LoadStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading { .. })
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

type Outcome = Result<(AlignedSeriesBuffer, Option<IngestStats>), LoadError>;

struct Completion {
    seq: u64,
    outcome: Outcome,
}

pub struct Loader {
    source: Arc<dyn DataSource>,
    current: SharedBuffer,
    status: LoadStatus,
    latest: u64,
    in_flight: Option<CancelToken>,
    stats: Option<IngestStats>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl Loader {
    pub fn new(source: impl DataSource + 'static) -> Self {
        Self::with_shared(Arc::new(source))
    }

    pub fn with_shared(source: Arc<dyn DataSource>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            source,
            current: Arc::new(RwLock::new(Arc::new(AlignedSeriesBuffer::empty()))),
            status: LoadStatus::Idle,
            latest: 0,
            in_flight: None,
            stats: None,
            tx,
            rx,
        }
    }

    /// Snapshot of the installed buffer.
    pub fn current(&self) -> Arc<AlignedSeriesBuffer> {
        read_shared(&self.current)
    }

    /// Handle for readers on other threads.
    pub fn shared(&self) -> SharedBuffer {
        self.current.clone()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Sequence number of the newest request.
    pub fn latest(&self) -> u64 {
        self.latest
    }

    /// Ingestion counters of the installed buffer, when it came from a file.
    pub fn stats(&self) -> Option<&IngestStats> {
        self.stats.as_ref()
    }

    /// Fetches `request` from the data source on a worker thread.
    pub fn request(&mut self, request: QueryRequest) -> u64 {
        let source = self.source.clone();
        tracing::debug!(query = %request.to_query_string(), "fetch requested");
        self.spawn("sv-fetch", move |cancel| {
            let buffer = source.fetch(&request, &cancel)?;
            Ok((buffer, None))
        })
    }

    /// Reads and ingests a delimited file on a worker thread.
    pub fn ingest_path(&mut self, path: impl Into<PathBuf>, delimiter: char) -> u64 {
        let path = path.into();
        tracing::debug!(path = %path.display(), "ingest requested");
        self.spawn("sv-ingest", move |cancel| {
            let table = Table::read(&path, delimiter)?;
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled.into());
            }
            let (buffer, stats) =
                ingest_until(&table, || cancel.is_cancelled()).ok_or(FetchError::Cancelled)?;
            Ok((buffer, Some(stats)))
        })
    }

    /// Installs `buffer` directly, superseding anything in flight.
    pub fn replace(&mut self, buffer: AlignedSeriesBuffer) -> u64 {
        let seq = self.supersede();
        self.install(seq, buffer, None);
        seq
    }

    /// Cancels the in-flight request. Its completion will be ignored.
    pub fn cancel(&mut self) {
        self.supersede();
        self.status = LoadStatus::Idle;
    }

    /// Applies any completions that have arrived. Returns the status if it
    /// changed.
    pub fn poll(&mut self) -> Option<LoadStatus> {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.apply(completion);
        }
        changed.then(|| self.status.clone())
    }

    /// Waits up to `timeout` for one completion, then drains the rest.
    pub fn poll_timeout(&mut self, timeout: Duration) -> Option<LoadStatus> {
        let mut changed = match self.rx.recv_timeout(timeout) {
            Ok(completion) => self.apply(completion),
            Err(_) => false,
        };
        changed |= self.poll().is_some();
        changed.then(|| self.status.clone())
    }

    /// Blocks until the newest request settles or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> &LoadStatus {
        let deadline = Instant::now() + timeout;
        while self.status.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.poll_timeout(remaining);
        }
        &self.status
    }

    fn supersede(&mut self) -> u64 {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.latest += 1;
        self.latest
    }

    fn spawn<F>(&mut self, name: &str, work: F) -> u64
    where
        F: FnOnce(CancelToken) -> Outcome + Send + 'static,
    {
        let seq = self.supersede();
        let token = CancelToken::new();
        self.in_flight = Some(token.clone());

        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("{name}-{seq}"))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(token)))
                    .unwrap_or(Err(LoadError::WorkerLost));
                // The loader may be gone; nothing to report to then.
                let _ = tx.send(Completion { seq, outcome });
            });

        match spawned {
            Ok(_) => self.status = LoadStatus::Loading { seq },
            Err(e) => self.fail(seq, LoadError::Spawn(e)),
        }
        seq
    }

    fn apply(&mut self, completion: Completion) -> bool {
        let Completion { seq, outcome } = completion;
        if seq != self.latest {
            tracing::debug!(seq, latest = self.latest, "discarding stale completion");
            return false;
        }
        self.in_flight = None;
        match outcome {
            Ok((buffer, stats)) => self.install(seq, buffer, stats),
            Err(LoadError::Fetch(FetchError::Cancelled)) => {
                tracing::trace!(seq, "request cancelled");
                self.status = LoadStatus::Idle;
            }
            Err(error) => self.fail(seq, error),
        }
        true
    }

    fn install(&mut self, seq: u64, buffer: AlignedSeriesBuffer, stats: Option<IngestStats>) {
        tracing::debug!(
            seq,
            points = buffer.len(),
            series = buffer.series_count(),
            "installing buffer"
        );
        let buffer = Arc::new(buffer);
        match self.current.write() {
            Ok(mut slot) => *slot = buffer,
            Err(poisoned) => *poisoned.into_inner() = buffer,
        }
        self.stats = stats;
        self.status = LoadStatus::Ready { seq };
    }

    fn fail(&mut self, seq: u64, error: LoadError) {
        tracing::warn!(seq, %error, "load failed, keeping previous buffer");
        self.status = LoadStatus::Failed {
            seq,
            error: Arc::new(error),
        };
    }
}

pub fn read_shared(shared: &SharedBuffer) -> Arc<AlignedSeriesBuffer> {
    match shared.read() {
        Ok(slot) => slot.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{align, Sample, Series};
    use crate::source::MemorySource;

    const WAIT: Duration = Duration::from_secs(5);

    fn buffer(points: usize) -> AlignedSeriesBuffer {
        align(&[Series::with_samples(
            "a",
            (0..points).map(|i| Sample::new(i as f64, 1.0)).collect(),
        )])
    }

    #[test]
    fn request_installs_result() {
        let mut loader = Loader::new(MemorySource::new(buffer(50)));
        assert!(loader.current().is_empty());
        let seq = loader.request(QueryRequest::new(10));
        assert!(matches!(loader.wait(WAIT), LoadStatus::Ready { seq: s } if *s == seq));
        assert_eq!(loader.current().len(), 10);
    }

    #[test]
    fn failure_keeps_last_good_buffer() {
        let mut loader = Loader::new(|req: &QueryRequest, _: &CancelToken| {
            if req.display_width == 0 {
                Err(FetchError::Server("boom".into()))
            } else {
                Ok(buffer(3))
            }
        });
        loader.request(QueryRequest::new(1));
        loader.wait(WAIT);
        loader.request(QueryRequest::new(0));
        let status = loader.wait(WAIT).clone();
        assert!(matches!(
            status.error(),
            Some(LoadError::Fetch(FetchError::Server(_)))
        ));
        assert_eq!(loader.current().len(), 3);
    }

    #[test]
    fn replace_supersedes_in_flight() {
        let (gate_tx, gate_rx) = channel::bounded::<()>(0);
        let mut loader = Loader::new(move |_: &QueryRequest, _: &CancelToken| {
            let _ = gate_rx.recv();
            Ok(buffer(7))
        });
        loader.request(QueryRequest::new(100));
        loader.replace(AlignedSeriesBuffer::empty());
        drop(gate_tx);
        assert!(loader.poll_timeout(Duration::from_millis(500)).is_none());
        assert!(loader.current().is_empty());
    }

    #[test]
    fn panicking_source_is_reported() {
        let mut loader = Loader::new(|_: &QueryRequest, _: &CancelToken| -> Result<AlignedSeriesBuffer, FetchError> {
            panic!("source bug")
        });
        loader.request(QueryRequest::new(1));
        assert!(matches!(loader.wait(WAIT).error(), Some(LoadError::WorkerLost)));
    }

    #[test]
    fn ingest_missing_file_fails() {
        let mut loader = Loader::new(MemorySource::default());
        loader.ingest_path("/nonexistent/sensorview.csv", ',');
        let status = loader.wait(WAIT);
        assert!(matches!(status.error(), Some(LoadError::Ingest(IngestError::Io(_)))));
    }
}
