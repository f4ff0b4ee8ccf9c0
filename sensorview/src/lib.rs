//! Windowing and alignment engine for large time-indexed sensor data.
//!
//! - [`data`]: aligned series buffers, tabular ingestion, downsampling
//! - [`view`]: virtual windowing over long sequences
//! - [`nav`]: live/fixed time range state machine
//! - [`source`]: data source contract and background loader
//! - [`session`]: selection, session address and event wiring

pub mod config;
pub mod data;
pub mod event;
pub mod nav;
pub mod session;
pub mod source;
pub mod view;

pub use config::ViewConfig;
pub use data::{align, downsample, ingest, AlignedSeriesBuffer, Reading, Sample, Series, Table};
pub use event::EventBus;
pub use nav::{NavEvent, Preset, TimeNavigator, TimeRange};
pub use session::{Selection, Session};
pub use source::{DataSource, Loader, MemorySource, QueryRequest};
pub use view::{SequenceViewport, VisibleRange};
