//! Virtual windowing over long ordered sequences.

mod fenwick;
mod viewport;

pub use fenwick::FenwickTree;
pub use viewport::{
    SequenceViewport, VisibleRange, WindowState, DEFAULT_ESTIMATED_EXTENT, DEFAULT_OVERSCAN,
};
