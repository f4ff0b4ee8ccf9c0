//! Tunable constants.
//!
//! Every field has a default, so a partial YAML or JSON document deserializes
//! into a complete `ViewConfig`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Length of the live window in seconds.
    pub default_span_secs: f64,
    /// Minimum interval between live re-emissions; values below 1 are raised.
    pub live_tick_secs: f64,
    /// Target point count per series after downsampling.
    pub display_width: usize,
    pub overscan: usize,
    pub estimated_extent: u32,
    /// Selections longer than this are written to the session address as
    /// "all sensors".
    pub address_selection_limit: usize,
    pub delimiter: char,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_span_secs: crate::nav::DEFAULT_SPAN_SECS,
            live_tick_secs: crate::nav::MIN_LIVE_TICK_SECS,
            display_width: 1000,
            overscan: crate::view::DEFAULT_OVERSCAN,
            estimated_extent: crate::view::DEFAULT_ESTIMATED_EXTENT,
            address_selection_limit: crate::session::MAX_ADDRESS_SELECTION,
            delimiter: ',',
        }
    }
}

impl ViewConfig {
    pub fn viewport(&self) -> crate::view::SequenceViewport {
        crate::view::SequenceViewport::new(self.estimated_extent).with_overscan(self.overscan)
    }
}
