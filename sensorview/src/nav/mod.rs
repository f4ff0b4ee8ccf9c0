mod clock;
mod navigator;
mod range;

pub use clock::{Clock, ManualClock, SystemClock};
pub use navigator::{NavEvent, TimeNavigator, DEFAULT_SPAN_SECS, MIN_LIVE_TICK_SECS};
pub use range::{InvalidRange, Preset, TimeRange, UnknownPreset};
