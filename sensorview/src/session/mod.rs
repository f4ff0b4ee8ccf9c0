mod address;
mod catalog;
mod selection;
mod session;

pub use address::{SessionAddress, MAX_ADDRESS_SELECTION, NONE_SENTINEL};
pub use catalog::{sensor_path, CatalogError, SensorCatalog, SeriesFilter};
pub use selection::Selection;
pub use session::{Session, SessionEvent};
