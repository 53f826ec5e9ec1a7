//! Domain Layer

pub mod height_map;
pub mod liveness;
pub mod maturity;
pub mod power_table;

pub use height_map::HeightToVscMap;
pub use liveness::LivenessTracker;
pub use maturity::MaturitySchedule;
pub use power_table::PowerTable;
