pub use circulation::{Circulation, LATEST_CIRCULATION_ID};
pub use figures::CirculationFigures;
pub use snapshots::Snapshot;

pub mod circulation;
pub mod figures;
pub mod snapshots;
