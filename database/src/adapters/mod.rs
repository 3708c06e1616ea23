pub mod circulation;
pub mod snapshots;
