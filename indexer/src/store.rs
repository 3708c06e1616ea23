use circulation_database::adapters;
use circulation_database::models::{Circulation, Snapshot};
use circulation_database::Database;

/// What the processor needs from the persistence layer: the most recent
/// daily snapshot, the latest-circulation singleton, and upserts for both.
pub(crate) trait Store {
    fn latest_snapshot(&self) -> anyhow::Result<Option<Snapshot>>;
    fn circulation(&self) -> anyhow::Result<Option<Circulation>>;
    fn store_snapshots(&self, snapshots: &[Snapshot]) -> anyhow::Result<()>;
    fn store_circulation(&self, circulation: &Circulation) -> anyhow::Result<()>;
}

impl Store for Database {
    fn latest_snapshot(&self) -> anyhow::Result<Option<Snapshot>> {
        adapters::snapshots::latest_snapshot(&mut *self.conn()?)
    }

    fn circulation(&self) -> anyhow::Result<Option<Circulation>> {
        adapters::circulation::get_circulation(&mut *self.conn()?)
    }

    fn store_snapshots(&self, snapshots: &[Snapshot]) -> anyhow::Result<()> {
        adapters::snapshots::store_snapshots(&mut *self.conn()?, snapshots)
    }

    fn store_circulation(&self, circulation: &Circulation) -> anyhow::Result<()> {
        adapters::circulation::store_circulation(&mut *self.conn()?, circulation)
    }
}

/// Picks the height to resume from after a restart: one block past whatever
/// the store has already seen, or `None` on a fresh database.
pub(crate) fn resume_height(database: &Database) -> anyhow::Result<Option<u64>> {
    let snapshot_height = Store::latest_snapshot(database)?.map(|snapshot| snapshot.block_height);
    let circulation_height = Store::circulation(database)?.map(|record| record.block_height);
    Ok(snapshot_height.max(circulation_height).map(|height| height + 1))
}
