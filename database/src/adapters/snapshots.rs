use anyhow::Context;
use diesel::prelude::*;
use tracing::debug;

use crate::models::snapshots::{Snapshot, SnapshotRow};
use crate::schema;

/// Gets the most recent daily snapshot from the database
pub fn latest_snapshot(conn: &mut SqliteConnection) -> anyhow::Result<Option<Snapshot>> {
    debug!(target: crate::CIRCULATION_DATABASE, "fetching latest snapshot");
    schema::snapshots::table
        .order(schema::snapshots::timestamp.desc())
        .first::<SnapshotRow>(conn)
        .optional()
        .context("DB Error")?
        .map(Snapshot::try_from)
        .transpose()
}

/// Upserts a batch of snapshots in one transaction, preserving order
pub fn store_snapshots(conn: &mut SqliteConnection, snapshots: &[Snapshot]) -> anyhow::Result<()> {
    let rows = snapshots
        .iter()
        .map(SnapshotRow::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        for row in &rows {
            diesel::insert_into(schema::snapshots::table)
                .values(row)
                .on_conflict(schema::snapshots::id)
                .do_update()
                .set(row)
                .execute(conn)?;
        }
        Ok(())
    })
    .context("Failed to store snapshots")
}
