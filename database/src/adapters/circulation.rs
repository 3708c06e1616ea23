use anyhow::Context;
use diesel::prelude::*;

use crate::models::circulation::{Circulation, CirculationRow, LATEST_CIRCULATION_ID};
use crate::schema;

/// Gets the singleton latest-circulation record, if it was ever written
pub fn get_circulation(conn: &mut SqliteConnection) -> anyhow::Result<Option<Circulation>> {
    schema::circulation::table
        .find(LATEST_CIRCULATION_ID)
        .first::<CirculationRow>(conn)
        .optional()
        .context("DB Error")?
        .map(Circulation::try_from)
        .transpose()
}

/// Upserts the singleton latest-circulation record in place
pub fn store_circulation(
    conn: &mut SqliteConnection,
    circulation: &Circulation,
) -> anyhow::Result<()> {
    let row = CirculationRow::try_from(circulation)?;
    diesel::insert_into(schema::circulation::table)
        .values(&row)
        .on_conflict(schema::circulation::id)
        .do_update()
        .set(&row)
        .execute(conn)
        .context("Failed to store the latest circulation record")?;
    Ok(())
}
