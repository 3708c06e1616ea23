use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;

use super::figures::{parse_decimal, CirculationFigures};
use crate::schema::snapshots;

/// One day of circulation history, keyed by the RFC 3339 rendering of its
/// UTC midnight timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
    pub figures: CirculationFigures,
}

#[derive(Insertable, Queryable, AsChangeset, Clone, Debug)]
#[diesel(table_name = snapshots)]
pub struct SnapshotRow {
    pub id: String,
    pub block_height: i64,
    pub timestamp: NaiveDateTime,
    pub total_supply: String,
    pub reward: String,
    pub phala_chain_bridge: String,
    pub khala_chain_bridge: String,
    pub sygma_bridge: String,
    pub portal_bridge: String,
    pub circulation: String,
}

impl TryFrom<&Snapshot> for SnapshotRow {
    type Error = anyhow::Error;

    fn try_from(snapshot: &Snapshot) -> anyhow::Result<Self> {
        Ok(Self {
            id: snapshot.id.clone(),
            block_height: i64::try_from(snapshot.block_height)
                .context("`block_height` expected to fit into i64")?,
            timestamp: snapshot.timestamp.naive_utc(),
            total_supply: snapshot.figures.total_supply.to_string(),
            reward: snapshot.figures.reward.to_string(),
            phala_chain_bridge: snapshot.figures.phala_chain_bridge.to_string(),
            khala_chain_bridge: snapshot.figures.khala_chain_bridge.to_string(),
            sygma_bridge: snapshot.figures.sygma_bridge.to_string(),
            portal_bridge: snapshot.figures.portal_bridge.to_string(),
            circulation: snapshot.figures.circulation.to_string(),
        })
    }
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = anyhow::Error;

    fn try_from(row: SnapshotRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            block_height: u64::try_from(row.block_height)
                .context("`block_height` expected to be u64")?,
            timestamp: row.timestamp.and_utc(),
            figures: CirculationFigures {
                total_supply: parse_decimal(&row.total_supply, "total_supply")?,
                reward: parse_decimal(&row.reward, "reward")?,
                phala_chain_bridge: parse_decimal(&row.phala_chain_bridge, "phala_chain_bridge")?,
                khala_chain_bridge: parse_decimal(&row.khala_chain_bridge, "khala_chain_bridge")?,
                sygma_bridge: parse_decimal(&row.sygma_bridge, "sygma_bridge")?,
                portal_bridge: parse_decimal(&row.portal_bridge, "portal_bridge")?,
                circulation: parse_decimal(&row.circulation, "circulation")?,
            },
        })
    }
}
