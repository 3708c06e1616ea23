use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;

use super::figures::{parse_decimal, CirculationFigures};
use crate::schema::circulation;

/// Fixed id of the singleton latest-circulation record.
pub const LATEST_CIRCULATION_ID: &str = "0";

/// Latest known circulation state, independent of the daily series. The
/// timestamp is the exact block time, not normalized to a day boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Circulation {
    pub id: String,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
    pub figures: CirculationFigures,
}

#[derive(Insertable, Queryable, AsChangeset, Clone, Debug)]
#[diesel(table_name = circulation)]
pub struct CirculationRow {
    pub id: String,
    pub block_height: i64,
    pub timestamp: NaiveDateTime,
    pub total_supply: String,
    pub reward: String,
    pub phala_chain_bridge: String,
    pub khala_chain_bridge: String,
    pub sygma_bridge: String,
    pub portal_bridge: String,
    #[diesel(column_name = circulation_value)]
    pub circulation: String,
}

impl TryFrom<&Circulation> for CirculationRow {
    type Error = anyhow::Error;

    fn try_from(circulation: &Circulation) -> anyhow::Result<Self> {
        Ok(Self {
            id: circulation.id.clone(),
            block_height: i64::try_from(circulation.block_height)
                .context("`block_height` expected to fit into i64")?,
            timestamp: circulation.timestamp.naive_utc(),
            total_supply: circulation.figures.total_supply.to_string(),
            reward: circulation.figures.reward.to_string(),
            phala_chain_bridge: circulation.figures.phala_chain_bridge.to_string(),
            khala_chain_bridge: circulation.figures.khala_chain_bridge.to_string(),
            sygma_bridge: circulation.figures.sygma_bridge.to_string(),
            portal_bridge: circulation.figures.portal_bridge.to_string(),
            circulation: circulation.figures.circulation.to_string(),
        })
    }
}

impl TryFrom<CirculationRow> for Circulation {
    type Error = anyhow::Error;

    fn try_from(row: CirculationRow) -> anyhow::Result<Self> {
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
