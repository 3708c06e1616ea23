use std::time::Duration;

use anyhow::Context;
use tracing::info;

use circulation_database::models::{Circulation, Snapshot, LATEST_CIRCULATION_ID};

use crate::blocks::BlockBatch;
use crate::circulation::CirculationSource;
use crate::snapshots::{self, collect_daily_snapshots};
use crate::store::Store;

/// Per-batch orchestration: the daily snapshot series first, then the
/// latest-circulation refresh. Holds the only mutable state of the pipeline,
/// threaded explicitly from batch to batch.
pub(crate) struct Processor<S, C> {
    store: S,
    source: C,
    latest_snapshot: Option<Snapshot>,
    /// ms epoch of the last singleton refresh; 0 until the first one.
    last_latest_data_update: i64,
    latest_data_update_interval: Duration,
}

impl<S: Store, C: CirculationSource> Processor<S, C> {
    pub(crate) fn new(
        store: S,
        source: C,
        latest_data_update_interval: Duration,
    ) -> anyhow::Result<Self> {
        let latest_snapshot = store.latest_snapshot()?;
        let last_latest_data_update = store
            .circulation()?
            .map(|record| record.timestamp.timestamp_millis())
            .unwrap_or(0);

        Ok(Self {
            store,
            source,
            latest_snapshot,
            last_latest_data_update,
            latest_data_update_interval,
        })
    }

    /// Processes one ordered batch of finalized blocks. Nothing is persisted
    /// until the whole batch has been computed, so a chain-query failure
    /// leaves the store untouched and the batch can simply be replayed.
    pub(crate) async fn process_batch(&mut self, batch: &BlockBatch) -> anyhow::Result<()> {
        if batch.blocks.is_empty() {
            return Ok(());
        }

        let pending =
            collect_daily_snapshots(&self.source, self.latest_snapshot.clone(), &batch.blocks)
                .await?;
        if !pending.is_empty() {
            self.store
                .store_snapshots(&pending)
                .context("Failed to flush daily snapshots")?;
            info!(
                target: crate::CIRCULATION_INDEXER,
                "Stored {} daily snapshot(s) up to {}",
                pending.len(),
                pending[pending.len() - 1].id,
            );
            self.latest_snapshot = pending.into_iter().next_back();
        }

        if batch.is_head {
            self.refresh_latest(batch).await?;
        }

        Ok(())
    }

    /// Refreshes the latest-circulation singleton against the last block of
    /// a batch that reached the chain head, at most once per configured
    /// interval of block time.
    async fn refresh_latest(&mut self, batch: &BlockBatch) -> anyhow::Result<()> {
        let block = batch.blocks.last().context("head batch contains no blocks")?;
        let block_timestamp =
            i64::try_from(block.timestamp).context("block timestamp does not fit into i64")?;

        if !should_refresh_latest(
            self.last_latest_data_update,
            block_timestamp,
            self.latest_data_update_interval,
        ) {
            return Ok(());
        }

        info!(
            target: crate::CIRCULATION_INDEXER,
            "Updating latest data at block {} (interval: {}s)",
            block.height,
            self.latest_data_update_interval.as_secs(),
        );
        let figures = self.source.fetch_circulation(block).await?;
        let circulation = Circulation {
            id: LATEST_CIRCULATION_ID.to_string(),
            block_height: block.height,
            timestamp: snapshots::block_time(block.timestamp)?,
            figures,
        };
        self.store
            .store_circulation(&circulation)
            .context("Failed to upsert the latest circulation record")?;
        self.last_latest_data_update = block_timestamp;

        Ok(())
    }
}

/// True once at least `interval` of block time has passed since the last
/// refresh. Timestamps are ms epoch.
fn should_refresh_latest(last_update_ms: i64, block_timestamp_ms: i64, interval: Duration) -> bool {
    block_timestamp_ms.saturating_sub(last_update_ms) >= interval.as_millis() as i64
}
