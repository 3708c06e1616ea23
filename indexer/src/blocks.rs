use std::time::Duration;

use futures::future::try_join_all;
use tracing::debug;

use crate::chain::{BlockHeader, RpcClient};

/// One contiguous run of finalized block headers. `is_head` is set when the
/// batch ends exactly at the finalized chain head.
pub(crate) struct BlockBatch {
    pub blocks: Vec<BlockHeader>,
    pub is_head: bool,
}

/// Polling source of ordered, gap-free-by-height block batches. Only blocks
/// buried at least `finality_confirmations` below the node head are handed
/// out, so reorgs never reach the processor.
pub(crate) struct BlockSource {
    client: RpcClient,
    next_height: u64,
    batch_size: u64,
    finality_confirmations: u64,
    poll_interval: Duration,
}

impl BlockSource {
    pub(crate) fn new(
        client: RpcClient,
        start_height: u64,
        batch_size: u64,
        finality_confirmations: u64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            next_height: start_height,
            batch_size,
            finality_confirmations,
            poll_interval,
        }
    }

    /// Waits until at least one new finalized block exists past the cursor,
    /// then fetches the next contiguous range of headers concurrently.
    pub(crate) async fn next_batch(&mut self) -> anyhow::Result<BlockBatch> {
        let head = loop {
            let head = self.finalized_head().await?;
            if head >= self.next_height {
                break head;
            }
            debug!(
                target: crate::CIRCULATION_INDEXER,
                "Caught up with the finalized head at {}, polling again in {}s",
                head,
                self.poll_interval.as_secs(),
            );
            tokio::time::sleep(self.poll_interval).await;
        };

        let end = head.min(self.next_height + self.batch_size - 1);
        let headers = (self.next_height..=end).map(|height| self.client.block_header(height));
        let blocks = try_join_all(headers).await?;
        self.next_height = end + 1;

        Ok(BlockBatch {
            blocks,
            is_head: end == head,
        })
    }

    async fn finalized_head(&self) -> anyhow::Result<u64> {
        let head = self.client.block_number().await?;
        Ok(head.saturating_sub(self.finality_confirmations))
    }
}
