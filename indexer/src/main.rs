use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use circulation_database::Database;

use crate::blocks::BlockSource;
use crate::chain::erc20::Erc20Contract;
use crate::chain::RpcClient;
use crate::configs::Opts;
use crate::processor::Processor;

mod blocks;
mod chain;
mod circulation;
mod configs;
mod processor;
mod snapshots;
mod store;

// Category for logging
const CIRCULATION_INDEXER: &str = "circulation_indexer";

const BATCH_RETRY_DURATION: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let opts: Opts = Opts::parse();

    configs::init_tracing(opts.debug)?;

    // Open the database as early as possible as a sanity check; the indexer
    // should fail right away if the path is unusable
    let database = Database::connect(&opts.database_url)?;

    let rpc_client = RpcClient::new(opts.rpc_url.clone());
    let contract = Erc20Contract::new(rpc_client.clone(), circulation::CONTRACT_ADDRESS);

    let start_height = match opts.start_block {
        Some(height) => height,
        None => store::resume_height(&database)?.unwrap_or(circulation::CONTRACT_DEPLOYED_AT),
    };

    info!(
        target: CIRCULATION_INDEXER,
        "Starting circulation indexer from block {}", start_height
    );

    let mut block_source = BlockSource::new(
        rpc_client,
        start_height,
        opts.batch_size.get(),
        opts.finality_confirmations,
        Duration::from_secs(opts.poll_interval),
    );
    let mut processor = Processor::new(
        database,
        contract,
        Duration::from_secs(opts.latest_data_update_interval),
    )?;

    loop {
        let batch = match block_source.next_batch().await {
            Ok(batch) => batch,
            Err(err) => {
                error!(
                    target: CIRCULATION_INDEXER,
                    "Failed to fetch the next block batch: {:#}. Retry in {}s",
                    err,
                    BATCH_RETRY_DURATION.as_secs(),
                );
                tokio::time::sleep(BATCH_RETRY_DURATION).await;
                continue;
            }
        };

        // A batch is replayed until it commits; the bulk upsert makes the
        // replay idempotent
        while let Err(err) = processor.process_batch(&batch).await {
            error!(
                target: CIRCULATION_INDEXER,
                "Failed to process batch ending at block {}: {:#}. Retry in {}s",
                batch.blocks.last().map(|block| block.height).unwrap_or(0),
                err,
                BATCH_RETRY_DURATION.as_secs(),
            );
            tokio::time::sleep(BATCH_RETRY_DURATION).await;
        }
    }
}
