use clap::Parser;
use tracing_subscriber::EnvFilter;

/// PHA circulation indexer
/// Tracks the circulating supply of the PHA token on Base mainnet and keeps
/// a dense daily history plus a continuously refreshed latest record
#[derive(Parser, Debug)]
#[clap(
    version,
    author,
    about,
    disable_help_subcommand(true),
    propagate_version(true),
    next_line_help(true)
)]
pub(crate) struct Opts {
    /// Path of the SQLite database holding the circulation records
    #[clap(long, env, default_value = "circulation.sqlite3")]
    pub database_url: String,
    /// JSON-RPC endpoint of a Base mainnet node
    #[clap(long, env)]
    pub rpc_url: String,
    /// Enables debug level of logs
    #[clap(long)]
    pub debug: bool,
    /// Minimum interval between refreshes of the latest circulation record, in seconds
    #[clap(long, env = "LATEST_DATA_UPDATE_INTERVAL", default_value = "300")]
    pub latest_data_update_interval: u64,
    /// Start from this block height instead of resuming from the database
    #[clap(long)]
    pub start_block: Option<u64>,
    /// Number of blocks fetched per batch
    #[clap(long, default_value = "100")]
    pub batch_size: std::num::NonZeroU64,
    /// Blocks behind the node head considered final
    #[clap(long, default_value = "75")]
    pub finality_confirmations: u64,
    /// Seconds to wait between head checks once caught up
    #[clap(long, default_value = "10")]
    pub poll_interval: u64,
}

pub(crate) fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let mut env_filter = EnvFilter::new("circulation_indexer=info,circulation_database=info");

    if debug {
        env_filter = env_filter
            .add_directive("circulation_indexer=debug".parse()?)
            .add_directive("circulation_database=debug".parse()?);
    }

    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        if !rust_log.is_empty() {
            for directive in rust_log.split(',').filter_map(|s| match s.parse() {
                Ok(directive) => Some(directive),
                Err(err) => {
                    eprintln!("Ignoring directive `{}`: {}", s, err);
                    None
                }
            }) {
                env_filter = env_filter.add_directive(directive);
            }
        }
    }

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if std::env::var("ENABLE_JSON_LOGS").is_ok() {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }

    Ok(())
}
