use anyhow::Context;
use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, TimeZone, Utc};
use tracing::{info, warn};

use circulation_database::models::Snapshot;

use crate::chain::BlockHeader;
use crate::circulation::CirculationSource;

/// Walks a batch of block headers in stream order and produces the daily
/// snapshots they give rise to.
///
/// For every block landing on a calendar day strictly after the latest
/// snapshot, any skipped days are first filled by copying the latest
/// snapshot forward, then real figures are fetched for the triggering block
/// itself. Further blocks on an already covered day are redundant and
/// produce nothing. The returned sequence is ordered by day and ends, when
/// non-empty, with the newest real snapshot.
pub(crate) async fn collect_daily_snapshots<S: CirculationSource>(
    source: &S,
    mut latest: Option<Snapshot>,
    blocks: &[BlockHeader],
) -> anyhow::Result<Vec<Snapshot>> {
    let mut pending: Vec<Snapshot> = Vec::new();

    for block in blocks {
        let day = normalize_to_day(block.timestamp)
            .with_context(|| format!("Block {} carries an unusable timestamp", block.height))?;

        if let Some(snapshot) = &latest {
            if day <= snapshot.timestamp {
                if day < snapshot.timestamp {
                    // Upstream guarantees ordered blocks, so this should
                    // never fire; surface it instead of writing backwards.
                    warn!(
                        target: crate::CIRCULATION_INDEXER,
                        "Out-of-order block {}: day {} precedes latest snapshot {}",
                        block.height,
                        day.date_naive(),
                        snapshot.id,
                    );
                }
                continue;
            }

            // Bounded day-by-day loop: a months-long gap must not recurse
            // or skip, every missing day gets a carried-forward record.
            let mut fill_day = snapshot.timestamp + Duration::days(1);
            while fill_day < day {
                pending.push(Snapshot {
                    id: snapshot_id(fill_day),
                    block_height: snapshot.block_height,
                    timestamp: fill_day,
                    figures: snapshot.figures.clone(),
                });
                fill_day += Duration::days(1);
            }
        }

        info!(
            target: crate::CIRCULATION_INDEXER,
            "Fetching snapshot {} {}",
            block.height,
            snapshot_id(day),
        );
        let figures = source.fetch_circulation(block).await?;
        let snapshot = Snapshot {
            id: snapshot_id(day),
            block_height: block.height,
            timestamp: day,
            figures,
        };
        pending.push(snapshot.clone());
        latest = Some(snapshot);
    }

    Ok(pending)
}

/// UTC midnight of the calendar day the ms-epoch timestamp falls on.
fn normalize_to_day(timestamp_ms: u64) -> anyhow::Result<DateTime<Utc>> {
    let exact = block_time(timestamp_ms)?;
    Ok(Utc.from_utc_datetime(&exact.date_naive().and_time(NaiveTime::MIN)))
}

pub(crate) fn block_time(timestamp_ms: u64) -> anyhow::Result<DateTime<Utc>> {
    let millis = i64::try_from(timestamp_ms).context("block timestamp does not fit into i64")?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .context("block timestamp is out of range")
}

/// Snapshot ids mirror the timestamp: RFC 3339 with millisecond precision,
/// e.g. "2023-01-04T00:00:00.000Z".
pub(crate) fn snapshot_id(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use bigdecimal::BigDecimal;
    use circulation_database::models::CirculationFigures;

    use super::*;

    /// Returns canned figures keyed by block height and records every fetch.
    struct ScriptedSource {
        fetched_heights: RefCell<Vec<u64>>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                fetched_heights: RefCell::new(Vec::new()),
            }
        }
    }

    impl CirculationSource for ScriptedSource {
        async fn fetch_circulation(&self, block: &BlockHeader) -> anyhow::Result<CirculationFigures> {
            self.fetched_heights.borrow_mut().push(block.height);
            Ok(figures(block.height))
        }
    }

    fn figures(seed: u64) -> CirculationFigures {
        CirculationFigures {
            total_supply: BigDecimal::from(1000),
            reward: BigDecimal::from(0),
            phala_chain_bridge: BigDecimal::from(0),
            khala_chain_bridge: BigDecimal::from(0),
            sygma_bridge: BigDecimal::from(0),
            portal_bridge: BigDecimal::from(0),
            circulation: BigDecimal::from(seed),
        }
    }

    fn day(year: i32, month: u32, date: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, date, 0, 0, 0).unwrap()
    }

    fn block_at(height: u64, year: i32, month: u32, date: u32, hour: u32) -> BlockHeader {
        let timestamp = Utc
            .with_ymd_and_hms(year, month, date, hour, 30, 0)
            .unwrap()
            .timestamp_millis() as u64;
        BlockHeader { height, timestamp }
    }

    fn real_snapshot(height: u64, year: i32, month: u32, date: u32) -> Snapshot {
        let timestamp = day(year, month, date);
        Snapshot {
            id: snapshot_id(timestamp),
            block_height: height,
            timestamp,
            figures: figures(height),
        }
    }

    #[tokio::test]
    async fn first_run_produces_a_single_real_snapshot() {
        let source = ScriptedSource::new();
        let blocks = [block_at(100, 2023, 1, 1, 12)];

        let pending = collect_daily_snapshots(&source, None, &blocks).await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "2023-01-01T00:00:00.000Z");
        assert_eq!(pending[0].block_height, 100);
        assert_eq!(pending[0].timestamp, day(2023, 1, 1));
        assert_eq!(*source.fetched_heights.borrow(), vec![100]);
    }

    #[tokio::test]
    async fn gap_days_are_carried_forward() {
        let source = ScriptedSource::new();
        let latest = real_snapshot(100, 2023, 1, 1);
        let blocks = [block_at(400, 2023, 1, 4, 9)];

        let pending = collect_daily_snapshots(&source, Some(latest.clone()), &blocks)
            .await
            .unwrap();

        assert_eq!(pending.len(), 3);

        assert_eq!(pending[0].id, "2023-01-02T00:00:00.000Z");
        assert_eq!(pending[0].block_height, 100);
        assert_eq!(pending[0].figures, latest.figures);

        assert_eq!(pending[1].id, "2023-01-03T00:00:00.000Z");
        assert_eq!(pending[1].block_height, 100);
        assert_eq!(pending[1].figures, latest.figures);

        assert_eq!(pending[2].id, "2023-01-04T00:00:00.000Z");
        assert_eq!(pending[2].block_height, 400);
        assert_eq!(pending[2].figures, figures(400));

        // Only the triggering block was computed, never the filled days
        assert_eq!(*source.fetched_heights.borrow(), vec![400]);
    }

    #[tokio::test]
    async fn long_gaps_fill_every_single_day() {
        let source = ScriptedSource::new();
        let latest = real_snapshot(100, 2023, 1, 1);
        let blocks = [block_at(900, 2023, 3, 15, 0)];

        let pending = collect_daily_snapshots(&source, Some(latest), &blocks)
            .await
            .unwrap();

        // 2023-01-02 .. 2023-03-15, one record per day, no gaps
        assert_eq!(pending.len(), 73);
        assert_eq!(pending[0].id, "2023-01-02T00:00:00.000Z");
        assert_eq!(pending.last().unwrap().id, "2023-03-15T00:00:00.000Z");
        for window in pending.windows(2) {
            assert_eq!(window[1].timestamp - window[0].timestamp, Duration::days(1));
        }
        for snapshot in &pending {
            assert_eq!(snapshot.id, snapshot_id(snapshot.timestamp));
        }
        assert_eq!(pending.last().unwrap().block_height, 900);
        assert_eq!(*source.fetched_heights.borrow(), vec![900]);
    }

    #[tokio::test]
    async fn same_day_blocks_collapse_into_one_snapshot() {
        let source = ScriptedSource::new();
        let blocks = [
            block_at(200, 2023, 1, 2, 0),
            block_at(201, 2023, 1, 2, 8),
            block_at(202, 2023, 1, 2, 23),
        ];

        let pending = collect_daily_snapshots(&source, Some(real_snapshot(100, 2023, 1, 1)), &blocks)
            .await
            .unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].block_height, 200);
        assert_eq!(*source.fetched_heights.borrow(), vec![200]);
    }

    #[tokio::test]
    async fn multi_day_batch_produces_one_snapshot_per_day() {
        let source = ScriptedSource::new();
        let blocks = [
            block_at(100, 2023, 1, 1, 6),
            block_at(101, 2023, 1, 1, 18),
            block_at(200, 2023, 1, 2, 6),
            block_at(400, 2023, 1, 4, 6),
        ];

        let pending = collect_daily_snapshots(&source, None, &blocks).await.unwrap();

        let ids: Vec<&str> = pending.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "2023-01-01T00:00:00.000Z",
                "2023-01-02T00:00:00.000Z",
                "2023-01-03T00:00:00.000Z",
                "2023-01-04T00:00:00.000Z",
            ]
        );
        // 01-03 is a fill carrying the 01-02 figures forward
        assert_eq!(pending[2].block_height, 200);
        assert_eq!(pending[2].figures, pending[1].figures);
        assert_eq!(*source.fetched_heights.borrow(), vec![100, 200, 400]);
    }

    #[tokio::test]
    async fn out_of_order_days_are_ignored() {
        let source = ScriptedSource::new();
        let blocks = [block_at(90, 2023, 1, 3, 12)];

        let pending = collect_daily_snapshots(&source, Some(real_snapshot(500, 2023, 1, 5)), &blocks)
            .await
            .unwrap();

        assert!(pending.is_empty());
        assert!(source.fetched_heights.borrow().is_empty());
    }

    #[test]
    fn snapshot_ids_render_utc_midnight_with_millis() {
        assert_eq!(snapshot_id(day(2023, 1, 4)), "2023-01-04T00:00:00.000Z");
    }

    #[test]
    fn normalizes_timestamps_to_utc_midnight() {
        let late_evening = Utc
            .with_ymd_and_hms(2023, 6, 15, 23, 59, 59)
            .unwrap()
            .timestamp_millis() as u64;
        assert_eq!(normalize_to_day(late_evening).unwrap(), day(2023, 6, 15));

        let exact_midnight = day(2023, 6, 16).timestamp_millis() as u64;
        assert_eq!(normalize_to_day(exact_midnight).unwrap(), day(2023, 6, 16));
    }
}
