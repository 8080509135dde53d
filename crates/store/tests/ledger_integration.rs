use candlewick_core::predict::entity::TradingAction;
use candlewick_core::store::port::{BlobStore, RunLedger, RunRecord};
use candlewick_store::blob::FsBlobStore;
use candlewick_store::ledger::SqliteRunLedger;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use tempfile::tempdir;

fn run(market: &str, hours: i64, action: Option<TradingAction>) -> RunRecord {
    RunRecord {
        run_id: format!("run-{}", hours),
        market: market.to_string(),
        run_at: Utc.with_ymd_and_hms(2024, 2, 10, 0, 5, 0).unwrap() + Duration::hours(hours),
        rows_written: 1,
        most_recent_date: NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(),
        newest_close: dec!(47800.33),
        action,
    }
}

#[tokio::test]
async fn test_ledger_persists_across_reopen() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("ledger.db");

    {
        let ledger = SqliteRunLedger::open(&path).await?;
        ledger.record(&run("btc", 0, Some(TradingAction::NoneToBuy))).await?;
        ledger.record(&run("eth", 0, None)).await?;
    }

    let ledger = SqliteRunLedger::open(&path).await?;
    let records = ledger.recent("btc", 10).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0], run("btc", 0, Some(TradingAction::NoneToBuy)));
    Ok(())
}

#[tokio::test]
async fn test_recent_is_newest_first_and_limited() -> anyhow::Result<()> {
    let ledger = SqliteRunLedger::in_memory().await?;
    for hours in [0, 48, 24] {
        ledger.record(&run("btc", hours, Some(TradingAction::NoneToNone))).await?;
    }

    let records = ledger.recent("btc", 2).await?;
    let ids: Vec<&str> = records.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(ids, vec!["run-48", "run-24"]);
    assert!(ledger.recent("spy", 5).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fs_blob_store_nested_keys() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = FsBlobStore::new(dir.path());

    store.put("candlewick", "data/btc.csv", b"2024-02-09,1,1,1,1,1\n".to_vec()).await?;
    store.put("candlewick", "data/eth.csv", Vec::new()).await?;

    assert_eq!(store.get("candlewick", "data/btc.csv").await?, b"2024-02-09,1,1,1,1,1\n");
    assert!(store.get("candlewick", "data/eth.csv").await?.is_empty());
    Ok(())
}
