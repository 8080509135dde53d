use candlewick_core::config::PredictorConfig;
use candlewick_core::predict::entity::{SeriesSnapshot, TradingAction};
use candlewick_core::predict::port::{PredictError, Predictor};
use candlewick_predict::command::CommandPredictor;
use std::time::Instant;
use tempfile::tempdir;

fn shell(script: &str, work_dir: &std::path::Path, timeout_secs: u64) -> CommandPredictor {
    // sh -c 'script' predictor --coin_to_predict=.. --data_dir=..
    // 追加的参数依次成为 $1、$2
    CommandPredictor::new(&PredictorConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "predictor".to_string()],
        work_dir: work_dir.display().to_string(),
        timeout_secs,
    })
}

fn snapshots() -> Vec<SeriesSnapshot> {
    vec![
        SeriesSnapshot {
            market: "btc".to_string(),
            csv: b"2024-02-09,1,1,1,47800.33,1\n".to_vec(),
        },
        SeriesSnapshot {
            market: "eth".to_string(),
            csv: b"2024-02-09,1,1,1,2500,1\n".to_vec(),
        },
    ]
}

#[tokio::test]
async fn test_reads_staged_snapshots_and_returns_action() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let script = r#"
        test "$1" = "--coin_to_predict=btc" || exit 3
        data="${2#--data_dir=}"
        grep -q 47800.33 "$data/btc.csv" || exit 4
        test -f "$data/eth.csv" || exit 5
        echo "training..."
        echo "none_to_buy"
    "#;

    let action = shell(script, dir.path(), 10).predict("btc", &snapshots()).await?;
    assert_eq!(action, TradingAction::NoneToBuy);
    Ok(())
}

#[tokio::test]
async fn test_non_zero_exit_is_failure() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let predictor = shell("echo 'model missing' >&2; echo none_to_buy; exit 2", dir.path(), 10);

    let result = predictor.predict("btc", &snapshots()).await;
    assert!(matches!(result, Err(PredictError::Failed(msg)) if msg.contains("model missing")));
    Ok(())
}

#[tokio::test]
async fn test_timeout_kills_predictor() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let predictor = shell("sleep 30; echo none_to_buy", dir.path(), 1);

    let started = Instant::now();
    let result = predictor.predict("btc", &snapshots()).await;
    assert!(matches!(result, Err(PredictError::Timeout(1))));
    assert!(started.elapsed().as_secs() < 10);
    Ok(())
}

#[tokio::test]
async fn test_unknown_output_and_missing_program() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let result = shell("echo maybe_buy", dir.path(), 10)
        .predict("btc", &snapshots())
        .await;
    assert!(matches!(result, Err(PredictError::UnknownAction(a)) if a == "maybe_buy"));

    let missing = CommandPredictor::new(&PredictorConfig {
        program: "/nonexistent/predictor".to_string(),
        args: Vec::new(),
        work_dir: dir.path().display().to_string(),
        timeout_secs: 10,
    });
    assert!(matches!(
        missing.predict("btc", &snapshots()).await,
        Err(PredictError::Spawn(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_target_market_must_be_in_snapshots() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let result = shell("echo none", dir.path(), 10).predict("sol", &snapshots()).await;
    assert!(matches!(result, Err(PredictError::Spawn(_))));
    Ok(())
}
