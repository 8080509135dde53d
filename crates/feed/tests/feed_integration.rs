use candlewick_core::market::port::MarketDataFeed;
use candlewick_feed::coinbase::CoinbaseFeed;
use candlewick_feed::yahoo::YahooFeed;
use chrono::{Days, Utc};

fn install_crypto() {
    // 多个测试共享进程，重复安装会返回 Err，忽略即可
    drop(rustls::crypto::ring::default_provider().install_default());
}

/// # Summary
/// Yahoo 真实接口抓取测试，需要网络，默认忽略。
///
/// # Logic
/// 1. 抓取 SPY 最近 10 天的日线。
/// 2. 断言非空且日期严格递增。
#[tokio::test]
#[ignore]
async fn test_yahoo_real_fetch() -> anyhow::Result<()> {
    install_crypto();
    let feed = YahooFeed::new()?;
    let end = Utc::now().date_naive();
    let start = end - Days::new(10);

    let records = feed.fetch("SPY", start, end).await?;
    assert!(!records.is_empty(), "SPY should have trading days in 10 days");
    assert!(records.windows(2).all(|w| w[0].date < w[1].date));
    for record in &records {
        println!("{} close={}", record.date, record.close);
    }
    Ok(())
}

/// # Summary
/// Coinbase 真实接口抓取测试，需要网络，默认忽略。
#[tokio::test]
#[ignore]
async fn test_coinbase_real_fetch() -> anyhow::Result<()> {
    install_crypto();
    let feed = CoinbaseFeed::new()?;
    let end = Utc::now().date_naive();
    let start = end - Days::new(7);

    let records = feed.fetch("BTC-USD", start, end).await?;
    // 加密货币 7x24，7 天窗口至少有 7 根完整日线
    assert!(records.len() >= 7, "got {} candles", records.len());
    assert!(records.windows(2).all(|w| w[0].date < w[1].date));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_coinbase_unknown_product() -> anyhow::Result<()> {
    install_crypto();
    let feed = CoinbaseFeed::new()?;
    let end = Utc::now().date_naive();
    let result = feed.fetch("NOPE-USD", end - Days::new(3), end).await;
    assert!(result.is_err());
    Ok(())
}
