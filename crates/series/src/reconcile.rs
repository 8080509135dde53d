use crate::cursor::{Cursor, find_newest};
use crate::gap::fill_gaps;
use crate::parser::parse_series;
use crate::writer::{IncrementalWriter, SeriesBuffer};
use candlewick_core::config::MarketProfile;
use candlewick_core::series::entity::CandleRecord;
use candlewick_core::series::error::SeriesError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// # Summary
/// 单个市场一次对账的结果。
///
/// # Invariants
/// - `most_recent_written >= cursor.newest_date`。
/// - `newest_close` 取自写入之前的序列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    // 追加新行之后的完整序列内容
    pub updated: Vec<u8>,
    // 对账前的游标
    pub cursor: Cursor,
    // 实际追加的行数
    pub records_written: u64,
    // 对账之后序列中的最新日期
    pub most_recent_written: NaiveDate,
    // 前向填充生成的合成记录数 (未必全部被写入)
    pub synthesized: usize,
    // 本次判定使用的“今天”
    pub today: NaiveDate,
}

impl Reconciliation {
    /// 对账前序列中的最新收盘价
    pub fn newest_close(&self) -> Decimal {
        self.cursor.newest_close
    }
}

/// # Summary
/// 把新抓取的日线合并进持久化序列。
///
/// # Logic
/// 1. 解析持久化内容并计算游标。
/// 2. 按市场参考时区计算今天。
/// 3. 若该市场需要前向填充，先补齐缺失的非交易日。
/// 4. 按日期稳定排序抓取结果，保证追加顺序与时间顺序一致。
/// 5. 通过增量写入器追加新行。
///
/// # Arguments
/// * `market`: 市场配置（时区与是否前向填充）。
/// * `persisted`: 当前持久化的序列字节。
/// * `fetched`: 抓取到的记录。
/// * `now`: 当前时刻。
///
/// # Returns
/// 成功返回 `Reconciliation`，解析或写入失败返回 `SeriesError`。
pub fn reconcile(
    market: &MarketProfile,
    persisted: &[u8],
    fetched: Vec<CandleRecord>,
    now: DateTime<Utc>,
) -> Result<Reconciliation, SeriesError> {
    let history = parse_series(persisted)?;
    let cursor = find_newest(&history);
    let today = market.zone.today(now);

    let real = fetched.len();
    let mut candidates = if market.gap_fill {
        fill_gaps(&market.name, fetched, today)?
    } else {
        fetched
    };
    let synthesized = candidates.len() - real;
    candidates.sort_by_key(|r| r.date);

    let mut buffer = SeriesBuffer::new(persisted.to_vec());
    let outcome = IncrementalWriter::new(cursor.newest_date, today).write(&candidates, &mut buffer)?;

    Ok(Reconciliation {
        updated: buffer.into_bytes(),
        cursor,
        records_written: outcome.records_written,
        most_recent_written: outcome.most_recent_written,
        synthesized,
        today,
    })
}
