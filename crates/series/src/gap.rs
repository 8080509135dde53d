use crate::cursor::newest_record;
use candlewick_core::series::entity::CandleRecord;
use candlewick_core::series::error::SeriesError;
use chrono::{Days, NaiveDate};
use tracing::debug;

/// # Summary
/// 计算需要补齐的天数：最新抓取日期到今天之间、不含今天的缺失自然日数。
pub fn missing_days(newest_fetched: NaiveDate, today: NaiveDate) -> i64 {
    today.signed_duration_since(newest_fetched).num_days() - 1
}

/// # Summary
/// 为非交易日或数据源缺口生成前向填充记录。
///
/// # Logic
/// 1. 取抓取序列中日期最大的记录作为模板（日期相同取最后一条）。
/// 2. 缺失天数 = (今天 - 最新抓取日期) 的整天数 - 1，今天本身永不补齐。
/// 3. 对 i = 1..=缺失天数，复制模板并把日期设为最新抓取日期 + i 天，按日期递增追加到序列末尾。
///
/// # Arguments
/// * `market`: 市场名称，仅用于错误信息。
/// * `fetched`: 抓取到的真实记录，至少一条。
/// * `today`: 行情源参考时区下的今天。
///
/// # Returns
/// 追加了合成记录的序列；抓取结果为空时返回 `EmptyFetch`。
pub fn fill_gaps(
    market: &str,
    mut fetched: Vec<CandleRecord>,
    today: NaiveDate,
) -> Result<Vec<CandleRecord>, SeriesError> {
    let template = newest_record(&fetched)
        .cloned()
        .ok_or_else(|| SeriesError::EmptyFetch(market.to_string()))?;

    let missing = missing_days(template.date, today);
    if missing <= 0 {
        return Ok(fetched);
    }

    for offset in 1..=missing.unsigned_abs() {
        let Some(date) = template.date.checked_add_days(Days::new(offset)) else {
            break;
        };
        debug!(market, %date, close = %template.close, "forward-filling missing day");
        fetched.push(template.with_date(date));
    }

    Ok(fetched)
}
