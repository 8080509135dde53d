use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::FeedZone;

/// # Summary
/// 单个交易日的 OHLCV 日线记录，是历史序列文件中的一行。
///
/// # Invariants
/// - `date` 只保留天粒度，两条记录属于“同一天”当且仅当 `date` 相等。
/// - 所有数值字段均为十进制定点数，禁止使用二进制浮点，避免多次追加后累计误差。
/// - 构造后不可变；补齐缺口时通过 `with_date` 生成新记录而不是原地修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleRecord {
    // 交易日
    pub date: NaiveDate,
    // 开盘价
    pub open: Decimal,
    // 最高价
    pub high: Decimal,
    // 最低价
    pub low: Decimal,
    // 收盘价
    pub close: Decimal,
    // 成交量
    pub volume: Decimal,
}

impl CandleRecord {
    pub fn new(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// # Summary
    /// 由带时刻的 K 线起始时间构造记录，时刻部分在参考时区下截断丢弃。
    ///
    /// # Arguments
    /// * `start`: 行情源返回的 K 线开始时间。
    /// * `zone`: 行情源的参考时区。
    pub fn at_instant(
        start: DateTime<Utc>,
        zone: FeedZone,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self::new(zone.date_of(start), open, high, low, close, volume)
    }

    /// # Summary
    /// 复制当前记录的全部 OHLCV 字段，仅替换日期。
    ///
    /// # Logic
    /// 用于前向填充：非交易日沿用最近一个真实交易日的价格与成交量。
    pub fn with_date(&self, date: NaiveDate) -> Self {
        Self {
            date,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_at_instant_discards_time_of_day() {
        let start = Utc.with_ymd_and_hms(2017, 1, 6, 14, 30, 0).unwrap();
        let record = CandleRecord::at_instant(
            start,
            FeedZone::UTC,
            dec!(1),
            dec!(2),
            dec!(0.5),
            dec!(1.5),
            dec!(100),
        );
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2017, 1, 6).unwrap());
    }

    #[test]
    fn test_with_date_keeps_prices() {
        let day = NaiveDate::from_ymd_opt(2017, 1, 6).unwrap();
        let next = NaiveDate::from_ymd_opt(2017, 1, 7).unwrap();
        let record = CandleRecord::new(day, dec!(225.04), dec!(225.83), dec!(223.8837), dec!(225.24), dec!(91087570));

        let copy = record.with_date(next);
        assert_eq!(copy.date, next);
        assert_eq!(copy.close, record.close);
        assert_eq!(copy.volume, record.volume);
        assert_eq!(record.date, day);
    }
}
