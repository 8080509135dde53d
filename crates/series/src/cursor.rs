use candlewick_core::series::entity::CandleRecord;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// # Summary
/// 对账游标：历史序列中的最新日期及其收盘价。
///
/// # Invariants
/// - 每次运行都从序列文件重新计算，不单独持久化。
/// - 空序列的游标日期为 1900-01-01，早于任何真实数据，此时收盘价为 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub newest_date: NaiveDate,
    pub newest_close: Decimal,
}

impl Cursor {
    /// # Summary
    /// 空序列的哨兵游标。
    pub fn empty() -> Self {
        Self {
            newest_date: sentinel_date(),
            newest_close: Decimal::ZERO,
        }
    }

    /// 序列中是否还没有任何记录
    pub fn is_empty(&self) -> bool {
        self.newest_date == sentinel_date()
    }
}

fn sentinel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// # Summary
/// 找出日期最大的记录。
///
/// # Logic
/// 不假设输入有序；日期相同的多条记录取最后出现的一条。
pub fn newest_record(records: &[CandleRecord]) -> Option<&CandleRecord> {
    records.iter().fold(None, |best, record| match best {
        Some(b) if b.date > record.date => Some(b),
        _ => Some(record),
    })
}

/// # Summary
/// 从记录序列计算对账游标。
///
/// # Arguments
/// * `records`: 任意顺序的记录。
///
/// # Returns
/// 最新记录的 (日期, 收盘价)；序列为空时返回 `Cursor::empty()`。
pub fn find_newest(records: &[CandleRecord]) -> Cursor {
    newest_record(records)
        .map(|r| Cursor {
            newest_date: r.date,
            newest_close: r.close,
        })
        .unwrap_or_else(Cursor::empty)
}
