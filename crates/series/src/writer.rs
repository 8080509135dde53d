use crate::parser::DATE_FORMAT;
use candlewick_core::series::entity::CandleRecord;
use candlewick_core::series::error::SeriesError;
use chrono::NaiveDate;
use csv::{Terminator, WriterBuilder};
use tracing::debug;

/// # Summary
/// 历史序列的追加目标。
///
/// # Invariants
/// - 只允许在末尾追加整行，已有内容永不改写。
pub trait SeriesSink {
    /// 追加一条记录
    fn append(&mut self, record: &CandleRecord) -> Result<(), SeriesError>;
}

/// # Summary
/// 将记录编码为一行 CSV：`date,open,high,low,close,volume\n`。
///
/// # Logic
/// 数值使用十进制原样输出，保持解析时的精度与小数位。
pub fn encode_row(record: &CandleRecord) -> Result<Vec<u8>, SeriesError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record([
            record.date.format(DATE_FORMAT).to_string(),
            record.open.to_string(),
            record.high.to_string(),
            record.low.to_string(),
            record.close.to_string(),
            record.volume.to_string(),
        ])
        .map_err(|e| SeriesError::Persistence(e.to_string()))?;

    writer
        .into_inner()
        .map_err(|e| SeriesError::Persistence(e.to_string()))
}

/// # Summary
/// 内存中的序列缓冲区，包装从对象存储下载的原始字节。
///
/// # Invariants
/// - 原内容末尾缺少换行时，首次追加前补一个 `\n`，避免新行与最后一行粘连。
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer {
    bytes: Vec<u8>,
}

impl SeriesBuffer {
    pub fn new(existing: Vec<u8>) -> Self {
        Self { bytes: existing }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl SeriesSink for SeriesBuffer {
    fn append(&mut self, record: &CandleRecord) -> Result<(), SeriesError> {
        let row = encode_row(record)?;
        if self.bytes.last().is_some_and(|b| *b != b'\n') {
            self.bytes.push(b'\n');
        }
        self.bytes.extend_from_slice(&row);
        Ok(())
    }
}

/// # Summary
/// 增量写入的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    // 实际追加的行数
    pub records_written: u64,
    // 已追加行中的最大日期；没有追加时等于原游标日期
    pub most_recent_written: NaiveDate,
}

/// # Summary
/// 增量写入器：只追加严格新于游标、且不是“今天”的记录。
///
/// # Invariants
/// - 写入顺序即抓取顺序，不做排序；调用方负责保证抓取结果按时间先后排列。
/// - `most_recent_written` 永不小于 `newest_known`。
/// - 用同一批抓取数据重复运行时，第二次追加 0 行。
#[derive(Debug, Clone, Copy)]
pub struct IncrementalWriter {
    newest_known: NaiveDate,
    today: NaiveDate,
}

impl IncrementalWriter {
    /// # Arguments
    /// * `newest_known`: 写入前序列中的最新日期。
    /// * `today`: 行情源参考时区下的今天，今天尚未收盘，永不写入。
    pub fn new(newest_known: NaiveDate, today: NaiveDate) -> Self {
        Self {
            newest_known,
            today,
        }
    }

    /// 判断一条抓取记录是否属于写入集合
    pub fn accepts(&self, record: &CandleRecord) -> bool {
        record.date > self.newest_known && record.date != self.today
    }

    /// # Summary
    /// 将符合条件的抓取记录逐行追加到目标序列。
    ///
    /// # Logic
    /// 1. 按给定顺序遍历抓取记录。
    /// 2. 过滤出日期大于游标且不等于今天的记录。
    /// 3. 每条记录单独追加一行，同时累计行数与最大日期。
    ///
    /// # Arguments
    /// * `fetched`: 抓取到的记录。
    /// * `sink`: 追加目标。
    ///
    /// # Returns
    /// 成功返回 `WriteOutcome`；任何一次追加失败都返回 `Persistence`，不报告部分行数。
    pub fn write<S: SeriesSink + ?Sized>(
        &self,
        fetched: &[CandleRecord],
        sink: &mut S,
    ) -> Result<WriteOutcome, SeriesError> {
        let mut outcome = WriteOutcome {
            records_written: 0,
            most_recent_written: self.newest_known,
        };

        for record in fetched.iter().filter(|r| self.accepts(r)) {
            debug!(date = %record.date, close = %record.close, "appending candle");
            sink.append(record)?;
            outcome.records_written += 1;
            if record.date > outcome.most_recent_written {
                outcome.most_recent_written = record.date;
            }
        }

        Ok(outcome)
    }
}
