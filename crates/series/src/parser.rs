use candlewick_core::series::entity::CandleRecord;
use candlewick_core::series::error::SeriesError;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 每一行数据必须包含的字段数: date,open,high,low,close,volume
pub const FIELD_COUNT: usize = 6;

/// 日期字段的唯一合法格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// # Summary
/// 将持久化的 CSV 文本解析为日线记录序列。
///
/// # Logic
/// 1. 逐行读取，不假设存在表头。
/// 2. 跳过空行，以及同时包含 date/open/close 字段的表头行。
/// 3. 其余每行必须恰好 6 个字段，日期为 `YYYY-MM-DD`，数值为十进制字符串。
/// 4. 字段不支持引号，带引号的字段按非法处理。
///
/// # Arguments
/// * `text`: 序列文件的原始字节。
///
/// # Returns
/// 按文件顺序排列的记录（不排序、不去重）；任意一行非法返回 `MalformedRecord`。
pub fn parse_series(text: &[u8]) -> Result<Vec<CandleRecord>, SeriesError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text);

    let mut records = Vec::new();
    let mut row = StringRecord::new();

    loop {
        let has_row = reader.read_record(&mut row).map_err(|e| SeriesError::MalformedRecord {
            line: e.position().map(|p| p.line()).unwrap_or_default(),
            reason: e.to_string(),
        })?;
        if !has_row {
            break;
        }

        let line = row.position().map(|p| p.line()).unwrap_or_default();
        if is_blank(&row) || is_header(&row) {
            continue;
        }
        records.push(parse_row(&row, line)?);
    }

    Ok(records)
}

/// # Summary
/// 判断一行是否为表头：字段中同时出现 date、open、close（忽略大小写）。
pub fn is_header(row: &StringRecord) -> bool {
    let has = |name: &str| row.iter().any(|field| field.eq_ignore_ascii_case(name));
    has("date") && has("open") && has("close")
}

// 只有真正的空行才跳过；`,,,,,` 是字段全空的损坏行
fn is_blank(row: &StringRecord) -> bool {
    row.len() == 1 && row.get(0).is_some_and(str::is_empty)
}

fn parse_row(row: &StringRecord, line: u64) -> Result<CandleRecord, SeriesError> {
    if row.len() != FIELD_COUNT {
        return Err(SeriesError::MalformedRecord {
            line,
            reason: format!("expected {} fields, found {}", FIELD_COUNT, row.len()),
        });
    }

    let date = parse_date(&row[0], line)?;
    Ok(CandleRecord::new(
        date,
        parse_decimal(&row[1], "open", line)?,
        parse_decimal(&row[2], "high", line)?,
        parse_decimal(&row[3], "low", line)?,
        parse_decimal(&row[4], "close", line)?,
        parse_decimal(&row[5], "volume", line)?,
    ))
}

fn parse_date(field: &str, line: u64) -> Result<NaiveDate, SeriesError> {
    // chrono 接受单位数的月/日，这里额外限定为严格的 10 字符格式
    if field.len() != 10 {
        return Err(SeriesError::MalformedRecord {
            line,
            reason: format!("date {:?} is not YYYY-MM-DD", field),
        });
    }
    NaiveDate::parse_from_str(field, DATE_FORMAT).map_err(|e| SeriesError::MalformedRecord {
        line,
        reason: format!("date {:?}: {}", field, e),
    })
}

/// # Summary
/// 解析十进制数值字段，支持可选符号与科学计数法。
///
/// # Logic
/// 1. 先按严格语法校验：`[+-]?digits(.digits)?([eE][+-]?digits)?`。
/// 2. 解析为 `Decimal`。
/// 3. 解析后的小数位少于文本要求的小数位说明发生了舍入，按非法处理。
pub fn parse_decimal(field: &str, name: &str, line: u64) -> Result<Decimal, SeriesError> {
    let malformed = |reason: String| SeriesError::MalformedRecord {
        line,
        reason: format!("{} {:?}: {}", name, field, reason),
    };

    let required_scale = decimal_grammar(field)
        .ok_or_else(|| malformed("not a decimal number".to_string()))?;

    let value = Decimal::from_str(field)
        .or_else(|_| Decimal::from_scientific(field))
        .map_err(|e| malformed(e.to_string()))?;

    if i64::from(value.scale()) < required_scale {
        return Err(malformed(format!(
            "needs {} decimal places, exceeds supported precision",
            required_scale
        )));
    }
    Ok(value)
}

/// # Summary
/// 按严格语法扫描数值文本。
///
/// # Returns
/// 合法时返回文本表示的小数位数 (小数部分位数减去指数，不小于 0)；非法返回 `None`。
fn decimal_grammar(field: &str) -> Option<i64> {
    let unsigned = field.strip_prefix(['+', '-']).unwrap_or(field);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (unsigned, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || frac_part.is_some_and(|f| !all_digits(f)) {
        return None;
    }

    let exp = match exponent {
        Some(e) => {
            let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
            if !all_digits(digits) {
                return None;
            }
            // 超长指数交给 Decimal 报错
            e.parse::<i64>().unwrap_or(i64::MAX)
        }
        None => 0,
    };

    let frac_len = i64::try_from(frac_part.map_or(0, str::len)).ok()?;
    Some(frac_len.saturating_sub(exp).max(0))
}
