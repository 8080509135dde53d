pub mod time;

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 行情数据源类型，决定某个市场使用哪一个 Feed 适配器抓取日线。
///
/// # Invariants
/// - 无特定约束。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    // Yahoo Finance 图表接口 (股票/ETF，非交易日无数据)
    Yahoo,
    // Coinbase Exchange 日线接口 (加密货币，7x24)
    Coinbase,
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(FeedKind::Yahoo),
            "coinbase" => Ok(FeedKind::Coinbase),
            _ => Err(format!("Unknown FeedKind: {}", s)),
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::Yahoo => write!(f, "yahoo"),
            FeedKind::Coinbase => write!(f, "coinbase"),
        }
    }
}

/// # Summary
/// 行情源的参考时区，用于把时间戳截断为“交易日”以及计算“今天”。
///
/// # Invariants
/// - 加密货币行情使用 UTC，股票行情使用交易所本地时区 (例如 America/Los_Angeles)。
/// - 序列化形式为 IANA 时区名称字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeedZone(Tz);

impl FeedZone {
    /// UTC 参考时区
    pub const UTC: FeedZone = FeedZone(Tz::UTC);

    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// # Summary
    /// 将任意时间点截断为该时区下的自然日。
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// # Summary
    /// 计算该时区下的“今天”。
    ///
    /// # Arguments
    /// * `now`: 当前时刻 (通常来自 `TimeProvider`)。
    ///
    /// # Returns
    /// 截断到天粒度的当前日期。
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.date_of(now)
    }

    /// # Summary
    /// 计算该时区下的“昨天”，即最近一个已经收盘的自然日。
    pub fn yesterday(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = self.today(now);
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for FeedZone {
    fn default() -> Self {
        Self::UTC
    }
}

impl TryFrom<String> for FeedZone {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for FeedZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s.trim())
            .map(FeedZone)
            .map_err(|e| format!("Unknown time zone {}: {}", s, e))
    }
}

impl From<FeedZone> for String {
    fn from(zone: FeedZone) -> Self {
        zone.name().to_string()
    }
}

impl std::fmt::Display for FeedZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_feed_kind_round_trip() {
        assert_eq!("Yahoo".parse::<FeedKind>(), Ok(FeedKind::Yahoo));
        assert_eq!(FeedKind::Coinbase.to_string(), "coinbase");
        assert!("ftx".parse::<FeedKind>().is_err());
    }

    #[test]
    fn test_today_depends_on_zone() {
        // 2024-03-02 03:00 UTC 在洛杉矶仍是 3 月 1 日
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap();
        let la: FeedZone = "America/Los_Angeles".parse().unwrap();

        assert_eq!(FeedZone::UTC.today(now), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(la.today(now), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(la.yesterday(now), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_zone_rejects_unknown_name() {
        assert!("Mars/Olympus".parse::<FeedZone>().is_err());
    }
}
