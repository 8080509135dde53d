use candlewick_core::common::{FeedKind, FeedZone};
use candlewick_core::config::MarketProfile;
use candlewick_core::series::entity::CandleRecord;
use candlewick_series::cursor::find_newest;
use candlewick_series::parser::parse_series;
use candlewick_series::reconcile::reconcile;
use candlewick_series::writer::encode_row;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn spy_profile(gap_fill: bool) -> MarketProfile {
    MarketProfile {
        name: "spy".to_string(),
        symbol: "SPY".to_string(),
        feed: FeedKind::Yahoo,
        blob_key: "data/spy.csv".to_string(),
        zone: FeedZone::UTC,
        gap_fill,
        lookback_days: 14,
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
}

fn fetched_prices() -> Vec<CandleRecord> {
    vec![
        CandleRecord::new(day(2017, 1, 6), dec!(900.0), dec!(300.0), dec!(250.0), dec!(300.0), dec!(3000.0)),
        CandleRecord::new(day(2017, 1, 7), dec!(900.0), dec!(300.0), dec!(250.0), dec!(300.0), dec!(3000.0)),
        CandleRecord::new(day(2017, 1, 8), dec!(9300.0), dec!(6300.0), dec!(6000.0), dec!(30340.0), dec!(304500.0)),
    ]
}

const PERSISTED: &str = "2017-01-03,225.04,225.83,223.8837,225.24,91087570\n\
                         2017-01-04,225.62,226.75,225.61,226.58,78458530\n\
                         2017-01-05,226.27,226.58,225.48,226.4,78291080";

#[test]
fn test_appends_new_days_but_not_today() {
    let now = noon(day(2017, 1, 8));
    let result = reconcile(&spy_profile(false), PERSISTED.as_bytes(), fetched_prices(), now).unwrap();

    assert_eq!(result.records_written, 2);
    assert_eq!(result.newest_close(), dec!(226.4));
    assert_eq!(result.most_recent_written, day(2017, 1, 7));

    let records = parse_series(&result.updated).unwrap();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.date != day(2017, 1, 8)));
}

#[test]
fn test_rerun_with_same_fetch_is_idempotent() {
    let now = noon(day(2017, 1, 8));
    let first = reconcile(&spy_profile(false), PERSISTED.as_bytes(), fetched_prices(), now).unwrap();
    let second = reconcile(&spy_profile(false), &first.updated, fetched_prices(), now).unwrap();

    assert_eq!(second.records_written, 0);
    assert_eq!(second.updated, first.updated);
    assert_eq!(second.most_recent_written, first.most_recent_written);
    assert_eq!(second.newest_close(), dec!(300.0));
}

#[test]
fn test_empty_history_accepts_yesterday() {
    let today = day(2024, 2, 10);
    let yesterday = CandleRecord::new(day(2024, 2, 9), dec!(1), dec!(2), dec!(0.5), dec!(1.5), dec!(42));

    let result = reconcile(&spy_profile(false), b"", vec![yesterday.clone()], noon(today)).unwrap();
    assert_eq!(result.records_written, 1);
    assert!(result.cursor.is_empty());
    assert_eq!(result.most_recent_written, day(2024, 2, 9));
    assert_eq!(parse_series(&result.updated).unwrap(), vec![yesterday]);
}

#[test]
fn test_header_only_history_is_empty() {
    let persisted = b"date,open,high,low,close,volume\n";
    let record = CandleRecord::new(day(2024, 2, 9), dec!(1), dec!(2), dec!(0.5), dec!(1.5), dec!(42));

    let result = reconcile(&spy_profile(false), persisted, vec![record], noon(day(2024, 2, 10))).unwrap();
    assert_eq!(result.records_written, 1);
    assert!(result.updated.starts_with(b"date,open"));
}

fn base() -> NaiveDate {
    day(2022, 12, 1)
}

fn arb_records() -> impl Strategy<Value = Vec<CandleRecord>> {
    prop::collection::vec((0u64..40, 1i64..10_000_000), 0..16).prop_map(|rows| {
        rows.into_iter()
            .map(|(offset, cents)| {
                let price = Decimal::new(cents, 2);
                CandleRecord::new(base() + Days::new(offset), price, price, price, price, Decimal::new(cents, 0))
            })
            .collect()
    })
}

fn encode(records: &[CandleRecord]) -> Vec<u8> {
    records.iter().flat_map(|r| encode_row(r).unwrap()).collect()
}

proptest! {
    #[test]
    fn prop_second_run_appends_nothing(
        history in arb_records(),
        fetched in arb_records(),
        today_offset in 0u64..45,
        gap_fill in any::<bool>(),
    ) {
        prop_assume!(!gap_fill || !fetched.is_empty());
        let now = noon(base() + Days::new(today_offset));
        let persisted = encode(&history);

        let first = reconcile(&spy_profile(gap_fill), &persisted, fetched.clone(), now).unwrap();
        let second = reconcile(&spy_profile(gap_fill), &first.updated, fetched, now).unwrap();
        prop_assert_eq!(second.records_written, 0);
        prop_assert_eq!(second.updated, first.updated);
    }

    #[test]
    fn prop_today_is_never_written(
        history in arb_records(),
        fetched in arb_records(),
        today_offset in 0u64..45,
    ) {
        let today = base() + Days::new(today_offset);
        let persisted = encode(&history);

        let result = reconcile(&spy_profile(false), &persisted, fetched, noon(today)).unwrap();
        let appended = parse_series(&result.updated[persisted.len()..]).unwrap();
        prop_assert!(appended.iter().all(|r| r.date != today));
        prop_assert_eq!(appended.len() as u64, result.records_written);
    }

    #[test]
    fn prop_cursor_is_monotonic_and_round_trips(
        history in arb_records(),
        fetched in arb_records(),
        today_offset in 0u64..45,
    ) {
        let persisted = encode(&history);
        let before = find_newest(&history);

        let result = reconcile(&spy_profile(false), &persisted, fetched, noon(base() + Days::new(today_offset))).unwrap();
        prop_assert!(result.most_recent_written >= before.newest_date);

        let after = find_newest(&parse_series(&result.updated).unwrap());
        if !after.is_empty() {
            prop_assert_eq!(after.newest_date, result.most_recent_written);
        }
    }
}
