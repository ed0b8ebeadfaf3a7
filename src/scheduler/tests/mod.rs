use super::*;
use chrono::{TimeZone, Timelike};

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, h, m, s).unwrap()
}

#[test]
fn test_parse_six_field_expression() {
    let schedule = CronSchedule::parse("0 30 2 * * *").unwrap();
    assert_eq!(schedule.expression(), "0 30 2 * * *");
    assert_eq!(schedule.to_string(), "0 30 2 * * *");
}

#[test]
fn test_parse_trims_whitespace() {
    let schedule = CronSchedule::parse("  0 0 * * * *  ").unwrap();
    assert_eq!(schedule.expression(), "0 0 * * * *");
}

#[test]
fn test_parse_rejects_garbage_with_config_key() {
    let err = CronSchedule::parse("at midnight").unwrap_err();
    match err {
        Error::Config { key, message } => {
            assert_eq!(key.as_deref(), Some("publish.start_schedule"));
            assert!(message.contains("at midnight"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_next_after_daily_schedule() {
    let schedule = CronSchedule::parse("0 0 3 * * *").unwrap();

    let before = at(1, 15, 0);
    let next = schedule.next_after(before).unwrap();
    assert_eq!(next, at(3, 0, 0));

    let after = at(3, 0, 0);
    let next = schedule.next_after(after).unwrap();
    assert_eq!(next.hour(), 3);
    assert_eq!(next.date_naive(), (after + chrono::Duration::days(1)).date_naive());
}

#[test]
fn test_upcoming_is_strictly_increasing() {
    let schedule = CronSchedule::parse("0 */15 * * * *").unwrap();
    let times = schedule.upcoming_after(at(10, 7, 0), 4);

    assert_eq!(
        times,
        vec![at(10, 15, 0), at(10, 30, 0), at(10, 45, 0), at(11, 0, 0)]
    );
}

#[test]
fn test_from_str_matches_parse() {
    let schedule: CronSchedule = "0 0 12 * * *".parse().unwrap();
    assert_eq!(schedule.next_after(at(11, 0, 0)), Some(at(12, 0, 0)));
}
