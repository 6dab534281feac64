use crate::domain::calendar::{date_key, start_of_week};
use crate::domain::models::DailyLedger;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

pub const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayMinutes {
    pub day_label: &'static str,
    pub date: NaiveDate,
    pub minutes: u32,
}

/// Minutes recorded for `subject_id` on each day of the Sunday-first week
/// containing `anchor`. Always seven entries, Sun through Sat.
pub fn weekly_minutes(ledger: &DailyLedger, subject_id: &str, anchor: NaiveDate) -> Vec<DayMinutes> {
    let start = start_of_week(anchor);
    DAY_LABELS
        .into_iter()
        .enumerate()
        .map(|(offset, day_label)| {
            let date = start + Duration::days(offset as i64);
            DayMinutes {
                day_label,
                date,
                minutes: ledger.minutes_on(&date_key(date), subject_id),
            }
        })
        .collect()
}

pub fn week_total(days: &[DayMinutes]) -> u32 {
    days.iter().map(|day| day.minutes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::parse_date_key;
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        parse_date_key(value).expect("valid date key")
    }

    #[test]
    fn empty_ledger_yields_seven_zero_days() {
        let days = weekly_minutes(&DailyLedger::new(), "subj-1", date("2026-10-14"));
        assert_eq!(days.len(), 7);
        assert!(days.iter().all(|day| day.minutes == 0));
        let labels: Vec<_> = days.iter().map(|day| day.day_label).collect();
        assert_eq!(labels, DAY_LABELS.to_vec());
        assert_eq!(days[0].date, date("2026-10-11"));
        assert_eq!(days[6].date, date("2026-10-17"));
    }

    #[test]
    fn picks_up_only_the_requested_subject_and_week() {
        let mut ledger = DailyLedger::new();
        ledger.add_minutes("2026-10-11", "subj-1", 25);
        ledger.add_minutes("2026-10-14", "subj-1", 50);
        ledger.add_minutes("2026-10-14", "subj-2", 99);
        ledger.add_minutes("2026-10-17", "subj-1", 10);
        ledger.add_minutes("2026-10-18", "subj-1", 300);
        ledger.add_minutes("2026-10-10", "subj-1", 300);

        let days = weekly_minutes(&ledger, "subj-1", date("2026-10-17"));
        let minutes: Vec<_> = days.iter().map(|day| day.minutes).collect();
        assert_eq!(minutes, vec![25, 0, 0, 50, 0, 0, 10]);
        assert_eq!(week_total(&days), 85);
    }

    #[test]
    fn anchor_on_sunday_starts_that_day() {
        let mut ledger = DailyLedger::new();
        ledger.add_minutes("2026-10-18", "subj-1", 30);
        let days = weekly_minutes(&ledger, "subj-1", date("2026-10-18"));
        assert_eq!(days[0].date, date("2026-10-18"));
        assert_eq!(days[0].minutes, 30);
    }

    proptest! {
        #[test]
        fn week_sum_matches_ledger_days_in_week(
            entries in proptest::collection::vec((0i64..60, 1u32..120), 0..40),
            anchor_offset in 0i64..60
        ) {
            let base = date("2026-09-01");
            let mut ledger = DailyLedger::new();
            for (offset, minutes) in &entries {
                ledger.add_minutes(&date_key(base + Duration::days(*offset)), "subj-1", *minutes);
            }
            let anchor = base + Duration::days(anchor_offset);
            let days = weekly_minutes(&ledger, "subj-1", anchor);

            let week_start = start_of_week(anchor);
            let expected: u32 = entries
                .iter()
                .filter(|(offset, _)| {
                    let day = base + Duration::days(*offset);
                    day >= week_start && day < week_start + Duration::days(7)
                })
                .map(|(_, minutes)| *minutes)
                .sum();

            prop_assert_eq!(days.len(), 7);
            prop_assert_eq!(week_total(&days), expected);
            prop_assert_eq!(weekly_minutes(&ledger, "subj-1", anchor), days);
        }
    }
}
