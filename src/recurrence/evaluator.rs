//! Recurrence evaluation
//!
//! Pure decision logic: given a validated rule, a template's reference due
//! date and a processing date, decide whether the template fires and what due
//! date a generated instance carries. The processing date is always passed in
//! explicitly so evaluation is deterministic under test and during replay.
//!
//! Calendar edges follow a clamp policy: a monthly rule targeting a day the
//! current month does not have fires on the month's last day, and a yearly
//! rule anchored on Feb 29 fires on Feb 28 in non-leap years. Clamped firings
//! surface through `DueDateOutcome::Fallback` so callers can log them.

use crate::recurrence::Recurrence;
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Outcome of a due-date computation.
///
/// `Fallback` carries the same due date shape as `Computed` but records why
/// the rule could not be honored literally for this occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueDateOutcome {
    Computed(DateTime<Utc>),
    Fallback { due: DateTime<Utc>, reason: String },
}

impl DueDateOutcome {
    pub fn due(&self) -> DateTime<Utc> {
        match self {
            DueDateOutcome::Computed(due) => *due,
            DueDateOutcome::Fallback { due, .. } => *due,
        }
    }
}

/// Decide whether a template fires on the processing date.
pub fn should_fire(
    rule: &Recurrence,
    reference_due_date: Option<&DateTime<Utc>>,
    processing_date: NaiveDate,
) -> bool {
    match rule {
        Recurrence::Daily { interval } => match reference_due_date {
            // No anchor: the template fires on every run.
            None => true,
            Some(reference) => {
                let days = processing_date
                    .signed_duration_since(reference.date_naive())
                    .num_days();
                days % i64::from(*interval) == 0
            }
        },
        Recurrence::Weekly { days_of_week } => match days_of_week {
            Some(days) => days.contains(&processing_date.weekday()),
            None => reference_due_date
                .map(|reference| reference.date_naive().weekday() == processing_date.weekday())
                .unwrap_or(false),
        },
        Recurrence::Monthly { day_of_month } => {
            let target = day_of_month.or_else(|| reference_due_date.map(|r| r.day()));
            match target {
                None => false,
                Some(target) => {
                    let last = days_in_month(processing_date.year(), processing_date.month());
                    processing_date.day() == target.min(last)
                }
            }
        }
        Recurrence::Yearly => match reference_due_date {
            None => false,
            Some(reference) => {
                if processing_date.month() != reference.month() {
                    return false;
                }
                let last = days_in_month(processing_date.year(), processing_date.month());
                processing_date.day() == reference.day().min(last)
            }
        },
    }
}

/// Compute the due date of a generated instance.
///
/// Returns `None` when the template has no due date to propagate. Otherwise
/// the instance is due on the processing date at the reference's time-of-day,
/// uniformly for all frequencies: the firing decision already guarantees the
/// processing date matches the rule's cadence.
pub fn compute_due_date(
    rule: &Recurrence,
    reference_due_date: Option<&DateTime<Utc>>,
    processing_date: NaiveDate,
) -> Option<DueDateOutcome> {
    let reference = reference_due_date?;
    let due = processing_date.and_time(reference.time()).and_utc();
    match clamp_reason(rule, reference, processing_date) {
        Some(reason) => Some(DueDateOutcome::Fallback { due, reason }),
        None => Some(DueDateOutcome::Computed(due)),
    }
}

/// Explain a firing that only happened because the target day was clamped to
/// the end of a shorter month.
fn clamp_reason(
    rule: &Recurrence,
    reference: &DateTime<Utc>,
    processing_date: NaiveDate,
) -> Option<String> {
    let target = match rule {
        Recurrence::Monthly { day_of_month } => day_of_month.unwrap_or_else(|| reference.day()),
        Recurrence::Yearly => reference.day(),
        _ => return None,
    };
    let last = days_in_month(processing_date.year(), processing_date.month());
    if target > last {
        Some(format!(
            "target day {} clamped to {} for {}",
            target,
            last,
            processing_date.format("%Y-%m")
        ))
    } else {
        None
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn daily_without_reference_fires_every_run() {
        let rule = Recurrence::Daily { interval: 3 };
        assert!(should_fire(&rule, None, date(2024, 1, 1)));
        assert!(should_fire(&rule, None, date(2024, 1, 2)));
    }

    #[test]
    fn daily_interval_three_fires_on_multiples() {
        let rule = Recurrence::Daily { interval: 3 };
        let reference = datetime(2024, 1, 1, 9, 0);

        for (day, expected) in [(1, true), (2, false), (3, false), (4, true), (5, false), (7, true)]
        {
            assert_eq!(
                should_fire(&rule, Some(&reference), date(2024, 1, day)),
                expected,
                "2024-01-{:02}",
                day
            );
        }
    }

    #[test]
    fn daily_ignores_time_of_day_in_interval_test() {
        let rule = Recurrence::Daily { interval: 2 };
        // Reference late in the day; the whole-day difference still counts.
        let reference = datetime(2024, 1, 1, 23, 59);
        assert!(should_fire(&rule, Some(&reference), date(2024, 1, 3)));
        assert!(!should_fire(&rule, Some(&reference), date(2024, 1, 4)));
    }

    #[test]
    fn weekly_explicit_days() {
        let rule = Recurrence::Weekly {
            days_of_week: Some(vec![chrono::Weekday::Mon, chrono::Weekday::Wed]),
        };
        assert!(should_fire(&rule, None, date(2024, 1, 8))); // Monday
        assert!(!should_fire(&rule, None, date(2024, 1, 9))); // Tuesday
        assert!(should_fire(&rule, None, date(2024, 1, 10))); // Wednesday
    }

    #[test]
    fn weekly_falls_back_to_reference_weekday() {
        let rule = Recurrence::Weekly { days_of_week: None };
        let reference = datetime(2024, 1, 5, 10, 0); // Friday
        assert!(should_fire(&rule, Some(&reference), date(2024, 1, 12))); // Friday
        assert!(!should_fire(&rule, Some(&reference), date(2024, 1, 13))); // Saturday
    }

    #[test]
    fn weekly_without_days_or_reference_never_fires() {
        let rule = Recurrence::Weekly { days_of_week: None };
        assert!(!should_fire(&rule, None, date(2024, 1, 8)));
    }

    #[test]
    fn monthly_explicit_day() {
        let rule = Recurrence::Monthly { day_of_month: Some(15) };
        assert!(should_fire(&rule, None, date(2024, 3, 15)));
        assert!(!should_fire(&rule, None, date(2024, 3, 14)));
        assert!(!should_fire(&rule, None, date(2024, 3, 16)));
    }

    #[test]
    fn monthly_falls_back_to_reference_day() {
        let rule = Recurrence::Monthly { day_of_month: None };
        let reference = datetime(2024, 1, 20, 9, 0);
        assert!(should_fire(&rule, Some(&reference), date(2024, 2, 20)));
        assert!(!should_fire(&rule, Some(&reference), date(2024, 2, 19)));
    }

    #[test]
    fn monthly_without_day_or_reference_never_fires() {
        let rule = Recurrence::Monthly { day_of_month: None };
        assert!(!should_fire(&rule, None, date(2024, 2, 20)));
    }

    #[test]
    fn monthly_day_31_clamps_to_short_month_end() {
        let rule = Recurrence::Monthly { day_of_month: Some(31) };
        assert!(should_fire(&rule, None, date(2024, 4, 30))); // April has 30 days
        assert!(!should_fire(&rule, None, date(2024, 4, 29)));
        assert!(should_fire(&rule, None, date(2024, 1, 31)));
        assert!(!should_fire(&rule, None, date(2024, 1, 30)));
    }

    #[test]
    fn monthly_day_30_clamps_in_february() {
        let rule = Recurrence::Monthly { day_of_month: Some(30) };
        assert!(should_fire(&rule, None, date(2024, 2, 29))); // leap year
        assert!(should_fire(&rule, None, date(2023, 2, 28)));
        assert!(!should_fire(&rule, None, date(2023, 2, 27)));
    }

    #[test]
    fn yearly_matches_month_and_day() {
        let rule = Recurrence::Yearly;
        let reference = datetime(2024, 6, 15, 8, 0);
        assert!(should_fire(&rule, Some(&reference), date(2025, 6, 15)));
        assert!(!should_fire(&rule, Some(&reference), date(2025, 6, 14)));
        assert!(!should_fire(&rule, Some(&reference), date(2025, 7, 15)));
    }

    #[test]
    fn yearly_without_reference_never_fires() {
        assert!(!should_fire(&Recurrence::Yearly, None, date(2025, 6, 15)));
    }

    #[test]
    fn yearly_feb_29_anchor_clamps_in_non_leap_years() {
        let rule = Recurrence::Yearly;
        let reference = datetime(2024, 2, 29, 8, 0);
        assert!(should_fire(&rule, Some(&reference), date(2025, 2, 28)));
        assert!(!should_fire(&rule, Some(&reference), date(2025, 2, 27)));
        // Leap years still fire on the 29th, not the 28th.
        assert!(should_fire(&rule, Some(&reference), date(2028, 2, 29)));
        assert!(!should_fire(&rule, Some(&reference), date(2028, 2, 28)));
    }

    #[test]
    fn due_date_preserves_time_of_day_for_all_frequencies() {
        let reference = datetime(2024, 1, 1, 14, 30);
        let processing = date(2024, 2, 5);
        let expected = datetime(2024, 2, 5, 14, 30);

        for rule in [
            Recurrence::Daily { interval: 1 },
            Recurrence::Weekly { days_of_week: None },
            Recurrence::Monthly { day_of_month: Some(5) },
            Recurrence::Yearly,
        ] {
            let outcome = compute_due_date(&rule, Some(&reference), processing).unwrap();
            assert_eq!(outcome.due(), expected, "{}", rule.frequency_name());
        }
    }

    #[test]
    fn due_date_absent_without_reference() {
        let rule = Recurrence::Daily { interval: 1 };
        assert!(compute_due_date(&rule, None, date(2024, 2, 5)).is_none());
    }

    #[test]
    fn clamped_firing_reports_fallback() {
        let rule = Recurrence::Monthly { day_of_month: Some(31) };
        let reference = datetime(2024, 1, 31, 9, 0);
        let outcome = compute_due_date(&rule, Some(&reference), date(2024, 4, 30)).unwrap();
        match outcome {
            DueDateOutcome::Fallback { due, reason } => {
                assert_eq!(due, datetime(2024, 4, 30, 9, 0));
                assert!(reason.contains("clamped"));
            }
            DueDateOutcome::Computed(_) => panic!("expected fallback for clamped firing"),
        }
    }

    #[test]
    fn unclamped_firing_is_computed() {
        let rule = Recurrence::Monthly { day_of_month: Some(31) };
        let reference = datetime(2024, 1, 31, 9, 0);
        let outcome = compute_due_date(&rule, Some(&reference), date(2024, 1, 31)).unwrap();
        assert!(matches!(outcome, DueDateOutcome::Computed(_)));
    }

    #[test]
    fn days_in_month_handles_year_rollover() {
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
    }
}
