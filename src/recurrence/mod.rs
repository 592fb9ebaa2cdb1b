//! Recurrence rules
//!
//! A recurrence rule is stored on a task as an opaque JSON payload and parsed
//! exactly once, when a record is viewed as a template. Evaluation works only
//! on the typed rule, so the firing logic never handles parse failures.

pub mod evaluator;

pub use evaluator::{compute_due_date, should_fire, DueDateOutcome};

use chrono::Weekday;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced when parsing a stored recurrence payload
#[derive(Debug, Error)]
pub enum RecurrenceParseError {
    #[error("invalid recurrence JSON: {0}")]
    Json(String),

    #[error("unknown recurrence frequency: {0}")]
    UnknownFrequency(String),

    #[error("day of week out of range (expected 0-6, Sunday-based): {0}")]
    InvalidDayOfWeek(u8),

    #[error("day of month out of range (expected 1-31): {0}")]
    InvalidDayOfMonth(u32),
}

/// Wire shape of a stored rule. `month_of_year` is accepted for compatibility
/// with authored payloads but has no effect on evaluation; yearly rules anchor
/// on the template's due date.
#[derive(Debug, Deserialize)]
struct RawRule {
    frequency: String,
    interval: Option<u32>,
    days_of_week: Option<Vec<u8>>,
    day_of_month: Option<u32>,
    #[allow(dead_code)]
    month_of_year: Option<u32>,
}

/// A validated recurrence rule.
///
/// `interval` only affects daily rules; weekly, monthly and yearly rules fire
/// on every matching date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily { interval: u32 },
    Weekly { days_of_week: Option<Vec<Weekday>> },
    Monthly { day_of_month: Option<u32> },
    Yearly,
}

impl Recurrence {
    /// Parse a stored JSON payload into a validated rule.
    pub fn parse(raw: &str) -> Result<Self, RecurrenceParseError> {
        let rule: RawRule =
            serde_json::from_str(raw).map_err(|e| RecurrenceParseError::Json(e.to_string()))?;

        match rule.frequency.as_str() {
            "daily" => Ok(Recurrence::Daily {
                // An authored interval of 0 means "every run"; normalize so
                // the modulus test is total.
                interval: rule.interval.unwrap_or(1).max(1),
            }),
            "weekly" => {
                let days_of_week = rule
                    .days_of_week
                    .map(|days| {
                        days.into_iter()
                            .map(weekday_from_sunday_index)
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .transpose()?;
                Ok(Recurrence::Weekly { days_of_week })
            }
            "monthly" => {
                if let Some(day) = rule.day_of_month {
                    if day == 0 || day > 31 {
                        return Err(RecurrenceParseError::InvalidDayOfMonth(day));
                    }
                }
                Ok(Recurrence::Monthly {
                    day_of_month: rule.day_of_month,
                })
            }
            "yearly" => Ok(Recurrence::Yearly),
            other => Err(RecurrenceParseError::UnknownFrequency(other.to_string())),
        }
    }

    pub fn frequency_name(&self) -> &'static str {
        match self {
            Recurrence::Daily { .. } => "daily",
            Recurrence::Weekly { .. } => "weekly",
            Recurrence::Monthly { .. } => "monthly",
            Recurrence::Yearly => "yearly",
        }
    }
}

/// Map a 0=Sunday .. 6=Saturday wire index onto a weekday.
fn weekday_from_sunday_index(index: u8) -> Result<Weekday, RecurrenceParseError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        other => Err(RecurrenceParseError::InvalidDayOfWeek(other)),
    }
}
