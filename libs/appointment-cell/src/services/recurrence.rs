// libs/appointment-cell/src/services/recurrence.rs
//
// Pure expansion of a recurrence rule into concrete occurrence start times.
// Booking each occurrence (conflict and capacity checks) happens in the
// booking service; expansion itself never touches the store.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::models::{RecurrenceFrequency, RecurrenceRule, ScheduleError};

pub const MAX_OCCURRENCES: u32 = 52;
pub const MAX_UNTIL_DAYS: i64 = 180;

pub fn expand_rule(
    base_start: DateTime<Utc>,
    rule: &RecurrenceRule,
) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
    validate_rule(base_start, rule)?;

    let step = match rule.frequency {
        RecurrenceFrequency::Daily => Duration::days(1),
        RecurrenceFrequency::Weekly => Duration::weeks(1),
        RecurrenceFrequency::Biweekly => Duration::weeks(2),
    };

    let until = rule
        .until
        .map(|date| date.and_hms_opt(23, 59, 59).unwrap().and_utc());

    let mut occurrences = Vec::new();
    let mut candidate = base_start;
    let mut steps: u32 = 0;

    loop {
        if let Some(count) = rule.count {
            if occurrences.len() as u32 >= count {
                break;
            }
        }
        if let Some(limit) = until {
            if candidate > limit {
                break;
            }
        }
        // Hard stop so a rule whose weekday filter never matches the
        // cadence cannot run away
        if occurrences.len() as u32 >= MAX_OCCURRENCES || steps >= MAX_OCCURRENCES * 7 {
            break;
        }
        steps += 1;

        let allowed = match &rule.weekdays {
            Some(days) => days.contains(&candidate.weekday()),
            None => true,
        };
        if allowed {
            occurrences.push(candidate);
        }

        candidate += step;
    }

    Ok(occurrences)
}

fn validate_rule(base_start: DateTime<Utc>, rule: &RecurrenceRule) -> Result<(), ScheduleError> {
    match (rule.count, rule.until) {
        (None, None) => {
            return Err(ScheduleError::ValidationError(
                "Recurrence rule needs either count or until".to_string(),
            ));
        }
        (Some(_), Some(_)) => {
            return Err(ScheduleError::ValidationError(
                "Recurrence rule takes count or until, not both".to_string(),
            ));
        }
        (Some(count), None) => {
            if count == 0 || count > MAX_OCCURRENCES {
                return Err(ScheduleError::ValidationError(format!(
                    "Occurrence count must be between 1 and {}",
                    MAX_OCCURRENCES
                )));
            }
        }
        (None, Some(until)) => {
            let limit = until.and_hms_opt(23, 59, 59).unwrap().and_utc();
            if limit < base_start {
                return Err(ScheduleError::ValidationError(
                    "Recurrence end date is before the first occurrence".to_string(),
                ));
            }
            if limit - base_start > Duration::days(MAX_UNTIL_DAYS) {
                return Err(ScheduleError::ValidationError(format!(
                    "Recurrence may span at most {} days",
                    MAX_UNTIL_DAYS
                )));
            }
        }
    }

    if let Some(days) = &rule.weekdays {
        if days.is_empty() {
            return Err(ScheduleError::ValidationError(
                "Weekday filter must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Weekday};

    fn base() -> DateTime<Utc> {
        // 2026-09-07 10:00 UTC, a Monday
        Utc.with_ymd_and_hms(2026, 9, 7, 10, 0, 0).unwrap()
    }

    fn rule(frequency: RecurrenceFrequency, count: u32) -> RecurrenceRule {
        RecurrenceRule {
            frequency,
            count: Some(count),
            until: None,
            weekdays: None,
        }
    }

    #[test]
    fn weekly_count_produces_exact_cadence() {
        let occurrences = expand_rule(base(), &rule(RecurrenceFrequency::Weekly, 4)).unwrap();
        assert_eq!(occurrences.len(), 4);
        for (i, occurrence) in occurrences.iter().enumerate() {
            assert_eq!(*occurrence, base() + Duration::weeks(i as i64));
            assert_eq!(occurrence.weekday(), Weekday::Mon);
        }
    }

    #[test]
    fn biweekly_doubles_the_gap() {
        let occurrences = expand_rule(base(), &rule(RecurrenceFrequency::Biweekly, 3)).unwrap();
        assert_eq!(
            occurrences,
            vec![base(), base() + Duration::weeks(2), base() + Duration::weeks(4)]
        );
    }

    #[test]
    fn daily_with_weekday_filter_skips_the_weekend() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Daily,
            count: None,
            until: Some(NaiveDate::from_ymd_opt(2026, 9, 13).unwrap()),
            weekdays: Some(vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]),
        };

        let occurrences = expand_rule(base(), &rule).unwrap();
        // Mon 7th through Sun 13th minus the weekend
        assert_eq!(occurrences.len(), 5);
        assert!(occurrences.iter().all(|o| o.weekday() != Weekday::Sat));
        assert!(occurrences.iter().all(|o| o.weekday() != Weekday::Sun));
    }

    #[test]
    fn until_bound_is_inclusive_of_the_last_day() {
        let rule = RecurrenceRule {
            frequency: RecurrenceFrequency::Weekly,
            count: None,
            until: Some(NaiveDate::from_ymd_opt(2026, 9, 21).unwrap()),
            weekdays: None,
        };

        let occurrences = expand_rule(base(), &rule).unwrap();
        assert_eq!(occurrences.len(), 3); // 7th, 14th, 21st
    }

    #[test]
    fn count_and_until_together_are_rejected() {
        let bad = RecurrenceRule {
            frequency: RecurrenceFrequency::Weekly,
            count: Some(4),
            until: Some(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()),
            weekdays: None,
        };
        assert!(expand_rule(base(), &bad).is_err());
    }

    #[test]
    fn neither_count_nor_until_is_rejected() {
        let bad = RecurrenceRule {
            frequency: RecurrenceFrequency::Weekly,
            count: None,
            until: None,
            weekdays: None,
        };
        assert!(expand_rule(base(), &bad).is_err());
    }

    #[test]
    fn runaway_bounds_are_rejected() {
        assert!(expand_rule(base(), &rule(RecurrenceFrequency::Weekly, 0)).is_err());
        assert!(expand_rule(base(), &rule(RecurrenceFrequency::Weekly, 53)).is_err());

        let too_far = RecurrenceRule {
            frequency: RecurrenceFrequency::Weekly,
            count: None,
            until: Some(NaiveDate::from_ymd_opt(2027, 9, 7).unwrap()),
            weekdays: None,
        };
        assert!(expand_rule(base(), &too_far).is_err());
    }
}
