//! Cron expressions behind a small trait

use crate::config::CronTimezone;
use crate::domain::{ExporterError, Result};
use chrono::{DateTime, Local, Utc};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Source of fire times for a scheduled job
pub trait Schedule: Send + Sync {
    /// First fire time strictly after `from`, if any
    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// Expression as configured
    fn expression(&self) -> &str;
}

/// Schedule parsed from a cron expression
///
/// Five-field expressions (`min hour dom month dow`) get a `0` seconds field
/// prepended; six- and seven-field expressions are used as is. Day-of-week
/// numbers follow the usual cron convention (`0` and `7` are Sunday, `1-5`
/// is Monday to Friday). Fire times are evaluated in the server's local
/// time unless the schedule is switched to UTC.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
    timezone: CronTimezone,
}

impl CronSchedule {
    /// # Errors
    ///
    /// [`ExporterError::Configuration`] for an expression the cron parser rejects.
    pub fn parse(expression: &str) -> Result<Self> {
        let normalized = normalize_expression(expression);
        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| {
            ExporterError::Configuration(format!("Invalid cron expression '{expression}': {e}"))
        })?;
        Ok(Self {
            expression: expression.trim().to_string(),
            schedule,
            timezone: CronTimezone::default(),
        })
    }

    pub fn in_timezone(mut self, timezone: CronTimezone) -> Self {
        self.timezone = timezone;
        self
    }
}

impl Schedule for CronSchedule {
    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.timezone {
            CronTimezone::Local => self
                .schedule
                .after(&from.with_timezone(&Local))
                .next()
                .map(|at| at.with_timezone(&Utc)),
            CronTimezone::Utc => self.schedule.after(&from).next(),
        }
    }

    fn expression(&self) -> &str {
        &self.expression
    }
}

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Six-field form with numeric weekdays spelled out
///
/// The cron crate counts weekdays from 1 = Sunday, so numbers are replaced
/// by names before parsing.
fn normalize_expression(expression: &str) -> String {
    let mut fields: Vec<String> = expression.split_whitespace().map(str::to_string).collect();
    if fields.len() == 5 {
        fields.insert(0, "0".to_string());
    }
    if let Some(dow) = fields.get_mut(5) {
        *dow = dow
            .split(',')
            .map(weekday_names)
            .collect::<Vec<_>>()
            .join(",");
    }
    fields.join(" ")
}

/// `1-5` → `MON,TUE,WED,THU,FRI`; anything not purely numeric is kept
fn weekday_names(item: &str) -> String {
    if !item.bytes().any(|b| b.is_ascii_digit()) {
        return item.to_string();
    }

    let (base, step) = match item.split_once('/') {
        Some((base, step)) => match step.parse::<u32>() {
            Ok(step) if step > 0 => (base, Some(step)),
            _ => return item.to_string(),
        },
        None => (item, None),
    };

    let number = |s: &str| s.parse::<u32>().ok().filter(|n| *n <= 7);
    let bounds = if base == "*" {
        Some((0, 6))
    } else if let Some((start, end)) = base.split_once('-') {
        number(start).zip(number(end))
    } else {
        number(base).map(|start| if step.is_some() { (start, 6) } else { (start, start) })
    };

    let Some((start, end)) = bounds.filter(|(start, end)| start <= end) else {
        return item.to_string();
    };

    let days: BTreeSet<usize> = (start..=end)
        .step_by(step.unwrap_or(1) as usize)
        .map(|day| (day % 7) as usize)
        .collect();
    days.into_iter()
        .map(|day| WEEKDAYS[day])
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};
    use test_case::test_case;

    #[test_case("0 6 * * *", "0 0 6 * * *" ; "five fields get seconds")]
    #[test_case("0 0 6 * * *", "0 0 6 * * *" ; "six fields unchanged")]
    #[test_case("  */5 * * * * *  ", "*/5 * * * * *" ; "trimmed")]
    #[test_case("0 6 * * 1-5", "0 0 6 * * MON,TUE,WED,THU,FRI" ; "weekday range")]
    #[test_case("0 6 * * 0", "0 0 6 * * SUN" ; "zero is sunday")]
    #[test_case("0 6 * * 7", "0 0 6 * * SUN" ; "seven is sunday")]
    #[test_case("0 6 * * 5-7", "0 0 6 * * SUN,FRI,SAT" ; "range through seven")]
    #[test_case("0 0 6 * * 1,3", "0 0 6 * * MON,WED" ; "six field list")]
    #[test_case("0 6 * * */2", "0 0 6 * * SUN,TUE,THU,SAT" ; "stepped wildcard")]
    #[test_case("0 6 * * MON-FRI", "0 0 6 * * MON-FRI" ; "names unchanged")]
    fn test_normalize_expression(input: &str, expected: &str) {
        assert_eq!(normalize_expression(input), expected);
    }

    fn utc(expression: &str) -> CronSchedule {
        CronSchedule::parse(expression)
            .unwrap()
            .in_timezone(CronTimezone::Utc)
    }

    #[test]
    fn test_next_after_daily() {
        let schedule = utc("0 6 * * *");
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 6, 0, 0).unwrap())
        );
        assert_eq!(schedule.expression(), "0 6 * * *");
    }

    #[test]
    fn test_named_weekdays() {
        let schedule = utc("0 30 8 * * MON-FRI");
        // 2024-03-02 is a Saturday
        let from = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_numeric_weekdays_are_monday_to_friday() {
        let schedule = utc("0 6 * * 1-5");
        // 2024-03-03 is a Sunday
        let mut at = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap();
        let mut days = Vec::new();
        for _ in 0..5 {
            at = schedule.next_after(at).unwrap();
            days.push(at.weekday());
        }
        assert_eq!(
            days,
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
        );
    }

    #[test]
    fn test_sunday_as_zero() {
        let schedule = utc("0 6 * * 0");
        let from = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_local_time_by_default() {
        let schedule = CronSchedule::parse("0 6 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let next = schedule.next_after(from).unwrap().with_timezone(&Local);
        assert_eq!((next.hour(), next.minute()), (6, 0));
        assert!(next.with_timezone(&Utc) > from);
    }

    #[test]
    fn test_invalid_expression() {
        let err = CronSchedule::parse("every morning").unwrap_err();
        assert!(matches!(err, ExporterError::Configuration(_)));
        assert!(err.to_string().contains("every morning"));
    }
}
