// Trigger schedule parsing and next-fire calculation
//
// Wraps a cron expression (with seconds field) evaluated in a configured
// timezone. Syntactically invalid expressions are configuration errors;
// schedules that are merely suspiciously hot produce a sanity warning that
// is surfaced, not raised.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;

use crate::errors::ScheduleError;

/// Parse and validate a cron expression
pub fn parse_cron_expression(expression: &str) -> Result<CronSchedule, ScheduleError> {
    CronSchedule::from_str(expression).map_err(|e| ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a timezone name
pub fn parse_timezone(name: &str) -> Result<Tz, ScheduleError> {
    Tz::from_str(name).map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}

pub fn default_timezone() -> Tz {
    chrono_tz::UTC
}

/// A validated trigger schedule
#[derive(Debug, Clone)]
pub struct TriggerSchedule {
    expression: String,
    schedule: CronSchedule,
    timezone: Tz,
}

impl TriggerSchedule {
    pub fn parse(expression: &str, timezone: Tz) -> Result<Self, ScheduleError> {
        let schedule = parse_cron_expression(expression)?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
            timezone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire instant strictly after the given time
    pub fn next_fire(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        let after_in_tz = after.with_timezone(&self.timezone);
        let next = self
            .schedule
            .after(&after_in_tz)
            .next()
            .ok_or_else(|| ScheduleError::NoNextFire(self.expression.clone()))?;
        Ok(next.with_timezone(&Utc))
    }

    /// Sanity check: a dependency check hits the artifact repository and the
    /// target node's filesystem, so firing more than once a minute is almost
    /// always a configuration mistake. Returns a warning message, never an
    /// error.
    pub fn check_sanity(&self) -> Option<String> {
        let mut upcoming = self.schedule.upcoming(self.timezone).take(4);
        let mut previous = upcoming.next()?;
        for next in upcoming {
            let gap = next - previous;
            if gap.num_seconds() < 60 {
                return Some(format!(
                    "schedule '{}' fires every {} seconds; dependency checks this frequent \
                     will hammer the artifact repository",
                    self.expression,
                    gap.num_seconds()
                ));
            }
            previous = next;
        }
        None
    }
}
