//! GFS retention evaluator
//!
//! Partitions the backup dates of one database into retained and discarded
//! sets under daily/weekly/monthly quotas. Pure: no I/O and no clock access,
//! the caller supplies `today`.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::config::RetentionPolicy;

/// Result of a retention evaluation: two disjoint sets, newest first,
/// together covering exactly the input dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub retained: Vec<NaiveDate>,
    pub discarded: Vec<NaiveDate>,
}

impl RetentionPlan {
    pub fn is_noop(&self) -> bool {
        self.discarded.is_empty()
    }
}

/// Classify every backup date as retained or discarded.
///
/// Dates are walked newest to oldest and each one is claimed by the first
/// matching rule, in this order:
///
/// 1. weekly: the date is a Monday and the weekly quota has room;
/// 2. monthly: the date is the first of its month and the monthly quota
///    has room;
/// 3. daily: the date lies in the inclusive window
///    `[today - daily quota days, today]` and the daily quota has room;
/// 4. otherwise the date is discarded.
///
/// A date that is both a Monday and the first of the month counts against
/// the weekly quota only. When a category has more candidates than quota,
/// the newest ones win; older candidates of the same category fall through
/// to discard. This is a greedy single pass, not a global optimum per
/// category. A quota of zero disables its rule.
pub fn evaluate(dates: &[NaiveDate], policy: &RetentionPolicy, today: NaiveDate) -> RetentionPlan {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let window_start = today
        .checked_sub_days(Days::new(u64::from(policy.daily)))
        .unwrap_or(NaiveDate::MIN);

    let mut weekly_found: u32 = 0;
    let mut monthly_found: u32 = 0;
    let mut daily_found: u32 = 0;

    let mut plan = RetentionPlan::default();

    for date in sorted {
        if weekly_found < policy.weekly && date.weekday() == Weekday::Mon {
            weekly_found += 1;
            plan.retained.push(date);
        } else if monthly_found < policy.monthly && date.day() == 1 {
            monthly_found += 1;
            plan.retained.push(date);
        } else if daily_found < policy.daily && date >= window_start && date <= today {
            daily_found += 1;
            plan.retained.push(date);
        } else {
            plan.discarded.push(date);
        }
    }

    plan
}
