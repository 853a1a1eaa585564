use crate::dates::{days_between, DateKey};
use crate::ledger::CheckIn;
use serde::{Deserialize, Serialize};

/// Derived streak state for one habit. Always recomputable from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub habit_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_check_in_date: Option<DateKey>,
    pub total_completions: u32,
}

impl Streak {
    pub fn empty(habit_id: &str) -> Self {
        Self {
            habit_id: habit_id.to_string(),
            current_streak: 0,
            longest_streak: 0,
            last_check_in_date: None,
            total_completions: 0,
        }
    }
}

/// Reduce a habit's check-ins to its streak as of `today`.
///
/// Only completed records of `habit_id` dated on or after `not_before` count.
/// A streak stays current while the latest completion is today or yesterday.
pub fn calculate_streak<'a>(
    habit_id: &str,
    not_before: Option<DateKey>,
    check_ins: impl IntoIterator<Item = &'a CheckIn>,
    today: DateKey,
) -> Streak {
    let mut dates: Vec<DateKey> = check_ins
        .into_iter()
        .filter(|record| record.habit_id == habit_id && record.completed)
        .map(|record| record.date)
        .filter(|date| not_before.is_none_or(|start| *date >= start))
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let mut streak = Streak::empty(habit_id);
    let Some(&most_recent) = dates.first() else {
        return streak;
    };

    streak.last_check_in_date = Some(most_recent);
    streak.total_completions = u32::try_from(dates.len()).unwrap_or(u32::MAX);

    if days_between(most_recent, today) <= 1 {
        streak.current_streak = leading_run(&dates);
    }
    streak.longest_streak = longest_run(&dates).max(streak.current_streak);
    streak
}

/// Length of the consecutive run starting at the head of a descending list.
fn leading_run(dates: &[DateKey]) -> u32 {
    let consecutive = dates
        .windows(2)
        .take_while(|pair| days_between(pair[1], pair[0]) == 1)
        .count();
    u32::try_from(consecutive + 1).unwrap_or(u32::MAX)
}

fn longest_run(dates: &[DateKey]) -> u32 {
    if dates.is_empty() {
        return 0;
    }

    let mut longest = 1u32;
    let mut run = 1u32;
    for pair in dates.windows(2) {
        if days_between(pair[1], pair[0]) == 1 {
            run = run.saturating_add(1);
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(raw: &str) -> DateKey {
        raw.parse().unwrap()
    }

    fn completed(habit_id: &str, date: &str) -> CheckIn {
        CheckIn {
            id: format!("{habit_id}-{date}"),
            habit_id: habit_id.to_string(),
            date: day(date),
            completed: true,
            mood: None,
            note: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    fn streak_of(dates: &[&str], today: &str) -> Streak {
        let records: Vec<CheckIn> = dates.iter().map(|date| completed("h", date)).collect();
        calculate_streak("h", None, &records, day(today))
    }

    #[test]
    fn empty_ledger_is_all_zero() {
        let streak = streak_of(&[], "2024-01-03");
        assert_eq!(streak, Streak::empty("h"));
        assert_eq!(streak.last_check_in_date, None);
    }

    #[test]
    fn three_consecutive_days_ending_today() {
        let streak = streak_of(&["2024-01-01", "2024-01-02", "2024-01-03"], "2024-01-03");
        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
        assert_eq!(streak.total_completions, 3);
        assert_eq!(streak.last_check_in_date, Some(day("2024-01-03")));
    }

    #[test]
    fn two_day_gap_breaks_current_but_keeps_longest() {
        let streak = streak_of(&["2024-01-01", "2024-01-02", "2024-01-03"], "2024-01-05");
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn grace_window_keeps_yesterdays_run_alive() {
        let streak = streak_of(&["2024-01-01", "2024-01-02"], "2024-01-03");
        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.longest_streak, 2);
    }

    #[test]
    fn single_check_in() {
        assert_eq!(streak_of(&["2024-01-03"], "2024-01-03").current_streak, 1);
        assert_eq!(streak_of(&["2024-01-02"], "2024-01-03").current_streak, 1);

        let stale = streak_of(&["2024-01-01"], "2024-01-03");
        assert_eq!(stale.current_streak, 0);
        assert_eq!(stale.longest_streak, 1);
    }

    #[test]
    fn skipped_day_starts_new_run() {
        let streak = streak_of(
            &["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-05"],
            "2024-01-05",
        );
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn new_personal_best_is_reflected_in_longest() {
        let streak = streak_of(
            &[
                "2024-01-01", "2024-01-02", "2024-01-04", "2024-01-05", "2024-01-06",
            ],
            "2024-01-06",
        );
        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn unchecked_records_and_other_habits_are_ignored() {
        let mut records = vec![
            completed("h", "2024-01-02"),
            completed("h", "2024-01-03"),
            completed("other", "2024-01-01"),
        ];
        let mut retracted = completed("h", "2024-01-01");
        retracted.completed = false;
        records.push(retracted);

        let streak = calculate_streak("h", None, &records, day("2024-01-03"));
        assert_eq!(streak.total_completions, 2);
        assert_eq!(streak.current_streak, 2);
    }

    #[test]
    fn check_ins_before_creation_do_not_count() {
        let records: Vec<CheckIn> = ["2024-01-01", "2024-01-02", "2024-01-03"]
            .iter()
            .map(|date| completed("h", date))
            .collect();
        let streak = calculate_streak("h", Some(day("2024-01-02")), &records, day("2024-01-03"));
        assert_eq!(streak.total_completions, 2);
        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.longest_streak, 2);
    }

    #[test]
    fn recomputation_is_idempotent_and_longest_never_below_current() {
        let dates = [
            "2024-02-01", "2024-02-02", "2024-02-10", "2024-02-11", "2024-02-12", "2024-02-13",
        ];
        for today in ["2024-02-13", "2024-02-14", "2024-02-15", "2024-03-01"] {
            let first = streak_of(&dates, today);
            let second = streak_of(&dates, today);
            assert_eq!(first, second);
            assert!(first.longest_streak >= first.current_streak);
        }
        assert_eq!(streak_of(&dates, "2024-02-14").current_streak, 4);
        assert_eq!(streak_of(&dates, "2024-02-15").current_streak, 0);
    }

    #[test]
    fn input_order_does_not_matter() {
        let forward = streak_of(&["2024-01-01", "2024-01-02", "2024-01-03"], "2024-01-03");
        let shuffled = streak_of(&["2024-01-02", "2024-01-03", "2024-01-01"], "2024-01-03");
        assert_eq!(forward, shuffled);
    }
}
