use crate::dates::DateKey;
use crate::habits::{Habit, HabitStore};
use crate::journal::Journal;
use crate::milestone::{next_milestone, progress_percent};
use crate::models::{DailyPoint, HabitStats, Overview, StatsResponse, WeeklyPoint};
use crate::schedule::is_due_on;
use chrono::Datelike;

const WEEK_COUNT: i64 = 8;
const RATE_WINDOW_DAYS: i64 = 30;

pub fn build_stats_at(today: DateKey, store: &HabitStore, journal: &Journal) -> StatsResponse {
    let active: Vec<&Habit> = store.active_habits().collect();

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today.add_days(-offset);
        let (completed, due) = day_totals(store, &active, date);
        last_7_days.push(DailyPoint {
            date,
            completed,
            due,
        });
    }

    let current_week_start = week_start(today);
    let mut weekly_totals = Vec::with_capacity(WEEK_COUNT as usize);
    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start.add_days(-7 * offset);
        let end = start.add_days(6);
        let completed = store
            .ledger()
            .iter()
            .filter(|record| record.completed && record.date >= start && record.date <= end)
            .count();

        let days_counted = if today < start {
            0
        } else if today > end {
            7
        } else {
            (today.date() - start.date()).num_days() as u8 + 1
        };

        weekly_totals.push(WeeklyPoint {
            week: week_label(start),
            start_date: start,
            end_date: end,
            completed: count_u32(completed),
            days_counted,
        });
    }

    let habits: Vec<HabitStats> = store
        .habits()
        .iter()
        .map(|habit| habit_stats(store, habit, today))
        .collect();

    let longest = store
        .streaks()
        .filter(|streak| streak.longest_streak > 0)
        .max_by_key(|streak| streak.longest_streak);

    let overview = Overview {
        total_habits: active.len(),
        completion_rate: window_rate(store, &active, today),
        longest_streak: longest.map_or(0, |streak| streak.longest_streak),
        longest_streak_habit: longest
            .and_then(|streak| store.habit(&streak.habit_id))
            .map(|habit| habit.name.clone()),
        best_current_streak: active
            .iter()
            .filter_map(|habit| store.streak(&habit.id))
            .map(|streak| streak.current_streak)
            .max()
            .unwrap_or(0),
        total_completions: store
            .streaks()
            .fold(0u32, |sum, streak| sum.saturating_add(streak.total_completions)),
        journal_entries: journal.len(),
        average_mood: journal.average_mood(),
    };

    StatsResponse {
        overview,
        last_7_days,
        weekly_totals,
        habits,
    }
}

/// Completed and due counts across `habits` on one day. Only habits that
/// existed and were due that day count.
fn day_totals(store: &HabitStore, habits: &[&Habit], date: DateKey) -> (u32, u32) {
    habits
        .iter()
        .filter(|habit| habit.created_on() <= date && is_due_on(habit, date))
        .fold((0, 0), |(completed, due), habit| {
            let done = store
                .check_in_on(&habit.id, date)
                .is_some_and(|record| record.completed);
            (completed + u32::from(done), due + 1)
        })
}

/// Percentage of due slots completed over the last 30 days, 0..=100.
fn window_rate(store: &HabitStore, habits: &[&Habit], today: DateKey) -> f64 {
    let (completed, due) = (0..RATE_WINDOW_DAYS)
        .map(|offset| day_totals(store, habits, today.add_days(-offset)))
        .fold((0u32, 0u32), |(c, d), (day_c, day_d)| (c + day_c, d + day_d));
    percentage(completed, due)
}

fn habit_stats(store: &HabitStore, habit: &Habit, today: DateKey) -> HabitStats {
    let streak = store.streak(&habit.id);
    let current = streak.map_or(0, |streak| streak.current_streak);
    HabitStats {
        habit_id: habit.id.clone(),
        name: habit.name.clone(),
        category: habit.category,
        frequency: habit.frequency,
        current_streak: current,
        longest_streak: streak.map_or(0, |streak| streak.longest_streak),
        total_completions: streak.map_or(0, |streak| streak.total_completions),
        completion_rate: window_rate(store, &[habit], today),
        next_milestone: next_milestone(current),
        milestone_progress: progress_percent(current),
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).round()
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn week_start(date: DateKey) -> DateKey {
    date.add_days(-i64::from(date.date().weekday().num_days_from_monday()))
}

fn week_label(date: DateKey) -> String {
    let iso = date.date().iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
