use crate::dates::DateKey;
use crate::habits::HabitStore;
use crate::schedule::is_due_on;
use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Streak,
    Consistency,
    Variety,
    Milestone,
    Special,
}

/// What an achievement's requirement is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    LongestStreak,
    TotalCompletions,
    TotalHabits,
    PerfectWeek,
    EarlyBird,
    NightOwl,
}

#[derive(Debug, Clone, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    pub icon: &'static str,
    pub color: &'static str,
    pub requirement: u32,
    #[serde(skip)]
    measure: Measure,
}

const fn entry(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: AchievementCategory,
    icon: &'static str,
    color: &'static str,
    requirement: u32,
    measure: Measure,
) -> Achievement {
    Achievement {
        id,
        name,
        description,
        category,
        icon,
        color,
        requirement,
        measure,
    }
}

use AchievementCategory as C;

pub static ACHIEVEMENTS: [Achievement; 17] = [
    entry(
        "streak-3",
        "Getting Started",
        "Complete a 3-day streak",
        C::Streak,
        "Flame",
        "#F59E0B",
        3,
        Measure::LongestStreak,
    ),
    entry(
        "streak-7",
        "Week Warrior",
        "Complete a 7-day streak",
        C::Streak,
        "Flame",
        "#F97316",
        7,
        Measure::LongestStreak,
    ),
    entry(
        "streak-14",
        "Fortnight Fighter",
        "Complete a 14-day streak",
        C::Streak,
        "Flame",
        "#EF4444",
        14,
        Measure::LongestStreak,
    ),
    entry(
        "streak-30",
        "Monthly Master",
        "Complete a 30-day streak",
        C::Streak,
        "Flame",
        "#DC2626",
        30,
        Measure::LongestStreak,
    ),
    entry(
        "streak-100",
        "Century Club",
        "Complete a 100-day streak",
        C::Streak,
        "Crown",
        "#8B5CF6",
        100,
        Measure::LongestStreak,
    ),
    entry(
        "streak-365",
        "Year of Dedication",
        "Complete a 365-day streak",
        C::Streak,
        "Trophy",
        "#F59E0B",
        365,
        Measure::LongestStreak,
    ),
    entry(
        "completions-10",
        "First Steps",
        "Complete 10 total check-ins",
        C::Milestone,
        "Star",
        "#06B6D4",
        10,
        Measure::TotalCompletions,
    ),
    entry(
        "completions-50",
        "Building Momentum",
        "Complete 50 total check-ins",
        C::Milestone,
        "Star",
        "#3B82F6",
        50,
        Measure::TotalCompletions,
    ),
    entry(
        "completions-100",
        "Century Mark",
        "Complete 100 total check-ins",
        C::Milestone,
        "Award",
        "#8B5CF6",
        100,
        Measure::TotalCompletions,
    ),
    entry(
        "completions-500",
        "Habit Hero",
        "Complete 500 total check-ins",
        C::Milestone,
        "Medal",
        "#EC4899",
        500,
        Measure::TotalCompletions,
    ),
    entry(
        "completions-1000",
        "Legendary",
        "Complete 1000 total check-ins",
        C::Milestone,
        "Trophy",
        "#F59E0B",
        1000,
        Measure::TotalCompletions,
    ),
    entry(
        "habits-3",
        "Diversifying",
        "Create 3 different habits",
        C::Variety,
        "Layers",
        "#10B981",
        3,
        Measure::TotalHabits,
    ),
    entry(
        "habits-5",
        "Well Rounded",
        "Create 5 different habits",
        C::Variety,
        "Layers",
        "#14B8A6",
        5,
        Measure::TotalHabits,
    ),
    entry(
        "habits-10",
        "Life Optimizer",
        "Create 10 different habits",
        C::Variety,
        "Sparkles",
        "#6366F1",
        10,
        Measure::TotalHabits,
    ),
    entry(
        "perfect-week",
        "Perfect Week",
        "Complete all habits for 7 days straight",
        C::Special,
        "Zap",
        "#F59E0B",
        1,
        Measure::PerfectWeek,
    ),
    entry(
        "early-bird",
        "Early Bird",
        "Complete a habit before 6 AM",
        C::Special,
        "Sun",
        "#F97316",
        1,
        Measure::EarlyBird,
    ),
    entry(
        "night-owl",
        "Night Owl",
        "Complete a habit after 10 PM",
        C::Special,
        "Moon",
        "#6366F1",
        1,
        Measure::NightOwl,
    ),
];

pub fn achievement_by_id(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|achievement| achievement.id == id)
}

pub fn achievements_in(
    category: AchievementCategory,
) -> impl Iterator<Item = &'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(move |achievement| achievement.category == category)
}

/// Aggregate figures the unlock rules compare against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStats {
    pub longest_streak: u32,
    pub total_completions: u32,
    pub total_habits: u32,
    pub completed_before_6am: bool,
    pub completed_after_10pm: bool,
    pub perfect_week: bool,
}

impl AchievementStats {
    pub fn collect(store: &HabitStore, today: DateKey) -> Self {
        Self::collect_in(store, today, &Local)
    }

    /// Time-of-day checks use the hour of each toggle in `tz`.
    pub fn collect_in<Tz: TimeZone>(store: &HabitStore, today: DateKey, tz: &Tz) -> Self {
        let local_hour = |instant: &DateTime<Utc>| instant.with_timezone(tz).hour();
        let completed: Vec<_> = store
            .ledger()
            .iter()
            .filter(|record| record.completed)
            .collect();

        Self {
            longest_streak: store
                .streaks()
                .map(|streak| streak.longest_streak)
                .max()
                .unwrap_or(0),
            total_completions: store
                .streaks()
                .fold(0u32, |sum, streak| sum.saturating_add(streak.total_completions)),
            total_habits: u32::try_from(store.habits().len()).unwrap_or(u32::MAX),
            completed_before_6am: completed
                .iter()
                .any(|record| local_hour(&record.timestamp) < 6),
            completed_after_10pm: completed
                .iter()
                .any(|record| local_hour(&record.timestamp) >= 22),
            perfect_week: has_perfect_week(store, today),
        }
    }

    fn satisfies(&self, achievement: &Achievement) -> bool {
        match achievement.measure {
            Measure::LongestStreak => self.longest_streak >= achievement.requirement,
            Measure::TotalCompletions => self.total_completions >= achievement.requirement,
            Measure::TotalHabits => self.total_habits >= achievement.requirement,
            Measure::PerfectWeek => self.perfect_week,
            Measure::EarlyBird => self.completed_before_6am,
            Measure::NightOwl => self.completed_after_10pm,
        }
    }
}

/// Every active habit due on each of the seven days ending `today` was
/// completed, and each of those days had something due.
fn has_perfect_week(store: &HabitStore, today: DateKey) -> bool {
    let active: Vec<_> = store.active_habits().collect();
    if active.is_empty() {
        return false;
    }

    (0..7).all(|offset| {
        let date = today.add_days(-offset);
        let mut due = active
            .iter()
            .filter(|habit| habit.created_on() <= date && is_due_on(habit, date))
            .peekable();
        due.peek().is_some()
            && due.all(|habit| {
                store
                    .check_in_on(&habit.id, date)
                    .is_some_and(|record| record.completed)
            })
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    pub achievement_id: String,
    pub current_progress: u32,
    pub is_unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Unlocked achievements, persisted in their own namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementBook {
    #[serde(default)]
    unlocked_achievements: Vec<AchievementProgress>,
}

impl AchievementBook {
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked_achievements
            .iter()
            .any(|progress| progress.achievement_id == id && progress.is_unlocked)
    }

    pub fn progress(&self, id: &str) -> Option<&AchievementProgress> {
        self.unlocked_achievements
            .iter()
            .find(|progress| progress.achievement_id == id)
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked_achievements
            .iter()
            .filter(|progress| progress.is_unlocked)
            .count()
    }

    pub fn total_count(&self) -> usize {
        ACHIEVEMENTS.len()
    }

    /// Unlock one achievement. Returns it when this call unlocked it.
    pub fn unlock(&mut self, id: &str, now: DateTime<Utc>) -> Option<&'static Achievement> {
        if self.is_unlocked(id) {
            return None;
        }
        let achievement = achievement_by_id(id)?;
        self.unlocked_achievements.push(AchievementProgress {
            achievement_id: id.to_string(),
            current_progress: achievement.requirement,
            is_unlocked: true,
            unlocked_at: Some(now),
        });
        info!(achievement = achievement.name, "achievement unlocked");
        Some(achievement)
    }

    /// Unlock everything `stats` now satisfies; returns the newly unlocked.
    pub fn check_and_unlock(
        &mut self,
        stats: &AchievementStats,
        now: DateTime<Utc>,
    ) -> Vec<&'static Achievement> {
        ACHIEVEMENTS
            .iter()
            .filter(|achievement| stats.satisfies(achievement))
            .filter_map(|achievement| self.unlock(achievement.id, now))
            .collect()
    }
}
