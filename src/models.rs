use crate::achievements::{AchievementBook, AchievementCategory};
use crate::coaching::{CoachingLog, CoachingMessage};
use crate::dates::DateKey;
use crate::habits::{Category, Frequency, Habit, HabitStore, ToggleOutcome};
use crate::journal::{Journal, JournalEntry};
use crate::ledger::CheckIn;
use crate::streak::Streak;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the service holds in memory; each field but `notices` is its
/// own persisted namespace.
#[derive(Debug, Clone, Default)]
pub struct AppData {
    pub habits: HabitStore,
    pub journal: Journal,
    pub preferences: Preferences,
    pub achievements: AchievementBook,
    pub coaching: CoachingLog,
    pub notices: Vec<Notice>,
}

impl AppData {
    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>, now: DateTime<Utc>) {
        self.notices.push(Notice {
            kind,
            message: message.into(),
            created_at: now,
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Achievement,
    Milestone,
    Error,
}

/// Transient user-facing notification, drained by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitView {
    #[serde(flatten)]
    pub habit: Habit,
    pub streak: Streak,
    pub completed_today: bool,
    pub next_milestone: u32,
    pub milestone_progress: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayResponse {
    pub date: DateKey,
    pub habits: Vec<HabitView>,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct HabitListQuery {
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    #[serde(flatten)]
    pub outcome: ToggleOutcome,
    pub unlocked_achievements: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoodRequest {
    pub mood: u8,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckInQuery {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakResponse {
    #[serde(flatten)]
    pub streak: Streak,
    pub next_milestone: u32,
    pub milestone_progress: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHabitResponse {
    #[serde(flatten)]
    pub habit: Habit,
    pub unlocked_achievements: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct JournalRequest {
    #[serde(default)]
    pub date: Option<String>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct JournalUpdate {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JournalQuery {
    /// Exact day; takes precedence over `from`/`to`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct JournalListResponse {
    pub entries: Vec<JournalEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    pub icon: &'static str,
    pub color: &'static str,
    pub requirement: u32,
    pub unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AchievementQuery {
    #[serde(default)]
    pub category: Option<AchievementCategory>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsResponse {
    pub unlocked: usize,
    pub total: usize,
    pub achievements: Vec<AchievementView>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CoachingQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingResponse {
    pub messages: Vec<CoachingMessage>,
    pub unread: usize,
    pub can_generate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_generation_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub dark_mode: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: DateKey,
    pub completed: u32,
    pub due: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPoint {
    pub week: String,
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub completed: u32,
    pub days_counted: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub habit_id: String,
    pub name: String,
    pub category: Category,
    pub frequency: Frequency,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completions: u32,
    /// Completed share of due days in the last 30 days, 0..=100.
    pub completion_rate: f64,
    pub next_milestone: u32,
    pub milestone_progress: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_habits: usize,
    pub completion_rate: f64,
    pub longest_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_streak_habit: Option<String>,
    pub best_current_streak: u32,
    pub total_completions: u32,
    pub journal_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_mood: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub overview: Overview,
    pub last_7_days: Vec<DailyPoint>,
    pub weekly_totals: Vec<WeeklyPoint>,
    pub habits: Vec<HabitStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInListResponse {
    pub habit_id: String,
    pub check_ins: Vec<CheckIn>,
}
