use crate::dates::DateKey;
use crate::ledger::{CheckIn, Ledger, Mood};
use crate::milestone::is_exact_milestone;
use crate::schedule::{is_due_on_with, CustomSchedule, EveryDay};
use crate::streak::{calculate_streak, Streak};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const NAME_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Health,
    Productivity,
    Learning,
    Mindfulness,
    Social,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    pub frequency: Frequency,
    /// Weekday indices (0 = Sunday) a weekly habit is due on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_days: Option<Vec<u8>>,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
}

impl Habit {
    /// First calendar day history may be recorded for.
    pub fn created_on(&self) -> DateKey {
        DateKey::of_instant(&self.created_at)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Category,
    pub frequency: Frequency,
    #[serde(default)]
    pub target_days: Option<Vec<u8>>,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub frequency: Option<Frequency>,
    pub target_days: Option<Vec<u8>>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HabitError {
    #[error("habit name must be between 1 and 50 characters")]
    InvalidName,
    #[error("description must be at most 200 characters")]
    DescriptionTooLong,
    #[error("target days must be weekday indices between 0 and 6")]
    InvalidTargetDays,
}

/// Result of a check-in toggle, after the streak has been recomputed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub check_in: CheckIn,
    pub streak: Streak,
    /// Set when this toggle completed the day and landed exactly on a milestone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u32>,
}

/// Habits, their check-in ledger and the derived streak cache.
///
/// Every mutation that can change a streak recomputes it before returning, so
/// no reader observes a stale value for the day it was computed on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStore {
    #[serde(default)]
    habits: Vec<Habit>,
    #[serde(default)]
    check_ins: Ledger,
    #[serde(default, with = "streak_pairs")]
    streaks: BTreeMap<String, Streak>,
    #[serde(skip)]
    computed_on: Option<DateKey>,
}

impl HabitStore {
    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn ledger(&self) -> &Ledger {
        &self.check_ins
    }

    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn active_habits(&self) -> impl Iterator<Item = &Habit> {
        self.habits.iter().filter(|habit| !habit.archived)
    }

    pub fn archived_habits(&self) -> impl Iterator<Item = &Habit> {
        self.habits.iter().filter(|habit| habit.archived)
    }

    pub fn due_on(&self, date: DateKey) -> Vec<&Habit> {
        self.due_on_with(date, &EveryDay)
    }

    pub fn due_on_with(&self, date: DateKey, custom: &dyn CustomSchedule) -> Vec<&Habit> {
        self.active_habits()
            .filter(|habit| is_due_on_with(habit, date, custom))
            .collect()
    }

    pub fn add_habit(&mut self, new: NewHabit, now: DateTime<Utc>) -> Result<Habit, HabitError> {
        let habit = Habit {
            id: Uuid::new_v4().to_string(),
            name: validate_name(&new.name)?,
            description: validate_description(new.description)?,
            category: new.category,
            frequency: new.frequency,
            target_days: validate_target_days(new.target_days)?,
            color: new.color,
            icon: new.icon,
            created_at: now,
            archived: false,
        };
        self.insert_habit(habit.clone());
        Ok(habit)
    }

    /// Insert a fully formed habit, replacing any habit with the same id.
    pub fn insert_habit(&mut self, habit: Habit) {
        self.streaks
            .insert(habit.id.clone(), Streak::empty(&habit.id));
        self.habits.retain(|existing| existing.id != habit.id);
        self.habits.push(habit);
    }

    /// Apply a partial edit. `Ok(None)` when the habit does not exist.
    pub fn update_habit(
        &mut self,
        id: &str,
        patch: HabitPatch,
        today: DateKey,
    ) -> Result<Option<Habit>, HabitError> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let description = validate_description(patch.description)?;
        let target_days = validate_target_days(patch.target_days)?;

        let Some(habit) = self.habits.iter_mut().find(|habit| habit.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            habit.name = name;
        }
        if description.is_some() {
            habit.description = description;
        }
        if let Some(category) = patch.category {
            habit.category = category;
        }
        if let Some(frequency) = patch.frequency {
            habit.frequency = frequency;
        }
        if target_days.is_some() {
            habit.target_days = target_days;
        }
        if let Some(color) = patch.color {
            habit.color = color;
        }
        if patch.icon.is_some() {
            habit.icon = patch.icon;
        }
        let updated = habit.clone();
        self.recompute_habit(id, today);
        Ok(Some(updated))
    }

    pub fn archive_habit(&mut self, id: &str) -> Option<&Habit> {
        self.set_archived(id, true)
    }

    pub fn restore_habit(&mut self, id: &str) -> Option<&Habit> {
        self.set_archived(id, false)
    }

    /// Hard delete, cascading to check-ins and the cached streak.
    pub fn delete_habit(&mut self, id: &str) -> bool {
        let before = self.habits.len();
        self.habits.retain(|habit| habit.id != id);
        if self.habits.len() == before {
            return false;
        }
        let removed = self.check_ins.cascade_delete_for_habit(id);
        self.streaks.remove(id);
        debug!(habit_id = id, removed, "deleted habit and its check-ins");
        true
    }

    /// Toggle completion for a habit on `date`; unknown habits are a no-op.
    pub fn toggle_check_in(
        &mut self,
        habit_id: &str,
        date: DateKey,
        now: DateTime<Utc>,
        today: DateKey,
    ) -> Option<ToggleOutcome> {
        self.habit(habit_id)?;
        let check_in = self.check_ins.toggle(habit_id, date, now).clone();
        let streak = self.recompute_habit(habit_id, today)?;
        let milestone = (check_in.completed && is_exact_milestone(streak.current_streak))
            .then_some(streak.current_streak);
        Some(ToggleOutcome {
            check_in,
            streak,
            milestone,
        })
    }

    pub fn check_in(&self, id: &str) -> Option<&CheckIn> {
        self.check_ins.find(id)
    }

    pub fn check_ins_for<'a>(
        &'a self,
        habit_id: &'a str,
    ) -> impl Iterator<Item = &'a CheckIn> + 'a {
        self.check_ins.all_for(habit_id)
    }

    pub fn check_in_on(&self, habit_id: &str, date: DateKey) -> Option<&CheckIn> {
        self.check_ins.record_for(habit_id, date)
    }

    pub fn set_mood(&mut self, check_in_id: &str, mood: Mood) -> Option<&CheckIn> {
        if !self.check_ins.set_mood(check_in_id, mood) {
            return None;
        }
        self.check_ins.find(check_in_id)
    }

    pub fn set_note(&mut self, check_in_id: &str, note: Option<String>) -> Option<&CheckIn> {
        let note = note.filter(|text| !text.trim().is_empty());
        if !self.check_ins.set_note(check_in_id, note) {
            return None;
        }
        self.check_ins.find(check_in_id)
    }

    pub fn streak(&self, habit_id: &str) -> Option<&Streak> {
        self.streaks.get(habit_id)
    }

    pub fn streaks(&self) -> impl Iterator<Item = &Streak> {
        self.streaks.values()
    }

    /// Rebuild every cached streak as of `today`.
    pub fn recompute_streaks(&mut self, today: DateKey) {
        let streaks = self
            .habits
            .iter()
            .map(|habit| {
                let streak = calculate_streak(
                    &habit.id,
                    Some(habit.created_on()),
                    self.check_ins.all_for(&habit.id),
                    today,
                );
                (habit.id.clone(), streak)
            })
            .collect();
        self.streaks = streaks;
        self.computed_on = Some(today);
        debug!(habits = self.habits.len(), %today, "recomputed streaks");
    }

    /// Recompute when the cache was built on a different day. Returns whether
    /// a recompute happened.
    pub fn ensure_fresh(&mut self, today: DateKey) -> bool {
        if self.computed_on == Some(today) {
            return false;
        }
        self.recompute_streaks(today);
        true
    }

    fn recompute_habit(&mut self, habit_id: &str, today: DateKey) -> Option<Streak> {
        if self.computed_on != Some(today) {
            self.recompute_streaks(today);
            return self.streaks.get(habit_id).cloned();
        }
        let habit = self.habit(habit_id)?;
        let streak = calculate_streak(
            habit_id,
            Some(habit.created_on()),
            self.check_ins.all_for(habit_id),
            today,
        );
        self.streaks.insert(habit_id.to_string(), streak.clone());
        Some(streak)
    }

    fn set_archived(&mut self, id: &str, archived: bool) -> Option<&Habit> {
        let habit = self.habits.iter_mut().find(|habit| habit.id == id)?;
        habit.archived = archived;
        Some(habit)
    }
}

fn validate_name(name: &str) -> Result<String, HabitError> {
    let name = name.trim();
    let chars = name.chars().count();
    if chars == 0 || chars > NAME_MAX_CHARS {
        return Err(HabitError::InvalidName);
    }
    Ok(name.to_string())
}

fn validate_description(description: Option<String>) -> Result<Option<String>, HabitError> {
    match description {
        Some(text) if text.chars().count() > DESCRIPTION_MAX_CHARS => {
            Err(HabitError::DescriptionTooLong)
        }
        other => Ok(other),
    }
}

fn validate_target_days(days: Option<Vec<u8>>) -> Result<Option<Vec<u8>>, HabitError> {
    let Some(mut days) = days else {
        return Ok(None);
    };
    if days.iter().any(|day| *day > 6) {
        return Err(HabitError::InvalidTargetDays);
    }
    days.sort_unstable();
    days.dedup();
    Ok(Some(days))
}

/// The streak cache persists as a list of `[habitId, streak]` pairs.
///
/// The cache is rebuilt from the ledger after every load, so pairs that fail
/// to parse are dropped instead of failing the whole snapshot.
mod streak_pairs {
    use crate::streak::Streak;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;
    use std::collections::BTreeMap;
    use tracing::warn;

    pub fn serialize<S: Serializer>(
        streaks: &BTreeMap<String, Streak>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&String, &Streak)> = streaks.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Streak>, D::Error> {
        let Value::Array(pairs) = Value::deserialize(deserializer)? else {
            warn!("streak cache is not a list; rebuilding from check-ins");
            return Ok(BTreeMap::new());
        };
        let mut streaks = BTreeMap::new();
        let mut dropped = 0usize;
        for pair in pairs {
            match serde_json::from_value::<(String, Streak)>(pair) {
                Ok((habit_id, streak)) => {
                    streaks.insert(habit_id, streak);
                }
                Err(_) => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "skipped unreadable streak cache entries");
        }
        Ok(streaks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(raw: &str) -> DateKey {
        raw.parse().unwrap()
    }

    fn noon(date: &str) -> DateTime<Utc> {
        let date = day(date).date();
        Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
    }

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: name.to_string(),
            description: None,
            category: Category::Health,
            frequency: Frequency::Daily,
            target_days: None,
            color: "#10b981".into(),
            icon: None,
        }
    }

    /// A store with one habit created well before the test dates.
    fn store_with_habit() -> (HabitStore, String) {
        let mut store = HabitStore::default();
        let habit = store
            .add_habit(new_habit("Read"), noon("2023-06-01"))
            .unwrap();
        (store, habit.id)
    }

    #[test]
    fn toggle_recomputes_streak_synchronously() {
        let (mut store, id) = store_with_habit();
        let today = day("2024-01-03");
        for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            store.toggle_check_in(&id, day(date), noon(date), today);
        }
        let streak = store.streak(&id).unwrap();
        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
        assert_eq!(streak.last_check_in_date, Some(today));
    }

    #[test]
    fn gap_scenario_matches_history() {
        let (mut store, id) = store_with_habit();
        for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            store.toggle_check_in(&id, day(date), noon(date), day(date));
        }
        let outcome = store
            .toggle_check_in(&id, day("2024-01-05"), noon("2024-01-05"), day("2024-01-05"))
            .unwrap();
        assert_eq!(outcome.streak.current_streak, 1);
        assert_eq!(outcome.streak.longest_streak, 3);
    }

    #[test]
    fn untoggle_drops_completion_but_keeps_record() {
        let (mut store, id) = store_with_habit();
        let today = day("2024-01-03");
        store.toggle_check_in(&id, today, noon("2024-01-03"), today);
        let outcome = store
            .toggle_check_in(&id, today, noon("2024-01-03"), today)
            .unwrap();
        assert!(!outcome.check_in.completed);
        assert_eq!(outcome.streak.total_completions, 0);
        assert_eq!(store.check_ins_for(&id).count(), 1);
    }

    #[test]
    fn toggle_for_unknown_habit_is_noop() {
        let mut store = HabitStore::default();
        let today = day("2024-01-03");
        assert!(store
            .toggle_check_in("missing", today, noon("2024-01-03"), today)
            .is_none());
        assert!(store.ledger().is_empty());
    }

    #[test]
    fn reaching_seven_days_reports_milestone() {
        let (mut store, id) = store_with_habit();
        let mut last = None;
        for offset in 0..7 {
            let date = day("2024-01-01").add_days(offset);
            let rendered = date.to_string();
            last = store.toggle_check_in(&id, date, noon(&rendered), date);
            if offset < 6 {
                assert_eq!(last.as_ref().unwrap().milestone, None);
            }
        }
        assert_eq!(last.unwrap().milestone, Some(7));
    }

    #[test]
    fn delete_cascades_to_check_ins_and_streak() {
        let (mut store, id) = store_with_habit();
        let today = day("2024-01-03");
        store.toggle_check_in(&id, today, noon("2024-01-03"), today);
        assert!(store.delete_habit(&id));
        assert!(store.habit(&id).is_none());
        assert!(store.streak(&id).is_none());
        assert!(store.ledger().is_empty());
        assert!(!store.delete_habit(&id));
    }

    #[test]
    fn archive_hides_from_due_list_and_keeps_streak() {
        let (mut store, id) = store_with_habit();
        let today = day("2024-01-03");
        store.toggle_check_in(&id, today, noon("2024-01-03"), today);

        store.archive_habit(&id).unwrap();
        assert!(store.due_on(today).is_empty());
        assert_eq!(store.archived_habits().count(), 1);
        assert_eq!(store.streak(&id).unwrap().current_streak, 1);

        store.restore_habit(&id).unwrap();
        assert_eq!(store.due_on(today).len(), 1);
    }

    #[test]
    fn ensure_fresh_recomputes_after_day_rollover() {
        let (mut store, id) = store_with_habit();
        let today = day("2024-01-03");
        store.toggle_check_in(&id, today, noon("2024-01-03"), today);
        assert!(!store.ensure_fresh(today));
        assert_eq!(store.streak(&id).unwrap().current_streak, 1);

        assert!(store.ensure_fresh(day("2024-01-05")));
        assert_eq!(store.streak(&id).unwrap().current_streak, 0);
        assert_eq!(store.streak(&id).unwrap().longest_streak, 1);
    }

    #[test]
    fn check_ins_before_creation_are_ignored() {
        let mut store = HabitStore::default();
        let habit = store
            .add_habit(new_habit("Walk"), noon("2024-01-02"))
            .unwrap();
        let today = day("2024-01-03");
        store.toggle_check_in(&habit.id, day("2024-01-01"), noon("2024-01-03"), today);
        let outcome = store
            .toggle_check_in(&habit.id, today, noon("2024-01-03"), today)
            .unwrap();
        assert_eq!(outcome.streak.total_completions, 1);
        assert_eq!(outcome.streak.current_streak, 1);
    }

    #[test]
    fn validation_rejects_bad_input() {
        let mut store = HabitStore::default();
        let now = noon("2024-01-01");
        assert_eq!(
            store.add_habit(new_habit("   "), now).unwrap_err(),
            HabitError::InvalidName
        );
        assert_eq!(
            store.add_habit(new_habit(&"x".repeat(51)), now).unwrap_err(),
            HabitError::InvalidName
        );

        let mut weekly = new_habit("Review");
        weekly.frequency = Frequency::Weekly;
        weekly.target_days = Some(vec![7]);
        assert_eq!(
            store.add_habit(weekly, now).unwrap_err(),
            HabitError::InvalidTargetDays
        );
        assert!(store.habits().is_empty());
    }

    #[test]
    fn update_applies_partial_patch() {
        let (mut store, id) = store_with_habit();
        let patch = HabitPatch {
            name: Some("  Read fiction ".into()),
            frequency: Some(Frequency::Weekly),
            target_days: Some(vec![5, 1, 1]),
            ..HabitPatch::default()
        };
        let updated = store
            .update_habit(&id, patch, day("2024-01-03"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Read fiction");
        assert_eq!(updated.target_days, Some(vec![1, 5]));
        assert_eq!(updated.category, Category::Health);

        assert_eq!(
            store
                .update_habit("missing", HabitPatch::default(), day("2024-01-03"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn snapshot_stores_streaks_as_pairs() {
        let (mut store, id) = store_with_habit();
        let today = day("2024-01-03");
        store.toggle_check_in(&id, today, noon("2024-01-03"), today);

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["streaks"][0][0], id.as_str());
        assert_eq!(json["streaks"][0][1]["currentStreak"], 1);
        assert_eq!(json["checkIns"].as_array().unwrap().len(), 1);

        let mut loaded: HabitStore = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.streak(&id).unwrap().current_streak, 1);
        assert!(loaded.ensure_fresh(today));
        assert_eq!(loaded.streak(&id).unwrap().current_streak, 1);
    }

    #[test]
    fn unreadable_streak_pairs_are_dropped() {
        let (mut store, id) = store_with_habit();
        let today = day("2024-01-03");
        store.toggle_check_in(&id, today, noon("2024-01-03"), today);

        let mut json = serde_json::to_value(&store).unwrap();
        json["streaks"][0][1]["lastCheckInDate"] = "".into();
        json["streaks"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!(["dangling"]));
        let loaded: HabitStore = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.habits().len(), 1);
        assert!(loaded.streak(&id).is_none());

        let mut json = serde_json::to_value(&store).unwrap();
        json["streaks"] = serde_json::json!({ "not": "a list" });
        let loaded: HabitStore = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.check_ins_for(&id).count(), 1);
        assert_eq!(loaded.streaks().count(), 0);
    }
}
