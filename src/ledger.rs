use crate::dates::DateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Self-reported mood attached to a check-in, 1 (struggled) to 5 (great).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Mood(u8);

impl Mood {
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Mood {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("mood must be between 1 and 5, got {value}"))
    }
}

impl From<Mood> for u8 {
    fn from(mood: Mood) -> Self {
        mood.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    pub habit_id: String,
    pub date: DateKey,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Wall-clock time of the most recent toggle.
    pub timestamp: DateTime<Utc>,
}

/// The authoritative set of check-ins.
///
/// Records are keyed by `(habit id, date)`, so a second record for an occupied
/// slot cannot be represented. On disk the ledger is a flat list of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CheckIn>", into = "Vec<CheckIn>")]
pub struct Ledger {
    records: BTreeMap<(String, DateKey), CheckIn>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip completion for `(habit_id, date)`, creating a completed record when
    /// the slot is empty. Returns the record as it stands afterwards.
    pub fn toggle(&mut self, habit_id: &str, date: DateKey, now: DateTime<Utc>) -> &CheckIn {
        self.records
            .entry((habit_id.to_string(), date))
            .and_modify(|record| {
                record.completed = !record.completed;
                record.timestamp = now;
            })
            .or_insert_with(|| CheckIn {
                id: Uuid::new_v4().to_string(),
                habit_id: habit_id.to_string(),
                date,
                completed: true,
                mood: None,
                note: None,
                timestamp: now,
            })
    }

    pub fn record_for(&self, habit_id: &str, date: DateKey) -> Option<&CheckIn> {
        self.records.get(&(habit_id.to_string(), date))
    }

    /// Every record of a habit, ascending by date.
    pub fn all_for<'a>(&'a self, habit_id: &'a str) -> impl Iterator<Item = &'a CheckIn> + 'a {
        self.records
            .values()
            .filter(move |record| record.habit_id == habit_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckIn> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, check_in_id: &str) -> Option<&CheckIn> {
        self.records.values().find(|record| record.id == check_in_id)
    }

    /// Attach a mood. Returns `false` when no such record exists.
    pub fn set_mood(&mut self, check_in_id: &str, mood: Mood) -> bool {
        self.find_mut(check_in_id)
            .map(|record| record.mood = Some(mood))
            .is_some()
    }

    /// Attach or clear a note. Returns `false` when no such record exists.
    pub fn set_note(&mut self, check_in_id: &str, note: Option<String>) -> bool {
        self.find_mut(check_in_id)
            .map(|record| record.note = note)
            .is_some()
    }

    /// Drop every record of a habit; returns how many were removed.
    pub fn cascade_delete_for_habit(&mut self, habit_id: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|(owner, _), _| owner != habit_id);
        before - self.records.len()
    }

    fn find_mut(&mut self, check_in_id: &str) -> Option<&mut CheckIn> {
        self.records
            .values_mut()
            .find(|record| record.id == check_in_id)
    }
}

impl From<Vec<CheckIn>> for Ledger {
    fn from(records: Vec<CheckIn>) -> Self {
        // Later duplicates of a slot win, which repairs snapshots written by
        // older versions that appended blindly.
        let records = records
            .into_iter()
            .map(|record| ((record.habit_id.clone(), record.date), record))
            .collect();
        Self { records }
    }
}

impl From<Ledger> for Vec<CheckIn> {
    fn from(ledger: Ledger) -> Self {
        ledger.records.into_values().collect()
    }
}
