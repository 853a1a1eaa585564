use crate::dates::DateKey;
use crate::errors::AppError;
use crate::models::AppData;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info};

/// One JSON snapshot file under the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Habits,
    Journal,
    Preferences,
    Achievements,
    Coaching,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Habits,
        Namespace::Journal,
        Namespace::Preferences,
        Namespace::Achievements,
        Namespace::Coaching,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Namespace::Habits => "habit-tracker-storage.json",
            Namespace::Journal => "journal-tracker-storage.json",
            Namespace::Preferences => "ui-preferences.json",
            Namespace::Achievements => "habit-tracker-achievements.json",
            Namespace::Coaching => "coaching-tracker-storage.json",
        }
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Load every namespace, falling back to an empty snapshot for anything
/// missing or unreadable, then rebuild the streak cache for `today`.
pub async fn load_data(dir: &Path, today: DateKey) -> AppData {
    let mut data = AppData {
        habits: load_namespace(dir, Namespace::Habits).await,
        journal: load_namespace(dir, Namespace::Journal).await,
        preferences: load_namespace(dir, Namespace::Preferences).await,
        achievements: load_namespace(dir, Namespace::Achievements).await,
        coaching: load_namespace(dir, Namespace::Coaching).await,
        notices: Vec::new(),
    };
    data.habits.recompute_streaks(today);
    info!(
        dir = %dir.display(),
        habits = data.habits.habits().len(),
        check_ins = data.habits.ledger().len(),
        journal_entries = data.journal.len(),
        "loaded data"
    );
    data
}

async fn load_namespace<T: DeserializeOwned + Default>(dir: &Path, namespace: Namespace) -> T {
    let path = namespace.path_in(dir);
    match fs::read(&path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                error!("failed to parse {}: {err}", path.display());
                T::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => T::default(),
        Err(err) => {
            error!("failed to read {}: {err}", path.display());
            T::default()
        }
    }
}

pub async fn persist_namespace(
    dir: &Path,
    namespace: Namespace,
    data: &AppData,
) -> Result<(), AppError> {
    let payload = match namespace {
        Namespace::Habits => to_payload(&data.habits)?,
        Namespace::Journal => to_payload(&data.journal)?,
        Namespace::Preferences => to_payload(&data.preferences)?,
        Namespace::Achievements => to_payload(&data.achievements)?,
        Namespace::Coaching => to_payload(&data.coaching)?,
    };
    fs::create_dir_all(dir).await?;
    fs::write(namespace.path_in(dir), payload).await?;
    debug!(file = namespace.file_name(), "persisted namespace");
    Ok(())
}

pub async fn persist_all(dir: &Path, data: &AppData) -> Result<(), AppError> {
    for namespace in Namespace::ALL {
        persist_namespace(dir, namespace, data).await?;
    }
    Ok(())
}

/// Remove every namespace file. Missing files are not an error.
pub async fn clear_data(dir: &Path) -> Result<(), AppError> {
    for namespace in Namespace::ALL {
        match fs::remove_file(namespace.path_in(dir)).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    info!(dir = %dir.display(), "cleared data");
    Ok(())
}

fn to_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec_pretty(value).map_err(AppError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habits::{Category, Frequency, NewHabit};
    use chrono::{TimeZone, Utc};

    fn day(raw: &str) -> DateKey {
        raw.parse().unwrap()
    }

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: name.into(),
            description: None,
            category: Category::Health,
            frequency: Frequency::Daily,
            target_days: None,
            color: "#10B981".into(),
            icon: None,
        }
    }

    #[tokio::test]
    async fn missing_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = load_data(&dir.path().join("absent"), day("2024-01-05")).await;
        assert!(data.habits.habits().is_empty());
        assert!(data.journal.is_empty());
        assert!(!data.preferences.dark_mode);
    }

    #[tokio::test]
    async fn corrupt_namespace_falls_back_without_touching_others() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = AppData::default();
        data.preferences.dark_mode = true;
        persist_all(dir.path(), &data).await.unwrap();
        std::fs::write(Namespace::Habits.path_in(dir.path()), b"{not json").unwrap();

        let loaded = load_data(dir.path(), day("2024-01-05")).await;
        assert!(loaded.habits.habits().is_empty());
        assert!(loaded.preferences.dark_mode);
    }

    #[tokio::test]
    async fn snapshot_survives_reload_with_streaks_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut data = AppData::default();
        let habit = data.habits.add_habit(new_habit("Walk"), created).unwrap();
        for date in ["2024-01-03", "2024-01-04"] {
            data.habits
                .toggle_check_in(&habit.id, day(date), created, day("2024-01-04"))
                .unwrap();
        }
        persist_namespace(dir.path(), Namespace::Habits, &data)
            .await
            .unwrap();

        let raw: serde_json::Value = serde_json::from_slice(
            &std::fs::read(Namespace::Habits.path_in(dir.path())).unwrap(),
        )
        .unwrap();
        assert_eq!(raw["streaks"][0][0], habit.id.as_str());
        assert_eq!(raw["checkIns"].as_array().unwrap().len(), 2);

        // A day later with no new check-in the streak is still alive.
        let loaded = load_data(dir.path(), day("2024-01-05")).await;
        assert_eq!(loaded.habits.streak(&habit.id).unwrap().current_streak, 2);
        // Two days later it has lapsed.
        let loaded = load_data(dir.path(), day("2024-01-06")).await;
        assert_eq!(loaded.habits.streak(&habit.id).unwrap().current_streak, 0);
        assert_eq!(loaded.habits.streak(&habit.id).unwrap().longest_streak, 2);
    }

    #[tokio::test]
    async fn malformed_streak_cache_keeps_habits_and_check_ins() {
        let dir = tempfile::tempdir().unwrap();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut data = AppData::default();
        let habit = data.habits.add_habit(new_habit("Walk"), created).unwrap();
        data.habits
            .toggle_check_in(&habit.id, day("2024-01-02"), created, day("2024-01-02"))
            .unwrap();
        persist_namespace(dir.path(), Namespace::Habits, &data)
            .await
            .unwrap();

        let path = Namespace::Habits.path_in(dir.path());
        let mut raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        raw["streaks"][0][1]["lastCheckInDate"] = "".into();
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let loaded = load_data(dir.path(), day("2024-01-03")).await;
        assert_eq!(loaded.habits.habits().len(), 1);
        assert_eq!(loaded.habits.check_ins_for(&habit.id).count(), 1);
        let streak = loaded.habits.streak(&habit.id).unwrap();
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.last_check_in_date, Some(day("2024-01-02")));
    }

    #[tokio::test]
    async fn clear_removes_every_namespace() {
        let dir = tempfile::tempdir().unwrap();
        persist_all(dir.path(), &AppData::default()).await.unwrap();
        clear_data(dir.path()).await.unwrap();
        for namespace in Namespace::ALL {
            assert!(!namespace.path_in(dir.path()).exists());
        }
        clear_data(dir.path()).await.unwrap();
    }
}
