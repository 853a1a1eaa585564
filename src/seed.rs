//! Sample data for demos and manual testing.

use crate::achievements::AchievementStats;
use crate::dates::DateKey;
use crate::habits::{Category, Frequency, Habit, HabitStore};
use crate::journal::{Journal, JournalEntry, SentimentAnalysis, SentimentLabel};
use crate::models::AppData;
use crate::schedule::is_due_on;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::info;

const HISTORY_DAYS: i64 = 60;
const JOURNAL_DAYS: i64 = 30;
const JOURNAL_ENTRY_CHANCE: f64 = 0.6;

struct SampleHabit {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: Category,
    frequency: Frequency,
    target_days: Option<&'static [u8]>,
    color: &'static str,
    age_days: i64,
    completion_rate: f64,
}

const SAMPLE_HABITS: [SampleHabit; 5] = [
    SampleHabit {
        id: "habit-1",
        name: "Morning Meditation",
        description: "10 minutes of mindfulness to start the day",
        category: Category::Mindfulness,
        frequency: Frequency::Daily,
        target_days: None,
        color: "#8b5cf6",
        age_days: 45,
        completion_rate: 0.85,
    },
    SampleHabit {
        id: "habit-2",
        name: "Exercise",
        description: "30 minutes of physical activity",
        category: Category::Health,
        frequency: Frequency::Daily,
        target_days: None,
        color: "#ef4444",
        age_days: 30,
        completion_rate: 0.65,
    },
    SampleHabit {
        id: "habit-3",
        name: "Read for 20 minutes",
        description: "Read books or articles to learn something new",
        category: Category::Learning,
        frequency: Frequency::Daily,
        target_days: None,
        color: "#3b82f6",
        age_days: 60,
        completion_rate: 0.75,
    },
    SampleHabit {
        id: "habit-4",
        name: "Drink 8 glasses of water",
        description: "Stay hydrated throughout the day",
        category: Category::Health,
        frequency: Frequency::Daily,
        target_days: None,
        color: "#06b6d4",
        age_days: 20,
        completion_rate: 0.90,
    },
    SampleHabit {
        id: "habit-5",
        name: "Weekly Review",
        description: "Reflect on the week and plan ahead",
        category: Category::Productivity,
        frequency: Frequency::Weekly,
        target_days: Some(&[0]),
        color: "#f59e0b",
        age_days: 40,
        completion_rate: 0.80,
    },
];

const SAMPLE_JOURNAL: [(&str, u8); 10] = [
    (
        "Had a great start to the day with meditation. \
         Feeling focused and ready to tackle my tasks.",
        5,
    ),
    (
        "Struggled to stay motivated today, but managed to get my workout in. Small wins matter.",
        3,
    ),
    ("Finished reading an amazing chapter. Learning about new concepts is exciting!", 4),
    ("Felt a bit overwhelmed with work. Need to prioritize better tomorrow.", 2),
    ("Perfect day! Hit all my habits and had quality time with family.", 5),
    ("Missed my morning routine due to early meeting. Getting back on track.", 3),
    ("Grateful for the progress I've made this week. Consistency is key.", 4),
    ("Challenging day but I showed up for myself. That's what counts.", 3),
    ("Energy levels were low today. Prioritizing rest tonight.", 2),
    ("Celebrated a small milestone - 7 day streak on meditation!", 5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub habits: usize,
    pub check_ins: usize,
    pub journal_entries: usize,
    pub achievements_unlocked: usize,
}

/// Replace habits, check-ins and journal entries with sample data ending on
/// `today`. Preferences are kept; achievements are re-evaluated.
pub fn seed_sample_data<R: Rng>(
    data: &mut AppData,
    today: DateKey,
    now: DateTime<Utc>,
    rng: &mut R,
) -> SeedSummary {
    data.habits = sample_habits(today, now, rng);
    data.journal = sample_journal(today, now, rng);

    let stats = AchievementStats::collect(&data.habits, today);
    let unlocked = data.achievements.check_and_unlock(&stats, now);

    let summary = SeedSummary {
        habits: data.habits.habits().len(),
        check_ins: data.habits.ledger().len(),
        journal_entries: data.journal.len(),
        achievements_unlocked: unlocked.len(),
    };
    info!(?summary, "seeded sample data");
    summary
}

/// Drop every namespace back to its empty state.
pub fn clear_all_data(data: &mut AppData) {
    *data = AppData::default();
    info!("cleared all data");
}

fn sample_habits<R: Rng>(today: DateKey, now: DateTime<Utc>, rng: &mut R) -> HabitStore {
    let mut store = HabitStore::default();
    for sample in &SAMPLE_HABITS {
        store.insert_habit(Habit {
            id: sample.id.to_string(),
            name: sample.name.to_string(),
            description: Some(sample.description.to_string()),
            category: sample.category,
            frequency: sample.frequency,
            target_days: sample.target_days.map(<[u8]>::to_vec),
            color: sample.color.to_string(),
            icon: None,
            created_at: now - Duration::days(sample.age_days),
            archived: false,
        });
    }

    let habits: Vec<Habit> = store.habits().to_vec();
    for (habit, sample) in habits.iter().zip(&SAMPLE_HABITS) {
        // Oldest first so each toggle extends history forward.
        for offset in (0..HISTORY_DAYS).rev() {
            let date = today.add_days(-offset);
            if date < habit.created_on() || !is_due_on(habit, date) {
                continue;
            }
            if rng.gen_bool(sample.completion_rate) {
                store.toggle_check_in(&habit.id, date, now - Duration::days(offset), today);
            }
        }
    }
    store.recompute_streaks(today);
    store
}

fn sample_journal<R: Rng>(today: DateKey, now: DateTime<Utc>, rng: &mut R) -> Journal {
    let mut journal = Journal::default();
    for offset in 0..JOURNAL_DAYS {
        if !rng.gen_bool(JOURNAL_ENTRY_CHANCE) {
            continue;
        }
        let date = today.add_days(-offset);
        let written_at = now - Duration::days(offset);
        let (content, score) = SAMPLE_JOURNAL[rng.gen_range(0..SAMPLE_JOURNAL.len())];
        let label = match score {
            4.. => SentimentLabel::Positive,
            3 => SentimentLabel::Neutral,
            _ => SentimentLabel::Negative,
        };
        journal.insert(JournalEntry {
            id: format!("journal-{date}"),
            date,
            content: content.to_string(),
            sentiment: Some(SentimentAnalysis {
                score,
                label,
                confidence: 0.85 + rng.gen_range(0.0..0.1),
                themes: Vec::new(),
                analyzed_at: written_at,
            }),
            created_at: written_at,
            updated_at: written_at,
        });
    }
    journal
}
