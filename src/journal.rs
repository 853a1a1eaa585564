use crate::dates::DateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const CONTENT_MIN_CHARS: usize = 10;
pub const CONTENT_MAX_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryNegative => "very-negative",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
            Self::VeryPositive => "very-positive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysis {
    pub score: u8,
    pub label: SentimentLabel,
    pub confidence: f64,
    #[serde(default)]
    pub themes: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub date: DateKey,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentAnalysis>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JournalError {
    #[error("entry must be at least 10 characters")]
    TooShort,
    #[error("entry must be at most 5000 characters")]
    TooLong,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    #[serde(default)]
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn add(
        &mut self,
        date: DateKey,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, JournalError> {
        let entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            date,
            content: validate_content(content)?,
            sentiment: None,
            created_at: now,
            updated_at: now,
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Insert a fully formed entry, used when seeding.
    pub fn insert(&mut self, entry: JournalEntry) {
        self.entries.retain(|existing| existing.id != entry.id);
        self.entries.push(entry);
    }

    /// Replace the content of an entry. Changed content invalidates any
    /// earlier sentiment. `Ok(None)` when the entry does not exist.
    pub fn update_content(
        &mut self,
        id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<&JournalEntry>, JournalError> {
        let content = validate_content(content)?;
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return Ok(None);
        };
        if entry.content != content {
            entry.content = content;
            entry.sentiment = None;
        }
        entry.updated_at = now;
        Ok(Some(&*entry))
    }

    pub fn attach_sentiment(&mut self, id: &str, sentiment: SentimentAnalysis) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.sentiment = Some(sentiment);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&JournalEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn by_date(&self, date: DateKey) -> Option<&JournalEntry> {
        self.entries.iter().find(|entry| entry.date == date)
    }

    /// Entries with `start <= date <= end`, newest first.
    pub fn in_range(&self, start: DateKey, end: DateKey) -> Vec<&JournalEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.date >= start && entry.date <= end)
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    pub fn recent(&self, count: usize) -> Vec<&JournalEntry> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        entries.truncate(count);
        entries
    }

    /// Mean sentiment score over analyzed entries.
    pub fn average_mood(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .entries
            .iter()
            .filter_map(|entry| entry.sentiment.as_ref())
            .map(|sentiment| f64::from(sentiment.score))
            .collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

fn validate_content(content: &str) -> Result<String, JournalError> {
    let content = content.trim();
    let chars = content.chars().count();
    if chars < CONTENT_MIN_CHARS {
        return Err(JournalError::TooShort);
    }
    if chars > CONTENT_MAX_CHARS {
        return Err(JournalError::TooLong);
    }
    Ok(content.to_string())
}
