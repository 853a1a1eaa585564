use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum spacing between two generated coaching messages.
pub const GENERATION_INTERVAL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoachingMessageType {
    Motivation,
    Insight,
    Suggestion,
    Celebration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CoachingMessageType,
    pub content: String,
    #[serde(default)]
    pub related_habit_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingLog {
    #[serde(default)]
    messages: Vec<CoachingMessage>,
    #[serde(default)]
    last_generated_at: Option<DateTime<Utc>>,
}

impl CoachingLog {
    pub fn messages(&self) -> &[CoachingMessage] {
        &self.messages
    }

    pub fn last_generated_at(&self) -> Option<DateTime<Utc>> {
        self.last_generated_at
    }

    /// Record a freshly generated message; newest messages come first.
    pub fn add(
        &mut self,
        kind: CoachingMessageType,
        content: String,
        related_habit_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> &CoachingMessage {
        self.messages.insert(
            0,
            CoachingMessage {
                id: Uuid::new_v4().to_string(),
                kind,
                content,
                related_habit_ids,
                created_at: now,
                read: false,
            },
        );
        self.last_generated_at = Some(now);
        &self.messages[0]
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.messages.iter_mut().find(|message| message.id == id) {
            Some(message) => {
                message.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for message in &mut self.messages {
            message.read = true;
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|message| message.id != id);
        self.messages.len() != before
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_generated_at = None;
    }

    pub fn unread(&self) -> impl Iterator<Item = &CoachingMessage> {
        self.messages.iter().filter(|message| !message.read)
    }

    pub fn recent(&self, count: usize) -> Vec<&CoachingMessage> {
        let mut messages: Vec<_> = self.messages.iter().collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(count);
        messages
    }

    pub fn can_generate_new(&self, now: DateTime<Utc>) -> bool {
        self.next_generation_at()
            .is_none_or(|allowed_at| now >= allowed_at)
    }

    pub fn next_generation_at(&self) -> Option<DateTime<Utc>> {
        self.last_generated_at
            .map(|last| last + Duration::seconds(GENERATION_INTERVAL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, hour, minute, 0).unwrap()
    }

    #[test]
    fn rate_limit_is_one_hour() {
        let mut log = CoachingLog::default();
        assert!(log.can_generate_new(at(9, 0)));
        log.add(CoachingMessageType::Insight, "Nice pattern".into(), Vec::new(), at(9, 0));
        assert!(!log.can_generate_new(at(9, 59)));
        assert!(log.can_generate_new(at(10, 0)));
        assert_eq!(log.next_generation_at(), Some(at(10, 0)));
    }

    #[test]
    fn newest_first_and_read_tracking() {
        let mut log = CoachingLog::default();
        let first = log
            .add(CoachingMessageType::Motivation, "one".into(), Vec::new(), at(9, 0))
            .id
            .clone();
        log.add(CoachingMessageType::Celebration, "two".into(), Vec::new(), at(11, 0));
        assert_eq!(log.messages()[0].content, "two");
        assert_eq!(log.recent(1)[0].content, "two");

        assert!(log.mark_read(&first));
        assert!(!log.mark_read("missing"));
        assert_eq!(log.unread().count(), 1);
        log.mark_all_read();
        assert_eq!(log.unread().count(), 0);

        assert!(log.delete(&first));
        assert_eq!(log.messages().len(), 1);
        log.clear();
        assert!(log.messages().is_empty());
        assert!(log.can_generate_new(at(11, 1)));
    }

    #[test]
    fn message_type_serializes_as_type_field() {
        let mut log = CoachingLog::default();
        log.add(
            CoachingMessageType::Suggestion,
            "Try mornings".into(),
            vec!["h1".into()],
            at(9, 0),
        );
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["messages"][0]["type"], "suggestion");
        assert_eq!(json["messages"][0]["relatedHabitIds"][0], "h1");
        assert!(json["lastGeneratedAt"].is_string());
    }
}
